use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use zns_tools::artifact::HardhatArtifacts;
use zns_tools::deployer::{self, RpcDeployer};
use zns_tools::resolver::BridgeResolver;
use zns_tools::verifier::ExplorerVerifier;
use zns_tools::{logging, Config, DeploymentOrchestrator, DeploymentPlan, Overrides, RunSummary};

#[derive(Parser)]
#[command(name = "zns")]
#[command(about = "ZNS CLI tools for contract deployment to zkSync")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy the selected ZNS contracts
    Deploy {
        /// Network profile to deploy to (zksync-testnet/zksync-mainnet or a deploy.toml profile)
        #[arg(short, long)]
        network: Option<String>,
        /// Contract to deploy; repeat for several
        #[arg(short, long = "unit")]
        units: Vec<String>,
        /// Deploy every declared unit
        #[arg(short, long, conflicts_with = "units")]
        all: bool,
        /// Directory with compiled artifacts
        #[arg(long)]
        artifacts: Option<PathBuf>,
    },
    /// Check configuration
    Config {
        /// Network profile to inspect
        #[arg(short, long)]
        network: Option<String>,
        /// Also require a deployer key
        #[arg(short, long)]
        validate: bool,
        /// Print configuration as JSON
        #[arg(long)]
        json: bool,
    },
    /// List declared units and available artifacts
    Units,
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Deploy {
            network,
            units,
            all,
            artifacts,
        } => {
            let config = Config::load(Overrides {
                network,
                units,
                all_units: all,
                artifacts_dir: artifacts,
            })?;
            deploy(config).await
        }
        Commands::Config {
            network,
            validate,
            json,
        } => {
            let config = Config::load(Overrides {
                network,
                ..Default::default()
            })?;
            if validate {
                deployer::parse_signer(config.require_private_key()?)?;
                info!("Configuration is valid");
            }
            if json {
                println!("{}", config.to_json()?);
            } else {
                config.print_summary();
            }
            Ok(())
        }
        Commands::Units => {
            let config = Config::load(Overrides::default())?;
            let selected = config.selected_units()?;
            let available = HardhatArtifacts::new(&config.artifacts_dir).list();
            println!(
                "Declared units ({} selected by {}, artifacts in {}):",
                selected.len(),
                config.selection,
                config.artifacts_dir.display()
            );
            for unit in &config.catalog {
                let marker = if selected.iter().any(|s| s.name == unit.name) {
                    "*"
                } else {
                    " "
                };
                let artifact = if available.contains(&unit.name) {
                    ""
                } else {
                    "  (no artifact)"
                };
                let args: Vec<String> = unit.args.iter().map(ToString::to_string).collect();
                println!("  {} {}({}){}", marker, unit.name, args.join(", "), artifact);
            }
            Ok(())
        }
    }
}

async fn deploy(config: Config) -> Result<()> {
    info!(network = %config.network, rpc_url = %config.rpc_url, "Starting deployment");

    let resolver = BridgeResolver::new(deployer::read_provider(config.rpc_url.clone()));
    let plan = DeploymentPlan::prepare(&config, &resolver)
        .await
        .context("Deployment setup failed")?;

    let rpc_deployer = RpcDeployer::new(config.rpc_url.clone(), plan.signer.clone());
    info!(deployer = %rpc_deployer.from_address(), units = plan.units.len(), "Deployment plan ready");

    let verifier = ExplorerVerifier::new(config.verify_url.clone(), config.compiler.clone())?;

    let orchestrator = DeploymentOrchestrator::new(
        Arc::new(HardhatArtifacts::new(&config.artifacts_dir)),
        Arc::new(rpc_deployer),
        Arc::new(verifier),
    );
    let results = orchestrator.run(&plan.units, &plan.context).await;

    let summary = RunSummary::from_results(&results);
    println!("Deployment finished: {}", summary);
    if summary.failed > 0 {
        for result in results.iter().filter(|r| r.error.is_some()) {
            warn!(contract = %result.unit.name, "Unit was not deployed");
        }
    }
    Ok(())
}
