//! Deployment transactions
//!
//! Constructor arguments are ABI-encoded against the artifact's constructor.
//! zkSync Era only accepts zksolc bytecode through an EIP-712 (type `0x71`)
//! transaction to the ContractDeployer system contract: the calldata carries
//! the bytecode hash and the arguments, the bytecode itself travels as a
//! factory dependency. The wallet-backed provider fills the remaining fields;
//! submission then waits for the receipt with no timeout.

use alloy::dyn_abi::{DynSolType, DynSolValue, Specifier};
use alloy::network::{ReceiptResponse, TransactionBuilder};
use alloy::primitives::{address, Address, Bytes, B256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use alloy_zksync::network::transaction_request::TransactionRequest;
use alloy_zksync::network::Zksync;
use alloy_zksync::provider::zksync_provider;
use alloy_zksync::wallet::ZksyncWallet;
use async_trait::async_trait;
use tracing::{debug, info};
use url::Url;

use crate::artifact::Artifact;
use crate::config::ConfigError;
use crate::error::DeployError;
use crate::units::ConstructorArg;

/// ContractDeployer system contract every zkSync deployment is addressed to.
pub const CONTRACT_DEPLOYER_ADDRESS: Address = address!("0000000000000000000000000000000000008006");

/// One deployment submission
#[derive(Debug, Clone, Copy)]
pub struct DeployRequest<'a> {
    pub artifact: &'a Artifact,
    /// ABI-encoded constructor arguments
    pub constructor_args: &'a Bytes,
    /// Token fees are denominated in for this run
    pub fee_token: Address,
}

/// A confirmed deployment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deployment {
    pub address: Address,
    pub tx_hash: B256,
}

/// Submits deployment transactions
#[async_trait]
pub trait ContractDeployer: Send + Sync {
    async fn deploy(&self, request: DeployRequest<'_>) -> Result<Deployment, DeployError>;
}

/// ABI-encode `args` for the artifact's constructor
///
/// Each argument is coerced from its text form to the declared parameter
/// type. Contracts without a constructor take no arguments.
pub fn encode_constructor(
    artifact: &Artifact,
    args: &[ConstructorArg],
) -> Result<Bytes, DeployError> {
    let invalid = |reason: String| DeployError::Arguments {
        contract: artifact.contract_name.clone(),
        reason,
    };

    let params = artifact
        .abi
        .constructor()
        .map(|constructor| constructor.inputs.as_slice())
        .unwrap_or_default();

    if params.len() != args.len() {
        return Err(invalid(format!(
            "expected {} arguments, got {}",
            params.len(),
            args.len()
        )));
    }

    let values = params
        .iter()
        .zip(args)
        .map(|(param, arg)| {
            let ty: DynSolType = param
                .resolve()
                .map_err(|e| invalid(format!("parameter {}: {}", param.name, e)))?;
            ty.coerce_str(&arg.to_string())
                .map_err(|e| invalid(format!("{} is not a valid {}: {}", arg, ty.sol_type_name(), e)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Bytes::from(DynSolValue::Tuple(values).abi_encode_params()))
}

/// Read-only HTTP provider shared by lookups
pub fn read_provider(rpc_url: Url) -> DynProvider {
    ProviderBuilder::new().connect_http(rpc_url).erased()
}

/// Parse the deployer credential
pub fn parse_signer(private_key: &str) -> Result<PrivateKeySigner, ConfigError> {
    private_key
        .trim()
        .trim_start_matches("0x")
        .parse::<PrivateKeySigner>()
        .map_err(|e| ConfigError::InvalidPrivateKey(e.to_string()))
}

/// Build the EIP-712 deployment transaction for `artifact`
pub fn deploy_request(
    from: Address,
    artifact: &Artifact,
    constructor_args: &Bytes,
) -> Result<TransactionRequest, DeployError> {
    TransactionRequest::default()
        .with_from(from)
        .zksync_deploy(artifact.bytecode.to_vec(), constructor_args.to_vec(), Vec::new())
        .map_err(|e| DeployError::Bytecode {
            contract: artifact.contract_name.clone(),
            reason: format!("{:?}", e),
        })
}

/// Turn a confirmed receipt into a [`Deployment`]
pub fn confirmed_deployment<R: ReceiptResponse>(receipt: &R) -> Result<Deployment, DeployError> {
    let tx_hash = receipt.transaction_hash();
    if !receipt.status() {
        return Err(DeployError::Reverted(tx_hash));
    }

    let address = receipt
        .contract_address()
        .ok_or(DeployError::NoContractAddress(tx_hash))?;

    Ok(Deployment { address, tx_hash })
}

/// Deployer sending zkSync EIP-712 deployments through a wallet-backed provider
#[derive(Clone)]
pub struct RpcDeployer {
    provider: DynProvider<Zksync>,
    from: Address,
}

impl RpcDeployer {
    pub fn new(rpc_url: Url, signer: PrivateKeySigner) -> Self {
        let from = signer.address();
        let provider = zksync_provider()
            .with_recommended_fillers()
            .wallet(ZksyncWallet::from(signer))
            .connect_http(rpc_url)
            .erased();
        Self { provider, from }
    }

    pub fn from_address(&self) -> Address {
        self.from
    }
}

#[async_trait]
impl ContractDeployer for RpcDeployer {
    async fn deploy(&self, request: DeployRequest<'_>) -> Result<Deployment, DeployError> {
        let tx = deploy_request(self.from, request.artifact, request.constructor_args)?;

        debug!(
            contract = %request.artifact.contract_name,
            code_len = request.artifact.bytecode.len(),
            fee_token = %request.fee_token,
            from = %self.from,
            "Submitting deployment"
        );

        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(|e| DeployError::Send(e.to_string()))?;
        let tx_hash: B256 = *pending.tx_hash();
        info!(contract = %request.artifact.contract_name, tx_hash = %tx_hash, "Deployment submitted");

        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| DeployError::Confirmation(e.to_string()))?;

        confirmed_deployment(&receipt)
    }
}
