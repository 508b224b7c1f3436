//! Cross-layer token address resolution
//!
//! The fee token defaults to the L2 counterpart of an L1 token. On zkSync the
//! counterpart of an ERC20 comes from the default L2 bridge; L1 ETH maps to
//! the base-token system contract.

use alloy::primitives::{address, Address};
use alloy::providers::{DynProvider, Provider};
use alloy::sol;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::ConfigError;
use crate::error::{ResolutionError, SetupError};

/// L2 system contract holding the base token (ETH).
pub const L2_BASE_TOKEN_ADDRESS: Address = address!("000000000000000000000000000000000000800a");

sol! {
    /// Default L2 ERC20 bridge.
    #[sol(rpc)]
    interface IL2Bridge {
        function l2TokenAddress(address l1Token) external view returns (address);
    }
}

/// Maps a source-chain token to its destination-chain counterpart
#[async_trait]
pub trait AddressResolver: Send + Sync {
    async fn resolve(&self, source: Address) -> Result<Address, ResolutionError>;
}

/// `zks_getBridgeContracts` response; only the L2 ERC20 bridge is used.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BridgeContracts {
    #[serde(default)]
    l2_erc20_default_bridge: Option<Address>,
}

/// Resolver backed by the zkSync bridge contracts
#[derive(Clone)]
pub struct BridgeResolver {
    provider: DynProvider,
}

impl BridgeResolver {
    pub fn new(provider: DynProvider) -> Self {
        Self { provider }
    }

    async fn default_l2_bridge(&self) -> Result<Address, ResolutionError> {
        let bridges: BridgeContracts = self
            .provider
            .raw_request("zks_getBridgeContracts".into(), [(); 0])
            .await
            .map_err(|e| ResolutionError::Provider(e.to_string()))?;

        bridges
            .l2_erc20_default_bridge
            .ok_or(ResolutionError::NoDefaultBridge)
    }
}

#[async_trait]
impl AddressResolver for BridgeResolver {
    async fn resolve(&self, source: Address) -> Result<Address, ResolutionError> {
        if source == Address::ZERO {
            return Ok(L2_BASE_TOKEN_ADDRESS);
        }

        let bridge = self.default_l2_bridge().await?;
        debug!(bridge = %bridge, token = %source, "Querying L2 bridge");

        let resolved = IL2Bridge::new(bridge, self.provider.clone())
            .l2TokenAddress(source)
            .call()
            .await
            .map_err(|e| ResolutionError::Bridge(e.to_string()))?;

        if resolved.is_zero() {
            return Err(ResolutionError::NoCounterpart(source));
        }
        Ok(resolved)
    }
}

/// Fee-token value with two sources: `FEE_TOKEN` wins, otherwise the L2
/// counterpart of the network's L1 fee token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeTokenSource {
    pub network: String,
    pub override_token: Option<Address>,
    pub l1_token: Option<Address>,
}

impl FeeTokenSource {
    /// Pick the fee token. The resolver is only queried when there is no
    /// override; having neither source is a configuration error.
    pub async fn resolve(&self, resolver: &dyn AddressResolver) -> Result<Address, SetupError> {
        if let Some(token) = self.override_token {
            info!(fee_token = %token, "Using FEE_TOKEN override");
            return Ok(token);
        }

        let l1_token = self
            .l1_token
            .ok_or_else(|| ConfigError::MissingFeeToken(self.network.clone()))?;
        let token = resolver.resolve(l1_token).await?;
        info!(l1_token = %l1_token, fee_token = %token, "Resolved L2 fee token");
        Ok(token)
    }
}
