use anyhow::Result;
use shieldpool_config::ShieldpoolConfig;
use shieldpool_privacy::{Address, AssetReference};

/// Which shield an operation talks to and which public account signs it.
///
/// Resolved once and passed into every call; nothing about the shield is
/// looked up from global state mid-operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShieldContext {
    pub asset: AssetReference,
    pub account: Address,
}

impl ShieldContext {
    pub fn new(asset: AssetReference, account: Address) -> Self {
        Self { asset, account }
    }

    pub fn from_config(config: &ShieldpoolConfig) -> Result<Self> {
        Ok(Self {
            asset: config.shield.asset_reference()?,
            account: config.shield.account_address()?,
        })
    }

    /// Same shield, different signing account
    pub fn with_account(self, account: Address) -> Self {
        Self { account, ..self }
    }
}
