//! Shieldpool configuration.
//!
//! The first file found among `$SP_CONFIG`, `./shieldpool.toml` and
//! `~/.shieldpool/shieldpool.toml` is read, then `SP_*` variables are
//! layered on top. Missing sections fall back to defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use shieldpool_privacy::{Address, AssetReference};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::{env, fs};

static GLOBAL_CONFIG: OnceLock<ShieldpoolConfig> = OnceLock::new();

const CONFIG_FILE_NAME: &str = "shieldpool.toml";
const CONFIG_DIR_NAME: &str = ".shieldpool";

const DEFAULT_ASSET: &str = "0x5b1869d9a4c187f2eaa108f3062412ecf0526b24";
const DEFAULT_ACCOUNT: &str = "0x627306090abab3a6e1400e9345bc60c78a8bef57";
const DEFAULT_DB_PATH: &str = "./shieldpool-db";
const DEFAULT_PROVER_WORKERS: usize = 2;
const DEFAULT_PROVER_QUEUE: usize = 32;
const DEFAULT_ROOT_HISTORY: usize = 100;

/// Root configuration structure (matches TOML layout)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShieldpoolConfig {
    #[serde(default)]
    pub shield: ShieldConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub prover: ProverConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
}

/// Which token is shielded and which public account pays for mints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShieldConfig {
    /// Token address (20-byte hex, optional 0x prefix)
    #[serde(default = "default_asset")]
    pub asset: String,
    /// Public account used as `msg.sender` for mint and burn
    #[serde(default = "default_account")]
    pub account: String,
}

impl Default for ShieldConfig {
    fn default() -> Self {
        Self {
            asset: DEFAULT_ASSET.into(),
            account: DEFAULT_ACCOUNT.into(),
        }
    }
}

impl ShieldConfig {
    /// Parse `asset` into the padded reference that goes into commitments
    pub fn asset_reference(&self) -> Result<AssetReference> {
        AssetReference::from_hex(&self.asset)
            .with_context(|| format!("Invalid shield.asset in config: {}", self.asset))
    }

    /// Parse `account` into a public ledger address
    pub fn account_address(&self) -> Result<Address> {
        Address::from_hex(&self.account)
            .with_context(|| format!("Invalid shield.account in config: {}", self.account))
    }
}

fn default_asset() -> String {
    DEFAULT_ASSET.into()
}

fn default_account() -> String {
    DEFAULT_ACCOUNT.into()
}

/// Local registry storage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
    /// Mirror confirmed receipts into RocksDB
    #[serde(default)]
    pub persist: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_DB_PATH.into(),
            persist: false,
        }
    }
}

fn default_db_path() -> String {
    DEFAULT_DB_PATH.into()
}

/// Proof worker pool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProverConfig {
    #[serde(default = "default_prover_workers")]
    pub workers: usize,
    #[serde(default = "default_prover_queue")]
    pub queue_depth: usize,
}

impl Default for ProverConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_PROVER_WORKERS,
            queue_depth: DEFAULT_PROVER_QUEUE,
        }
    }
}

fn default_prover_workers() -> usize {
    DEFAULT_PROVER_WORKERS
}
fn default_prover_queue() -> usize {
    DEFAULT_PROVER_QUEUE
}

/// Ledger-side parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// How many recent roots a spend may be proven against
    #[serde(default = "default_root_history")]
    pub root_history: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            root_history: DEFAULT_ROOT_HISTORY,
        }
    }
}

fn default_root_history() -> usize {
    DEFAULT_ROOT_HISTORY
}

fn parse_bool(raw: &str) -> bool {
    raw == "1" || raw.eq_ignore_ascii_case("true")
}

fn parse_into<T: std::str::FromStr>(key: &str, raw: &str, field: &mut T) {
    match raw.parse() {
        Ok(parsed) => *field = parsed,
        Err(_) => log::warn!("Ignoring unparseable {}={}", key, raw),
    }
}

impl ShieldpoolConfig {
    /// Load configuration from config file with env var overrides
    pub fn load() -> Result<Self> {
        let mut config = match Self::find_config_file() {
            Some(path) => {
                log::info!("Loading config from: {}", path.display());
                Self::read_file(&path)?
            }
            None => {
                log::info!("No config file found, using defaults and environment variables");
                Self::default()
            }
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a specific file path
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = Self::read_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Find the config file path
    fn find_config_file() -> Option<PathBuf> {
        if let Ok(path) = env::var("SP_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
            log::warn!("SP_CONFIG points to missing file: {}", path.display());
        }

        let local_path = PathBuf::from(CONFIG_FILE_NAME);
        if local_path.exists() {
            return Some(local_path);
        }

        Self::default_config_path().filter(|p| p.exists())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    /// Apply `SP_*` overrides; `lookup` returns the raw value for a key
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        for key in [
            "SP_ASSET",
            "SP_ACCOUNT",
            "SP_DB_PATH",
            "SP_PERSIST",
            "SP_PROVER_WORKERS",
            "SP_PROVER_QUEUE",
            "SP_ROOT_HISTORY",
        ] {
            let Some(raw) = lookup(key) else { continue };
            match key {
                "SP_ASSET" => self.shield.asset = raw,
                "SP_ACCOUNT" => self.shield.account = raw,
                "SP_DB_PATH" => self.storage.path = raw,
                "SP_PERSIST" => self.storage.persist = parse_bool(&raw),
                "SP_PROVER_WORKERS" => parse_into(key, &raw, &mut self.prover.workers),
                "SP_PROVER_QUEUE" => parse_into(key, &raw, &mut self.prover.queue_depth),
                _ => parse_into(key, &raw, &mut self.ledger.root_history),
            }
        }
    }

    /// Get the default config file path
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Generate a sample config file
    pub fn generate_sample() -> String {
        let mut sample = Self::default();
        sample.storage.persist = true;
        toml::to_string_pretty(&sample).unwrap_or_default()
    }

    /// Get the global config instance, initializing it if necessary.
    ///
    /// Falls back to defaults if loading fails.
    pub fn global() -> &'static ShieldpoolConfig {
        GLOBAL_CONFIG.get_or_init(|| {
            Self::load().unwrap_or_else(|e| {
                log::warn!("Failed to load config: {}, using defaults", e);
                Self::default()
            })
        })
    }

    /// Initialize the global config with a specific instance.
    ///
    /// Returns `Err(config)` if already initialized.
    pub fn set_global(config: ShieldpoolConfig) -> Result<(), ShieldpoolConfig> {
        GLOBAL_CONFIG.set(config)
    }
}
