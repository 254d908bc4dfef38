use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Configuration loading error: {0}")]
    ConfigLoad(#[from] ConfigError),
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

pub type Result<T> = std::result::Result<T, ConfigurationError>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    /// General system settings
    pub system: SystemSettings,

    /// Alchemy JSON-RPC / NFT API (transfers, receipts, ENS, owned tokens)
    pub alchemy: AlchemyConfig,

    /// OpenSea v2 API (listings and sale events)
    pub opensea: OpenSeaConfig,

    /// Reservoir API (WWMM asks)
    pub reservoir: ReservoirConfig,

    /// CoinGecko simple price API
    pub coingecko: CoinGeckoConfig,

    /// Tracked collection and its settlement currencies
    pub collection: CollectionConfig,

    /// Aggregation knobs
    pub activity: ActivityConfig,

    pub retry: RetrySettings,

    pub metadata: MetadataConfig,

    /// API server configuration
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemSettings {
    /// Enable debug mode
    pub debug_mode: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlchemyConfig {
    /// Alchemy API key (required)
    pub api_key: String,

    /// Network slug used in the endpoint host, e.g. "eth-mainnet"
    pub network: String,

    /// Request timeout in seconds
    pub request_timeout_seconds: u64,

    /// Transfers requested per activity page
    pub page_size: u32,

    /// Transfers requested per page while computing volume
    pub max_count_volume: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenSeaConfig {
    pub api_key: String,

    pub api_base_url: String,

    pub collection_slug: String,

    pub request_timeout_seconds: u64,

    /// Stop paging listings once this many are collected
    pub max_listings: usize,

    /// Enable the OpenSea listing and sales feeds
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservoirConfig {
    pub api_key: String,

    pub api_base_url: String,

    pub request_timeout_seconds: u64,

    /// Stop paging asks once this many are collected
    pub max_listings: usize,

    /// Delay between ask pages in milliseconds
    pub page_delay_ms: u64,

    /// Enable the WWMM listing feed
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoinGeckoConfig {
    pub api_base_url: String,

    /// Fiat currency for conversions (e.g., "usd")
    pub vs_currency: String,

    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionConfig {
    /// ERC-721 contract of the plot collection
    pub contract_address: String,

    pub weth_address: String,

    pub wild_address: String,

    pub total_supply: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityConfig {
    /// Records returned when the caller gives no limit
    pub default_limit: usize,

    /// Upper bound on any requested limit
    pub max_limit: usize,

    /// Transactions attributed concurrently per volume batch
    pub batch_size: usize,

    /// Pause between volume batches in milliseconds
    pub batch_delay_ms: u64,

    /// Pause between transfer pages in milliseconds
    pub page_delay_ms: u64,

    /// ENS lookup timeout in milliseconds
    pub ens_timeout_ms: u64,

    /// Paging for volume stops once a page is older than this many days
    pub volume_lookback_days: i64,

    /// Hard cap on transfer pages fetched for one volume request
    pub max_volume_pages: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Total attempts, including the first
    pub max_attempts: u32,

    pub base_delay_ms: u64,

    pub max_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataConfig {
    /// Path of the plot trait dataset
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API server host
    pub host: String,

    /// API server port
    pub port: u16,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            system: SystemSettings { debug_mode: false },
            alchemy: AlchemyConfig {
                api_key: "".to_string(), // Must be set in .env or config file
                network: "eth-mainnet".to_string(),
                request_timeout_seconds: 30,
                page_size: 50,
                max_count_volume: 200,
            },
            opensea: OpenSeaConfig {
                api_key: "".to_string(),
                api_base_url: "https://api.opensea.io/api/v2".to_string(),
                collection_slug: "wilder-land-the-island".to_string(),
                request_timeout_seconds: 30,
                max_listings: 200,
                enabled: false, // Disabled by default until API key is provided
            },
            reservoir: ReservoirConfig {
                api_key: "".to_string(),
                api_base_url: "https://api.reservoir.tools".to_string(),
                request_timeout_seconds: 30,
                max_listings: 50,
                page_delay_ms: 500,
                enabled: false,
            },
            coingecko: CoinGeckoConfig {
                api_base_url: "https://api.coingecko.com/api/v3".to_string(),
                vs_currency: "usd".to_string(),
                request_timeout_seconds: 10,
            },
            collection: CollectionConfig {
                contract_address: "0xd396ca541F501F5D303166C509e2045848df356b".to_string(),
                weth_address: "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2".to_string(),
                wild_address: "0x2a3bFF78B79A009976EeA096a51A948a3dC00e34".to_string(),
                total_supply: 4444,
            },
            activity: ActivityConfig {
                default_limit: 25,
                max_limit: 100,
                batch_size: 10,
                batch_delay_ms: 200,
                page_delay_ms: 100,
                ens_timeout_ms: 5000,
                volume_lookback_days: 7,
                max_volume_pages: 20,
            },
            retry: RetrySettings {
                max_attempts: 3,
                base_delay_ms: 1000,
                max_delay_ms: 8000,
            },
            metadata: MetadataConfig {
                path: "data/metadata.json".to_string(),
            },
            api: ApiConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
        }
    }
}

fn require_timeout(section: &str, seconds: u64) -> Result<()> {
    if seconds == 0 {
        return Err(ConfigurationError::InvalidValue(format!(
            "{} request timeout must be greater than 0",
            section
        )));
    }
    Ok(())
}

impl AlchemyConfig {
    pub fn validate(&self) -> Result<()> {
        if self.api_key.is_empty() {
            return Err(ConfigurationError::InvalidValue(
                "Alchemy API key is required".to_string(),
            ));
        }
        if self.page_size == 0 || self.max_count_volume == 0 {
            return Err(ConfigurationError::InvalidValue(
                "Alchemy page sizes must be greater than 0".to_string(),
            ));
        }
        require_timeout("Alchemy", self.request_timeout_seconds)
    }
}

impl OpenSeaConfig {
    pub fn validate(&self) -> Result<()> {
        if self.enabled && self.api_key.is_empty() {
            return Err(ConfigurationError::InvalidValue(
                "OpenSea API key is required when OpenSea is enabled".to_string(),
            ));
        }
        if self.enabled && self.collection_slug.is_empty() {
            return Err(ConfigurationError::InvalidValue(
                "OpenSea collection slug is required when OpenSea is enabled".to_string(),
            ));
        }
        require_timeout("OpenSea", self.request_timeout_seconds)
    }
}

impl ReservoirConfig {
    pub fn validate(&self) -> Result<()> {
        if self.enabled && self.api_key.is_empty() {
            return Err(ConfigurationError::InvalidValue(
                "Reservoir API key is required when Reservoir is enabled".to_string(),
            ));
        }
        require_timeout("Reservoir", self.request_timeout_seconds)
    }
}

impl ActivityConfig {
    pub fn validate(&self) -> Result<()> {
        if self.default_limit == 0 || self.default_limit > self.max_limit {
            return Err(ConfigurationError::InvalidValue(format!(
                "activity.default_limit must be between 1 and max_limit ({})",
                self.max_limit
            )));
        }
        if self.batch_size == 0 {
            return Err(ConfigurationError::InvalidValue(
                "activity.batch_size must be greater than 0".to_string(),
            ));
        }
        if self.volume_lookback_days <= 0 {
            return Err(ConfigurationError::InvalidValue(
                "activity.volume_lookback_days must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl SystemConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path("config.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let mut config_builder = Config::builder()
            // Start with defaults
            .add_source(Config::try_from(&SystemConfig::default())?);

        if config_path.as_ref().exists() {
            info!(
                "Loading configuration from: {}",
                config_path.as_ref().display()
            );
            config_builder = config_builder.add_source(File::from(config_path.as_ref()));
        } else {
            debug!("Config file not found, using defaults and environment variables");
        }

        // e.g. PLOT__ALCHEMY__API_KEY
        config_builder = config_builder.add_source(
            Environment::with_prefix("PLOT")
                .try_parsing(true)
                .separator("__")
                .list_separator(","),
        );

        Self::from_config(config_builder.build()?)
    }

    fn from_config(config: Config) -> Result<Self> {
        let system_config: SystemConfig = config.try_deserialize()?;
        system_config.validate()?;
        Ok(system_config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        self.alchemy.validate()?;
        self.opensea.validate()?;
        self.reservoir.validate()?;
        self.activity.validate()?;
        require_timeout("CoinGecko", self.coingecko.request_timeout_seconds)?;

        if self.retry.max_attempts == 0 {
            return Err(ConfigurationError::InvalidValue(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }

        if self.api.port == 0 {
            return Err(ConfigurationError::InvalidValue(
                "API port cannot be 0".to_string(),
            ));
        }

        for (name, value) in [
            ("collection.contract_address", &self.collection.contract_address),
            ("collection.weth_address", &self.collection.weth_address),
            ("collection.wild_address", &self.collection.wild_address),
        ] {
            if !is_hex_address(value) {
                return Err(ConfigurationError::InvalidValue(format!(
                    "{} is not a 20-byte hex address: '{}'",
                    name, value
                )));
            }
        }

        Ok(())
    }

    /// Get configuration as a JSON value for API responses, with secrets blanked
    pub fn to_json_value(&self) -> serde_json::Value {
        let mut redacted = self.clone();
        for key in [
            &mut redacted.alchemy.api_key,
            &mut redacted.opensea.api_key,
            &mut redacted.reservoir.api_key,
        ] {
            if !key.is_empty() {
                *key = "***".to_string();
            }
        }
        serde_json::to_value(redacted).unwrap_or(serde_json::Value::Null)
    }
}

fn is_hex_address(value: &str) -> bool {
    value
        .strip_prefix("0x")
        .map(|hex| hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit()))
        .unwrap_or(false)
}

/// Configuration manager for loading and managing system configuration
#[derive(Debug)]
pub struct ConfigManager {
    config: SystemConfig,
}

impl ConfigManager {
    /// Create a new configuration manager
    pub fn new() -> Result<Self> {
        let config = SystemConfig::load()?;
        info!("Configuration loaded successfully");
        debug!("Configuration: {}", config.to_json_value());

        Ok(Self { config })
    }

    /// Create configuration manager from a specific file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = SystemConfig::load_from_path(path)?;
        Ok(Self { config })
    }

    /// Get a reference to the current configuration
    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    pub fn into_config(self) -> SystemConfig {
        self.config
    }
}
