// Runtime configuration for booking retrieval and payment
use crate::error::{BookingError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_DATA_DIR: &str = "samples/bookings";
pub const DEFAULT_PAYMENT_BASE_URL: &str = "https://payment.example.com/pay";

pub const ENV_DATA_DIR: &str = "BOOKING_DATA_DIR";
pub const ENV_PAYMENT_BASE_URL: &str = "BOOKING_PAYMENT_BASE_URL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookingConfig {
    // Directory holding the booking_<id>.xml and <id>.xml fixtures
    pub data_dir: PathBuf,
    pub payment_base_url: String,
    // When set, parsed bookings are persisted as JSON files here instead of in memory
    pub store_dir: Option<PathBuf>,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            payment_base_url: DEFAULT_PAYMENT_BASE_URL.to_string(),
            store_dir: None,
        }
    }
}

impl BookingConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| BookingError::Config(e.to_string()))
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            BookingError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(
            std::env::var(ENV_DATA_DIR).ok(),
            std::env::var(ENV_PAYMENT_BASE_URL).ok(),
        )
    }

    fn with_overrides(mut self, data_dir: Option<String>, payment_base_url: Option<String>) -> Self {
        if let Some(dir) = data_dir.filter(|d| !d.is_empty()) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(url) = payment_base_url.filter(|u| !u.is_empty()) {
            self.payment_base_url = url;
        }
        self
    }
}
