use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::rank::DecimalContext;

/// File name looked up inside the data directory when no config path is given.
pub const CONFIG_FILE_NAME: &str = "tearank.toml";

/// Keeps the sum of favorite weights over every canon far from `Decimal::MAX`.
pub const MAX_FAVORITE_WEIGHT: Decimal = dec!(1000000);

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory holding the database. Always comes from the command line.
    #[serde(skip)]
    pub data_dir: PathBuf,
    pub dedupe: DedupeConfig,
    pub tearank: TeaRankConfig,
    pub package_managers: PackageManagerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DedupeConfig {
    /// Persist the computed changes. When false the run only logs them.
    pub load: bool,
    /// Recompute canon names after identities are settled.
    pub rename_canons: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TeaRankConfig {
    /// Fraction of incoming weight a node keeps for itself.
    pub split_ratio: Decimal,
    /// Weights below this are credited in place instead of being split further.
    pub tol: Decimal,
    pub max_iter: u64,
    /// Significant digits kept after every decimal operation.
    pub precision: u32,
    /// Prior weight per package manager name.
    pub favorites: BTreeMap<String, Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PackageManagerConfig {
    /// Package managers registered by `init`.
    pub known: Vec<String>,
    /// Package managers whose packages become graph nodes.
    pub ranked: Vec<String>,
    /// Package managers whose dependencies are stored package-to-package.
    pub legacy: Vec<String>,
}

impl Config {
    /// Loads the config from `path`, or from `<data_dir>/tearank.toml` if present,
    /// falling back to defaults.
    pub fn load(data_dir: impl Into<PathBuf>, path: Option<&Path>) -> Result<Self> {
        let data_dir = data_dir.into();
        let candidate = match path {
            Some(path) => Some(path.to_path_buf()),
            None => Some(data_dir.join(CONFIG_FILE_NAME)).filter(|p| p.exists()),
        };

        let mut config = match candidate {
            Some(path) => {
                tracing::debug!("Loading config from {}", path.display());
                Self::from_toml(&fs::read_to_string(&path)?)?
            }
            None => Self::default(),
        };
        config.data_dir = data_dir;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.tearank.validate()?;
        if self.package_managers.ranked.is_empty() {
            return Err(Error::Config(
                "package_managers.ranked cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("tearank.db")
    }
}

impl TeaRankConfig {
    pub fn validate(&self) -> Result<()> {
        if self.split_ratio <= Decimal::ZERO || self.split_ratio >= Decimal::ONE {
            return Err(Error::Config(format!(
                "tearank.split_ratio must be between 0 and 1 (exclusive), got {}",
                self.split_ratio
            )));
        }
        if self.tol <= Decimal::ZERO {
            return Err(Error::Config(format!(
                "tearank.tol must be positive, got {}",
                self.tol
            )));
        }
        if self.max_iter == 0 {
            return Err(Error::Config("tearank.max_iter must be positive".to_string()));
        }
        if let Some((name, weight)) = self
            .favorites
            .iter()
            .find(|(_, w)| w.is_sign_negative() || **w > MAX_FAVORITE_WEIGHT)
        {
            return Err(Error::Config(format!(
                "favorite weight for {name} must be between 0 and {MAX_FAVORITE_WEIGHT}, got {weight}"
            )));
        }
        self.context().map(|_| ())
    }

    pub fn context(&self) -> Result<DecimalContext> {
        DecimalContext::new(self.precision)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            dedupe: DedupeConfig::default(),
            tearank: TeaRankConfig::default(),
            package_managers: PackageManagerConfig::default(),
        }
    }
}

impl Default for DedupeConfig {
    fn default() -> Self {
        Self {
            load: true,
            rename_canons: true,
        }
    }
}

impl Default for TeaRankConfig {
    fn default() -> Self {
        Self {
            split_ratio: dec!(0.5),
            tol: dec!(0.000001),
            max_iter: 1_000_000,
            precision: 9,
            favorites: BTreeMap::from([
                ("homebrew".to_string(), dec!(0.3)),
                ("debian".to_string(), dec!(0.6)),
                ("pkgx".to_string(), dec!(0.1)),
            ]),
        }
    }
}

impl Default for PackageManagerConfig {
    fn default() -> Self {
        let names = |names: &[&str]| names.iter().map(ToString::to_string).collect();
        Self {
            known: names(&["crates", "npm", "homebrew", "debian", "pkgx", "pypi"]),
            ranked: names(&["homebrew", "debian", "pkgx"]),
            legacy: names(&["npm"]),
        }
    }
}
