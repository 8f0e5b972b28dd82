//! `resonance.toml` loading.
//!
//! Every field has a default, so a store without a config file runs on the stock cap
//! table. Point formulas are not configurable here; they live in `engine::bonus`.

use crate::core::error::ResonanceError;
use crate::core::time::CapWindow;
use crate::engine::types::Stat;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "resonance.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapRule {
    pub window: CapWindow,
    pub limit: i64,
}

impl CapRule {
    const fn daily(limit: i64) -> Self {
        Self {
            window: CapWindow::Daily,
            limit,
        }
    }

    const fn monthly(limit: i64) -> Self {
        Self {
            window: CapWindow::Monthly,
            limit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapsConfig {
    pub questing: CapRule,
    pub wayfinder: CapRule,
    pub attunement: CapRule,
    pub mana: CapRule,
    pub nexus: CapRule,
}

impl Default for CapsConfig {
    fn default() -> Self {
        Self {
            questing: CapRule::daily(40),
            wayfinder: CapRule::daily(40),
            attunement: CapRule::monthly(100),
            mana: CapRule::daily(36),
            nexus: CapRule::monthly(200),
        }
    }
}

impl CapsConfig {
    pub fn rule(&self, stat: Stat) -> CapRule {
        match stat {
            Stat::Questing => self.questing,
            Stat::Wayfinder => self.wayfinder,
            Stat::Attunement => self.attunement,
            Stat::Mana => self.mana,
            Stat::Nexus => self.nexus,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub max_page_size: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self { max_page_size: 200 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResonanceConfig {
    pub caps: CapsConfig,
    pub ledger: LedgerConfig,
}

impl ResonanceConfig {
    pub fn validate(&self) -> Result<(), ResonanceError> {
        for stat in Stat::ALL {
            let rule = self.caps.rule(stat);
            if rule.limit < 0 {
                return Err(ResonanceError::ConfigError(format!(
                    "caps.{}.limit must be >= 0 (got {})",
                    stat, rule.limit
                )));
            }
        }
        if self.ledger.max_page_size == 0 {
            return Err(ResonanceError::ConfigError(
                "ledger.max_page_size must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE_NAME)
}

pub fn parse_config(content: &str) -> Result<ResonanceConfig, ResonanceError> {
    let config: ResonanceConfig =
        toml::from_str(content).map_err(|e| ResonanceError::ConfigError(e.to_string()))?;
    config.validate()?;
    Ok(config)
}

/// Load `<root>/resonance.toml`. A missing file yields the defaults (not an error).
pub fn load_config(root: &Path) -> Result<ResonanceConfig, ResonanceError> {
    let path = config_path(root);
    if !path.exists() {
        return Ok(ResonanceConfig::default());
    }
    let content = fs::read_to_string(&path).map_err(ResonanceError::IoError)?;
    parse_config(&content)
}
