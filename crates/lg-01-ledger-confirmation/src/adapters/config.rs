//! Configuration Provider Adapters
//!
//! - `StaticConfigProvider` - in-memory, replaced explicitly with `update()`
//! - `TomlConfigProvider` - TOML file, re-read whenever its modification time changes

use parking_lot::RwLock;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{info, warn};

use crate::config::GatewayConfig;
use crate::error::{ConfirmationError, ConfirmationResult};
use crate::ports::outbound::ConfigProvider;

// ============================================================================
// StaticConfigProvider
// ============================================================================

/// In-memory configuration, hot-swappable through [`StaticConfigProvider::update`].
#[derive(Debug, Default)]
pub struct StaticConfigProvider {
    config: RwLock<GatewayConfig>,
}

impl StaticConfigProvider {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config: RwLock::new(config),
        }
    }

    /// Replace the configuration. Invalid configurations are rejected and the
    /// current one is kept.
    pub fn update(&self, config: GatewayConfig) -> ConfirmationResult<()> {
        config.validate()?;
        *self.config.write() = config;
        Ok(())
    }

    /// Apply an in-place change to the current configuration.
    pub fn modify<F>(&self, change: F) -> ConfirmationResult<()>
    where
        F: FnOnce(&mut GatewayConfig),
    {
        let mut candidate = self.config.read().clone();
        change(&mut candidate);
        self.update(candidate)
    }
}

impl ConfigProvider for StaticConfigProvider {
    fn current(&self) -> GatewayConfig {
        self.config.read().clone()
    }
}

// ============================================================================
// TomlConfigProvider
// ============================================================================

struct LoadedConfig {
    config: GatewayConfig,
    modified: Option<SystemTime>,
}

/// TOML-file configuration provider.
///
/// The file is checked on every `current()` call; when its modification
/// time has changed it is re-parsed and validated. A reload that fails keeps
/// the last good configuration and logs a warning.
pub struct TomlConfigProvider {
    path: PathBuf,
    state: RwLock<LoadedConfig>,
}

impl TomlConfigProvider {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the file cannot be read, parsed or validated.
    pub fn load<P: AsRef<Path>>(path: P) -> ConfirmationResult<Self> {
        let path = path.as_ref().to_path_buf();
        let (config, modified) = read_config(&path)?;
        info!(path = %path.display(), nodes = config.nodes.len(), "Loaded gateway configuration");

        Ok(Self {
            path,
            state: RwLock::new(LoadedConfig { config, modified }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the file unconditionally.
    pub fn reload(&self) -> ConfirmationResult<()> {
        let (config, modified) = read_config(&self.path)?;
        *self.state.write() = LoadedConfig { config, modified };
        Ok(())
    }

    fn reload_if_changed(&self) {
        let modified = file_modified(&self.path);
        if modified.is_some() && modified == self.state.read().modified {
            return;
        }

        match read_config(&self.path) {
            Ok((config, modified)) => {
                info!(path = %self.path.display(), "Gateway configuration reloaded");
                *self.state.write() = LoadedConfig { config, modified };
            }
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Configuration reload failed, keeping last good configuration"
                );
                // Remember the attempt so a broken file is not re-parsed every tick
                self.state.write().modified = modified;
            }
        }
    }
}

impl ConfigProvider for TomlConfigProvider {
    fn current(&self) -> GatewayConfig {
        self.reload_if_changed();
        self.state.read().config.clone()
    }
}

fn file_modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

fn read_config(path: &Path) -> ConfirmationResult<(GatewayConfig, Option<SystemTime>)> {
    let modified = file_modified(path);
    let content = fs::read_to_string(path).map_err(|e| ConfirmationError::Config {
        reason: format!("failed to read {}: {}", path.display(), e),
    })?;
    let config = GatewayConfig::from_toml_str(&content)?;
    Ok((config, modified))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NodeRecord;
    use crate::domain::TrustWeight;
    use std::io::Write;
    use std::time::Duration;

    const CONFIG: &str = r#"
        [ledger_confirmation]
        max_commit_batch_size = 50

        [[nodes]]
        name = "node-1"
        trust_weighting = 1.0
    "#;

    fn write_config(path: &Path, content: &str, bump_secs: u64) {
        let mut file = fs::File::create(path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.set_modified(SystemTime::now() + Duration::from_secs(bump_secs))
            .unwrap();
    }

    #[test]
    fn test_static_provider_update() {
        let provider = StaticConfigProvider::new(GatewayConfig::default());
        assert!(provider.current().nodes.is_empty());

        provider
            .update(GatewayConfig::with_nodes(vec![NodeRecord::new(
                "a",
                TrustWeight::whole(1),
            )]))
            .unwrap();
        assert_eq!(provider.current().nodes.len(), 1);

        let rejected = provider.modify(|c| c.nodes.push(NodeRecord::new("a", TrustWeight::whole(1))));
        assert!(rejected.is_err());
        assert_eq!(provider.current().nodes.len(), 1);
    }

    #[test]
    fn test_toml_provider_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateway.toml");
        write_config(&path, CONFIG, 0);

        let provider = TomlConfigProvider::load(&path).unwrap();
        let config = provider.current();
        assert_eq!(config.ledger_confirmation.max_commit_batch_size, 50);
        assert_eq!(config.nodes[0].name, "node-1");
    }

    #[test]
    fn test_toml_provider_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = TomlConfigProvider::load(dir.path().join("missing.toml"));
        assert!(matches!(result, Err(ConfirmationError::Config { .. })));
    }

    #[test]
    fn test_toml_provider_hot_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateway.toml");
        write_config(&path, CONFIG, 0);
        let provider = TomlConfigProvider::load(&path).unwrap();

        write_config(&path, &CONFIG.replace("50", "75"), 10);
        assert_eq!(
            provider.current().ledger_confirmation.max_commit_batch_size,
            75
        );
    }

    #[test]
    fn test_toml_provider_keeps_last_good_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateway.toml");
        write_config(&path, CONFIG, 0);
        let provider = TomlConfigProvider::load(&path).unwrap();

        write_config(
            &path,
            "[ledger_confirmation]\ncommit_requires_node_quorum_trust_proportion = 2.0\n",
            10,
        );
        let config = provider.current();
        assert_eq!(config.ledger_confirmation.max_commit_batch_size, 50);
        assert_eq!(config.nodes.len(), 1);
        assert!(provider.reload().is_err());
    }
}
