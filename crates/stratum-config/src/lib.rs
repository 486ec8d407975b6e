//! Engine configuration for Stratum
//!
//! Settings are read from a YAML file found by [`find_config_file`]. Every
//! field has a default, so a missing file is not an error for [`load`].

pub mod error;

pub use error::*;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable naming a config file directly
pub const CONFIG_PATH_ENV: &str = "STRATUM_CONFIG_PATH";

const CANDIDATES: [&str; 4] = [
    "stratum.local.yaml",
    ".stratum.local.yaml",
    "stratum.yaml",
    ".stratum.yaml",
];

/// Settings for one reconciliation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Maximum number of instances processed at once
    pub parallelism: usize,

    /// Call ReadResource before planning instances that already exist
    pub refresh: bool,

    /// Stop scheduling new instances after an ordering violation
    pub halt_on_ordering_violation: bool,

    /// Plan every instance but apply nothing
    pub plan_only: bool,

    /// Default `tracing` filter directive, overridden by `RUST_LOG`
    pub log_filter: String,

    /// Version reported to providers in ConfigureProvider
    pub client_version: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            parallelism: 10,
            refresh: true,
            halt_on_ordering_violation: true,
            plan_only: false,
            log_filter: "info".to_string(),
            client_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl EngineConfig {
    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism;
        self
    }

    pub fn with_refresh(mut self, refresh: bool) -> Self {
        self.refresh = refresh;
        self
    }

    pub fn with_plan_only(mut self, plan_only: bool) -> Self {
        self.plan_only = plan_only;
        self
    }

    pub fn with_halt_on_ordering_violation(mut self, halt: bool) -> Self {
        self.halt_on_ordering_violation = halt;
        self
    }

    /// Parse and validate YAML. `origin` is only used in error messages.
    pub fn from_yaml(yaml: &str, origin: &Path) -> Result<Self> {
        // an empty file means "all defaults"
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(yaml).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml(&yaml, path)
    }

    pub fn validate(&self) -> Result<()> {
        if self.parallelism == 0 {
            return Err(ConfigError::Invalid(
                "parallelism must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Find the engine config file
///
/// Search order:
/// 1. `STRATUM_CONFIG_PATH` (used only if the file exists)
/// 2. Current directory: stratum.local.yaml, .stratum.local.yaml, stratum.yaml, .stratum.yaml
/// 3. `./.stratum/` with the same names
/// 4. `~/.config/stratum/config.yaml`
pub fn find_config_file() -> Result<PathBuf> {
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
        debug!(path = %path.display(), "{} points to a missing file", CONFIG_PATH_ENV);
    }

    let current_dir = std::env::current_dir()?;
    for filename in &CANDIDATES {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(path);
        }
    }

    let stratum_dir = current_dir.join(".stratum");
    if stratum_dir.is_dir() {
        for filename in &CANDIDATES {
            let path = stratum_dir.join(filename);
            if path.exists() {
                return Ok(path);
            }
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let global_config = config_dir.join("stratum").join("config.yaml");
        if global_config.exists() {
            return Ok(global_config);
        }
    }

    Err(ConfigError::ConfigFileNotFound)
}

/// Load the discovered config, or the defaults when there is none.
pub fn load() -> Result<EngineConfig> {
    match find_config_file() {
        Ok(path) => {
            debug!(path = %path.display(), "loading engine config");
            EngineConfig::from_file(&path)
        }
        Err(ConfigError::ConfigFileNotFound) => Ok(EngineConfig::default()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;

    struct CwdGuard(PathBuf);

    impl CwdGuard {
        fn enter(dir: &Path) -> Self {
            let original = std::env::current_dir().unwrap();
            std::env::set_current_dir(dir).unwrap();
            Self(original)
        }
    }

    impl Drop for CwdGuard {
        fn drop(&mut self) {
            let _ = std::env::set_current_dir(&self.0);
        }
    }

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.parallelism, 10);
        assert!(config.refresh);
        assert!(config.halt_on_ordering_violation);
        assert!(!config.plan_only);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config =
            EngineConfig::from_yaml("parallelism: 2\nplan_only: true\n", Path::new("t.yaml"))
                .unwrap();
        assert_eq!(config.parallelism, 2);
        assert!(config.plan_only);
        assert!(config.refresh);
    }

    #[test]
    fn test_zero_parallelism_rejected() {
        let result = EngineConfig::from_yaml("parallelism: 0", Path::new("t.yaml"));
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result = EngineConfig::from_yaml("paralelism: 4", Path::new("t.yaml"));
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    #[serial]
    fn test_find_config_file_in_current_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("stratum.yaml"), "refresh: false").unwrap();
        let _cwd = CwdGuard::enter(temp_dir.path());

        let path = find_config_file().unwrap();
        assert!(path.ends_with("stratum.yaml"));
        assert!(!load().unwrap().refresh);
    }

    #[test]
    #[serial]
    fn test_local_file_priority() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("stratum.yaml"), "parallelism: 1").unwrap();
        fs::write(temp_dir.path().join(".stratum.local.yaml"), "parallelism: 3").unwrap();
        let _cwd = CwdGuard::enter(temp_dir.path());

        assert!(find_config_file().unwrap().ends_with(".stratum.local.yaml"));
        assert_eq!(load().unwrap().parallelism, 3);
    }

    #[test]
    #[serial]
    fn test_find_config_file_in_stratum_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let stratum_dir = temp_dir.path().join(".stratum");
        fs::create_dir(&stratum_dir).unwrap();
        fs::write(stratum_dir.join("stratum.yaml"), "").unwrap();
        let _cwd = CwdGuard::enter(temp_dir.path());

        assert!(find_config_file().unwrap().ends_with(".stratum/stratum.yaml"));
    }

    #[test]
    #[serial]
    fn test_env_var_wins() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("custom.yaml");
        fs::write(&config_path, "log_filter: debug").unwrap();

        unsafe {
            std::env::set_var(CONFIG_PATH_ENV, config_path.to_str().unwrap());
        }
        let found = find_config_file();
        let loaded = load();
        unsafe {
            std::env::remove_var(CONFIG_PATH_ENV);
        }

        assert_eq!(found.unwrap(), config_path);
        assert_eq!(loaded.unwrap().log_filter, "debug");
    }

    #[test]
    #[serial]
    fn test_missing_file_falls_back_to_defaults() {
        let temp_dir = tempfile::tempdir().unwrap();
        let _cwd = CwdGuard::enter(temp_dir.path());

        // a user-level config would be found here; only assert when there is none
        if let Err(ConfigError::ConfigFileNotFound) = find_config_file() {
            assert_eq!(load().unwrap(), EngineConfig::default());
        }
    }
}
