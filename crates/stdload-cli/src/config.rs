use anyhow::{Context, Result};
use config::builder::DefaultState;
use config::{ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use stdload_logging::LogFormat;

/// Built-in defaults, also written by `stdload init`
pub const DEFAULT_CONFIG: &str = r#"
[catalog]
root = "."  # Content root; set via STDLOAD_ROOT env var
manifest = "MANIFEST.yaml"  # Relative to the root
product_matrix = "config/product-matrix.yaml"  # Relative to the root

[loading]
strategy = "standard"  # minimal, standard, comprehensive or a profile name
# budget = 8000  # Token budget; set via STDLOAD_BUDGET env var

[audit]
drift_percent = 50  # Report sections whose measured size is this far off

[logging]
level = "warn"  # trace, debug, info, warn, error
format = "text"  # text or json
"#;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct CatalogConfig {
    pub root: PathBuf,
    pub manifest: PathBuf,
    pub product_matrix: PathBuf,
}

impl CatalogConfig {
    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(&self.manifest)
    }

    pub fn product_matrix_path(&self) -> PathBuf {
        self.root.join(&self.product_matrix)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct LoadingConfig {
    pub strategy: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<u64>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct AuditConfig {
    pub drift_percent: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct Config {
    pub catalog: CatalogConfig,
    pub loading: LoadingConfig,
    pub audit: AuditConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Get the global config path: ~/.stdload/stdload.toml
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".stdload").join("stdload.toml"))
    }

    /// Write the default global config unless one exists. Returns the path
    /// and whether a file was written.
    pub fn init_global(force: bool) -> Result<(PathBuf, bool)> {
        let config_path =
            Self::global_config_path().context("could not find the home directory")?;
        let written = write_default(&config_path, force)?;
        Ok((config_path, written))
    }

    /// Load configuration with layered approach:
    /// 1. Built-in defaults
    /// 2. Global config: ~/.stdload/stdload.toml (optional)
    /// 3. Local override: ./stdload.toml (optional)
    /// 4. File given with --config
    /// 5. Environment variables with STDLOAD__ prefix
    /// 6. Convenience overrides STDLOAD_ROOT and STDLOAD_BUDGET (highest priority)
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        // Load .env file from current directory
        dotenvy::dotenv().ok();

        let global = Self::global_config_path();
        let mut config_builder = layers(global.as_deref(), explicit);

        if let Ok(root) = env::var("STDLOAD_ROOT") {
            config_builder = config_builder.set_override("catalog.root", root)?;
        }

        if let Ok(budget) = env::var("STDLOAD_BUDGET") {
            config_builder = config_builder.set_override("loading.budget", budget)?;
        }

        let config: Self = config_builder
            .build()?
            .try_deserialize()
            .context("invalid configuration")?;
        Ok(config)
    }

    /// Defaults overlaid with one TOML document
    pub fn from_toml(text: &str) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .add_source(File::from_str(text, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Effective configuration rendered as TOML
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

fn layers(global: Option<&Path>, explicit: Option<&Path>) -> ConfigBuilder<DefaultState> {
    let mut config_builder = config::Config::builder()
        // Layer 1: Built-in defaults
        .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

    // Layer 2: Global config
    if let Some(path) = global {
        config_builder = config_builder.add_source(File::from(path).required(false));
    }

    // Layer 3: Local workspace config
    config_builder = config_builder.add_source(File::with_name("stdload").required(false));

    // Layer 4: Explicit file, which must exist
    if let Some(path) = explicit {
        config_builder = config_builder.add_source(File::from(path));
    }

    // Layer 5: Environment variables with STDLOAD__ prefix
    config_builder.add_source(Environment::with_prefix("STDLOAD").separator("__"))
}

fn write_default(config_path: &Path, force: bool) -> Result<bool> {
    if config_path.exists() && !force {
        return Ok(false);
    }
    if let Some(config_dir) = config_path.parent() {
        fs::create_dir_all(config_dir)
            .with_context(|| format!("creating {}", config_dir.display()))?;
    }
    fs::write(config_path, DEFAULT_CONFIG.trim_start())
        .with_context(|| format!("writing {}", config_path.display()))?;
    Ok(true)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.catalog.root, PathBuf::from("."));
        assert_eq!(
            config.catalog.manifest_path(),
            PathBuf::from("./MANIFEST.yaml")
        );
        assert_eq!(config.loading.strategy, "standard");
        assert_eq!(config.loading.budget, None);
        assert_eq!(config.audit.drift_percent, 50);
        assert_eq!(config.logging.format, LogFormat::Text);
    }

    #[test]
    fn test_overlay_replaces_single_keys() {
        let config = Config::from_toml(
            r#"
[catalog]
root = "/srv/standards"

[loading]
budget = 8000
"#,
        )
        .unwrap();
        assert_eq!(
            config.catalog.product_matrix_path(),
            PathBuf::from("/srv/standards/config/product-matrix.yaml")
        );
        assert_eq!(config.catalog.manifest, PathBuf::from("MANIFEST.yaml"));
        assert_eq!(config.loading.budget, Some(8000));
        assert_eq!(config.loading.strategy, "standard");
    }

    #[test]
    fn test_layers_read_files_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let global = dir.path().join("global.toml");
        let explicit = dir.path().join("explicit.toml");
        fs::write(&global, "[loading]\nstrategy = \"minimal\"\nbudget = 100\n").unwrap();
        fs::write(&explicit, "[loading]\nbudget = 200\n").unwrap();

        let config: Config = layers(Some(&global), Some(&explicit))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(config.loading.strategy, "minimal");
        assert_eq!(config.loading.budget, Some(200));

        // A missing global file is fine, a missing explicit one is not
        let missing = dir.path().join("missing.toml");
        assert!(layers(Some(&missing), None).build().is_ok());
        assert!(layers(None, Some(&missing)).build().is_err());
    }

    #[test]
    fn test_round_trip_through_toml() {
        let config = Config::from_toml("[loading]\nbudget = 4000\n").unwrap();
        let text = config.to_toml().unwrap();
        assert!(text.contains("budget = 4000"));
        assert_eq!(Config::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn test_write_default_keeps_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("stdload.toml");

        assert!(write_default(&path, false).unwrap());
        fs::write(&path, "# edited").unwrap();
        assert!(!write_default(&path, false).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "# edited");

        assert!(write_default(&path, true).unwrap());
        assert!(Config::from_toml(&fs::read_to_string(&path).unwrap()).is_ok());
    }
}
