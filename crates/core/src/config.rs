//! Configuration management for Lectern.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - Config files (.lectern/config.yaml)
//! - Environment variables
//! - Command-line flags
//!
//! The configuration is workspace-centric, with most state stored in `.lectern/`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};
use crate::flags::EngineFlags;

/// Main application configuration.
///
/// This struct holds all global configuration options that affect
/// engine behavior across commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .lectern/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Emit logs as JSON lines
    pub log_json: bool,

    /// Reference corpus locations
    pub corpus: CorpusConfig,

    /// Usage ledger persistence
    pub ledger: LedgerConfig,

    /// Per-provider endpoint, model and key overrides, keyed by provider id
    pub providers: BTreeMap<String, ProviderConfig>,

    /// Engine tunables
    pub flags: EngineFlags,
}

/// Where the reference corpus lives.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorpusConfig {
    /// Live source root; defaults to `<workspace>/content/reference`
    pub reference_root: Option<PathBuf>,

    /// Pre-built index artifact; defaults to `<workspace>/public/reference-index.json`
    pub index_artifact: Option<PathBuf>,
}

/// Which key-value store backs the usage ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Sqlite,
}

/// Usage ledger persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LedgerConfig {
    pub backend: StoreBackend,

    /// SQLite file; defaults to `.lectern/usage.sqlite`
    pub path: Option<PathBuf>,

    /// How long stored records live
    pub retention_days: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            path: None,
            retention_days: 120,
        }
    }
}

/// Provider-specific configuration. Every field is optional; the
/// provider crate supplies defaults for anything left unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    pub api_url: Option<String>,
    pub model: Option<String>,

    /// Environment variables checked in order for a platform-funded key
    pub api_key_envs: Option<Vec<String>>,

    /// Per-request timeout in seconds
    pub timeout: Option<u64>,
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
    corpus: Option<CorpusConfig>,
    ledger: Option<LedgerConfig>,
    providers: Option<BTreeMap<String, ProviderConfig>>,
    flags: Option<EngineFlags>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
    json: Option<bool>,
}

/// Platform-funded key env vars per provider, checked in order.
pub const DEFAULT_PLATFORM_KEY_ENVS: &[(&str, &[&str])] = &[
    ("openai", &["ANTHROPIC_API_KEY", "OPENAI_API_KEY"]),
    ("google", &["GOOGLE_API_KEY", "GEMINI_API_KEY"]),
    ("minimax", &["MINIMAX_API_KEY"]),
    ("nvidia_kimi", &["NVIDIA_KIMI_API_KEY"]),
];

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            log_level: None,
            verbose: false,
            no_color: false,
            log_json: false,
            corpus: CorpusConfig::default(),
            ledger: LedgerConfig::default(),
            providers: BTreeMap::new(),
            flags: EngineFlags::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the YAML file and the environment.
    ///
    /// Environment variables:
    /// - `LECTERN_WORKSPACE`: Override workspace path
    /// - `LECTERN_CONFIG`: Path to config file
    /// - `LECTERN_REFERENCE_ROOT` / `LECTERN_INDEX_ARTIFACT`: Corpus locations
    /// - `LECTERN_<PROVIDER>_API_URL` / `LECTERN_<PROVIDER>_MODEL`: Provider overrides
    /// - `LECTERN_*` engine flags (see [`EngineFlags`])
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use lectern_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Workspace: {:?}", config.workspace);
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_with(|name| std::env::var(name).ok())
    }

    /// Same as [`AppConfig::load`] with an injectable variable lookup.
    pub fn load_with<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(workspace) = lookup("LECTERN_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }

        if let Some(config_file) = lookup("LECTERN_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = match config.config_file {
            Some(ref cf) => cf.clone(),
            None => config.lectern_dir().join("config.yaml"),
        };

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override YAML config
        if let Some(root) = lookup("LECTERN_REFERENCE_ROOT") {
            config.corpus.reference_root = Some(PathBuf::from(root));
        }
        if let Some(artifact) = lookup("LECTERN_INDEX_ARTIFACT") {
            config.corpus.index_artifact = Some(PathBuf::from(artifact));
        }

        for (provider, _) in DEFAULT_PLATFORM_KEY_ENVS {
            let prefix = format!("LECTERN_{}", provider.to_uppercase());
            let url = lookup(&format!("{}_API_URL", prefix));
            let model = lookup(&format!("{}_MODEL", prefix));
            if url.is_none() && model.is_none() {
                continue;
            }
            let entry = config.providers.entry(provider.to_string()).or_default();
            if url.is_some() {
                entry.api_url = url;
            }
            if model.is_some() {
                entry.model = model;
            }
        }

        config.flags = config.flags.merged_with(&lookup);

        if let Some(level) = lookup("RUST_LOG") {
            config.log_level = Some(level);
        }

        if lookup("NO_COLOR").is_some() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(path) = config_file.workspace.and_then(|ws| ws.path) {
            result.workspace = PathBuf::from(path);
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
            if let Some(json) = logging.json {
                result.log_json = json;
            }
        }

        if let Some(corpus) = config_file.corpus {
            if corpus.reference_root.is_some() {
                result.corpus.reference_root = corpus.reference_root;
            }
            if corpus.index_artifact.is_some() {
                result.corpus.index_artifact = corpus.index_artifact;
            }
        }

        if let Some(ledger) = config_file.ledger {
            result.ledger = ledger;
        }

        if let Some(providers) = config_file.providers {
            result.providers.extend(providers);
        }

        if let Some(flags) = config_file.flags {
            result.flags = flags;
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// This method merges command-line flags with the loaded configuration,
    /// giving precedence to CLI flags over environment variables.
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
        log_json: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        if log_json {
            self.log_json = true;
        }

        self
    }

    /// Get the path to the .lectern directory.
    pub fn lectern_dir(&self) -> PathBuf {
        self.workspace.join(".lectern")
    }

    /// Ensure the .lectern directory exists.
    pub fn ensure_lectern_dir(&self) -> AppResult<()> {
        let lectern_dir = self.lectern_dir();
        if !lectern_dir.exists() {
            std::fs::create_dir_all(&lectern_dir).map_err(|e| {
                AppError::Config(format!("Failed to create .lectern directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Live corpus root, resolved against the workspace.
    pub fn reference_root(&self) -> PathBuf {
        self.resolve_path(
            self.corpus.reference_root.as_deref(),
            Path::new("content/reference"),
        )
    }

    /// Pre-built index artifact path, resolved against the workspace.
    pub fn index_artifact(&self) -> PathBuf {
        self.resolve_path(
            self.corpus.index_artifact.as_deref(),
            Path::new("public/reference-index.json"),
        )
    }

    /// SQLite ledger file, resolved against the workspace.
    pub fn ledger_path(&self) -> PathBuf {
        match self.ledger.path {
            Some(ref path) if path.is_absolute() => path.clone(),
            Some(ref path) => self.workspace.join(path),
            None => self.lectern_dir().join("usage.sqlite"),
        }
    }

    fn resolve_path(&self, configured: Option<&Path>, fallback: &Path) -> PathBuf {
        match configured {
            Some(path) if path.is_absolute() => path.to_path_buf(),
            Some(path) => self.workspace.join(path),
            None => self.workspace.join(fallback),
        }
    }

    /// Get the configuration for one provider, if any was given.
    pub fn provider_config(&self, provider: &str) -> Option<&ProviderConfig> {
        self.providers.get(provider)
    }

    /// Env var names consulted for a provider's platform-funded key.
    pub fn platform_key_envs(&self, provider: &str) -> Vec<String> {
        if let Some(envs) = self
            .provider_config(provider)
            .and_then(|cfg| cfg.api_key_envs.clone())
        {
            return envs;
        }
        DEFAULT_PLATFORM_KEY_ENVS
            .iter()
            .find(|(id, _)| *id == provider)
            .map(|(_, envs)| envs.iter().map(|e| e.to_string()).collect())
            .unwrap_or_default()
    }

    /// Resolve a platform-funded key: first non-empty configured variable wins.
    pub fn resolve_platform_key<F>(&self, provider: &str, lookup: F) -> Option<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.platform_key_envs(provider)
            .iter()
            .filter_map(|name| lookup(name))
            .map(|value| value.trim().to_string())
            .find(|value| !value.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: Vec<(&str, String)>) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(!config.verbose);
        assert!(!config.no_color);
        assert_eq!(config.ledger.backend, StoreBackend::Memory);
        assert_eq!(config.ledger.retention_days, 120);
    }

    #[test]
    fn test_lectern_dir() {
        let config = AppConfig::default();
        assert!(config.lectern_dir().ends_with(".lectern"));
        assert!(config.ledger_path().ends_with(".lectern/usage.sqlite"));
    }

    #[test]
    fn test_with_overrides() {
        let config = AppConfig::default();
        let overridden = config.with_overrides(None, None, None, true, false, true);

        assert!(overridden.verbose);
        assert!(overridden.log_json);
        assert_eq!(overridden.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_load_merges_yaml_then_env() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".lectern")).unwrap();
        std::fs::write(
            dir.path().join(".lectern/config.yaml"),
            r#"
corpus:
  referenceRoot: docs/ref
ledger:
  backend: sqlite
  retentionDays: 30
providers:
  google:
    model: gemini-test
"#,
        )
        .unwrap();

        let config = AppConfig::load_with(lookup_from(vec![
            ("LECTERN_WORKSPACE", dir.path().display().to_string()),
            ("LECTERN_GOOGLE_API_URL", "http://localhost:9/g".to_string()),
            ("LECTERN_QUALITY_FLOOR", "0.5".to_string()),
        ]))
        .unwrap();

        assert_eq!(config.reference_root(), dir.path().join("docs/ref"));
        assert_eq!(config.ledger.backend, StoreBackend::Sqlite);
        assert_eq!(config.ledger.retention_days, 30);
        let google = config.provider_config("google").unwrap();
        assert_eq!(google.model.as_deref(), Some("gemini-test"));
        assert_eq!(google.api_url.as_deref(), Some("http://localhost:9/g"));
        assert_eq!(config.flags.quality_floor, 0.5);
    }

    #[test]
    fn test_load_missing_workspace() {
        let result = AppConfig::load_with(lookup_from(vec![(
            "LECTERN_WORKSPACE",
            "/definitely/not/here".to_string(),
        )]));
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_resolve_platform_key_first_non_empty() {
        let config = AppConfig::default();
        let lookup = lookup_from(vec![
            ("ANTHROPIC_API_KEY", "   ".to_string()),
            ("OPENAI_API_KEY", "sk-open".to_string()),
        ]);
        assert_eq!(
            config.resolve_platform_key("openai", &lookup),
            Some("sk-open".to_string())
        );
        assert_eq!(config.resolve_platform_key("minimax", &lookup), None);
    }
}
