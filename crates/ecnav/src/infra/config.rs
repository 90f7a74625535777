//! Configuration management utilities.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dirs_next::config_dir;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

static DEFAULT_CONFIG: Lazy<&'static str> =
    Lazy::new(|| include_str!("../../assets/default-config.toml"));
static DEFAULT_WORKSPACE_CONFIG_PATH: &str = ".ecnav/config.toml";

/// Layered configuration loaded from defaults, user, workspace, and env.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default = "Defaults::unset")]
    pub defaults: Defaults,
    #[serde(default = "Resolve::unset")]
    pub resolve: Resolve,
}

/// Output defaults. Unset fields fall back to the built-in values, so a later layer can reset
/// a value an earlier one changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Defaults {
    #[serde(default)]
    format: Option<String>,
    #[serde(default)]
    theme: Option<String>,
    #[serde(default)]
    color: Option<bool>,
    #[serde(default)]
    file_name: Option<String>,
}

impl Defaults {
    fn unset() -> Self {
        Self {
            format: None,
            theme: None,
            color: None,
            file_name: None,
        }
    }

    fn default_format() -> &'static str {
        "text"
    }

    fn default_theme() -> &'static str {
        "dracula"
    }

    fn default_file_name() -> &'static str {
        ".editorconfig"
    }

    pub fn format(&self) -> &str {
        self.format.as_deref().unwrap_or_else(|| Self::default_format())
    }

    pub fn theme(&self) -> &str {
        self.theme.as_deref().unwrap_or_else(|| Self::default_theme())
    }

    pub fn color(&self) -> bool {
        self.color.unwrap_or(false)
    }

    pub fn file_name(&self) -> &str {
        self.file_name.as_deref().unwrap_or_else(|| Self::default_file_name())
    }
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            format: Some(Self::default_format().to_owned()),
            theme: Some(Self::default_theme().to_owned()),
            color: Some(false),
            file_name: Some(Self::default_file_name().to_owned()),
        }
    }
}

/// Limits for pattern compilation and containment checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolve {
    #[serde(default)]
    max_states: Option<usize>,
    #[serde(default)]
    max_range_expansion: Option<usize>,
    #[serde(default)]
    max_glob_expansion: Option<usize>,
}

impl Resolve {
    const DEFAULT_MAX_STATES: usize = 10_000;
    const DEFAULT_MAX_RANGE_EXPANSION: usize = 1024;
    const DEFAULT_MAX_GLOB_EXPANSION: usize = 256;

    fn unset() -> Self {
        Self {
            max_states: None,
            max_range_expansion: None,
            max_glob_expansion: None,
        }
    }

    pub fn max_states(&self) -> usize {
        self.max_states.unwrap_or(Self::DEFAULT_MAX_STATES)
    }

    pub fn max_range_expansion(&self) -> usize {
        self.max_range_expansion
            .unwrap_or(Self::DEFAULT_MAX_RANGE_EXPANSION)
    }

    pub fn max_glob_expansion(&self) -> usize {
        self.max_glob_expansion
            .unwrap_or(Self::DEFAULT_MAX_GLOB_EXPANSION)
    }
}

impl Default for Resolve {
    fn default() -> Self {
        Self {
            max_states: Some(Self::DEFAULT_MAX_STATES),
            max_range_expansion: Some(Self::DEFAULT_MAX_RANGE_EXPANSION),
            max_glob_expansion: Some(Self::DEFAULT_MAX_GLOB_EXPANSION),
        }
    }
}

/// Environment overrides for critical settings.
#[derive(Debug, Default, Clone)]
pub struct EnvOverrides {
    format: Option<String>,
    max_states: Option<String>,
}

impl EnvOverrides {
    fn from_env() -> Self {
        Self {
            format: env::var("ECNAV_FORMAT").ok(),
            max_states: env::var("ECNAV_MAX_STATES").ok(),
        }
    }

    #[cfg(test)]
    fn for_tests(format: &str, max_states: &str) -> Self {
        Self {
            format: Some(format.to_owned()),
            max_states: Some(max_states.to_owned()),
        }
    }
}

impl Config {
    /// Load configuration from defaults, user/global config, workspace config, and env overrides.
    pub fn load() -> Result<Self> {
        let env = EnvOverrides::from_env();
        let global = global_config_path();
        let workspace = workspace_config_path()?;
        Self::load_with_layers(global, workspace, env)
    }

    fn load_with_layers(
        global: Option<PathBuf>,
        workspace: Option<PathBuf>,
        env_overrides: EnvOverrides,
    ) -> Result<Self> {
        let mut layers: Vec<Config> = Vec::new();

        layers.push(Self::from_str(&DEFAULT_CONFIG)?);

        if let Some(global_path) = global.filter(|path| path.exists()) {
            layers.push(Self::from_file(&global_path)?);
        }

        if let Some(workspace_path) = workspace.filter(|path| path.exists()) {
            layers.push(Self::from_file(&workspace_path)?);
        }

        let merged = layers.into_iter().reduce(Config::merge).unwrap_or_default();
        apply_env_overrides(merged, env_overrides)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        Self::from_str(&data)
            .with_context(|| format!("invalid config file: {}", path.display()))
    }

    fn from_str(contents: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(contents).with_context(|| "failed to parse TOML config".to_string())?;
        Ok(config)
    }

    fn merge(self, other: Self) -> Self {
        Self {
            defaults: merge_defaults(self.defaults, other.defaults),
            resolve: merge_resolve(self.resolve, other.resolve),
        }
    }
}

fn merge_defaults(mut base: Defaults, overlay: Defaults) -> Defaults {
    if let Some(value) = overlay.format {
        base.format = Some(value);
    }
    if let Some(value) = overlay.theme {
        base.theme = Some(value);
    }
    if let Some(value) = overlay.color {
        base.color = Some(value);
    }
    if let Some(value) = overlay.file_name {
        base.file_name = Some(value);
    }
    base
}

fn merge_resolve(mut base: Resolve, overlay: Resolve) -> Resolve {
    if let Some(value) = overlay.max_states {
        base.max_states = Some(value);
    }
    if let Some(value) = overlay.max_range_expansion {
        base.max_range_expansion = Some(value);
    }
    if let Some(value) = overlay.max_glob_expansion {
        base.max_glob_expansion = Some(value);
    }
    base
}

fn global_config_path() -> Option<PathBuf> {
    config_dir().map(|base| base.join("ecnav/config.toml"))
}

fn workspace_config_path() -> Result<Option<PathBuf>> {
    let cwd = env::current_dir()?;
    let root = find_repo_root(&cwd).unwrap_or(cwd);
    Ok(Some(root.join(DEFAULT_WORKSPACE_CONFIG_PATH)))
}

fn find_repo_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(".git").exists())
        .map(Path::to_path_buf)
}

fn apply_env_overrides(mut config: Config, env: EnvOverrides) -> Result<Config> {
    if let Some(format) = env.format {
        config.defaults.format = Some(format);
    }
    if let Some(max_states) = env.max_states {
        config.resolve.max_states = Some(
            max_states
                .trim()
                .parse()
                .with_context(|| format!("ECNAV_MAX_STATES is not a number: {max_states}"))?,
        );
    }
    Ok(config)
}
