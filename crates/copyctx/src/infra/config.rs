//! Configuration management utilities.

use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dirs_next::config_dir;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

static DEFAULT_CONFIG: Lazy<&'static str> =
    Lazy::new(|| include_str!("../../assets/default-config.toml"));
static DEFAULT_WORKSPACE_CONFIG_PATH: &str = ".copyctx/config.toml";

/// Layered configuration loaded from defaults, user, workspace, and env.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub limits: Limits,
    #[serde(default)]
    pub exclude: Exclude,
    #[serde(default)]
    pub ignore: Ignore,
    #[serde(default)]
    pub walk: Walk,
}

/// Size and sniffing thresholds for the classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Limits {
    #[serde(default)]
    max_file_size: Option<u64>,
    #[serde(default)]
    sniff_bytes: Option<usize>,
    #[serde(default)]
    max_nul_fraction: Option<f64>,
    #[serde(default)]
    max_control_fraction: Option<f64>,
    #[serde(default)]
    cache_capacity: Option<usize>,
    #[serde(default)]
    cache_eviction: Option<usize>,
}

impl Limits {
    fn default_max_file_size() -> u64 {
        3 * 1024 * 1024
    }

    fn default_sniff_bytes() -> usize {
        8192
    }

    fn default_max_nul_fraction() -> f64 {
        0.10
    }

    fn default_max_control_fraction() -> f64 {
        0.10
    }

    fn default_cache_capacity() -> usize {
        1000
    }

    fn default_cache_eviction() -> usize {
        200
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
            .unwrap_or_else(Self::default_max_file_size)
    }

    pub fn sniff_bytes(&self) -> usize {
        self.sniff_bytes.unwrap_or_else(Self::default_sniff_bytes)
    }

    pub fn max_nul_fraction(&self) -> f64 {
        self.max_nul_fraction
            .unwrap_or_else(Self::default_max_nul_fraction)
    }

    pub fn max_control_fraction(&self) -> f64 {
        self.max_control_fraction
            .unwrap_or_else(Self::default_max_control_fraction)
    }

    pub fn cache_capacity(&self) -> usize {
        self.cache_capacity
            .unwrap_or_else(Self::default_cache_capacity)
    }

    pub fn cache_eviction(&self) -> usize {
        self.cache_eviction
            .unwrap_or_else(Self::default_cache_eviction)
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_file_size: Some(Self::default_max_file_size()),
            sniff_bytes: Some(Self::default_sniff_bytes()),
            max_nul_fraction: Some(Self::default_max_nul_fraction()),
            max_control_fraction: Some(Self::default_max_control_fraction()),
            cache_capacity: Some(Self::default_cache_capacity()),
            cache_eviction: Some(Self::default_cache_eviction()),
        }
    }
}

/// Names and patterns rejected outright by the classifier, even when
/// selected explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exclude {
    #[serde(default)]
    pub basenames: Vec<String>,
    #[serde(default)]
    pub patterns: Vec<String>,
}

impl Default for Exclude {
    fn default() -> Self {
        Self {
            basenames: vec![".DS_Store".into(), "Thumbs.db".into()],
            patterns: Vec::new(),
        }
    }
}

/// Paths and globs never entered while walking selected folders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ignore {
    #[serde(default)]
    pub paths: Vec<String>,
    #[serde(default)]
    pub globs: Vec<String>,
}

impl Default for Ignore {
    fn default() -> Self {
        Self {
            paths: vec![
                "target/".into(),
                "node_modules/".into(),
                "dist/".into(),
                ".git/".into(),
            ],
            globs: vec!["*.min.js".into(), "*.lock".into()],
        }
    }
}

/// Folder-walk policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Walk {
    #[serde(default)]
    respect_gitignore: Option<bool>,
    #[serde(default)]
    include_hidden: Option<bool>,
}

impl Walk {
    fn default_respect_gitignore() -> bool {
        true
    }

    fn default_include_hidden() -> bool {
        false
    }

    pub fn respect_gitignore(&self) -> bool {
        self.respect_gitignore
            .unwrap_or_else(Self::default_respect_gitignore)
    }

    pub fn include_hidden(&self) -> bool {
        self.include_hidden
            .unwrap_or_else(Self::default_include_hidden)
    }
}

impl Default for Walk {
    fn default() -> Self {
        Self {
            respect_gitignore: Some(Self::default_respect_gitignore()),
            include_hidden: Some(Self::default_include_hidden()),
        }
    }
}

/// Environment overrides for critical settings.
#[derive(Debug, Default, Clone)]
pub struct EnvOverrides {
    max_file_size: Option<u64>,
    respect_gitignore: Option<bool>,
}

impl EnvOverrides {
    fn from_env() -> Self {
        Self {
            max_file_size: env::var("COPYCTX_MAX_FILE_SIZE")
                .ok()
                .and_then(|raw| raw.trim().parse().ok()),
            respect_gitignore: env::var("COPYCTX_GITIGNORE")
                .ok()
                .and_then(|raw| parse_bool(&raw)),
        }
    }

    #[cfg(test)]
    fn for_tests(max_file_size: Option<u64>, respect_gitignore: Option<bool>) -> Self {
        Self {
            max_file_size,
            respect_gitignore,
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Config {
    /// Load configuration from defaults, user/global config, workspace config,
    /// and env overrides.
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
        Ok(apply_env_overrides(merged, env_overrides))
    }

    fn from_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        Self::from_str(&data)
    }

    fn from_str(contents: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(contents).with_context(|| "failed to parse TOML config".to_string())?;
        Ok(config)
    }

    fn merge(self, other: Self) -> Self {
        Self {
            limits: merge_limits(self.limits, other.limits),
            exclude: merge_exclude(self.exclude, other.exclude),
            ignore: merge_ignore(self.ignore, other.ignore),
            walk: merge_walk(self.walk, other.walk),
        }
    }
}

fn merge_limits(mut base: Limits, overlay: Limits) -> Limits {
    if let Some(value) = overlay.max_file_size {
        base.max_file_size = Some(value);
    }
    if let Some(value) = overlay.sniff_bytes {
        base.sniff_bytes = Some(value);
    }
    if let Some(value) = overlay.max_nul_fraction {
        base.max_nul_fraction = Some(value);
    }
    if let Some(value) = overlay.max_control_fraction {
        base.max_control_fraction = Some(value);
    }
    if let Some(value) = overlay.cache_capacity {
        base.cache_capacity = Some(value);
    }
    if let Some(value) = overlay.cache_eviction {
        base.cache_eviction = Some(value);
    }
    base
}

fn merge_exclude(base: Exclude, overlay: Exclude) -> Exclude {
    let mut basenames: BTreeSet<String> = base.basenames.into_iter().collect();
    basenames.extend(overlay.basenames);

    let mut patterns: BTreeSet<String> = base.patterns.into_iter().collect();
    patterns.extend(overlay.patterns);

    Exclude {
        basenames: basenames.into_iter().collect(),
        patterns: patterns.into_iter().collect(),
    }
}

fn merge_ignore(base: Ignore, overlay: Ignore) -> Ignore {
    let mut paths: BTreeSet<String> = base.paths.into_iter().collect();
    paths.extend(overlay.paths);

    let mut globs: BTreeSet<String> = base.globs.into_iter().collect();
    globs.extend(overlay.globs);

    Ignore {
        paths: paths.into_iter().collect(),
        globs: globs.into_iter().collect(),
    }
}

fn merge_walk(mut base: Walk, overlay: Walk) -> Walk {
    if let Some(value) = overlay.respect_gitignore {
        base.respect_gitignore = Some(value);
    }
    if let Some(value) = overlay.include_hidden {
        base.include_hidden = Some(value);
    }
    base
}

fn apply_env_overrides(mut config: Config, env: EnvOverrides) -> Config {
    if let Some(bytes) = env.max_file_size {
        config.limits.max_file_size = Some(bytes);
    }
    if let Some(respect) = env.respect_gitignore {
        config.walk.respect_gitignore = Some(respect);
    }
    config
}

fn global_config_path() -> Option<PathBuf> {
    config_dir().map(|base| base.join("copyctx/config.toml"))
}

fn workspace_config_path() -> Result<Option<PathBuf>> {
    let cwd = env::current_dir()?;
    let root = find_repo_root(&cwd).unwrap_or(cwd);
    Ok(Some(root.join(DEFAULT_WORKSPACE_CONFIG_PATH)))
}

/// Nearest ancestor of `start` containing a `.git` entry.
pub fn find_repo_root(start: &Path) -> Option<PathBuf> {
    let mut current = start;
    loop {
        if current.join(".git").exists() {
            return Some(current.to_path_buf());
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => return None,
        }
    }
}
