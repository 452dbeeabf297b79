//! Config file loading and merging with CLI flags.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use bibdl_core::resolver::{CandidateFilter, DEFAULT_BLACKLIST, DEFAULT_BOOK_HOSTS};
use bibdl_core::search::DEFAULT_SCHOLAR_BASE_URL;
use bibdl_core::throttle::{
    DEFAULT_BASELINE_DELAY, DEFAULT_JITTER_RATIO, DEFAULT_MIN_DELAY, DEFAULT_ROTATION_RANGE,
    ThrottleConfig,
};
use bibdl_core::{download, search};
use serde::Deserialize;

use crate::cli::Args;

/// TOML-backed defaults. Every key is optional; unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct FileConfig {
    pub(crate) output_dir: Option<PathBuf>,
    pub(crate) overwrite: Option<bool>,
    pub(crate) baseline_delay_ms: Option<u64>,
    pub(crate) min_delay_ms: Option<u64>,
    pub(crate) jitter_ratio: Option<f64>,
    pub(crate) rotation_min: Option<u32>,
    pub(crate) rotation_max: Option<u32>,
    pub(crate) blacklist: Option<Vec<String>>,
    pub(crate) book_hosts: Option<Vec<String>>,
    pub(crate) on_blocked: Option<String>,
    pub(crate) scholar_base_url: Option<String>,
    pub(crate) connect_timeout_secs: Option<u64>,
    pub(crate) read_timeout_secs: Option<u64>,
}

impl FileConfig {
    /// Validates values that are not checked when building library types.
    pub(crate) fn validate(&self) -> Result<()> {
        validate_timeout_secs("connect_timeout_secs", self.connect_timeout_secs)?;
        validate_timeout_secs("read_timeout_secs", self.read_timeout_secs)?;
        if let Some(command) = self.on_blocked.as_deref()
            && command.trim().is_empty()
        {
            bail!("Invalid config value for `on_blocked`: command must not be empty");
        }
        Ok(())
    }
}

fn validate_timeout_secs(field: &str, value: Option<u64>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(1..=3600).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 1..=3600");
    }
    Ok(())
}

/// Config file location and its parsed contents, if any.
#[derive(Debug, Clone)]
pub(crate) struct LoadedConfig {
    pub(crate) path: Option<PathBuf>,
    pub(crate) config: Option<FileConfig>,
}

/// Resolves the default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/bibdl/config.toml`
/// 2. `$HOME/.config/bibdl/config.toml`
#[must_use]
pub(crate) fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg_config_home).join("bibdl").join("config.toml"));
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("bibdl")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads the config file. An explicit path must exist; the default path is optional.
pub(crate) fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    if let Some(path) = explicit {
        let config = load_file_config(path)?;
        return Ok(LoadedConfig {
            path: Some(path.to_path_buf()),
            config: Some(config),
        });
    }

    let path = resolve_default_config_path();
    let config = match path.as_deref() {
        Some(path_ref) if path_ref.exists() => Some(load_file_config(path_ref)?),
        _ => None,
    };
    Ok(LoadedConfig { path, config })
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

pub(crate) fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let config: FileConfig = toml::from_str(raw)?;
    config.validate()?;
    Ok(config)
}

/// Everything the runtime needs, after merging CLI flags over file values.
#[derive(Debug, Clone)]
pub(crate) struct RunSettings {
    pub(crate) paths: Vec<PathBuf>,
    pub(crate) key: Option<String>,
    pub(crate) output_dir: PathBuf,
    pub(crate) overwrite: bool,
    pub(crate) dry_run: bool,
    pub(crate) json: bool,
    pub(crate) on_blocked: Option<String>,
    pub(crate) throttle: ThrottleConfig,
    pub(crate) filter: CandidateFilter,
    pub(crate) scholar_base_url: String,
    pub(crate) provider_timeouts: (u64, u64),
    pub(crate) download_timeouts: (u64, u64),
}

/// Merges CLI flags over file values over built-in defaults.
pub(crate) fn resolve_settings(args: &Args, file: Option<&FileConfig>) -> Result<RunSettings> {
    let file = file.cloned().unwrap_or_default();

    let baseline = args
        .delay_ms
        .or(file.baseline_delay_ms)
        .map_or(DEFAULT_BASELINE_DELAY, Duration::from_millis);
    let min = args
        .min_delay_ms
        .or(file.min_delay_ms)
        .map_or(DEFAULT_MIN_DELAY, Duration::from_millis);
    let rotation_min = file.rotation_min.unwrap_or(*DEFAULT_ROTATION_RANGE.start());
    let rotation_max = file.rotation_max.unwrap_or(*DEFAULT_ROTATION_RANGE.end());
    let throttle = ThrottleConfig::new(
        baseline,
        min,
        file.jitter_ratio.unwrap_or(DEFAULT_JITTER_RATIO),
        rotation_min..=rotation_max,
    )
    .context("Invalid throttle settings")?;

    let filter = match (file.blacklist, file.book_hosts) {
        (None, None) => CandidateFilter::default(),
        (blacklist, book_hosts) => CandidateFilter::from_patterns(
            blacklist.unwrap_or_else(|| to_owned_patterns(DEFAULT_BLACKLIST)),
            book_hosts.unwrap_or_else(|| to_owned_patterns(DEFAULT_BOOK_HOSTS)),
        )
        .context("Invalid host pattern in config")?,
    };

    let provider_timeouts = (
        file.connect_timeout_secs.unwrap_or(search::CONNECT_TIMEOUT_SECS),
        file.read_timeout_secs.unwrap_or(search::READ_TIMEOUT_SECS),
    );
    let download_timeouts = (
        file.connect_timeout_secs
            .unwrap_or(download::CONNECT_TIMEOUT_SECS),
        file.read_timeout_secs.unwrap_or(download::READ_TIMEOUT_SECS),
    );

    Ok(RunSettings {
        paths: args.paths.clone(),
        key: args.key.clone(),
        output_dir: args
            .output_dir
            .clone()
            .or(file.output_dir)
            .unwrap_or_else(|| PathBuf::from(".")),
        overwrite: args.force || file.overwrite.unwrap_or(false),
        dry_run: args.dry_run,
        json: args.json,
        on_blocked: args.on_blocked.clone().or(file.on_blocked),
        throttle,
        filter,
        scholar_base_url: file
            .scholar_base_url
            .unwrap_or_else(|| DEFAULT_SCHOLAR_BASE_URL.to_string()),
        provider_timeouts,
        download_timeouts,
    })
}

fn to_owned_patterns(patterns: &[&str]) -> Vec<String> {
    patterns.iter().map(|p| (*p).to_string()).collect()
}
