//! Application configuration loading for CLI defaults.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use harvester_core::config::{MAX_ITEM_COUNT, MAX_PACING_MS, MAX_PAGE_READY_TIMEOUT_SECS};

/// Key/value file configuration for harvester defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    /// Landing page of the platform.
    pub base_url: Option<String>,
    /// Number of items per run.
    pub count: Option<u64>,
    pub output_dir: Option<PathBuf>,
    pub session_file: Option<PathBuf>,
    /// Where the page dump goes when discovery under-delivers.
    pub diagnostic_file: Option<PathBuf>,
    pub pacing_ms: Option<u64>,
    pub ready_timeout_secs: Option<u64>,
    pub headless: Option<bool>,
    pub browser_path: Option<PathBuf>,
    /// Font tried before the built-in CJK candidates.
    pub font_path: Option<PathBuf>,
}

impl FileConfig {
    /// Validates config values against the CLI ranges.
    pub fn validate(&self) -> Result<()> {
        if let Some(count) = self.count
            && !(1..=MAX_ITEM_COUNT as u64).contains(&count)
        {
            bail!("Invalid config value for `count`: {count}. Expected range: 1..={MAX_ITEM_COUNT}");
        }
        if let Some(pacing) = self.pacing_ms
            && pacing > MAX_PACING_MS
        {
            bail!("Invalid config value for `pacing_ms`: {pacing}. Expected range: 0..={MAX_PACING_MS}");
        }
        if let Some(secs) = self.ready_timeout_secs
            && !(1..=MAX_PAGE_READY_TIMEOUT_SECS).contains(&secs)
        {
            bail!(
                "Invalid config value for `ready_timeout_secs`: {secs}. Expected range: 1..={MAX_PAGE_READY_TIMEOUT_SECS}"
            );
        }
        Ok(())
    }
}

/// Loaded config metadata.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Resolved config path if a base directory is known.
    pub path: Option<PathBuf>,
    /// Parsed file config when a config file exists and was valid.
    pub config: Option<FileConfig>,
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/harvester/config.toml`
/// 2. `$HOME/.config/harvester/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("harvester")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("harvester")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads config from default path if present.
pub fn load_default_file_config() -> Result<LoadedConfig> {
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

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }
        let line_no = line_index + 1;

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!("Invalid config syntax on line {line_no}: expected key = value");
        };

        let key = raw_key.trim();
        let value = raw_value.trim();
        let string_value = || {
            parse_string_literal(value)
                .with_context(|| format!("Invalid `{key}` value on line {line_no}"))
        };
        let integer_value = || {
            parse_integer_u64(value)
                .with_context(|| format!("Invalid `{key}` value on line {line_no}"))
        };
        let boolean_value = || {
            parse_boolean(value).with_context(|| format!("Invalid `{key}` value on line {line_no}"))
        };

        match key {
            "base_url" => cfg.base_url = Some(string_value()?),
            "count" => cfg.count = Some(integer_value()?),
            "output_dir" => cfg.output_dir = Some(PathBuf::from(string_value()?)),
            "session_file" => cfg.session_file = Some(PathBuf::from(string_value()?)),
            "diagnostic_file" => cfg.diagnostic_file = Some(PathBuf::from(string_value()?)),
            "pacing_ms" => cfg.pacing_ms = Some(integer_value()?),
            "ready_timeout_secs" => cfg.ready_timeout_secs = Some(integer_value()?),
            "headless" => cfg.headless = Some(boolean_value()?),
            "browser_path" => cfg.browser_path = Some(PathBuf::from(string_value()?)),
            "font_path" => cfg.font_path = Some(PathBuf::from(string_value()?)),
            unknown => {
                bail!("Unknown configuration key: '{unknown}' on line {line_no}");
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_integer_u64(raw_value: &str) -> Result<u64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<i128>()?;
    if value < 0 {
        bail!("Expected non-negative integer");
    }
    u64::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u64"))
}

fn parse_boolean(raw_value: &str) -> Result<bool> {
    match raw_value.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => bail!("Expected 'true' or 'false'"),
    }
}
