//! Configuration lifecycle: load file config, merge CLI, build the run config.

use std::time::Duration;

use anyhow::{Context, Result};
use harvester_core::HarvestConfig;

use crate::app_config::{FileConfig, load_default_file_config};
use crate::cli::Args;

/// Loads the default config file and merges CLI overrides over it.
pub(crate) fn resolve_config(args: &Args) -> Result<HarvestConfig> {
    let loaded_config = load_default_file_config()?;
    merge_config(args, loaded_config.config.as_ref())
}

/// Applies defaults, then file values, then CLI values. Later layers win.
pub(crate) fn merge_config(args: &Args, file: Option<&FileConfig>) -> Result<HarvestConfig> {
    let mut config = HarvestConfig::default();

    if let Some(file) = file {
        if let Some(base_url) = &file.base_url {
            config.base_url.clone_from(base_url);
        }
        if let Some(count) = file.count {
            config.item_count = usize::try_from(count).context("`count` does not fit usize")?;
        }
        if let Some(dir) = &file.output_dir {
            config.output_dir.clone_from(dir);
        }
        if let Some(path) = &file.session_file {
            config.session_file.clone_from(path);
        }
        if let Some(path) = &file.diagnostic_file {
            config.diagnostic_file.clone_from(path);
        }
        if let Some(millis) = file.pacing_ms {
            config.pacing = Duration::from_millis(millis);
        }
        if let Some(secs) = file.ready_timeout_secs {
            config.page_ready_timeout = Duration::from_secs(secs);
        }
        if let Some(headless) = file.headless {
            config.launch.headless = headless;
        }
        if let Some(path) = &file.browser_path {
            config.launch.executable = Some(path.clone());
        }
        if let Some(font) = &file.font_path {
            config.font_candidates.insert(0, font.clone());
        }
    }

    if let Some(base_url) = &args.base_url {
        config.base_url.clone_from(base_url);
    }
    if let Some(count) = args.count {
        config.item_count = usize::try_from(count).context("`--count` does not fit usize")?;
    }
    if let Some(dir) = &args.output_dir {
        config.output_dir.clone_from(dir);
    }
    if let Some(path) = &args.session_file {
        config.session_file.clone_from(path);
    }
    if let Some(millis) = args.pacing_ms {
        config.pacing = Duration::from_millis(millis);
    }
    if let Some(secs) = args.ready_timeout_secs {
        config.page_ready_timeout = Duration::from_secs(secs);
    }
    if args.headless {
        config.launch.headless = true;
    }
    if let Some(path) = &args.browser_path {
        config.launch.executable = Some(path.clone());
    }
    config.fresh_login = args.fresh_login;

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn args(argv: &[&str]) -> Args {
        let mut full = vec!["harvester"];
        full.extend_from_slice(argv);
        Args::try_parse_from(full).unwrap()
    }

    #[test]
    fn test_merge_config_defaults_without_file() {
        let config = merge_config(&args(&[]), None).unwrap();
        assert_eq!(config, HarvestConfig::default());
    }

    #[test]
    fn test_merge_config_file_values_apply() {
        let file = FileConfig {
            count: Some(9),
            pacing_ms: Some(0),
            headless: Some(true),
            font_path: Some(PathBuf::from("/fonts/custom.ttf")),
            ..FileConfig::default()
        };
        let config = merge_config(&args(&[]), Some(&file)).unwrap();
        assert_eq!(config.item_count, 9);
        assert_eq!(config.pacing, Duration::ZERO);
        assert!(config.launch.headless);
        assert_eq!(config.font_candidates[0], PathBuf::from("/fonts/custom.ttf"));
        assert_eq!(
            config.font_candidates.len(),
            HarvestConfig::default().font_candidates.len() + 1
        );
    }

    #[test]
    fn test_merge_config_cli_overrides_file() {
        let file = FileConfig {
            count: Some(9),
            output_dir: Some(PathBuf::from("from-file")),
            ..FileConfig::default()
        };
        let config = merge_config(&args(&["-n", "2", "-o", "from-cli"]), Some(&file)).unwrap();
        assert_eq!(config.item_count, 2);
        assert_eq!(config.output_dir, PathBuf::from("from-cli"));
    }

    #[test]
    fn test_merge_config_rejects_invalid_base_url() {
        let err = merge_config(&args(&["--base-url", "ftp://example.com/"]), None)
            .expect_err("non-http base url must be rejected");
        assert!(err.to_string().contains("ftp://example.com/"));
    }

    #[test]
    fn test_merge_config_fresh_login_flag() {
        let config = merge_config(&args(&["--fresh-login"]), None).unwrap();
        assert!(config.fresh_login);
    }

    /// With XDG_CONFIG_HOME pointing at an empty temp dir, resolve_config
    /// succeeds and returns defaults.
    #[test]
    fn test_resolve_config_no_config_file_returns_defaults() {
        let temp = TempDir::new().unwrap();
        let prev = std::env::var_os("XDG_CONFIG_HOME");
        // SAFETY: test isolates env change and restores on drop.
        unsafe {
            std::env::set_var("XDG_CONFIG_HOME", temp.path());
        }
        let _restore = RestoreEnv::new("XDG_CONFIG_HOME", prev);

        let config = resolve_config(&args(&[])).unwrap();
        assert_eq!(config, HarvestConfig::default());
    }

    struct RestoreEnv {
        key: &'static str,
        value: Option<std::ffi::OsString>,
    }

    impl RestoreEnv {
        fn new(key: &'static str, value: Option<std::ffi::OsString>) -> Self {
            Self { key, value }
        }
    }

    impl Drop for RestoreEnv {
        fn drop(&mut self) {
            // SAFETY: test restores env to prior state.
            match &self.value {
                Some(v) => unsafe { std::env::set_var(self.key, v) },
                None => unsafe { std::env::remove_var(self.key) },
            }
        }
    }
}
