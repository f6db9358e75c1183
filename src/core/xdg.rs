//! XDG Base Directory Support
//!
//! Resolves where the configuration file and the persistent session
//! cache live on Linux/Unix systems.

use std::env;
use std::path::PathBuf;

const APP_DIR: &str = "fedsearch";

/// XDG directory structure for fedsearch
#[derive(Debug, Clone)]
pub struct XdgDirs {
    pub config_dir: PathBuf,
    pub state_dir: PathBuf,
}

impl XdgDirs {
    /// Priority order (highest to lowest):
    /// 1. Explicit FEDSEARCH_* env vars
    /// 2. XDG_* environment variables
    /// 3. XDG defaults (~/.config, ~/.local/state)
    pub fn new() -> Self {
        Self {
            config_dir: Self::resolve("FEDSEARCH_CONFIG_DIR", "XDG_CONFIG_HOME", &[".config"]),
            state_dir: Self::resolve(
                "FEDSEARCH_STATE_DIR",
                "XDG_STATE_HOME",
                &[".local", "state"],
            ),
        }
    }

    fn resolve(explicit: &str, xdg_var: &str, fallback: &[&str]) -> PathBuf {
        if let Ok(dir) = env::var(explicit) {
            return PathBuf::from(dir);
        }

        if let Ok(xdg) = env::var(xdg_var) {
            return PathBuf::from(xdg).join(APP_DIR);
        }

        let mut dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        for part in fallback {
            dir.push(part);
        }
        dir.join(APP_DIR)
    }

    /// Get config file path
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    /// Persistent session cache file
    pub fn cache_file(&self) -> PathBuf {
        self.state_dir.join("cache.json")
    }

    /// Log the resolved XDG paths
    pub fn log_paths(&self) {
        tracing::debug!("XDG directories resolved:");
        tracing::debug!("  Config: {:?}", self.config_dir);
        tracing::debug!("  State: {:?}", self.state_dir);
    }
}

impl Default for XdgDirs {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env_vars() {
        env::remove_var("XDG_CONFIG_HOME");
        env::remove_var("XDG_STATE_HOME");
        env::remove_var("FEDSEARCH_CONFIG_DIR");
        env::remove_var("FEDSEARCH_STATE_DIR");
    }

    #[test]
    #[serial]
    fn test_xdg_defaults() {
        clear_env_vars();

        let xdg = XdgDirs::new();
        assert!(xdg.config_dir.ends_with(".config/fedsearch"));
        assert!(xdg.state_dir.ends_with(".local/state/fedsearch"));
    }

    #[test]
    #[serial]
    fn test_xdg_env_vars() {
        clear_env_vars();
        env::set_var("XDG_CONFIG_HOME", "/c");
        env::set_var("XDG_STATE_HOME", "/s");

        let xdg = XdgDirs::new();
        assert_eq!(xdg.config_file(), PathBuf::from("/c/fedsearch/config.toml"));
        assert_eq!(xdg.cache_file(), PathBuf::from("/s/fedsearch/cache.json"));

        clear_env_vars();
    }

    #[test]
    #[serial]
    fn test_explicit_dir_priority() {
        clear_env_vars();
        env::set_var("XDG_STATE_HOME", "/xdg/state");
        env::set_var("FEDSEARCH_STATE_DIR", "/fed/state");

        let xdg = XdgDirs::new();
        assert_eq!(
            xdg.state_dir,
            PathBuf::from("/fed/state"),
            "FEDSEARCH_STATE_DIR should take priority over XDG_STATE_HOME"
        );

        clear_env_vars();
    }
}
