use crate::env::Environment;
use log::LevelFilter;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Embedded default configuration.
const DEFAULT_CONFIG: &str = include_str!("../config.default.toml");

// ── Final (merged) config types ──

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
    /// Aliases defined at startup, by name.
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_history_size")]
    pub history_size: usize,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_history_size() -> usize {
    100
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            history_size: default_history_size(),
        }
    }
}

// ── Overlay types (user config that merges with defaults) ──

#[derive(Debug, Deserialize, Default)]
struct ConfigOverlay {
    /// Default aliases to drop. Must precede the first table in the file.
    #[serde(default)]
    remove_aliases: Vec<String>,
    #[serde(default)]
    settings: SettingsOverlay,
    #[serde(default)]
    aliases: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize, Default)]
struct SettingsOverlay {
    log_level: Option<String>,
    history_size: Option<usize>,
}

impl Config {
    /// Load the default embedded configuration.
    pub fn default_config() -> Self {
        match toml::from_str(DEFAULT_CONFIG) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("cellsh: embedded config parse error: {e}");
                Self::default()
            }
        }
    }

    /// Load configuration with resolution order:
    /// 1. Start with embedded defaults
    /// 2. Merge the overlay at `path`, or ~/.config/cellsh/config.toml when no
    ///    path is given (if it exists)
    ///
    /// Aliases from the overlay are added to or replace the defaults; names
    /// listed in `remove_aliases` are dropped first. Settings override.
    pub fn load(path: Option<&Path>) -> Self {
        let mut config = Self::default_config();
        if let Some(overlay) = Self::load_overlay(path) {
            config.apply_overlay(overlay);
        }
        config
    }

    /// Where the user overlay lives when `--config` is not given.
    pub fn user_config_path() -> Option<PathBuf> {
        let home = std::env::var_os("HOME")?;
        Some(Path::new(&home).join(".config/cellsh/config.toml"))
    }

    fn load_overlay(path: Option<&Path>) -> Option<ConfigOverlay> {
        let content = match path {
            Some(path) => match std::fs::read_to_string(path) {
                Ok(content) => content,
                Err(e) => {
                    eprintln!("cellsh: cannot read {}: {e}", path.display());
                    return None;
                }
            },
            None => std::fs::read_to_string(Self::user_config_path()?).ok()?,
        };
        match toml::from_str(&content) {
            Ok(overlay) => Some(overlay),
            Err(e) => {
                eprintln!("cellsh: config parse error: {e}");
                None
            }
        }
    }

    /// Apply an overlay on top of this config (merge semantics).
    fn apply_overlay(&mut self, overlay: ConfigOverlay) {
        if let Some(v) = overlay.settings.log_level {
            self.settings.log_level = v;
        }
        if let Some(v) = overlay.settings.history_size {
            self.settings.history_size = v;
        }

        for name in &overlay.remove_aliases {
            self.aliases.remove(name);
        }
        self.aliases.extend(overlay.aliases);
    }

    /// Merge an overlay given as TOML text.
    pub fn apply_overlay_str(&mut self, toml_str: &str) -> Result<(), toml::de::Error> {
        let overlay: ConfigOverlay = toml::from_str(toml_str)?;
        self.apply_overlay(overlay);
        Ok(())
    }

    /// `settings.log_level` as a filter; unknown names fall back to `Info`.
    pub fn log_level(&self) -> LevelFilter {
        LevelFilter::from_str(&self.settings.log_level).unwrap_or(LevelFilter::Info)
    }

    /// Install the configured aliases and history size into `env`.
    pub fn apply(&self, env: &mut Environment) {
        for (name, value) in &self.aliases {
            env.aliases.add(name.as_str(), value.as_str());
        }
        env.history_size = self.settings.history_size;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_defaults_parse() {
        let config = Config::default_config();
        assert_eq!(config.settings.log_level, "info");
        assert_eq!(config.settings.history_size, 100);
        assert_eq!(config.aliases.get("ll").map(String::as_str), Some("ls -l"));
    }

    #[test]
    fn overlay_merges_aliases() {
        let mut config = Config::default_config();
        config
            .apply_overlay_str(
                r#"
                [aliases]
                gs = "git status"
                ll = "ls -l -a"
                "#,
            )
            .unwrap();
        assert_eq!(config.aliases["gs"], "git status");
        assert_eq!(config.aliases["ll"], "ls -l -a");
        assert_eq!(config.aliases["la"], "ls -a");
    }

    #[test]
    fn overlay_removes_aliases() {
        let mut config = Config::default_config();
        config
            .apply_overlay_str(
                r#"
                remove_aliases = ["la"]

                [aliases]
                "#,
            )
            .unwrap();
        assert!(!config.aliases.contains_key("la"));
        assert!(config.aliases.contains_key("ll"));
    }

    #[test]
    fn overlay_overrides_settings() {
        let mut config = Config::default_config();
        config
            .apply_overlay_str(
                r#"
                [settings]
                log_level = "debug"
                "#,
            )
            .unwrap();
        assert_eq!(config.log_level(), LevelFilter::Debug);
        assert_eq!(config.settings.history_size, 100);
    }

    #[test]
    fn bad_overlay_is_an_error() {
        let mut config = Config::default_config();
        assert!(config.apply_overlay_str("[settings]\nhistory_size = \"many\"").is_err());
        assert_eq!(config.settings.history_size, 100);
    }

    #[test]
    fn unknown_level_falls_back_to_info() {
        let mut config = Config::default_config();
        config.settings.log_level = "chatty".into();
        assert_eq!(config.log_level(), LevelFilter::Info);
    }

    #[test]
    fn load_from_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[settings]\nhistory_size = 5\n").unwrap();
        let config = Config::load(Some(&path));
        assert_eq!(config.settings.history_size, 5);
        assert!(config.aliases.contains_key("ll"));
    }

    #[test]
    fn unreadable_path_keeps_defaults() {
        let config = Config::load(Some(Path::new("/no/such/cellsh.toml")));
        assert_eq!(config.settings.history_size, 100);
    }

    #[test]
    fn apply_installs_into_environment() {
        let mut config = Config::default_config();
        config.settings.history_size = 7;
        let mut env = Environment::new();
        config.apply(&mut env);
        assert_eq!(env.history_size, 7);
        assert_eq!(env.aliases.lookup("la"), Some("ls -a"));
    }
}
