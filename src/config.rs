// src/config.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::retry::RetryPolicy;

const ENV_PATH: &str = "PAGEWATCH_CONFIG_PATH";

/// Service configuration. File values (TOML or JSON) are applied first,
/// then individual env vars override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// The monitored page.
    pub source_url: String,
    /// Key under which its snapshot is stored.
    pub source_key: String,
    pub interval_secs: u64,
    pub draft_ttl_secs: i64,
    /// Base for the confirmation links sent to humans.
    pub confirm_base_url: String,
    pub state_dir: String,
    pub retry: RetryPolicy,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            source_url: String::new(),
            source_key: "default".to_string(),
            interval_secs: 300,
            draft_ttl_secs: crate::draft::DEFAULT_DRAFT_TTL_SECS,
            confirm_base_url: "http://127.0.0.1:8000".to_string(),
            state_dir: "state".to_string(),
            retry: RetryPolicy::default(),
        }
    }
}

/// Load config from an explicit path. Supports TOML or JSON formats.
pub fn load_config_from(path: &Path) -> Result<WatchConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading config from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_config(&content, ext.as_str())
}

/// Load config using env var + fallbacks:
/// 1) $PAGEWATCH_CONFIG_PATH
/// 2) config/pagewatch.toml
/// 3) config/pagewatch.json
/// 4) built-in defaults
/// Individual env vars override whatever was loaded.
pub fn load_config_default() -> Result<WatchConfig> {
    let mut cfg = if let Ok(p) = std::env::var(ENV_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            load_config_from(&pb)?
        } else {
            return Err(anyhow!("PAGEWATCH_CONFIG_PATH points to non-existent path"));
        }
    } else {
        let toml_p = PathBuf::from("config/pagewatch.toml");
        let json_p = PathBuf::from("config/pagewatch.json");
        if toml_p.exists() {
            load_config_from(&toml_p)?
        } else if json_p.exists() {
            load_config_from(&json_p)?
        } else {
            WatchConfig::default()
        }
    };
    apply_env_overrides(&mut cfg);
    Ok(cfg)
}

fn parse_config(s: &str, hint_ext: &str) -> Result<WatchConfig> {
    let try_toml = hint_ext == "toml" || !s.trim_start().starts_with('{');
    if try_toml {
        if let Ok(v) = toml::from_str(s) {
            return Ok(v);
        }
    }
    if let Ok(v) = serde_json::from_str(s) {
        return Ok(v);
    }
    if !try_toml {
        if let Ok(v) = toml::from_str(s) {
            return Ok(v);
        }
    }
    Err(anyhow!("unsupported config format"))
}

fn apply_env_overrides(cfg: &mut WatchConfig) {
    if let Ok(v) = std::env::var("WATCH_URL") {
        if !v.is_empty() {
            cfg.source_url = v;
        }
    }
    if let Ok(v) = std::env::var("WATCH_SOURCE_KEY") {
        if !v.is_empty() {
            cfg.source_key = v;
        }
    }
    if let Some(v) = env_parse::<u64>("CHECK_INTERVAL_SECS") {
        cfg.interval_secs = v;
    }
    if let Some(v) = env_parse::<i64>("DRAFT_TTL_SECS") {
        cfg.draft_ttl_secs = v;
    }
    if let Ok(v) = std::env::var("CONFIRM_BASE_URL") {
        if !v.is_empty() {
            cfg.confirm_base_url = v;
        }
    }
    if let Ok(v) = std::env::var("STATE_DIR") {
        if !v.is_empty() {
            cfg.state_dir = v;
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    const ENV_KEYS: &[&str] = &[
        ENV_PATH,
        "WATCH_URL",
        "WATCH_SOURCE_KEY",
        "CHECK_INTERVAL_SECS",
        "DRAFT_TTL_SECS",
        "CONFIRM_BASE_URL",
        "STATE_DIR",
    ];

    fn clear_env() {
        for k in ENV_KEYS {
            env::remove_var(k);
        }
    }

    #[test]
    fn toml_and_json_both_parse() {
        let toml_src = r#"
            source_url = "https://example.com/page"
            interval_secs = 60
        "#;
        let cfg = parse_config(toml_src, "toml").unwrap();
        assert_eq!(cfg.source_url, "https://example.com/page");
        assert_eq!(cfg.interval_secs, 60);
        assert_eq!(cfg.source_key, "default"); // defaulted

        let json_src = r#"{ "source_url": "https://example.com/x", "draft_ttl_secs": 120 }"#;
        let cfg = parse_config(json_src, "json").unwrap();
        assert_eq!(cfg.source_url, "https://example.com/x");
        assert_eq!(cfg.draft_ttl_secs, 120);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(parse_config("][ not a config", "toml").is_err());
    }

    #[serial_test::serial]
    #[test]
    fn default_uses_env_path_then_fallbacks() {
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();
        clear_env();

        // No files anywhere → defaults
        let cfg = load_config_default().unwrap();
        assert_eq!(cfg, WatchConfig::default());

        // Env path takes precedence
        let p = tmp.path().join("watch.toml");
        std::fs::write(&p, "source_url = \"https://example.com\"\n").unwrap();
        env::set_var(ENV_PATH, p.display().to_string());
        let cfg = load_config_default().unwrap();
        assert_eq!(cfg.source_url, "https://example.com");

        clear_env();
        env::set_current_dir(&old).unwrap();
    }

    #[serial_test::serial]
    #[test]
    fn env_vars_override_file_values() {
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();
        clear_env();

        env::set_var("WATCH_URL", "https://override.example.com");
        env::set_var("CHECK_INTERVAL_SECS", "30");
        let cfg = load_config_default().unwrap();
        assert_eq!(cfg.source_url, "https://override.example.com");
        assert_eq!(cfg.interval_secs, 30);

        clear_env();
        env::set_current_dir(&old).unwrap();
    }
}
