use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DollarError, Result};

pub const DB_FILE: &str = "dollardollar.db";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub data_dir: String,
    #[serde(default)]
    pub user_name: String,
    /// Credentialed SimpleFin endpoint returned by a claim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simplefin_access_url: Option<String>,
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    #[serde(default)]
    pub auth: AuthSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthModeSetting {
    #[default]
    Session,
    DevAutoLogin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSettings {
    #[serde(default)]
    pub mode: AuthModeSetting,
    #[serde(default)]
    pub dev_user: Option<String>,
    /// Token -> user name.
    #[serde(default)]
    pub api_tokens: BTreeMap<String, String>,
    #[serde(default)]
    pub demo_users: Vec<String>,
    #[serde(default = "default_demo_restricted")]
    pub demo_restricted: Vec<String>,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            mode: AuthModeSetting::default(),
            dev_user: None,
            api_tokens: BTreeMap::new(),
            demo_users: Vec::new(),
            demo_restricted: default_demo_restricted(),
        }
    }
}

fn default_lookback_days() -> u32 {
    30
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn default_demo_restricted() -> Vec<String> {
    ["/simplefin", "/settings", "/accounts/delete", "/api/simplefin"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir().to_string_lossy().to_string(),
            user_name: String::new(),
            simplefin_access_url: None,
            lookback_days: default_lookback_days(),
            http_timeout_secs: default_http_timeout_secs(),
            auth: AuthSettings::default(),
        }
    }
}

fn config_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os("DOLLARDOLLAR_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("dollardollar")
}

fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("dollardollar")
}

pub fn load_settings() -> Settings {
    let path = settings_path();
    if path.exists() {
        let content = std::fs::read_to_string(&path).unwrap_or_default();
        match serde_json::from_str(&content) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "unreadable settings, using defaults");
                Settings::default()
            }
        }
    } else {
        Settings::default()
    }
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    std::fs::create_dir_all(config_dir())?;
    write_settings_file(&settings_path(), settings)
}

/// Settings can hold the SimpleFin access URL, so the file is owner-only.
fn write_settings_file(path: &Path, settings: &Settings) -> Result<()> {
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| DollarError::Settings(e.to_string()))?;

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    // `mode` only applies on create; tighten files left by older versions.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }
    file.write_all(format!("{json}\n").as_bytes())?;
    Ok(())
}

impl Settings {
    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join(DB_FILE)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs.max(1))
    }
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| PathBuf::from(path))
        .to_string_lossy()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = Settings {
            data_dir: "/tmp/test".to_string(),
            user_name: "Alice".to_string(),
            simplefin_access_url: Some("https://u:p@bridge.example/simplefin".to_string()),
            lookback_days: 90,
            ..Settings::default()
        };
        let json = serde_json::to_string_pretty(&settings).unwrap();
        std::fs::write(&path, &json).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        let loaded: Settings = serde_json::from_str(&content).unwrap();
        assert_eq!(loaded.user_name, "Alice");
        assert_eq!(loaded.data_dir, "/tmp/test");
        assert_eq!(loaded.lookback_days, 90);
        assert_eq!(
            loaded.simplefin_access_url.as_deref(),
            Some("https://u:p@bridge.example/simplefin")
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_settings_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = Settings {
            simplefin_access_url: Some("https://u:secret@h/x".to_string()),
            ..Settings::default()
        };
        write_settings_file(&path, &settings).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);

        // An existing world-readable file is tightened on save.
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();
        write_settings_file(&path, &settings).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
        let loaded: Settings =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded.simplefin_access_url.as_deref(), Some("https://u:secret@h/x"));
    }

    #[test]
    fn test_load_returns_defaults_when_missing() {
        let s = Settings::default();
        assert!(s.user_name.is_empty());
        assert_eq!(s.lookback_days, 30);
        assert_eq!(s.http_timeout_secs, 30);
        assert!(s.simplefin_access_url.is_none());
        assert!(!s.data_dir.is_empty());
        assert_eq!(s.auth.mode, AuthModeSetting::Session);
    }

    #[test]
    fn test_load_merges_with_defaults() {
        let json = r#"{"data_dir": "/tmp/test", "user_name": "Bob"}"#;
        let s: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(s.lookback_days, 30);
        assert_eq!(s.user_name, "Bob");
        assert!(s.auth.demo_restricted.contains(&"/simplefin".to_string()));
    }

    #[test]
    fn test_db_path_and_timeout() {
        let s = Settings {
            data_dir: "/tmp/ledger".to_string(),
            http_timeout_secs: 0,
            ..Settings::default()
        };
        assert_eq!(s.db_path(), PathBuf::from("/tmp/ledger/dollardollar.db"));
        assert_eq!(s.http_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_auth_block_parses() {
        let json = r#"{
            "data_dir": "/tmp/test",
            "auth": {
                "mode": "dev_auto_login",
                "dev_user": "dev@example.com",
                "api_tokens": {"abc123": "alice"},
                "demo_users": ["demo@example.com"]
            }
        }"#;
        let s: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(s.auth.mode, AuthModeSetting::DevAutoLogin);
        assert_eq!(s.auth.dev_user.as_deref(), Some("dev@example.com"));
        assert_eq!(s.auth.api_tokens.get("abc123").map(String::as_str), Some("alice"));
        assert_eq!(s.auth.demo_users, vec!["demo@example.com".to_string()]);
        assert!(!s.auth.demo_restricted.is_empty());
    }
}
