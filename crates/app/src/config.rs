//! Settings and history persistence under the user's config directory.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use shared::historico::MessageHistory;
use shared::settings::AppSettings;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

fn config_dir() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("br", "zelador", "zelador")
        .context("could not resolve a config directory")?;
    Ok(dirs.config_dir().to_path_buf())
}

pub fn settings_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("settings.json"))
}

pub fn history_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("history.json"))
}

/// Load settings, creating the default file on first run.
pub fn load_settings() -> Result<AppSettings> {
    let path = settings_path()?;
    match read_settings(&path) {
        Ok(settings) => Ok(settings),
        Err(e) => {
            warn!(error = %e, "settings unreadable, writing defaults");
            let settings = AppSettings::default();
            write_settings(&path, &settings)?;
            Ok(settings)
        }
    }
}

pub fn save_settings(settings: &AppSettings) -> Result<()> {
    write_settings(&settings_path()?, settings)
}

pub fn load_history() -> MessageHistory {
    match history_path().and_then(|path| read_history(&path)) {
        Ok(history) => history,
        Err(_) => MessageHistory::new(),
    }
}

pub fn save_history(history: &MessageHistory) -> Result<()> {
    let path = history_path()?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, history.to_json()?)?;
    Ok(())
}

fn read_settings(path: &Path) -> Result<AppSettings> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

fn write_settings(path: &Path, settings: &AppSettings) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(settings)?)?;
    info!(path = %path.display(), "settings saved");
    Ok(())
}

fn read_history(path: &Path) -> Result<MessageHistory> {
    let raw = fs::read_to_string(path)?;
    Ok(MessageHistory::from_json(&raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let mut settings = AppSettings::default();
        settings.backend_url = "http://example.test".into();
        write_settings(&path, &settings).unwrap();

        let restored = read_settings(&path).unwrap();
        assert_eq!(restored.backend_url, "http://example.test");
        assert_eq!(restored.user_id, settings.user_id);
    }

    #[test]
    fn test_read_settings_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_settings(&dir.path().join("nada.json")).is_err());
    }

    #[test]
    fn test_history_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");

        let mut history = MessageHistory::new();
        history.record("asst_1", "Residencial Aurora", "olá", true);
        fs::write(&path, history.to_json().unwrap()).unwrap();

        let restored = read_history(&path).unwrap();
        assert_eq!(restored.messages_for("asst_1").len(), 1);
    }
}
