//! Application configuration.
//!
//! Read from `palavras.json` in the platform data directory. Every field has a
//! default, so the file is optional and may be partial. `PALAVRAS_DB` and
//! `PALAVRAS_LEARNER` override the file.

use crate::error::{AppError, Result};
use crate::models::grade::default_allowed_grades;
use crate::models::{LearnerId, SessionMode};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "palavras.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    pub database_path: PathBuf,
    /// Learner whose cards are shown. Sign-in is handled elsewhere.
    pub learner_id: LearnerId,
    /// Qualities offered on the review screen, out of 0-5.
    pub allowed_grades: Vec<u8>,
    pub default_mode: SessionMode,
    /// Used when `RUST_LOG` is not set.
    pub log_filter: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: data_dir().join("palavras.sqlite3"),
            learner_id: 1,
            allowed_grades: default_allowed_grades(),
            default_mode: SessionMode::Due,
            log_filter: "info".to_string(),
        }
    }
}

pub fn data_dir() -> PathBuf {
    let mut path = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("palavras");
    path
}

impl AppConfig {
    /// Loads the config file from the data directory and applies env overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::from_file(&data_dir().join(CONFIG_FILE))?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Missing file means defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn apply_overrides<F>(&mut self, var: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(db) = var("PALAVRAS_DB") {
            self.database_path = PathBuf::from(db);
        }
        if let Some(learner) = var("PALAVRAS_LEARNER") {
            self.learner_id = learner.parse().map_err(|_| {
                AppError::Config(format!("PALAVRAS_LEARNER is not a number: {learner}"))
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.allowed_grades.is_empty() {
            return Err(AppError::Config("allowedGrades must not be empty".to_string()));
        }
        if let Some(grade) = self.allowed_grades.iter().find(|&&g| g > 5) {
            return Err(AppError::Config(format!("grade {grade} is outside 0-5")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = AppConfig::from_file(&dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.allowed_grades, vec![0, 1, 3, 5]);
    }

    #[test]
    fn test_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(
            &path,
            r#"{ "learnerId": 7, "allowedGrades": [0, 2, 4, 5], "defaultMode": "all" }"#,
        )
        .unwrap();

        let config = AppConfig::from_file(&path).unwrap();
        assert_eq!(config.learner_id, 7);
        assert_eq!(config.allowed_grades, vec![0, 2, 4, 5]);
        assert_eq!(config.default_mode, SessionMode::All);
        assert_eq!(config.log_filter, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        config
            .apply_overrides(|key| match key {
                "PALAVRAS_DB" => Some("/tmp/other.sqlite3".to_string()),
                "PALAVRAS_LEARNER" => Some("42".to_string()),
                _ => None,
            })
            .unwrap();

        assert_eq!(config.database_path, PathBuf::from("/tmp/other.sqlite3"));
        assert_eq!(config.learner_id, 42);

        let bad =
            config.apply_overrides(|key| (key == "PALAVRAS_LEARNER").then(|| "ana".to_string()));
        assert!(matches!(bad, Err(AppError::Config(_))));
    }

    #[test]
    fn test_validate_grades() {
        let mut config = AppConfig::default();
        config.allowed_grades = vec![0, 6];
        assert!(matches!(config.validate(), Err(AppError::Config(_))));

        config.allowed_grades.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(AppConfig::from_file(&path), Err(AppError::Json(_))));
    }
}
