use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use marksix_engine::accuracy::DEFAULT_ACCURACY_LIMIT;
use marksix_engine::ai::clamp_timeout;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub database: PathBuf,
    pub accuracy_limit: u32,
    pub ai: AiSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: marksix_db::db::db_path(),
            accuracy_limit: DEFAULT_ACCURACY_LIMIT,
            ai: AiSettings::default(),
        }
    }
}

/// Service de complétion compatible OpenAI utilisé par la stratégie `ai`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AiSettings {
    pub endpoint: String,
    pub model: String,
    pub api_key: String,
    pub timeout_secs: u64,
    pub temperature: f64,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: String::new(),
            timeout_secs: 60,
            temperature: 0.8,
        }
    }
}

impl AiSettings {
    pub fn timeout(&self) -> Duration {
        clamp_timeout(self.timeout_secs)
    }
}

/// Fichier TOML optionnel, surchargé par les variables `MARKSIX__*` (ex. `MARKSIX__AI__API_KEY`).
pub fn load(path: &Path) -> Result<Settings> {
    let raw = config::Config::builder()
        .add_source(config::File::from(path).required(false))
        .add_source(
            config::Environment::with_prefix("MARKSIX")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()
        .with_context(|| format!("Impossible de lire la configuration {:?}", path))?;

    raw.try_deserialize()
        .context("Configuration invalide")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_gives_defaults() {
        let settings = load(Path::new("/nonexistent/marksix.toml")).unwrap();
        assert_eq!(settings.accuracy_limit, 200);
        assert_eq!(settings.ai.timeout(), Duration::from_secs(60));
        assert_eq!(settings.ai.temperature, 0.8);
    }

    #[test]
    fn test_file_overrides_and_timeout_is_clamped() {
        let path = std::env::temp_dir().join(format!("marksix-settings-{}.toml", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "database = \"/tmp/x.db\"\naccuracy_limit = 50\n[ai]\ntimeout_secs = 5\nmodel = \"local\"").unwrap();
        drop(file);

        let settings = load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(settings.database, PathBuf::from("/tmp/x.db"));
        assert_eq!(settings.accuracy_limit, 50);
        assert_eq!(settings.ai.model, "local");
        assert_eq!(settings.ai.timeout(), Duration::from_secs(30));
        assert!(settings.ai.api_key.is_empty());
    }
}
