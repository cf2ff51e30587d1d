use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const CONFIG_FILE: &str = "palpite.json";
pub const API_URL_ENV: &str = "PALPITE_API_URL";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api_base_url: String,
    pub timeout_secs: u64,
    pub stale_after_hours: u64,
    pub default_window: u32,
    pub hot_count: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://loteriascaixa-api.herokuapp.com/api".to_string(),
            timeout_secs: 15,
            stale_after_hours: 12,
            default_window: 100,
            hot_count: 10,
        }
    }
}

/// Lê o arquivo se existir; a variável de ambiente tem prioridade sobre a URL.
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let mut config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Não foi possível ler {:?}", path))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Configuração inválida em {:?}", path))?
    } else {
        debug!("{:?} ausente, usando a configuração padrão", path);
        AppConfig::default()
    };

    if let Ok(url) = std::env::var(API_URL_ENV) {
        if !url.trim().is_empty() {
            config.api_base_url = url.trim().to_string();
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.timeout_secs, 15);
        assert_eq!(config.default_window, 100);
        assert_eq!(config.hot_count, 10);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("nada.json")).unwrap();
        assert_eq!(config.stale_after_hours, 12);
    }

    #[test]
    fn test_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"hot_count": 6, "timeout_secs": 3}}"#).unwrap();
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.hot_count, 6);
        assert_eq!(config.timeout_secs, 3);
        assert_eq!(config.default_window, 100);
    }

    #[test]
    fn test_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ nao e json").unwrap();
        assert!(load_config(file.path()).is_err());
    }
}
