//! Backend settings: config file, then environment, then command-line flags.

use anyhow::Context;
use banana_ai::GeminiConfig;
use std::fs;
use std::path::Path;

/// Flag overrides applied last.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub model: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// Load a JSON config file. Missing fields take their defaults.
pub fn load_config_file(path: impl AsRef<Path>) -> anyhow::Result<GeminiConfig> {
    let path = path.as_ref();
    let data = fs::read_to_string(path)
        .with_context(|| format!("read config file: {}", path.display()))?;
    let config: GeminiConfig = serde_json::from_str(&data)
        .with_context(|| format!("parse config json: {}", path.display()))?;
    Ok(config)
}

pub fn resolve(config_file: Option<&Path>, overrides: &Overrides) -> anyhow::Result<GeminiConfig> {
    let mut config = match config_file {
        Some(path) => load_config_file(path)?,
        None => GeminiConfig::default(),
    };

    config.apply_env();

    if let Some(model) = &overrides.model {
        config.model = model.clone();
    }
    if let Some(secs) = overrides.timeout_secs {
        config.timeout_secs = secs;
    }

    tracing::debug!(config = ?config, "resolved backend settings");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_file_then_flags() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"api_key": "from-file", "model": "file-model", "timeout_secs": 45}}"#
        )
        .unwrap();

        let overrides = Overrides {
            model: Some("flag-model".into()),
            timeout_secs: None,
        };
        let config = resolve(Some(file.path()), &overrides).unwrap();

        assert_eq!(config.model, "flag-model");
        assert_eq!(config.timeout_secs, 45);
        assert!(!config.api_key.is_empty());
    }

    #[test]
    fn test_missing_file_names_the_path() {
        let err = load_config_file("/definitely/not/here.json").unwrap_err();
        assert!(format!("{err:#}").contains("/definitely/not/here.json"));
    }

    #[test]
    fn test_invalid_json_is_reported() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        let err = load_config_file(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("parse config json"));
    }
}
