use tracing::debug;

use super::ChatError;

pub const DEFAULT_API_BASE: &str = "https://maas-api.cn-huabei-1.xf-yun.com/v1";
const DEFAULT_MODEL_ID: &str = "xop3qwen14b";
const DEFAULT_LORA_RESOURCE_ID: &str = "1922568028878811136";

pub const DEFAULT_PRESET: &str = "KU1.0";

/// (preset name, model id variable, adapter id variable)
const PRESET_ENV: &[(&str, &str, &str)] = &[
    ("KU1.0", "KU1_MODEL_ID", "KU1_LORA_RESOURCE_ID"),
    ("KU5.0", "KU5_MODEL_ID", "KU5_LORA_RESOURCE_ID"),
];

/// A selectable fine-tuned model: base model plus LoRA adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelPreset {
    pub name: String,
    pub model_id: String,
    pub lora_resource_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    pub api_key: String,
    pub api_base: String,
    pub presets: Vec<ModelPreset>,
}

impl ChatConfig {
    /// Read configuration from the environment, loading `.env` first if present.
    pub fn from_env() -> Result<Self, ChatError> {
        match dotenvy::dotenv() {
            Ok(path) => debug!(path = %path.display(), "loaded .env"),
            Err(e) if e.not_found() => {}
            Err(e) => debug!("ignoring unreadable .env: {}", e),
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ChatError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = get("MASS_API_KEY").ok_or(ChatError::MissingApiKey)?;
        let api_base = get("MASS_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        let presets = PRESET_ENV
            .iter()
            .map(|(name, model_var, lora_var)| ModelPreset {
                name: name.to_string(),
                model_id: get(model_var).unwrap_or_else(|| DEFAULT_MODEL_ID.to_string()),
                lora_resource_id: get(lora_var)
                    .unwrap_or_else(|| DEFAULT_LORA_RESOURCE_ID.to_string()),
            })
            .collect();

        Ok(Self {
            api_key,
            api_base,
            presets,
        })
    }

    pub fn preset(&self, name: &str) -> Result<&ModelPreset, ChatError> {
        self.presets
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| ChatError::UnknownPreset(name.to_string()))
    }

    pub fn preset_names(&self) -> Vec<&str> {
        self.presets.iter().map(|p| p.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_missing_api_key_is_fatal() {
        let err = ChatConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ChatError::MissingApiKey));

        let err = ChatConfig::from_lookup(lookup(&[("MASS_API_KEY", "  ")])).unwrap_err();
        assert!(matches!(err, ChatError::MissingApiKey));
    }

    #[test]
    fn test_defaults() {
        let config = ChatConfig::from_lookup(lookup(&[("MASS_API_KEY", "k")])).unwrap();
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.preset_names(), vec!["KU1.0", "KU5.0"]);
        let preset = config.preset(DEFAULT_PRESET).unwrap();
        assert_eq!(preset.model_id, "xop3qwen14b");
        assert_eq!(preset.lora_resource_id, "1922568028878811136");
    }

    #[test]
    fn test_overrides_and_unknown_preset() {
        let config = ChatConfig::from_lookup(lookup(&[
            ("MASS_API_KEY", "k"),
            ("MASS_API_BASE", "http://localhost:9000/v1"),
            ("KU5_MODEL_ID", "qwen-big"),
            ("KU5_LORA_RESOURCE_ID", "42"),
        ]))
        .unwrap();
        assert_eq!(config.api_base, "http://localhost:9000/v1");
        let preset = config.preset("KU5.0").unwrap();
        assert_eq!(preset.model_id, "qwen-big");
        assert_eq!(preset.lora_resource_id, "42");
        assert!(matches!(
            config.preset("KU9.0"),
            Err(ChatError::UnknownPreset(name)) if name == "KU9.0"
        ));
    }
}
