use anyhow::Result;
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub llm: LLMConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub provider: String,
    pub s3_bucket_name: String,
    pub s3_region: String,
    pub s3_access_key_id: Option<String>,
    pub s3_secret_access_key: Option<String>,
    pub s3_endpoint: Option<String>,
}

#[derive(Clone, Deserialize)]
pub struct LLMConfig {
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub text_model: String,
    pub text_max_tokens: u32,
    pub image_model: String,
    pub audio_model: String,
    pub audio_voice: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
            cors_allowed_origins: vec!["*".to_string()],
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            provider: "memory".to_string(),
            s3_bucket_name: String::new(),
            s3_region: "us-east-1".to_string(),
            s3_access_key_id: None,
            s3_secret_access_key: None,
            s3_endpoint: None,
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            openai_api_key: String::new(),
            openai_base_url: "https://api.openai.com/v1".to_string(),
            text_model: "gpt-3.5-turbo".to_string(),
            text_max_tokens: 100,
            image_model: "dall-e-3".to_string(),
            audio_model: "tts-1".to_string(),
            audio_voice: "echo".to_string(),
        }
    }
}

// Keep the API key out of logs
impl std::fmt::Debug for LLMConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LLMConfig")
            .field("openai_api_key", &if self.openai_api_key.is_empty() { "<unset>" } else { "<redacted>" })
            .field("openai_base_url", &self.openai_base_url)
            .field("text_model", &self.text_model)
            .field("text_max_tokens", &self.text_max_tokens)
            .field("image_model", &self.image_model)
            .field("audio_model", &self.audio_model)
            .field("audio_voice", &self.audio_voice)
            .finish()
    }
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let llm_defaults = LLMConfig::default();

        let config = Self {
            server: ServerConfig {
                port: var_or("PORT", "3000").parse()?,
                host: var_or("HOST", "0.0.0.0"),
                cors_allowed_origins: var_or("ALLOWED_ORIGINS", "*")
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            },
            storage: StorageConfig {
                provider: var_or("STORAGE_PROVIDER", "s3"),
                s3_bucket_name: env::var("S3_BUCKET_NAME").unwrap_or_default(),
                s3_region: var_or("S3_REGION", "us-east-1"),
                s3_access_key_id: env::var("AWS_ACCESS_KEY_ID").ok(),
                s3_secret_access_key: env::var("AWS_SECRET_ACCESS_KEY").ok(),
                s3_endpoint: env::var("S3_ENDPOINT").ok(),
            },
            llm: LLMConfig {
                openai_api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
                openai_base_url: var_or("OPENAI_BASE_URL", &llm_defaults.openai_base_url),
                text_model: var_or("OPENAI_TEXT_MODEL", &llm_defaults.text_model),
                text_max_tokens: match env::var("OPENAI_TEXT_MAX_TOKENS") {
                    Ok(value) => value.parse()?,
                    Err(_) => llm_defaults.text_max_tokens,
                },
                image_model: var_or("OPENAI_IMAGE_MODEL", &llm_defaults.image_model),
                audio_model: var_or("OPENAI_AUDIO_MODEL", &llm_defaults.audio_model),
                audio_voice: var_or("OPENAI_AUDIO_VOICE", &llm_defaults.audio_voice),
            },
        };

        if config.storage.provider == "s3" && config.storage.s3_bucket_name.is_empty() {
            anyhow::bail!("S3_BUCKET_NAME must be set when STORAGE_PROVIDER=s3");
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_openai_models() {
        let llm = LLMConfig::default();
        assert_eq!(llm.text_model, "gpt-3.5-turbo");
        assert_eq!(llm.image_model, "dall-e-3");
        assert_eq!(llm.audio_model, "tts-1");
        assert_eq!(llm.text_max_tokens, 100);
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let llm = LLMConfig {
            openai_api_key: "sk-secret".to_string(),
            ..LLMConfig::default()
        };
        let printed = format!("{:?}", llm);
        assert!(!printed.contains("sk-secret"));
        assert!(printed.contains("<redacted>"));
    }
}
