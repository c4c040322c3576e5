// OpenAI content generator
// Text: chat completions, Image: images/generations, Audio: audio/speech
// API Reference: https://platform.openai.com/docs/api-reference

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::LLMConfig;
use crate::llm::provider::{ContentGenerator, GeneratedKind};
use crate::types::{AppError, AppResult};

pub struct OpenAIGenerator {
    client: Client,
    api_key: String,
    base_url: String,
    text_model: String,
    text_max_tokens: u32,
    image_model: String,
    audio_model: String,
    audio_voice: String,
}

// Request types
#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    n: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ImageRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    size: &'a str,
    quality: &'a str,
    n: u32,
    response_format: &'a str,
}

#[derive(Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    voice: &'a str,
    input: &'a str,
    response_format: &'a str,
}

// Response types
#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ImageResponse {
    data: Vec<ImageData>,
}

#[derive(Deserialize)]
struct ImageData {
    #[serde(default)]
    b64_json: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Deserialize)]
struct OpenAIErrorResponse {
    error: OpenAIError,
}

#[derive(Deserialize)]
struct OpenAIError {
    message: String,
    #[serde(default)]
    code: Option<String>,
}

impl OpenAIGenerator {
    pub fn new(config: &LLMConfig) -> Self {
        Self {
            client: Client::new(),
            api_key: config.openai_api_key.clone(),
            base_url: config.openai_base_url.trim_end_matches('/').to_string(),
            text_model: config.text_model.clone(),
            text_max_tokens: config.text_max_tokens,
            image_model: config.image_model.clone(),
            audio_model: config.audio_model.clone(),
            audio_voice: config.audio_voice.clone(),
        }
    }

    async fn post<T: Serialize>(&self, endpoint: &str, body: &T) -> AppResult<Response> {
        let url = format!("{}/{}", self.base_url, endpoint);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::LLMApi(format!("OpenAI request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();

            if let Ok(error_response) = serde_json::from_str::<OpenAIErrorResponse>(&error_text) {
                return Err(AppError::LLMApi(format!(
                    "OpenAI API error ({}): {} (code: {:?})",
                    status, error_response.error.message, error_response.error.code
                )));
            }

            return Err(AppError::LLMApi(format!(
                "OpenAI API error ({}): {}",
                status, error_text
            )));
        }

        Ok(response)
    }

    async fn create_text(&self, prompt: &str) -> AppResult<Vec<u8>> {
        let request = ChatRequest {
            model: &self.text_model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: self.text_max_tokens,
            n: 1,
        };

        let response: ChatResponse = self
            .post("chat/completions", &request)
            .await?
            .json()
            .await
            .map_err(|e| AppError::LLMApi(format!("Failed to parse chat response: {}", e)))?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();

        Ok(content.into_bytes())
    }

    async fn create_image(&self, prompt: &str) -> AppResult<Vec<u8>> {
        let request = ImageRequest {
            model: &self.image_model,
            prompt,
            size: "1024x1024",
            quality: "standard",
            n: 1,
            response_format: "b64_json",
        };

        let response: ImageResponse = self
            .post("images/generations", &request)
            .await?
            .json()
            .await
            .map_err(|e| AppError::LLMApi(format!("Failed to parse image response: {}", e)))?;

        let Some(image) = response.data.into_iter().next() else {
            return Ok(Vec::new());
        };

        match (image.b64_json, image.url) {
            (Some(encoded), _) => STANDARD
                .decode(encoded)
                .map_err(|e| AppError::LLMApi(format!("Invalid image payload: {}", e))),
            (None, Some(url)) => self.download(&url).await,
            (None, None) => Ok(Vec::new()),
        }
    }

    async fn create_audio(&self, prompt: &str) -> AppResult<Vec<u8>> {
        let request = SpeechRequest {
            model: &self.audio_model,
            voice: &self.audio_voice,
            input: prompt,
            response_format: "mp3",
        };

        let audio = self.post("audio/speech", &request).await?.bytes().await?;
        Ok(audio.to_vec())
    }

    async fn download(&self, url: &str) -> AppResult<Vec<u8>> {
        debug!(url, "Downloading generated image");
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl ContentGenerator for OpenAIGenerator {
    async fn generate(&self, prompt: &str, kind: GeneratedKind) -> AppResult<Vec<u8>> {
        info!(%kind, prompt_chars = prompt.len(), "Generating file content");

        let contents = match kind {
            GeneratedKind::Text => self.create_text(prompt).await?,
            GeneratedKind::Image => self.create_image(prompt).await?,
            GeneratedKind::Audio => self.create_audio(prompt).await?,
        };

        debug!(%kind, bytes = contents.len(), "Generated file content");
        Ok(contents)
    }
}
