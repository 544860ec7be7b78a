use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use super::TextGenerator;
use crate::error::AiError;

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f64,
}

#[derive(Deserialize)]
struct ChatCompletion {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

/// Client d'un service de complétion compatible OpenAI (`POST {endpoint}` avec `messages`).
#[derive(Debug, Clone)]
pub struct HttpTextGenerator {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
    temperature: f64,
}

impl HttpTextGenerator {
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        temperature: f64,
    ) -> Result<Self, AiError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(AiError::NotConfigured);
        }
        let client = Client::builder()
            .build()
            .map_err(|e| AiError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            model: model.into(),
            api_key,
            temperature,
        })
    }
}

impl TextGenerator for HttpTextGenerator {
    fn generate_text(&self, prompt: &str, timeout: Duration) -> Result<String, AiError> {
        let request = ChatRequest {
            model: &self.model,
            messages: [ChatMessage { role: "user", content: prompt }],
            temperature: self.temperature,
        };

        tracing::debug!(endpoint = %self.endpoint, model = %self.model, ?timeout, "appel du service de génération");
        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .timeout(timeout)
            .json(&request)
            .send()
            .map_err(|e| AiError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(AiError::Transport(format!("HTTP {status}: {body}")));
        }

        let completion: ChatCompletion = resp
            .json()
            .map_err(|e| AiError::Transport(format!("réponse illisible : {e}")))?;
        completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| AiError::Transport("réponse sans contenu".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_is_not_configured() {
        let err = HttpTextGenerator::new("http://localhost/v1/chat/completions", "m", "  ", 0.8).unwrap_err();
        assert!(matches!(err, AiError::NotConfigured));
    }

    #[test]
    fn test_completion_deserialization() {
        let json = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"平码：1,2,3,4,5,6 特码：7"}}]}"#;
        let completion: ChatCompletion = serde_json::from_str(json).unwrap();
        assert_eq!(completion.choices.len(), 1);
        assert!(completion.choices[0].message.content.contains("特码"));
    }

    #[test]
    fn test_request_serialization() {
        let request = ChatRequest {
            model: "m",
            messages: [ChatMessage { role: "user", content: "bonjour" }],
            temperature: 0.8,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["messages"][0]["content"], "bonjour");
        assert_eq!(value["temperature"], 0.8);
    }
}
