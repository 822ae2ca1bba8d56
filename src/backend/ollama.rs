use anyhow::Result;
use reqwest::blocking::Client;
use serde_json::Value;

use super::{local_confidence, LOCAL_LABEL};
use crate::config::LocalModelConfig;
use crate::http;
use crate::models::Metadata;
use crate::traits::{AskContext, Attempt, SourceAdapter, SourceError};

/// Local generation through an Ollama server.
///
/// Sends `{model, prompt, stream: false}` to `{url}/api/generate` and reads
/// the `response` field. The URL honours `OLLAMA_HOST`.
pub struct OllamaBackend {
    client: Client,
    url: String,
    model: String,
}

impl OllamaBackend {
    pub fn new(config: &LocalModelConfig) -> Result<Self> {
        Ok(Self {
            client: http::client(config.timeout_secs)?,
            url: config.effective_url(),
            model: config.model.clone(),
        })
    }

    fn generate(&self, prompt: &str) -> Result<String, SourceError> {
        let body = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
        });
        let endpoint = format!("{}/api/generate", self.url.trim_end_matches('/'));
        let json = http::send_json(self.client.post(endpoint).json(&body))?;
        parse_generate_response(&json)
    }
}

/// Extract the reply text from an `/api/generate` response.
pub fn parse_generate_response(json: &Value) -> Result<String, SourceError> {
    if let Some(err) = json.get("error").and_then(Value::as_str) {
        return Err(SourceError::Parse(format!("ollama error: {}", err)));
    }
    json.get("response")
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .ok_or_else(|| SourceError::Parse("Invalid Ollama response: missing response".into()))
}

impl SourceAdapter for OllamaBackend {
    fn label(&self) -> &str {
        LOCAL_LABEL
    }

    fn description(&self) -> &str {
        "Local model via Ollama"
    }

    fn try_resolve(&self, query: &str, ctx: &AskContext) -> Attempt {
        if query.trim().is_empty() {
            return Attempt::Failed(SourceError::Config("empty prompt".into()));
        }
        let reply = match self.generate(&ctx.prompt_for(query)) {
            Ok(r) => r,
            Err(e) => return Attempt::Failed(e),
        };
        if reply.is_empty() {
            return Attempt::Failed(SourceError::Parse("empty response".into()));
        }
        let mut meta = Metadata::new();
        meta.insert("model".to_string(), self.model.clone().into());
        Attempt::answered(reply.clone(), local_confidence(&reply)).with_metadata(meta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_response_field() {
        let json = json!({"model": "llama3.2:3b", "response": "  Hello there.  ", "done": true});
        assert_eq!(parse_generate_response(&json).unwrap(), "Hello there.");
    }

    #[test]
    fn surfaces_server_error() {
        let json = json!({"error": "model 'x' not found"});
        let err = parse_generate_response(&json).unwrap_err();
        assert!(err.to_string().contains("model 'x' not found"));
    }

    #[test]
    fn empty_prompt_fails_without_network() {
        let backend = OllamaBackend::new(&LocalModelConfig {
            url: "http://127.0.0.1:9".into(),
            ..LocalModelConfig::default()
        })
        .unwrap();
        assert!(matches!(
            backend.try_resolve("   ", &AskContext::new()),
            Attempt::Failed(SourceError::Config(_))
        ));
    }
}
