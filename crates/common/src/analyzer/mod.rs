//! Text analysis service abstraction
//!
//! Review annotation and recommendation text both come from a hosted
//! text-generation service. This module provides:
//! - `TextGenerator`: one prompt in, one string out (OpenAI chat, HuggingFace inference)
//! - `Analyzer`: typed analysis of a single dimension plus recommendation text
//! - `MockAnalyzer`: deterministic keyword heuristics for local runs and tests
//!
//! Calls are bounded by the configured timeout and never retried.

mod mock;
mod prompts;

pub use mock::MockAnalyzer;
pub use prompts::{parse_reply, recommendation_prompt, analysis_prompt};

use crate::config::AnalyzerConfig;
use crate::db::{RecommendationKey, RecommendationKind};
use crate::errors::{AppError, Result};
use crate::metrics;
use crate::vocabulary::{Dimension, DimensionValue};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Trait for prompt-to-text generation
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a reply for a single prompt
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Trait for review analysis
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Analyze exactly one dimension of a review text
    async fn analyze(&self, dimension: Dimension, text: &str) -> Result<DimensionValue>;

    /// Produce recommendation text for a (category, theme) key
    async fn recommend(&self, kind: RecommendationKind, key: &RecommendationKey) -> Result<String>;
}

fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AppError::Configuration {
            message: format!("Failed to create HTTP client: {}", e),
        })
}

/// Map a transport error, keeping timeouts distinct
fn transport_error(service: &str, timeout: Duration, e: reqwest::Error) -> AppError {
    if e.is_timeout() {
        AppError::UpstreamTimeout {
            service: service.to_string(),
            timeout_ms: timeout.as_millis() as u64,
        }
    } else {
        AppError::Analyzer {
            message: format!("{} request failed: {}", service, e),
        }
    }
}

async fn check_status(service: &str, response: reqwest::Response) -> Result<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(AppError::Analyzer {
        message: format!("{} API error {}: {}", service, status, body),
    })
}

/// OpenAI-compatible chat completion client
pub struct OpenAiGenerator {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    timeout: Duration,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

impl OpenAiGenerator {
    pub fn new(
        api_key: String,
        model: String,
        base_url: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            api_key,
            model,
            base_url: base_url.unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            timeout,
        })
    }
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage { role: "user", content: prompt }],
            temperature: 0.2,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error("openai", self.timeout, e))?;

        let result: ChatResponse = check_status("openai", response)
            .await?
            .json()
            .await
            .map_err(|e| AppError::Analyzer {
                message: format!("Failed to parse openai response: {}", e),
            })?;

        result
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::Analyzer {
                message: "openai returned no content".to_string(),
            })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// HuggingFace inference API client (text2text-generation)
pub struct HuggingFaceGenerator {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    timeout: Duration,
}

#[derive(Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
}

#[derive(Deserialize)]
struct Generated {
    generated_text: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum InferenceResponse {
    List(Vec<Generated>),
    Single(Generated),
}

impl HuggingFaceGenerator {
    pub fn new(
        api_key: String,
        model: String,
        base_url: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            api_key,
            model,
            base_url: base_url
                .unwrap_or_else(|| "https://api-inference.huggingface.co/models".to_string()),
            timeout,
        })
    }
}

#[async_trait]
impl TextGenerator for HuggingFaceGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), self.model);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&InferenceRequest { inputs: prompt })
            .send()
            .await
            .map_err(|e| transport_error("huggingface", self.timeout, e))?;

        let result: InferenceResponse = check_status("huggingface", response)
            .await?
            .json()
            .await
            .map_err(|e| AppError::Analyzer {
                message: format!("Failed to parse huggingface response: {}", e),
            })?;

        let text = match result {
            InferenceResponse::List(items) => items.into_iter().next().map(|g| g.generated_text),
            InferenceResponse::Single(g) => Some(g.generated_text),
        };

        text.map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::Analyzer {
                message: "huggingface returned no generated_text".to_string(),
            })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Analyzer backed by text generators
pub struct LlmAnalyzer {
    analysis: Arc<dyn TextGenerator>,
    recommendations: Arc<dyn TextGenerator>,
}

impl LlmAnalyzer {
    pub fn new(analysis: Arc<dyn TextGenerator>, recommendations: Arc<dyn TextGenerator>) -> Self {
        Self { analysis, recommendations }
    }
}

#[async_trait]
impl Analyzer for LlmAnalyzer {
    async fn analyze(&self, dimension: Dimension, text: &str) -> Result<DimensionValue> {
        let start = Instant::now();
        let prompt = analysis_prompt(dimension, text);

        let outcome = match self.analysis.generate(&prompt).await {
            Ok(reply) => parse_reply(dimension, &reply),
            Err(e) => Err(e),
        };

        metrics::record_analysis(
            start.elapsed().as_secs_f64(),
            dimension.as_str(),
            self.analysis.model_name(),
            outcome.is_ok(),
        );

        outcome
    }

    async fn recommend(&self, kind: RecommendationKind, key: &RecommendationKey) -> Result<String> {
        let prompt = recommendation_prompt(kind, key);
        self.recommendations.generate(&prompt).await
    }
}

fn create_generator(
    config: &AnalyzerConfig,
    model: String,
    timeout: Duration,
) -> Result<Arc<dyn TextGenerator>> {
    let api_key = || {
        config.api_key.clone().filter(|k| !k.is_empty()).ok_or_else(|| AppError::Configuration {
            message: format!("analyzer.api_key is required for provider '{}'", config.provider),
        })
    };

    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiGenerator::new(
            api_key()?,
            model,
            config.api_base.clone(),
            timeout,
        )?)),
        "huggingface" => Ok(Arc::new(HuggingFaceGenerator::new(
            api_key()?,
            model,
            config.api_base.clone(),
            timeout,
        )?)),
        other => Err(AppError::Configuration {
            message: format!("Unknown analyzer provider '{}'", other),
        }),
    }
}

/// Create an analyzer based on configuration
pub fn create_analyzer(config: &AnalyzerConfig) -> Result<Arc<dyn Analyzer>> {
    if config.provider == "mock" {
        tracing::warn!("Using mock analyzer, results are keyword heuristics");
        return Ok(Arc::new(MockAnalyzer::new()));
    }

    let timeout = Duration::from_secs(config.timeout_secs);
    let analysis = create_generator(config, config.model.clone(), timeout)?;
    let recommendations = match config.recommendation_model {
        Some(ref model) if model != &config.model => create_generator(config, model.clone(), timeout)?,
        _ => analysis.clone(),
    };

    tracing::info!(
        provider = %config.provider,
        model = %config.model,
        timeout_secs = config.timeout_secs,
        "Analyzer configured"
    );

    Ok(Arc::new(LlmAnalyzer::new(analysis, recommendations)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocabulary::{Priority, Sentiment};
    use std::sync::Mutex;

    /// Replays canned replies and records the prompts it saw
    struct Scripted {
        replies: Mutex<Vec<Result<String>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn new(replies: Vec<Result<String>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into_iter().rev().collect()),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl TextGenerator for Scripted {
        async fn generate(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.replies.lock().unwrap().pop().unwrap_or_else(|| {
                Err(AppError::Analyzer { message: "script exhausted".into() })
            })
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    #[tokio::test]
    async fn test_llm_analyzer_parses_legacy_labels() {
        let script = Scripted::new(vec![
            Ok("Негативный.".to_string()),
            Ok("Priority: Очень важный".to_string()),
        ]);
        let analyzer = LlmAnalyzer::new(script.clone(), script.clone());

        let sentiment = analyzer.analyze(Dimension::Sentiment, "Ужасная доставка").await.unwrap();
        assert_eq!(sentiment, DimensionValue::Sentiment(Sentiment::Negative));

        let priority = analyzer.analyze(Dimension::Priority, "Ужасная доставка").await.unwrap();
        assert_eq!(priority, DimensionValue::Priority(Priority::VeryImportant));

        let prompts = script.prompts.lock().unwrap();
        assert!(prompts[0].contains("Ужасная доставка"));
    }

    #[tokio::test]
    async fn test_unparseable_reply_is_an_error() {
        let script = Scripted::new(vec![Ok("I cannot tell".to_string())]);
        let analyzer = LlmAnalyzer::new(script.clone(), script);
        let err = analyzer.analyze(Dimension::Sentiment, "hmm").await.unwrap_err();
        assert!(matches!(err, AppError::Analyzer { .. }));
    }

    #[tokio::test]
    async fn test_generator_errors_pass_through() {
        let script = Scripted::new(vec![Err(AppError::UpstreamTimeout {
            service: "openai".into(),
            timeout_ms: 20_000,
        })]);
        let analyzer = LlmAnalyzer::new(script.clone(), script);
        let err = analyzer.analyze(Dimension::Theme, "text").await.unwrap_err();
        assert!(matches!(err, AppError::UpstreamTimeout { timeout_ms: 20_000, .. }));
    }

    #[test]
    fn test_factory_requires_key() {
        let config = AnalyzerConfig::default();
        assert!(matches!(create_analyzer(&config), Err(AppError::Configuration { .. })));

        let mock = AnalyzerConfig { provider: "mock".into(), ..AnalyzerConfig::default() };
        assert!(create_analyzer(&mock).is_ok());

        let unknown = AnalyzerConfig {
            provider: "carrier-pigeon".into(),
            api_key: Some("k".into()),
            ..AnalyzerConfig::default()
        };
        assert!(create_analyzer(&unknown).is_err());
    }
}
