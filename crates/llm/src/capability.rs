use std::future::Future;
use std::pin::Pin;

use snafu::Snafu;

/// Model used when the configuration does not name one.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-pro";

/// Fixed sampling parameters sent with every request.
///
/// The defaults are the widget's published generation behavior; callers that
/// need different values build the struct explicitly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationConfig {
    pub max_output_tokens: u64,
    pub temperature: f64,
    pub top_k: u32,
    pub top_p: f64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_output_tokens: 1000,
            temperature: 0.7,
            top_k: 40,
            top_p: 0.95,
        }
    }
}

/// Connection settings for one generation backend.
#[derive(Debug, Clone, PartialEq)]
pub struct CapabilityConfig {
    pub provider_id: String,
    pub api_key: String,
    pub model_id: String,
    pub generation: GenerationConfig,
}

impl CapabilityConfig {
    pub fn new(
        provider_id: impl Into<String>,
        api_key: impl Into<String>,
        model_id: impl Into<String>,
    ) -> Self {
        let model_id = model_id.into().trim().to_string();

        Self {
            provider_id: provider_id.into().trim().to_string(),
            api_key: api_key.into().trim().to_string(),
            model_id: if model_id.is_empty() {
                DEFAULT_GEMINI_MODEL.to_string()
            } else {
                model_id
            },
            generation: GenerationConfig::default(),
        }
    }

    pub fn with_generation(mut self, generation: GenerationConfig) -> Self {
        self.generation = generation;
        self
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.is_empty()
    }
}

/// One outbound generation call: an optional instruction plus the prompt text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateRequest {
    pub preamble: Option<String>,
    pub text: String,
}

impl GenerateRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            preamble: None,
            text: text.into(),
        }
    }

    pub fn with_preamble(mut self, preamble: impl Into<String>) -> Self {
        self.preamble = Some(preamble.into());
        self
    }
}

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
pub type CapabilityResult<T> = Result<T, CapabilityError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CapabilityError {
    #[snafu(display("generate request on `{stage}` has no prompt text"))]
    EmptyPrompt { stage: &'static str },
    #[snafu(display("provider '{provider_id}' is not supported"))]
    UnsupportedProvider {
        stage: &'static str,
        provider_id: String,
    },
    #[snafu(display("http client failed on `{stage}`, {source}"))]
    HttpClient {
        stage: &'static str,
        source: rig::http_client::Error,
    },
    #[snafu(display("completion failed on `{stage}`, {source}"))]
    CompletionFailed {
        stage: &'static str,
        source: rig::completion::CompletionError,
    },
    #[snafu(display("generation task failed on `{stage}`: {message}"))]
    Runtime {
        stage: &'static str,
        message: String,
    },
}

impl CapabilityError {
    /// Wraps an out-of-band runtime failure (for example a cancelled or
    /// panicked worker task) so callers see one error type at the seam.
    pub fn runtime(stage: &'static str, message: impl Into<String>) -> Self {
        Self::Runtime {
            stage,
            message: message.into(),
        }
    }
}

/// A text-generation backend: one prompt in, one finished reply out.
///
/// Single-shot by contract. No streaming, no cancellation and no timeout;
/// transport-level limits belong to the implementation behind this trait.
pub trait GenerationCapability: Send + Sync {
    fn id(&self) -> &str;
    fn model_id(&self) -> &str;
    fn generate<'a>(&'a self, request: GenerateRequest) -> BoxFuture<'a, CapabilityResult<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_defaults_match_published_parameters() {
        let generation = GenerationConfig::default();

        assert_eq!(generation.max_output_tokens, 1000);
        assert_eq!(generation.temperature, 0.7);
        assert_eq!(generation.top_k, 40);
        assert_eq!(generation.top_p, 0.95);
    }

    #[test]
    fn config_trims_fields_and_fills_default_model() {
        let config = CapabilityConfig::new(" gemini ", "  secret  ", "   ");

        assert_eq!(config.provider_id, "gemini");
        assert_eq!(config.api_key, "secret");
        assert_eq!(config.model_id, DEFAULT_GEMINI_MODEL);
        assert!(config.has_api_key());
    }

    #[test]
    fn config_without_key_reports_missing_credential() {
        let config = CapabilityConfig::new("gemini", "   ", "gemini-1.5-pro");

        assert!(!config.has_api_key());
    }

    #[test]
    fn request_builder_carries_optional_preamble() {
        let bare = GenerateRequest::new("hello");
        assert_eq!(bare.preamble, None);
        assert_eq!(bare.text, "hello");

        let instructed = GenerateRequest::new("hello").with_preamble("be brief");
        assert_eq!(instructed.preamble.as_deref(), Some("be brief"));
    }
}
