use rig::OneOrMany;
use rig::completion::{CompletionModel, Message as RigMessage};
use rig::message::AssistantContent;
use rig::prelude::CompletionClient;
use rig::providers::gemini;
use snafu::{ResultExt, ensure};

use super::capability::{
    BoxFuture, CapabilityConfig, CapabilityResult, CompletionFailedSnafu, EmptyPromptSnafu,
    GenerateRequest, GenerationCapability, HttpClientSnafu,
};

pub const GEMINI_PROVIDER_ID: &str = "gemini";

/// Gemini-backed generation capability built on the rig provider stack.
///
/// Construction never validates the credential: a missing key is logged and
/// the failure surfaces on first use, when the per-call client is built.
pub struct GeminiCapability {
    config: CapabilityConfig,
}

impl GeminiCapability {
    pub fn new(config: CapabilityConfig) -> Self {
        if !config.has_api_key() {
            tracing::error!(
                provider_id = %config.provider_id,
                model_id = %config.model_id,
                "missing API key; generation will fail on first use"
            );
        }

        Self { config }
    }

    fn build_client(config: &CapabilityConfig) -> CapabilityResult<gemini::Client> {
        gemini::Client::builder()
            .api_key(config.api_key.as_str())
            .build()
            .context(HttpClientSnafu {
                stage: "build-client",
            })
    }

    async fn request_completion(
        config: &CapabilityConfig,
        request: &GenerateRequest,
    ) -> CapabilityResult<String> {
        let client = Self::build_client(config)?;
        let model = client.completion_model(config.model_id.clone());

        let mut builder = model
            .completion_request(RigMessage::user(request.text.clone()))
            .temperature(config.generation.temperature)
            .max_tokens(config.generation.max_output_tokens)
            // Nucleus-sampling knobs are Gemini generationConfig fields that the
            // builder has no first-class setters for.
            .additional_params(serde_json::json!({
                "topK": config.generation.top_k,
                "topP": config.generation.top_p,
            }));

        if let Some(preamble) = &request.preamble {
            builder = builder.preamble(preamble.clone());
        }

        let response = builder.send().await.context(CompletionFailedSnafu {
            stage: "send-completion",
        })?;

        Ok(extract_reply_text(response.choice))
    }
}

impl GenerationCapability for GeminiCapability {
    fn id(&self) -> &str {
        &self.config.provider_id
    }

    fn model_id(&self) -> &str {
        &self.config.model_id
    }

    fn generate<'a>(&'a self, request: GenerateRequest) -> BoxFuture<'a, CapabilityResult<String>> {
        Box::pin(async move {
            ensure!(
                !request.text.trim().is_empty(),
                EmptyPromptSnafu { stage: "generate" }
            );

            Self::request_completion(&self.config, &request).await
        })
    }
}

/// Flattens the reply to its text parts; tool calls and other non-text
/// content are dropped. An all-non-text reply therefore comes back empty,
/// which callers treat as a failed exchange.
fn extract_reply_text(choice: OneOrMany<AssistantContent>) -> String {
    choice
        .into_iter()
        .filter_map(|content| match content {
            AssistantContent::Text(text) => Some(text.text),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("")
}
