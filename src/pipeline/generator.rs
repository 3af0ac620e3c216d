use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info};

use super::extractor::Payload;
use crate::error::GenerationError;
use crate::features::{
    ContentIdeas, Feature, FeatureKind, HashtagSet, NicheSearch, TitleBio, TrendAnalysis,
};
use crate::llm::client::LlmClient;
use crate::util::preview;

const RAW_PREVIEW_CHARS: usize = 2000;

/// Runs one feature end to end against a completion oracle. Stateless apart
/// from the shared client, so one instance serves concurrent requests.
#[derive(Clone)]
pub struct Generator {
    client: Arc<dyn LlmClient>,
}

impl Generator {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }

    pub async fn generate<F: Feature>(
        &self,
        request: &F::Request,
    ) -> Result<F::Output, GenerationError> {
        let kind = F::KIND;
        let primary = F::validate(request)?;
        info!("{}: generating for '{}'", kind, preview(primary, 80));

        let prompt = F::prompt(request);
        debug!("{} prompt:\n{}", kind, prompt);

        let raw = self.client.complete(&prompt, &F::sampling()).await?;
        debug!("{}: oracle returned {} chars", kind, raw.chars().count());

        let payload = F::extraction_chain().extract(&raw);
        F::normalize(request, payload).map_err(|e| {
            error!(
                "{}: {}; raw oracle text: {}",
                kind,
                e,
                preview(&raw, RAW_PREVIEW_CHARS)
            );
            e
        })
    }

    /// Pure half of the pipeline: extraction and normalization of a raw completion.
    pub fn process<F: Feature>(
        request: &F::Request,
        raw: &str,
    ) -> Result<F::Output, GenerationError> {
        let payload: Option<Payload> = F::extraction_chain().extract(raw);
        F::normalize(request, payload)
    }

    /// Untyped entry point: deserializes `body` into the feature's request and
    /// returns the serialized result.
    pub async fn generate_json(
        &self,
        kind: FeatureKind,
        body: Value,
    ) -> Result<Value, GenerationError> {
        match kind {
            FeatureKind::NicheSearch => self.generate_value::<NicheSearch>(body).await,
            FeatureKind::TrendAnalysis => self.generate_value::<TrendAnalysis>(body).await,
            FeatureKind::HashtagSet => self.generate_value::<HashtagSet>(body).await,
            FeatureKind::ContentIdea => self.generate_value::<ContentIdeas>(body).await,
            FeatureKind::TitleBio => self.generate_value::<TitleBio>(body).await,
        }
    }

    async fn generate_value<F: Feature>(&self, body: Value) -> Result<Value, GenerationError> {
        let request: F::Request = serde_json::from_value(body)
            .map_err(|e| GenerationError::Validation(format!("Invalid request body: {}", e)))?;
        let output = self.generate::<F>(&request).await?;
        serde_json::to_value(output)
            .map_err(|e| GenerationError::Extraction(format!("failed to serialize result: {}", e)))
    }
}
