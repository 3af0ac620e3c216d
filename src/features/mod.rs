//! The five generation features. Each one owns its request type, prompt,
//! sampling knobs, expected payload shape and normalizer.

pub mod hashtags;
pub mod ideas;
pub mod niches;
pub mod title_bio;
pub mod trends;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::GenerationError;
use crate::llm::client::SamplingParams;
use crate::pipeline::extractor::{Elements, ExtractionChain, Payload, Shape};

pub use hashtags::HashtagSet;
pub use ideas::ContentIdeas;
pub use niches::NicheSearch;
pub use title_bio::TitleBio;
pub use trends::TrendAnalysis;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum FeatureKind {
    NicheSearch,
    TrendAnalysis,
    HashtagSet,
    ContentIdea,
    TitleBio,
}

impl FeatureKind {
    pub const ALL: [FeatureKind; 5] = [
        FeatureKind::NicheSearch,
        FeatureKind::TrendAnalysis,
        FeatureKind::HashtagSet,
        FeatureKind::ContentIdea,
        FeatureKind::TitleBio,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureKind::NicheSearch => "niche-search",
            FeatureKind::TrendAnalysis => "trend-analysis",
            FeatureKind::HashtagSet => "hashtag-set",
            FeatureKind::ContentIdea => "content-idea",
            FeatureKind::TitleBio => "title-bio",
        }
    }

    /// HTTP route the feature is served on.
    pub fn route(&self) -> &'static str {
        match self {
            FeatureKind::NicheSearch => "/generate-niches",
            FeatureKind::TrendAnalysis => "/analyze-trend",
            FeatureKind::HashtagSet => "/generate-hashtags",
            FeatureKind::ContentIdea => "/generate-content-ideas",
            FeatureKind::TitleBio => "/generate-titles-bios",
        }
    }

    pub fn required_message(&self) -> &'static str {
        match self {
            FeatureKind::NicheSearch => "Topic is required",
            FeatureKind::TrendAnalysis => "Search term is required",
            FeatureKind::HashtagSet => "Keyword is required",
            FeatureKind::ContentIdea | FeatureKind::TitleBio => "Niche is required",
        }
    }

    pub fn upstream_message(&self) -> &'static str {
        match self {
            FeatureKind::NicheSearch => "Failed to generate niches",
            FeatureKind::TrendAnalysis => "Failed to analyze trend",
            FeatureKind::HashtagSet => "Failed to generate hashtags",
            FeatureKind::ContentIdea => "Failed to generate content ideas",
            FeatureKind::TitleBio => "Failed to generate content",
        }
    }

    pub fn extraction_message(&self) -> &'static str {
        match self {
            FeatureKind::NicheSearch => "Failed to parse niches data",
            FeatureKind::TrendAnalysis => "Failed to parse trend analysis data",
            FeatureKind::HashtagSet => "Failed to parse hashtags data",
            FeatureKind::ContentIdea => "Failed to parse content ideas data",
            FeatureKind::TitleBio => "Failed to parse titles and bios data",
        }
    }
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One request/response cycle: validate, prompt, complete, extract, normalize.
/// Everything except the oracle call is pure.
pub trait Feature: Send + Sync + 'static {
    const KIND: FeatureKind;

    type Request: DeserializeOwned + Send + Sync + 'static;
    type Output: Serialize + Send + 'static;

    /// The required input field, untrimmed.
    fn primary(request: &Self::Request) -> &str;

    /// Returns the trimmed primary field, or a validation error when it is blank.
    fn validate(request: &Self::Request) -> Result<&str, GenerationError> {
        let primary = Self::primary(request).trim();
        if primary.is_empty() {
            Err(GenerationError::Validation(
                Self::KIND.required_message().to_string(),
            ))
        } else {
            Ok(primary)
        }
    }

    fn prompt(request: &Self::Request) -> String;

    fn sampling() -> SamplingParams;

    fn shape() -> Shape;

    /// Element kind a bare array span must start with.
    fn elements() -> Elements {
        Elements::Any
    }

    /// Structural tiers for [`Feature::shape`]; features with a heuristic tier append it.
    fn extraction_chain() -> ExtractionChain {
        ExtractionChain::structural_of(Self::shape(), Self::elements())
    }

    fn normalize(
        request: &Self::Request,
        payload: Option<Payload>,
    ) -> Result<Self::Output, GenerationError>;
}
