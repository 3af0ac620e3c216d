use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{Feature, FeatureKind};
use crate::error::GenerationError;
use crate::llm::client::SamplingParams;
use crate::llm::prompts;
use crate::pipeline::extractor::{ExtractionChain, LabelledLines, Payload, Shape};
use crate::pipeline::normalizer::{is_substantive, item_text, require_payload, take_limited};

pub const TITLE_COUNT: usize = 6;
pub const BIO_COUNT: usize = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Title,
    Bio,
    #[default]
    Both,
}

impl ContentType {
    pub fn wants_titles(self) -> bool {
        matches!(self, ContentType::Title | ContentType::Both)
    }

    pub fn wants_bios(self) -> bool {
        matches!(self, ContentType::Bio | ContentType::Both)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TitleBioRequest {
    pub content_type: ContentType,
    pub niche: Option<String>,
    pub keywords: Option<String>,
    pub tone: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextItem {
    pub text: String,
    pub saved: bool,
    pub copied: bool,
}

impl TextItem {
    fn new(text: String) -> Self {
        Self {
            text,
            saved: false,
            copied: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TitlesAndBios {
    pub titles: Vec<TextItem>,
    pub bios: Vec<TextItem>,
}

pub struct TitleBio;

fn text_items(value: Option<&Value>, limit: usize, what: &str) -> Vec<TextItem> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    let kept: Vec<TextItem> = items
        .iter()
        .filter_map(|v| item_text(v, &["text", "title", "bio"]))
        .filter(|t| {
            let keep = is_substantive(t);
            if !keep {
                debug!("dropping {} fragment '{}'", what, t);
            }
            keep
        })
        .map(TextItem::new)
        .collect();
    take_limited(kept, limit, what)
}

impl Feature for TitleBio {
    const KIND: FeatureKind = FeatureKind::TitleBio;

    type Request = TitleBioRequest;
    type Output = TitlesAndBios;

    fn primary(request: &TitleBioRequest) -> &str {
        request.niche.as_deref().unwrap_or_default()
    }

    fn prompt(request: &TitleBioRequest) -> String {
        prompts::title_bio_prompt(
            request.content_type.wants_titles(),
            request.content_type.wants_bios(),
            Self::primary(request),
            request.tone.as_deref().unwrap_or_default(),
            request.keywords.as_deref().unwrap_or_default(),
            request.description.as_deref().unwrap_or_default(),
        )
    }

    fn sampling() -> SamplingParams {
        SamplingParams {
            temperature: 0.9,
            max_output_tokens: 2048,
            ..SamplingParams::default()
        }
    }

    fn shape() -> Shape {
        Shape::Object
    }

    fn extraction_chain() -> ExtractionChain {
        ExtractionChain::structural(Self::shape()).with(LabelledLines::titles_and_bios())
    }

    fn normalize(
        request: &TitleBioRequest,
        payload: Option<Payload>,
    ) -> Result<TitlesAndBios, GenerationError> {
        let content_type = request.content_type;
        let map = match require_payload(payload)? {
            Payload::Object(map) => map,
            // A bare list is unambiguous only when a single category was asked for
            Payload::Array(items) => match content_type {
                ContentType::Title => [("titles".to_string(), Value::Array(items))].into_iter().collect(),
                ContentType::Bio => [("bios".to_string(), Value::Array(items))].into_iter().collect(),
                ContentType::Both => {
                    return Err(GenerationError::Extraction(
                        "expected an object with titles and bios".to_string(),
                    ))
                }
            },
        };

        let mut result = TitlesAndBios::default();
        if content_type.wants_titles() {
            result.titles = text_items(map.get("titles"), TITLE_COUNT, "titles");
        }
        if content_type.wants_bios() {
            result.bios = text_items(map.get("bios"), BIO_COUNT, "bios");
        }

        if result.titles.is_empty() && result.bios.is_empty() {
            return Err(GenerationError::Extraction(
                "no usable titles or bios".to_string(),
            ));
        }
        Ok(result)
    }
}
