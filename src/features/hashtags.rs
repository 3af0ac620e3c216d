use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Feature, FeatureKind};
use crate::error::GenerationError;
use crate::llm::client::SamplingParams;
use crate::llm::prompts;
use crate::pipeline::extractor::{Elements, ExtractionChain, HashtagTokens, Payload, Shape};
use crate::pipeline::normalizer::{
    expect_list, hashtag, is_substantive, item_text, require_payload, take_limited,
};

pub const HASHTAG_COUNT: usize = 15;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HashtagRequest {
    pub keyword: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hashtags {
    pub hashtags: Vec<String>,
}

pub struct HashtagSet;

impl Feature for HashtagSet {
    const KIND: FeatureKind = FeatureKind::HashtagSet;

    type Request = HashtagRequest;
    type Output = Hashtags;

    fn primary(request: &HashtagRequest) -> &str {
        request.keyword.as_deref().unwrap_or_default()
    }

    fn prompt(request: &HashtagRequest) -> String {
        prompts::hashtag_prompt(Self::primary(request).trim())
    }

    fn sampling() -> SamplingParams {
        SamplingParams {
            max_output_tokens: 1024,
            ..SamplingParams::default()
        }
    }

    fn shape() -> Shape {
        Shape::Array
    }

    fn elements() -> Elements {
        Elements::Strings
    }

    fn extraction_chain() -> ExtractionChain {
        ExtractionChain::structural_of(Self::shape(), Self::elements()).with(HashtagTokens)
    }

    fn normalize(
        _request: &HashtagRequest,
        payload: Option<Payload>,
    ) -> Result<Hashtags, GenerationError> {
        let items = expect_list(require_payload(payload)?, &["hashtags", "tags"])?;

        let mut hashtags: Vec<String> = Vec::new();
        for item in &items {
            let Some(text) = item_text(item, &["hashtag", "tag", "text"]) else {
                continue;
            };
            let Some(tag) = hashtag(&text) else {
                continue;
            };
            // Length counts the leading '#', so "#fyp" survives and "#ok" does not
            if !is_substantive(&tag) {
                debug!("dropping hashtag '{}'", text);
                continue;
            }
            if !hashtags.contains(&tag) {
                hashtags.push(tag);
            }
        }

        if hashtags.is_empty() {
            return Err(GenerationError::Extraction("no usable hashtags".to_string()));
        }
        Ok(Hashtags {
            hashtags: take_limited(hashtags, HASHTAG_COUNT, "hashtags"),
        })
    }
}
