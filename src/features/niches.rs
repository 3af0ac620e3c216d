use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{Feature, FeatureKind};
use crate::error::GenerationError;
use crate::llm::client::SamplingParams;
use crate::llm::prompts;
use crate::pipeline::extractor::{Elements, Payload, Shape};
use crate::pipeline::normalizer::{
    coerce_object, expect_list, is_substantive, number_value, require_payload, string_list,
    take_limited, text_field,
};

pub const NICHE_COUNT: usize = 5;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NicheRequest {
    pub topic: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Niche {
    pub niche: String,
    pub description: String,
    pub trendiness_score: u8,
    pub tags: Vec<String>,
    pub saved: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NicheResults {
    pub results: Vec<Niche>,
}

pub struct NicheSearch;

/// Rounded and clamped to 0..=100; anything non-numeric is 0.
fn trendiness(value: Option<&Value>) -> u8 {
    number_value(value)
        .map(|n| n.round().clamp(0.0, 100.0) as u8)
        .unwrap_or(0)
}

fn niche_from(value: Value) -> Option<Niche> {
    let map = coerce_object(value, "niche")?;
    let niche = text_field(&map, &["niche", "name", "title"])?;
    if !is_substantive(&niche) {
        debug!("dropping niche '{}'", niche);
        return None;
    }
    let score = map.get("trendinessScore").or_else(|| map.get("trendiness_score"));
    Some(Niche {
        niche,
        description: text_field(&map, &["description"]).unwrap_or_default(),
        trendiness_score: trendiness(score),
        tags: string_list(map.get("tags").or_else(|| map.get("hashtags")), &["tag", "text"]),
        saved: false,
    })
}

impl Feature for NicheSearch {
    const KIND: FeatureKind = FeatureKind::NicheSearch;

    type Request = NicheRequest;
    type Output = NicheResults;

    fn primary(request: &NicheRequest) -> &str {
        request.topic.as_deref().unwrap_or_default()
    }

    fn prompt(request: &NicheRequest) -> String {
        prompts::niche_prompt(Self::primary(request).trim())
    }

    fn sampling() -> SamplingParams {
        SamplingParams {
            max_output_tokens: 2048,
            ..SamplingParams::default()
        }
    }

    fn shape() -> Shape {
        Shape::Array
    }

    fn elements() -> Elements {
        Elements::Objects
    }

    fn normalize(
        _request: &NicheRequest,
        payload: Option<Payload>,
    ) -> Result<NicheResults, GenerationError> {
        let items = expect_list(require_payload(payload)?, &["results", "niches"])?;
        let results: Vec<Niche> = items.into_iter().filter_map(niche_from).collect();
        if results.is_empty() {
            return Err(GenerationError::Extraction("no usable niches".to_string()));
        }
        Ok(NicheResults {
            results: take_limited(results, NICHE_COUNT, "niches"),
        })
    }
}
