use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use tracing::debug;

use super::{Feature, FeatureKind};
use crate::error::GenerationError;
use crate::llm::client::SamplingParams;
use crate::llm::prompts;
use crate::pipeline::extractor::{Payload, Shape};
use crate::pipeline::normalizer::{
    expect_object, hashtag, json_number, require_payload, string_list, text_field,
};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TrendRequest {
    pub search_term: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Momentum {
    Rising,
    #[default]
    Stable,
    Declining,
}

impl Momentum {
    /// Case-insensitive; anything unrecognized is `Stable`.
    pub fn parse_lenient(value: Option<&Value>) -> Self {
        match value.and_then(Value::as_str).map(|s| s.trim().to_lowercase()) {
            Some(s) if s == "rising" => Momentum::Rising,
            Some(s) if s == "declining" => Momentum::Declining,
            Some(s) if s == "stable" => Momentum::Stable,
            other => {
                if other.is_some() {
                    debug!("unrecognized momentum {:?}, using stable", other);
                }
                Momentum::Stable
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: String,
    pub value: Number,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendReport {
    pub overview: String,
    pub related_hashtags: Vec<String>,
    pub suggested_styles: Vec<String>,
    pub momentum: Momentum,
    pub data: Vec<TrendPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendResponse {
    pub trend_results: TrendReport,
}

pub struct TrendAnalysis;

const ENVELOPE_KEYS: [&str; 3] = ["trendResults", "analysis", "trend"];

/// `{ "trendResults": { ... } }` style envelopes are unwrapped when the top
/// level has no overview of its own.
fn unwrap_envelope(mut map: Map<String, Value>) -> Map<String, Value> {
    if map.contains_key("overview") {
        return map;
    }
    for key in ENVELOPE_KEYS {
        if let Some(Value::Object(inner)) = map.remove(key) {
            debug!("unwrapping trend analysis from '{}'", key);
            return inner;
        }
    }
    map
}

fn point_from(value: &Value) -> Option<TrendPoint> {
    let map = value.as_object()?;
    let date = text_field(map, &["date", "month", "label"])?;
    let value = json_number(map.get("value").or_else(|| map.get("count")))?;
    Some(TrendPoint { date, value })
}

impl Feature for TrendAnalysis {
    const KIND: FeatureKind = FeatureKind::TrendAnalysis;

    type Request = TrendRequest;
    type Output = TrendResponse;

    fn primary(request: &TrendRequest) -> &str {
        request.search_term.as_deref().unwrap_or_default()
    }

    fn prompt(request: &TrendRequest) -> String {
        prompts::trend_prompt(Self::primary(request).trim())
    }

    fn sampling() -> SamplingParams {
        SamplingParams {
            max_output_tokens: 1536,
            ..SamplingParams::default()
        }
    }

    fn shape() -> Shape {
        Shape::Object
    }

    fn normalize(
        _request: &TrendRequest,
        payload: Option<Payload>,
    ) -> Result<TrendResponse, GenerationError> {
        let map = unwrap_envelope(expect_object(require_payload(payload)?)?);

        let related_hashtags = string_list(map.get("relatedHashtags"), &["hashtag", "tag", "text"])
            .iter()
            .filter_map(|t| hashtag(t))
            .collect();

        let data: Vec<TrendPoint> = match map.get("data") {
            Some(Value::Array(points)) => points.iter().filter_map(point_from).collect(),
            _ => Vec::new(),
        };

        Ok(TrendResponse {
            trend_results: TrendReport {
                overview: text_field(&map, &["overview", "summary"]).unwrap_or_default(),
                related_hashtags,
                suggested_styles: string_list(
                    map.get("suggestedStyles"),
                    &["style", "name", "text"],
                ),
                momentum: Momentum::parse_lenient(map.get("momentum")),
                data,
            },
        })
    }
}
