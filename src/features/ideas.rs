use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use super::{Feature, FeatureKind};
use crate::error::GenerationError;
use crate::llm::client::SamplingParams;
use crate::llm::prompts;
use crate::pipeline::extractor::{Elements, Payload, Shape};
use crate::pipeline::normalizer::{
    coerce_object, expect_list, hashtag, is_substantive, require_payload, scalar_text,
    string_list, take_limited, text_field,
};

pub const IDEA_COUNT: usize = 4;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IdeaRequest {
    pub niche: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentIdea {
    pub title: String,
    pub outline: String,
    pub hashtags: Vec<String>,
    pub saved: bool,
    pub copied: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdeaList {
    pub ideas: Vec<ContentIdea>,
}

pub struct ContentIdeas;

/// Outlines come back as prose, a list of steps, or a section map.
fn outline_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::Array(steps)) => steps
            .iter()
            .filter_map(scalar_text)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n"),
        Some(Value::Object(sections)) => sections
            .iter()
            .filter_map(|(k, v)| scalar_text(v).map(|t| format!("{}: {}", k, t)))
            .collect::<Vec<_>>()
            .join("\n"),
        Some(other) => scalar_text(other).unwrap_or_default(),
        None => String::new(),
    }
}

fn idea_from(map: Map<String, Value>) -> Option<ContentIdea> {
    let title = text_field(&map, &["title", "idea", "text"])?;
    if !is_substantive(&title) {
        debug!("dropping idea '{}'", title);
        return None;
    }
    Some(ContentIdea {
        title,
        outline: outline_text(map.get("outline").or_else(|| map.get("description"))),
        hashtags: string_list(map.get("hashtags").or_else(|| map.get("tags")), &["tag", "text"])
            .iter()
            .filter_map(|t| hashtag(t))
            .collect(),
        saved: false,
        copied: false,
    })
}

impl Feature for ContentIdeas {
    const KIND: FeatureKind = FeatureKind::ContentIdea;

    type Request = IdeaRequest;
    type Output = IdeaList;

    fn primary(request: &IdeaRequest) -> &str {
        request.niche.as_deref().unwrap_or_default()
    }

    fn prompt(request: &IdeaRequest) -> String {
        prompts::content_idea_prompt(Self::primary(request).trim())
    }

    fn sampling() -> SamplingParams {
        SamplingParams {
            temperature: 0.8,
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
        _request: &IdeaRequest,
        payload: Option<Payload>,
    ) -> Result<IdeaList, GenerationError> {
        let items = expect_list(require_payload(payload)?, &["ideas", "contentIdeas"])?;
        let ideas: Vec<ContentIdea> = items
            .into_iter()
            .filter_map(|v| coerce_object(v, "title"))
            .filter_map(idea_from)
            .collect();
        if ideas.is_empty() {
            return Err(GenerationError::Extraction("no usable content ideas".to_string()));
        }
        Ok(IdeaList {
            ideas: take_limited(ideas, IDEA_COUNT, "content ideas"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn normalize(v: Value) -> Result<IdeaList, GenerationError> {
        ContentIdeas::normalize(&IdeaRequest::default(), Payload::from_value(v))
    }

    #[test]
    fn test_ideas_get_ui_flags() {
        let out = normalize(json!([
            {"title": "3 herbs you can't kill", "outline": "Intro...", "hashtags": ["#herbs", "garden"]}
        ]))
        .unwrap();
        let idea = &out.ideas[0];
        assert!(!idea.saved && !idea.copied);
        assert_eq!(idea.hashtags, vec!["#herbs", "#garden"]);
    }

    #[test]
    fn test_outline_shapes() {
        let out = normalize(json!([
            {"title": "Array outline", "outline": ["Hook", "Demo", "CTA"]},
            {"title": "Object outline", "outline": {"intro": "Hook", "outro": "CTA"}},
            {"title": "No outline"}
        ]))
        .unwrap();
        assert_eq!(out.ideas[0].outline, "Hook\nDemo\nCTA");
        assert_eq!(out.ideas[1].outline, "intro: Hook\noutro: CTA");
        assert_eq!(out.ideas[2].outline, "");
    }

    #[test]
    fn test_truncates_to_four_and_drops_short_titles() {
        let out = normalize(json!(["ok", "Idea one!", "Idea two!", "Idea three!", "Idea four!", "Idea five!"]))
            .unwrap();
        assert_eq!(out.ideas.len(), IDEA_COUNT);
        assert_eq!(out.ideas[0].title, "Idea one!");
    }

    #[test]
    fn test_object_without_list_is_extraction_error() {
        assert!(matches!(
            normalize(json!({"title": "single", "count": 1})),
            Err(GenerationError::Extraction(_))
        ));
    }
}
