use async_trait::async_trait;
use serde::Serialize;

use crate::error::GenerationError;

/// Sampling knobs forwarded to the oracle with every prompt.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SamplingParams {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.95,
            top_k: 40,
            max_output_tokens: 2048,
        }
    }
}

/// An opaque text-completion oracle.
///
/// Implementations make exactly one outbound call per `complete` and never retry;
/// any non-success answer is reported as `GenerationError::Upstream`, a missing
/// credential as `GenerationError::Configuration`.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(
        &self,
        prompt: &str,
        sampling: &SamplingParams,
    ) -> Result<String, GenerationError>;
}

pub struct MockLlmClient;

impl Default for MockLlmClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(
        &self,
        prompt: &str,
        _sampling: &SamplingParams,
    ) -> Result<String, GenerationError> {
        // Pick a canned answer by the role line each feature prompt opens with
        if prompt.contains("TikTok niche research expert") {
            Ok(r##"```json
[
  {"niche": "15-Minute Weeknight Meals", "description": "Fast dinners for busy professionals, filmed start to finish in real time.", "trendinessScore": 88, "tags": ["#quickrecipes", "#weeknightdinner", "#cookingtiktok"]},
  {"niche": "Budget Meal Prep", "description": "Feeding a family for a week on a fixed grocery budget.", "trendinessScore": 82, "tags": ["#mealprep", "#budgetmeals", "#frugalliving"]},
  {"niche": "Air Fryer Experiments", "description": "Testing unexpected foods in the air fryer and rating the results.", "trendinessScore": 79, "tags": ["#airfryer", "#foodhacks", "#tastetest"]},
  {"niche": "Heritage Recipes", "description": "Recreating family recipes with grandparents on camera.", "trendinessScore": 74, "tags": ["#familyrecipes", "#heritagecooking", "#grandma"]},
  {"niche": "One-Pan Desserts", "description": "Low-effort desserts with minimal cleanup.", "trendinessScore": 71, "tags": ["#easydessert", "#onepan", "#baking"]}
]
```"##
            .to_string())
        } else if prompt.contains("TikTok trend analysis expert") {
            Ok(r##"{
  "overview": "Steady creator interest with spikes around seasonal challenges.",
  "relatedHashtags": ["#fyp", "#trending", "#challenge", "#viral", "#creator"],
  "suggestedStyles": ["Tutorial", "Duet reaction", "Day in the life", "Before and after"],
  "momentum": "rising",
  "data": [
    {"date": "Jan", "value": 42}, {"date": "Feb", "value": 48}, {"date": "Mar", "value": 55},
    {"date": "Apr", "value": 61}, {"date": "May", "value": 70}, {"date": "Jun", "value": 77}
  ]
}"##
            .to_string())
        } else if prompt.contains("TikTok hashtag expert") {
            Ok(r##"["#fyp", "#foryou", "#viral", "#trending", "#tiktoktips", "#contentcreator", "#creatorsearchinsights", "#learnontiktok", "#howto", "#dailyvlog", "#smallbusiness", "#explorepage", "#tiktokmademebuyit", "#lifehacks", "#community"]"##
                .to_string())
        } else if prompt.contains("TikTok content strategist") {
            Ok(r##"[
  {"title": "3 Mistakes Everyone Makes", "outline": "Intro: hook with the most common mistake.\nMain: walk through all three with quick fixes.\nOutro: ask viewers which one they make.", "hashtags": ["#tips", "#mistakes", "#learnontiktok"]},
  {"title": "I Tried It For 30 Days", "outline": "Intro: the challenge.\nMain: weekly check-ins.\nOutro: honest verdict.", "hashtags": ["#30daychallenge", "#results", "#honestreview"]},
  {"title": "Beginner vs Pro", "outline": "Intro: split screen setup.\nMain: same task, two skill levels.\nOutro: the one tip that closes the gap.", "hashtags": ["#beginnervspro", "#skills", "#tutorial"]},
  {"title": "Things I Wish I Knew Sooner", "outline": "Intro: relatable moment.\nMain: five quick lessons.\nOutro: invite viewers to add theirs.", "hashtags": ["#lessonslearned", "#advice", "#storytime"]}
]"##
            .to_string())
        } else if prompt.contains("Generate creative and engaging TikTok") {
            Ok(r#"Here you go!
```json
{
  "titles": ["Stop Scrolling: This Changes Everything", "Nobody Talks About This", "Watch Till The End", "The 10-Second Rule", "POV: You Finally Get It", "Try This Tonight"],
  "bios": ["Daily tips that actually work", "Making the hard stuff simple", "Follow for a new trick every day", "Real results, no fluff", "Your shortcut to better content"]
}
```"#
                .to_string())
        } else {
            Ok(r#"{"status": "mock"}"#.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_sampling_params() {
        let params = SamplingParams::default();
        assert_eq!(params.top_k, 40);
        assert_eq!(params.max_output_tokens, 2048);
    }

    #[tokio::test]
    async fn test_mock_client_unknown_prompt() {
        let client = MockLlmClient::new();
        let out = client
            .complete("something else", &SamplingParams::default())
            .await
            .unwrap();
        assert_eq!(out, r#"{"status": "mock"}"#);
    }

    #[tokio::test]
    async fn test_mock_client_hashtags_is_json_array() {
        let client = MockLlmClient::new();
        let out = client
            .complete("You are a TikTok hashtag expert.", &SamplingParams::default())
            .await
            .unwrap();
        let parsed: Vec<String> = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed.len(), 15);
    }
}
