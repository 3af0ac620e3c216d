//! Recovers a structured JSON payload from free-form oracle output.
//!
//! Strategies run in order, first match wins:
//! 1. A fenced block labelled `json`
//! 2. Any fenced block
//! 3. A balanced `{...}` or `[...]` span of the expected top-level shape
//! 4. Feature-specific heuristics (labelled lines, quoted fragments, `#tag` tokens)
//!
//! A parse error inside a tier only means that tier failed.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Expected top-level JSON shape for a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Object,
    Array,
}

impl Shape {
    fn delimiters(self) -> (char, char) {
        match self {
            Shape::Object => ('{', '}'),
            Shape::Array => ('[', ']'),
        }
    }
}

/// Element kind an array span must start with before tier 3 accepts it.
/// A stray `[1]` or `[]` in prose then never hides the real list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Elements {
    Any,
    Objects,
    Strings,
}

impl Elements {
    fn admits(self, payload: &Payload) -> bool {
        let Payload::Array(items) = payload else {
            return true;
        };
        match (self, items.first()) {
            (_, None) => false,
            (Elements::Any, Some(_)) => true,
            (Elements::Objects, Some(first)) => first.is_object(),
            (Elements::Strings, Some(first)) => first.is_string(),
        }
    }
}

/// Best-effort parsed payload. Scalars never count as a payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Object(Map<String, Value>),
    Array(Vec<Value>),
}

impl Payload {
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Payload::Object(map)),
            Value::Array(items) => Some(Payload::Array(items)),
            _ => None,
        }
    }

    pub fn shape(&self) -> Shape {
        match self {
            Payload::Object(_) => Shape::Object,
            Payload::Array(_) => Shape::Array,
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            Payload::Object(map) => Value::Object(map),
            Payload::Array(items) => Value::Array(items),
        }
    }
}

fn parse_payload(candidate: &str) -> Option<Payload> {
    match serde_json::from_str::<Value>(candidate.trim()) {
        Ok(value) => Payload::from_value(value),
        Err(e) => {
            debug!("candidate span is not valid JSON: {}", e);
            None
        }
    }
}

/// One tier of the extraction chain.
pub trait Extractor: Send + Sync {
    fn name(&self) -> &'static str;
    fn extract(&self, text: &str) -> Option<Payload>;
}

static JSON_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)```[ \t]*json[ \t]*\r?\n(.*?)```").expect("valid regex")
});

static ANY_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```[A-Za-z0-9_+-]*[ \t]*\r?\n(.*?)```").expect("valid regex")
});

/// Tier 1: a fence explicitly labelled as JSON.
pub struct LabeledFence;

impl Extractor for LabeledFence {
    fn name(&self) -> &'static str {
        "json-fence"
    }

    fn extract(&self, text: &str) -> Option<Payload> {
        JSON_FENCE
            .captures_iter(text)
            .filter_map(|c| c.get(1))
            .find_map(|m| parse_payload(m.as_str()))
    }
}

/// Tier 2: any fenced block, labelled or not.
pub struct AnyFence;

impl Extractor for AnyFence {
    fn name(&self) -> &'static str {
        "any-fence"
    }

    fn extract(&self, text: &str) -> Option<Payload> {
        ANY_FENCE
            .captures_iter(text)
            .filter_map(|c| c.get(1))
            .find_map(|m| parse_payload(m.as_str()))
    }
}

/// Tier 3: the first balanced span of the expected shape that parses and
/// whose elements fit. Only the span is parsed, so prose before or after it
/// is ignored.
pub struct BalancedSpan {
    pub shape: Shape,
    pub elements: Elements,
}

const MAX_SPAN_ATTEMPTS: usize = 64;

impl BalancedSpan {
    pub fn new(shape: Shape) -> Self {
        Self {
            shape,
            elements: Elements::Any,
        }
    }

    pub fn elements(mut self, elements: Elements) -> Self {
        self.elements = elements;
        self
    }
}

impl Extractor for BalancedSpan {
    fn name(&self) -> &'static str {
        match self.shape {
            Shape::Object => "object-span",
            Shape::Array => "array-span",
        }
    }

    fn extract(&self, text: &str) -> Option<Payload> {
        let (open, close) = self.shape.delimiters();
        text.char_indices()
            .filter(|(_, c)| *c == open)
            .take(MAX_SPAN_ATTEMPTS)
            .filter_map(|(start, _)| balanced_end(text, start, open, close).map(|end| (start, end)))
            .filter_map(|(start, end)| parse_payload(&text[start..end]))
            .find(|payload| payload.shape() == self.shape && self.elements.admits(payload))
    }
}

/// Byte offset one past the delimiter that closes the span opened at `start`.
/// Delimiters inside JSON strings (including escaped quotes) are ignored.
fn balanced_end(text: &str, start: usize, open: char, close: char) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        if c == '"' {
            in_string = true;
        } else if c == open {
            depth += 1;
        } else if c == close {
            depth -= 1;
            if depth == 0 {
                return Some(start + offset + c.len_utf8());
            }
        }
    }
    None
}

/// A category the line heuristic sorts fragments into.
#[derive(Debug, Clone)]
pub struct LineCategory {
    /// Output key, e.g. "titles".
    pub key: &'static str,
    /// Line label, e.g. "title" matches `Title 3: ...`.
    pub label: &'static str,
    /// Quote style that defaults a bare fragment into this category.
    pub quote: char,
}

/// Tier 4 (title/bio style output): scans lines for `Label N: text`, section
/// headers and quoted fragments.
///
/// Precedence when a line could belong to more than one category:
/// an explicit `Label N:` prefix wins, then the most recent section header
/// (`"titles": [`, `Bios:`), then the fragment's quote style. A fragment is
/// assigned to at most one category.
pub struct LabelledLines {
    categories: Vec<LineCategory>,
}

static LIST_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[-*•]+|\d+[.)])\s+").expect("valid regex"));

impl LabelledLines {
    pub fn new(categories: Vec<LineCategory>) -> Self {
        Self { categories }
    }

    pub fn titles_and_bios() -> Self {
        Self::new(vec![
            LineCategory {
                key: "titles",
                label: "title",
                quote: '"',
            },
            LineCategory {
                key: "bios",
                label: "bio",
                quote: '\'',
            },
        ])
    }

    fn category_index(&self, word: &str) -> Option<usize> {
        let word = word.to_lowercase();
        self.categories
            .iter()
            .position(|c| word == c.label || word == c.key)
    }

    /// `Title 3: text`, `Bio - text`, `title #2) text`
    fn labelled(&self, line: &str) -> Option<(usize, String)> {
        let split = line.find(|c: char| !c.is_alphabetic())?;
        let idx = self.category_index(&line[..split])?;
        let rest = line[split..]
            .trim_start()
            .trim_start_matches('#')
            .trim_start_matches(|c: char| c.is_ascii_digit())
            .trim_start();
        let rest = rest.strip_prefix([':', '.', ')', '-'])?;
        let text = strip_quotes(rest.trim());
        (!text.is_empty()).then(|| (idx, text.to_string()))
    }

    /// `"titles": [`, `Titles:`, `## Bios`, `**Bios**`
    fn header(&self, line: &str) -> Option<usize> {
        let bare = line
            .trim_matches(|c: char| matches!(c, '#' | '*' | '"' | '\'' | ' ' | '\t'))
            .trim_end_matches(['[', '{', ' '])
            .trim_end_matches(':')
            .trim_end_matches(['"', '\'', '*']);
        self.category_index(bare.trim())
    }

    fn quoted(&self, line: &str, current: Option<usize>) -> Option<(usize, String)> {
        let line = line.trim_end_matches(',').trim_end();
        let first = line.chars().next()?;
        if line.chars().count() < 2 || !line.ends_with(first) {
            return None;
        }
        let quote_idx = self.categories.iter().position(|c| c.quote == first)?;
        let inner = line[first.len_utf8()..line.len() - first.len_utf8()].trim();
        if inner.is_empty() {
            return None;
        }
        let idx = current.unwrap_or(quote_idx);
        // Without a section header, a fragment naming another category is ambiguous
        let lower = inner.to_lowercase();
        let names_other = current.is_none()
            && self
                .categories
                .iter()
                .enumerate()
                .any(|(i, c)| i != idx && lower.contains(c.label));
        (!names_other).then(|| (idx, inner.to_string()))
    }
}

fn strip_quotes(text: &str) -> &str {
    let text = text.trim_end_matches(',').trim();
    for q in ['"', '\'', '“'] {
        let close = if q == '“' { '”' } else { q };
        if let Some(inner) = text.strip_prefix(q).and_then(|t| t.strip_suffix(close)) {
            return inner.trim();
        }
    }
    text
}

impl Extractor for LabelledLines {
    fn name(&self) -> &'static str {
        "labelled-lines"
    }

    fn extract(&self, text: &str) -> Option<Payload> {
        let mut buckets: Vec<Vec<Value>> = vec![Vec::new(); self.categories.len()];
        let mut current: Option<usize> = None;

        for raw in text.lines() {
            let line = LIST_MARKER.replace(raw.trim(), "");
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Some((idx, fragment)) = self.labelled(line) {
                buckets[idx].push(Value::String(fragment));
            } else if let Some(idx) = self.header(line) {
                current = Some(idx);
            } else if let Some((idx, fragment)) = self.quoted(line, current) {
                buckets[idx].push(Value::String(fragment));
            } else if line.starts_with([']', '}']) {
                current = None;
            }
        }

        if buckets.iter().all(Vec::is_empty) {
            return None;
        }

        let map = self
            .categories
            .iter()
            .zip(buckets)
            .map(|(c, items)| (c.key.to_string(), Value::Array(items)))
            .collect();
        Some(Payload::Object(map))
    }
}

static HASHTAG_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"#[\p{L}\p{N}_]+").expect("valid regex"));

/// Tier 4 (hashtag output): every distinct `#tag` token, in order of appearance.
pub struct HashtagTokens;

impl Extractor for HashtagTokens {
    fn name(&self) -> &'static str {
        "hashtag-tokens"
    }

    fn extract(&self, text: &str) -> Option<Payload> {
        let mut seen: Vec<Value> = Vec::new();
        for m in HASHTAG_TOKEN.find_iter(text) {
            let tag = Value::String(m.as_str().to_string());
            if !seen.contains(&tag) {
                seen.push(tag);
            }
        }
        (!seen.is_empty()).then_some(Payload::Array(seen))
    }
}

/// Ordered list of extraction tiers.
pub struct ExtractionChain {
    tiers: Vec<Box<dyn Extractor>>,
}

impl ExtractionChain {
    pub fn empty() -> Self {
        Self { tiers: Vec::new() }
    }

    /// The three structural tiers for the given shape.
    pub fn structural(shape: Shape) -> Self {
        Self::structural_of(shape, Elements::Any)
    }

    /// Structural tiers whose span scan also checks the element kind.
    pub fn structural_of(shape: Shape, elements: Elements) -> Self {
        Self::empty()
            .with(LabeledFence)
            .with(AnyFence)
            .with(BalancedSpan::new(shape).elements(elements))
    }

    pub fn with<E: Extractor + 'static>(mut self, tier: E) -> Self {
        self.tiers.push(Box::new(tier));
        self
    }

    /// Drop a tier by name, e.g. to run without the heuristic fallback.
    pub fn without(mut self, name: &str) -> Self {
        self.tiers.retain(|t| t.name() != name);
        self
    }

    pub fn tier_names(&self) -> Vec<&'static str> {
        self.tiers.iter().map(|t| t.name()).collect()
    }

    pub fn extract(&self, text: &str) -> Option<Payload> {
        for tier in &self.tiers {
            if let Some(payload) = tier.extract(text) {
                debug!("extraction tier '{}' matched", tier.name());
                return Some(payload);
            }
            debug!("extraction tier '{}' found nothing", tier.name());
        }
        warn!("all {} extraction tiers failed", self.tiers.len());
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(v: Value) -> Payload {
        Payload::from_value(v).unwrap()
    }

    #[test]
    fn test_json_fence_interior_parsed() {
        let text = "Sure!\n```json\n[{\"niche\": \"a\"}]\n```\nEnjoy.";
        assert_eq!(
            LabeledFence.extract(text),
            Some(payload(json!([{"niche": "a"}])))
        );
    }

    #[test]
    fn test_json_fence_label_case_insensitive() {
        let text = "```JSON\n{\"a\": 1}\n```";
        assert_eq!(LabeledFence.extract(text), Some(payload(json!({"a": 1}))));
    }

    #[test]
    fn test_json_fence_invalid_falls_through() {
        let text = "```json\n{\"a\": 1,}\n```";
        assert_eq!(LabeledFence.extract(text), None);
    }

    #[test]
    fn test_any_fence_without_label() {
        let text = "Here:\n```\n[\"#a\", \"#b\"]\n```";
        assert_eq!(AnyFence.extract(text), Some(payload(json!(["#a", "#b"]))));
    }

    #[test]
    fn test_any_fence_skips_non_json_block() {
        let text = "```python\nprint('x')\n```\nthen\n```\n{\"ok\": true}\n```";
        assert_eq!(AnyFence.extract(text), Some(payload(json!({"ok": true}))));
    }

    #[test]
    fn test_fence_scalar_is_not_a_payload() {
        assert_eq!(AnyFence.extract("```\n42\n```"), None);
    }

    #[test]
    fn test_span_ignores_surrounding_prose() {
        let text = r#"Here is the analysis: {"overview": "x", "momentum": "rising"} Let me know if you need more!"#;
        assert_eq!(
            BalancedSpan::new(Shape::Object).extract(text),
            Some(payload(json!({"overview": "x", "momentum": "rising"})))
        );
    }

    #[test]
    fn test_span_handles_nested_and_braces_in_strings() {
        let text = r#"Result: {"a": {"b": "} tricky {"}, "c": "say \"hi\""} trailing }"#;
        assert_eq!(
            BalancedSpan::new(Shape::Object).extract(text),
            Some(payload(json!({"a": {"b": "} tricky {"}, "c": "say \"hi\""})))
        );
    }

    #[test]
    fn test_span_skips_non_json_brackets() {
        let text = "See [the docs] for details.\n[\"#one\", \"#two\"]";
        assert_eq!(
            BalancedSpan::new(Shape::Array).extract(text),
            Some(payload(json!(["#one", "#two"])))
        );
    }

    #[test]
    fn test_span_finds_inner_array_of_wrapped_object() {
        let text = r##"{"hashtags": ["#a", "#b"]}"##;
        assert_eq!(
            BalancedSpan::new(Shape::Array).extract(text),
            Some(payload(json!(["#a", "#b"])))
        );
    }

    #[test]
    fn test_span_skips_citation_and_empty_list() {
        let text = "Based on 2024 data [1] and [], here you go:\n[{\"niche\": \"Budget meal prep\"}]";
        assert_eq!(
            BalancedSpan::new(Shape::Array)
                .elements(Elements::Objects)
                .extract(text),
            Some(payload(json!([{"niche": "Budget meal prep"}])))
        );
        let text = r##"Sources [2]: ["#mealprep", "#budgeteats"]"##;
        assert_eq!(
            BalancedSpan::new(Shape::Array)
                .elements(Elements::Strings)
                .extract(text),
            Some(payload(json!(["#mealprep", "#budgeteats"])))
        );
    }

    #[test]
    fn test_span_empty_array_never_accepted() {
        assert_eq!(BalancedSpan::new(Shape::Array).extract("nothing here: []"), None);
    }

    #[test]
    fn test_span_unbalanced_is_none() {
        assert_eq!(
            BalancedSpan::new(Shape::Object).extract("{\"a\": [1, 2"),
            None
        );
    }

    #[test]
    fn test_labelled_lines_explicit_labels() {
        let text = "Title 1: Stop scrolling now\nBio 1: Daily fitness laughs\nTitle 2: Leg day regrets";
        let out = LabelledLines::titles_and_bios().extract(text).unwrap();
        assert_eq!(
            out,
            payload(json!({
                "titles": ["Stop scrolling now", "Leg day regrets"],
                "bios": ["Daily fitness laughs"]
            }))
        );
    }

    #[test]
    fn test_labelled_lines_label_wins_over_quote_style() {
        // Explicit label beats the single-quote default for bios
        let text = "Title 1: 'Gym fails compilation'";
        let out = LabelledLines::titles_and_bios().extract(text).unwrap();
        assert_eq!(
            out,
            payload(json!({"titles": ["Gym fails compilation"], "bios": []}))
        );
    }

    #[test]
    fn test_labelled_lines_section_headers_on_malformed_json() {
        let text = r#"{
  "titles": [
    "Leg Day Survival Guide",
    "Why I Fear Burpees",
  ],
  "bios": [
    "Sweat, laugh, repeat",
  ]
"#;
        let out = LabelledLines::titles_and_bios().extract(text).unwrap();
        assert_eq!(
            out,
            payload(json!({
                "titles": ["Leg Day Survival Guide", "Why I Fear Burpees"],
                "bios": ["Sweat, laugh, repeat"]
            }))
        );
    }

    #[test]
    fn test_labelled_lines_quote_style_default() {
        let text = "\"Double quoted title here\"\n'Single quoted bio here'";
        let out = LabelledLines::titles_and_bios().extract(text).unwrap();
        assert_eq!(
            out,
            payload(json!({
                "titles": ["Double quoted title here"],
                "bios": ["Single quoted bio here"]
            }))
        );
    }

    #[test]
    fn test_labelled_lines_drops_fragment_naming_other_category() {
        let text = "\"My bio is great\"";
        assert_eq!(LabelledLines::titles_and_bios().extract(text), None);
    }

    #[test]
    fn test_labelled_lines_nothing_usable() {
        assert_eq!(
            LabelledLines::titles_and_bios().extract("I'm sorry, I can't help with that."),
            None
        );
    }

    #[test]
    fn test_hashtag_tokens_in_order_deduplicated() {
        let text = "Try #fitness, #gymtok and #fitness again. Also #legday!";
        assert_eq!(
            HashtagTokens.extract(text),
            Some(payload(json!(["#fitness", "#gymtok", "#legday"])))
        );
        assert_eq!(HashtagTokens.extract("no tags here"), None);
    }

    #[test]
    fn test_chain_order_first_match_wins() {
        let text = "```json\n{\"from\": \"fence\"}\n```\n{\"from\": \"span\"}";
        let chain = ExtractionChain::structural(Shape::Object);
        assert_eq!(chain.extract(text), Some(payload(json!({"from": "fence"}))));
    }

    #[test]
    fn test_chain_falls_through_broken_fence_to_span() {
        let text = "```json\n{broken\n```\nActually: {\"ok\": 1}";
        let chain = ExtractionChain::structural(Shape::Object);
        assert_eq!(chain.extract(text), Some(payload(json!({"ok": 1}))));
    }

    #[test]
    fn test_chain_heuristic_can_be_disabled() {
        let chain = ExtractionChain::structural(Shape::Object).with(LabelledLines::titles_and_bios());
        assert_eq!(
            chain.tier_names(),
            vec!["json-fence", "any-fence", "object-span", "labelled-lines"]
        );
        let text = "Title 1: Something catchy";
        assert!(chain.extract(text).is_some());
        let chain = chain.without("labelled-lines");
        assert_eq!(chain.extract(text), None);
    }

    #[test]
    fn test_chain_is_deterministic() {
        let text = "prose [\"#a\", \"#b\"] more prose";
        let chain = ExtractionChain::structural(Shape::Array).with(HashtagTokens);
        assert_eq!(chain.extract(text), chain.extract(text));
    }
}
