// Prompt text for each generation feature. Every prompt names the exact count,
// the exact field names, and asks for bare JSON.

const JSON_ONLY: &str = "Do NOT include any explanatory text outside the JSON.";

pub fn niche_prompt(topic: &str) -> String {
    format!(
        r#"You are a TikTok niche research expert. Generate 5 specific, trending TikTok content niches related to: {topic}.

For each niche, provide:
1. A specific niche name (not too general)
2. A brief description (2-3 sentences) explaining the niche and its audience
3. A trendiness score from 1-100 based on current popularity
4. 3 relevant hashtags for this niche

Format the response as a JSON array of exactly 5 objects with these fields:
{{ "niche": string, "description": string, "trendinessScore": number, "tags": string[] }}

{JSON_ONLY}"#
    )
}

pub fn trend_prompt(search_term: &str) -> String {
    format!(
        r#"You are a TikTok trend analysis expert. Analyze the current trend status for: {search_term}.

Provide:
1. A comprehensive overview of the trend (2-3 sentences)
2. 5 related hashtags (including the # symbol)
3. 4 suggested content styles that perform well with this trend
4. Trend momentum (rising, stable, or declining)
5. Simulated trend data for the last 6 months (generate realistic numbers)

Format the response as a single JSON object:
{{
  "overview": string,
  "relatedHashtags": string[],
  "suggestedStyles": string[],
  "momentum": "rising" | "stable" | "declining",
  "data": [{{ "date": string, "value": number }}]
}}

{JSON_ONLY}"#
    )
}

pub fn hashtag_prompt(keyword: &str) -> String {
    format!(
        r#"You are a TikTok hashtag expert. Generate 15 relevant and trending TikTok hashtags related to: {keyword}.

The hashtags should include:
1. Some broad, popular hashtags
2. Some niche-specific hashtags
3. Some trending hashtags

Format the response as a JSON array of exactly 15 strings, each string being a hashtag (including the # symbol).

{JSON_ONLY}"#
    )
}

pub fn content_idea_prompt(niche: &str) -> String {
    format!(
        r#"You are a TikTok content strategist. Generate 4 creative content ideas for TikTok videos related to: {niche}.

For each idea, provide:
1. A catchy title (attention-grabbing and specific)
2. A detailed outline with sections for how the video should flow (intro, main points, outro)
3. 3-4 relevant hashtags (including the # symbol)

Format the response as a JSON array of exactly 4 objects with these fields:
{{ "title": string, "outline": string, "hashtags": string[] }}

{JSON_ONLY}"#
    )
}

/// Title/bio prompt. Blank optional inputs are left out entirely.
pub fn title_bio_prompt(
    include_titles: bool,
    include_bios: bool,
    niche: &str,
    tone: &str,
    keywords: &str,
    description: &str,
) -> String {
    let subject = match (include_titles, include_bios) {
        (true, true) => "titles and bios",
        (true, false) => "titles",
        _ => "bios",
    };

    let tone = tone.trim();
    let creator = if tone.is_empty() {
        format!("{} content creator", niche.trim())
    } else {
        format!("{} {} content creator", tone, niche.trim())
    };

    let mut prompt = format!("Generate creative and engaging TikTok {} for a {}. ", subject, creator);

    if !keywords.trim().is_empty() {
        prompt.push_str(&format!(
            "Include these keywords if possible: {}. ",
            keywords.trim()
        ));
    }

    if !description.trim().is_empty() {
        prompt.push_str(&format!("Additional context: {}. ", description.trim()));
    }

    if include_titles {
        prompt.push_str(
            "For titles, create attention-grabbing, short phrases that will make users stop scrolling. ",
        );
    }

    if include_bios {
        prompt.push_str(
            "For bios, create concise text (max 80 characters) that describes the creator's content focus and encourages follows. ",
        );
    }

    let counts = match (include_titles, include_bios) {
        (true, true) => "Generate 6 titles and 5 bios.",
        (true, false) => "Generate 6 titles.",
        _ => "Generate 5 bios.",
    };

    prompt.push_str(&format!(
        "Output format should be a JSON object with two arrays of strings: \"titles\" and \"bios\" (empty array if not requested). {} Respond with only the JSON object.",
        counts
    ));

    prompt
}
