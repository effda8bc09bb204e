use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Sentinel the filter panel sends for "no constraint".
pub const FILTER_ALL: &str = "All";

/// User-selected intent axis; changes the prompt's selection rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Mode {
    #[default]
    Narrative,
    Visual,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Narrative => write!(f, "narrative"),
            Mode::Visual => write!(f, "visual"),
        }
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "narrative" => Ok(Mode::Narrative),
            "visual" => Ok(Mode::Visual),
            other => Err(format!("unknown mode: {other}")),
        }
    }
}

impl TryFrom<String> for Mode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Soft hints passed through to the prompt. Both the camelCase names of the
/// filter panel and the short names of the keyword form are accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filters {
    #[serde(default, alias = "mediaType", alias = "media")]
    pub media_type: Option<String>,
    #[serde(default, alias = "eraVibe", alias = "era")]
    pub era_vibe: Option<String>,
    #[serde(default, alias = "nicheLevel", alias = "depth")]
    pub niche_level: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
}

impl Filters {
    /// Returns `(label, value)` for every filter that actually constrains
    /// the selection, in prompt order.
    pub fn active(&self) -> Vec<(&'static str, &str)> {
        [
            ("Media Type", self.media_type.as_deref()),
            ("Era/Vibe", self.era_vibe.as_deref()),
            ("Niche Level", self.niche_level.as_deref()),
            ("Time Type", self.time.as_deref()),
        ]
        .into_iter()
        .filter_map(|(label, value)| match value {
            Some(v) if !is_unconstrained(v) => Some((label, v)),
            _ => None,
        })
        .collect()
    }
}

/// True for the "All" sentinel and for blank values.
pub fn is_unconstrained(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || value.eq_ignore_ascii_case(FILTER_ALL)
}

/// Body of `POST /api/generate`.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub mode: Mode,
    #[serde(alias = "keyword")]
    pub query: String,
    #[serde(default)]
    pub filters: Option<Filters>,
}

/// One item exactly as the model produced it. Field names drift between
/// prompt revisions, so nothing is assumed about its shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawResult(pub Map<String, Value>);

impl RawResult {
    /// First non-empty value among `keys`, or an empty string. Numbers and
    /// booleans are rendered as text.
    pub fn text(&self, keys: &[&str]) -> String {
        keys.iter()
            .filter_map(|k| self.0.get(*k))
            .find_map(|v| match v {
                Value::String(s) if !s.is_empty() => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                Value::Bool(b) => Some(b.to_string()),
                _ => None,
            })
            .unwrap_or_default()
    }

    /// String entries of the array under `key`; anything else yields nothing.
    pub fn tags(&self, key: &str) -> Vec<String> {
        match self.0.get(key) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl From<Map<String, Value>> for RawResult {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// A model result with its cover image and retail link attached.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrichedResult {
    pub title_ja: String,
    pub title_en: String,
    pub creator: String,
    pub media_type: String,
    pub analysis: String,
    pub structural_insight: String,
    pub match_tags: Vec<String>,
    #[serde(rename = "imageUrl")]
    pub image_url: Option<String>,
    #[serde(rename = "retailUrl")]
    pub retail_url: String,
}

/// Which JSON shape the service hands back to the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultShape {
    Flat,
    #[default]
    Tagged,
}

impl FromStr for ResultShape {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "flat" => Ok(ResultShape::Flat),
            "tagged" => Ok(ResultShape::Tagged),
            other => Err(format!("unknown result shape: {other}")),
        }
    }
}

/// At most five enriched results from one generation, in model order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResultSet {
    Tagged {
        input_analysis_tags: Vec<String>,
        results: Vec<EnrichedResult>,
    },
    Flat(Vec<EnrichedResult>),
}

impl ResultSet {
    pub fn empty(shape: ResultShape) -> Self {
        Self::build(shape, Vec::new(), Vec::new())
    }

    pub fn build(shape: ResultShape, tags: Vec<String>, results: Vec<EnrichedResult>) -> Self {
        match shape {
            ResultShape::Flat => ResultSet::Flat(results),
            ResultShape::Tagged => ResultSet::Tagged {
                input_analysis_tags: tags,
                results,
            },
        }
    }

    pub fn results(&self) -> &[EnrichedResult] {
        match self {
            ResultSet::Tagged { results, .. } => results,
            ResultSet::Flat(results) => results,
        }
    }

    pub fn tags(&self) -> &[String] {
        match self {
            ResultSet::Tagged {
                input_analysis_tags,
                ..
            } => input_analysis_tags,
            ResultSet::Flat(_) => &[],
        }
    }

    pub fn len(&self) -> usize {
        self.results().len()
    }

    pub fn is_empty(&self) -> bool {
        self.results().is_empty()
    }
}

// Gemini generateContent request format
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GeminiRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

impl GeminiRequest {
    /// Single user turn asking for a JSON reply.
    pub fn json_prompt(prompt: String, temperature: Option<f32>) -> Self {
        Self {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part { text: Some(prompt) }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                temperature,
            },
        }
    }

    pub fn prompt_text(&self) -> String {
        self.contents
            .iter()
            .flat_map(|c| c.parts.iter())
            .filter_map(|p| p.text.as_deref())
            .collect()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_mime_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

// Gemini generateContent response format
#[derive(Debug, Deserialize, Clone, Default)]
pub struct GeminiResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

impl GeminiResponse {
    /// Wraps `text` as a single-candidate reply.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            candidates: vec![Candidate {
                content: Some(Content {
                    role: Some("model".to_string()),
                    parts: vec![Part {
                        text: Some(text.into()),
                    }],
                }),
                finish_reason: Some("STOP".to_string()),
            }],
        }
    }

    /// Text parts of the first candidate, concatenated.
    pub fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.is_empty() { None } else { Some(text) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filters_accept_every_naming_revision() {
        let camel: Filters = serde_json::from_value(json!({
            "mediaType": "Book", "eraVibe": "All", "nicheLevel": "Deep", "time": ""
        }))
        .unwrap();
        let short: Filters =
            serde_json::from_value(json!({ "media": "Book", "era": "All", "depth": "Deep" }))
                .unwrap();

        assert_eq!(camel.active(), vec![("Media Type", "Book"), ("Niche Level", "Deep")]);
        assert_eq!(short.active(), camel.active());
    }

    #[test]
    fn test_all_sentinel_is_case_insensitive() {
        assert!(is_unconstrained("All"));
        assert!(is_unconstrained(" all "));
        assert!(is_unconstrained(""));
        assert!(!is_unconstrained("Allegory"));
    }

    #[test]
    fn test_raw_result_text_skips_empty_and_missing() {
        let raw = RawResult::from(
            json!({ "title_ja": "", "title": "AKIRA", "year": 1988 })
                .as_object()
                .unwrap()
                .clone(),
        );
        assert_eq!(raw.text(&["title_ja", "title"]), "AKIRA");
        assert_eq!(raw.text(&["year"]), "1988");
        assert_eq!(raw.text(&["creator"]), "");
    }

    #[test]
    fn test_result_set_shapes_serialize_as_expected() {
        let tagged = ResultSet::empty(ResultShape::Tagged);
        let flat = ResultSet::empty(ResultShape::Flat);
        assert_eq!(
            serde_json::to_value(&tagged).unwrap(),
            json!({ "input_analysis_tags": [], "results": [] })
        );
        assert_eq!(serde_json::to_value(&flat).unwrap(), json!([]));
    }

    #[test]
    fn test_mode_parses_any_casing() {
        let mode: Mode = serde_json::from_str("\"Visual\"").unwrap();
        assert_eq!(mode, Mode::Visual);
        assert_eq!(serde_json::to_string(&mode).unwrap(), "\"visual\"");
        assert!(serde_json::from_str::<Mode>("\"poetic\"").is_err());
    }

    #[test]
    fn test_generate_request_accepts_keyword_alias() {
        let req: GenerateRequest =
            serde_json::from_value(json!({ "keyword": "Noir", "mode": "visual" })).unwrap();
        assert_eq!(req.query, "Noir");
        assert_eq!(req.mode, Mode::Visual);
        assert!(req.filters.is_none());
    }

    #[test]
    fn test_gemini_response_text_joins_parts() {
        let resp: GeminiResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "[{" }, { "text": "}]" }] },
                "finishReason": "STOP"
            }]
        }))
        .unwrap();
        assert_eq!(resp.text().as_deref(), Some("[{}]"));
        assert_eq!(GeminiResponse::default().text(), None);
    }
}
