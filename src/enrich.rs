use std::sync::Arc;

use crate::covers::CoverLookup;
use crate::models::{EnrichedResult, RawResult};

pub const QUERY_PLACEHOLDER: &str = "{query}";

/// Attaches a cover image and a retail search link to each model item.
pub struct Enricher {
    covers: Arc<dyn CoverLookup>,
    retail_search_url: String,
}

impl Enricher {
    pub fn new(covers: Arc<dyn CoverLookup>, retail_search_url: impl Into<String>) -> Self {
        Self {
            covers,
            retail_search_url: retail_search_url.into(),
        }
    }

    /// Never fails: missing fields default to empty and the cover lookup
    /// degrades to `None`.
    pub async fn enrich(&self, item: RawResult) -> EnrichedResult {
        let title_ja = item.text(&["title_ja", "title"]);
        let title_en = item.text(&["title_en"]);
        let creator = item.text(&["creator"]);

        let lookup_title = if title_ja.is_empty() { &title_en } else { &title_ja };
        let image_url = self.covers.lookup(lookup_title, &creator).await;
        let retail_url = retail_url(&self.retail_search_url, &title_ja, &creator);

        EnrichedResult {
            media_type: item.text(&["media_type", "category"]),
            analysis: item.text(&["analysis", "reason"]),
            structural_insight: item.text(&["structural_insight"]),
            match_tags: item.tags("match_tags"),
            title_ja,
            title_en,
            creator,
            image_url,
            retail_url,
        }
    }
}

/// Percent-encodes `"<title> <creator>"` into the search template. No check
/// is made that the store actually carries the work.
pub fn retail_url(template: &str, title: &str, creator: &str) -> String {
    let terms = format!("{title} {creator}");
    let encoded = urlencoding::encode(&terms);
    if template.contains(QUERY_PLACEHOLDER) {
        template.replace(QUERY_PLACEHOLDER, &encoded)
    } else {
        format!("{template}{encoded}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::covers::MockCoverLookup;
    use mockall::predicate::eq;
    use serde_json::json;

    const AMAZON: &str = "https://www.amazon.co.jp/s?k={query}";

    fn raw(value: serde_json::Value) -> RawResult {
        RawResult::from(value.as_object().cloned().unwrap_or_default())
    }

    fn enricher(covers: MockCoverLookup) -> Enricher {
        Enricher::new(Arc::new(covers), AMAZON)
    }

    #[test]
    fn test_retail_url_encodes_title_and_creator() {
        assert_eq!(
            retail_url(AMAZON, "AKIRA", "大友克洋"),
            "https://www.amazon.co.jp/s?k=AKIRA%20%E5%A4%A7%E5%8F%8B%E5%85%8B%E6%B4%8B"
        );
    }

    #[test]
    fn test_retail_url_exists_for_empty_fields() {
        assert_eq!(retail_url(AMAZON, "", ""), "https://www.amazon.co.jp/s?k=%20");
    }

    #[test]
    fn test_retail_template_without_placeholder_appends() {
        assert_eq!(
            retail_url("https://shop.example/?q=", "Dune", "Herbert"),
            "https://shop.example/?q=Dune%20Herbert"
        );
    }

    #[tokio::test]
    async fn test_localized_title_drives_lookup_and_link() {
        let mut covers = MockCoverLookup::new();
        covers
            .expect_lookup()
            .with(eq("攻殻機動隊"), eq("士郎正宗"))
            .times(1)
            .returning(|_, _| Some("https://covers/gits.jpg".to_string()));

        let item = raw(json!({
            "title_ja": "攻殻機動隊",
            "title_en": "Ghost in the Shell",
            "creator": "士郎正宗",
            "media_type": "漫画",
            "analysis": "…",
            "structural_insight": "…",
            "match_tags": ["電脳", "身体"]
        }));
        let result = enricher(covers).enrich(item).await;

        assert_eq!(result.title_ja, "攻殻機動隊");
        assert_eq!(result.title_en, "Ghost in the Shell");
        assert_eq!(result.image_url.as_deref(), Some("https://covers/gits.jpg"));
        assert!(result.retail_url.contains(urlencoding::encode("攻殻機動隊").as_ref()));
        assert!(result.retail_url.contains(urlencoding::encode("士郎正宗").as_ref()));
        assert_eq!(result.match_tags, vec!["電脳", "身体"]);
    }

    #[tokio::test]
    async fn test_legacy_field_names_are_mapped() {
        let mut covers = MockCoverLookup::new();
        covers.expect_lookup().returning(|_, _| None);

        let item = raw(json!({
            "title": "Blade Runner",
            "creator": "Ridley Scott",
            "category": "MOVIE",
            "reason": "rain-soaked neon"
        }));
        let result = enricher(covers).enrich(item).await;

        assert_eq!(result.title_ja, "Blade Runner");
        assert_eq!(result.media_type, "MOVIE");
        assert_eq!(result.analysis, "rain-soaked neon");
        assert_eq!(result.image_url, None);
        assert!(result.match_tags.is_empty());
    }

    #[tokio::test]
    async fn test_english_title_is_the_lookup_fallback() {
        let mut covers = MockCoverLookup::new();
        covers
            .expect_lookup()
            .with(eq("Solaris"), eq(""))
            .times(1)
            .returning(|_, _| None);

        let result = enricher(covers).enrich(raw(json!({ "title_en": "Solaris" }))).await;

        assert_eq!(result.title_ja, "");
        assert_eq!(result.creator, "");
        assert_eq!(result.retail_url, "https://www.amazon.co.jp/s?k=%20");
    }

    #[tokio::test]
    async fn test_empty_item_still_gets_a_link() {
        let mut covers = MockCoverLookup::new();
        covers.expect_lookup().returning(|_, _| None);

        let result = enricher(covers).enrich(RawResult::default()).await;
        assert_eq!(result.title_ja, "");
        assert!(!result.retail_url.is_empty());
    }
}
