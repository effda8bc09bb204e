use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

#[cfg(test)]
use mockall::automock;

use crate::config::BooksConfig;

/// Resolves a cover thumbnail for a work.
///
/// "No match" and "provider failed" both come back as `None`: a missing
/// image is an ordinary outcome and the page renders a placeholder for it.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CoverLookup: Send + Sync {
    async fn lookup(&self, title: &str, creator: &str) -> Option<String>;
}

/// Google Books volumes search, one result per query.
pub struct GoogleBooksLookup {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl GoogleBooksLookup {
    pub fn new(cfg: &BooksConfig) -> Self {
        Self {
            client: Client::new(),
            endpoint: cfg.endpoint.clone(),
            api_key: cfg.api_key.clone().filter(|k| !k.is_empty()),
        }
    }

    fn search_url(&self, title: &str, creator: &str) -> String {
        let mut url = format!(
            "{}?q={}&maxResults=1",
            self.endpoint,
            urlencoding::encode(&volume_query(title, creator))
        );
        if let Some(key) = &self.api_key {
            url.push_str("&key=");
            url.push_str(&urlencoding::encode(key));
        }
        url
    }

    async fn fetch(&self, url: &str) -> Result<Value, reqwest::Error> {
        self.client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await
    }
}

#[async_trait]
impl CoverLookup for GoogleBooksLookup {
    async fn lookup(&self, title: &str, creator: &str) -> Option<String> {
        if title.trim().is_empty() {
            tracing::debug!("Skipping cover lookup for an untitled item");
            return None;
        }

        let url = self.search_url(title, creator);
        match self.fetch(&url).await {
            Ok(body) => {
                let thumbnail = thumbnail_from_volumes(&body);
                if thumbnail.is_none() {
                    tracing::debug!("No cover found for '{}' by '{}'", title, creator);
                }
                thumbnail
            }
            Err(e) => {
                tracing::warn!("Cover lookup failed for '{}': {}", title, e);
                None
            }
        }
    }
}

/// Exact-title and exact-author operators keep encyclopedias and
/// companion guides that merely share a keyword out of the first slot.
pub fn volume_query(title: &str, creator: &str) -> String {
    let creator = creator.trim();
    if creator.is_empty() {
        format!("intitle:\"{title}\"")
    } else {
        format!("intitle:\"{title}\" inauthor:\"{creator}\"")
    }
}

/// First volume's thumbnail, upgraded to https.
pub fn thumbnail_from_volumes(body: &Value) -> Option<String> {
    let links = body.get("items")?.get(0)?.get("volumeInfo")?.get("imageLinks")?;
    let url = links
        .get("thumbnail")
        .or_else(|| links.get("smallThumbnail"))?
        .as_str()?;
    if url.is_empty() {
        return None;
    }
    Some(match url.strip_prefix("http://") {
        Some(rest) => format!("https://{rest}"),
        None => url.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn lookup_at(endpoint: &str, api_key: Option<&str>) -> GoogleBooksLookup {
        GoogleBooksLookup::new(&BooksConfig {
            endpoint: endpoint.to_string(),
            api_key: api_key.map(str::to_string),
        })
    }

    #[test]
    fn test_query_uses_exact_operators() {
        assert_eq!(
            volume_query("Neuromancer", "William Gibson"),
            r#"intitle:"Neuromancer" inauthor:"William Gibson""#
        );
        assert_eq!(volume_query("Neuromancer", " "), r#"intitle:"Neuromancer""#);
    }

    #[test]
    fn test_search_url_is_encoded_and_capped() {
        let lookup = lookup_at("https://www.googleapis.com/books/v1/volumes", Some("k1"));
        let url = lookup.search_url("AKIRA", "大友克洋");
        assert!(url.starts_with("https://www.googleapis.com/books/v1/volumes?q=intitle%3A%22AKIRA%22"));
        assert!(url.contains("%E5%A4%A7%E5%8F%8B"));
        assert!(url.contains("&maxResults=1"));
        assert!(url.ends_with("&key=k1"));
    }

    #[test]
    fn test_thumbnail_is_upgraded_to_https() {
        let body = json!({
            "items": [{ "volumeInfo": { "imageLinks": {
                "thumbnail": "http://books.google.com/books/content?id=x&printsec=frontcover"
            }}}]
        });
        assert_eq!(
            thumbnail_from_volumes(&body).as_deref(),
            Some("https://books.google.com/books/content?id=x&printsec=frontcover")
        );
    }

    #[test]
    fn test_small_thumbnail_is_a_fallback() {
        let body = json!({
            "items": [{ "volumeInfo": { "imageLinks": { "smallThumbnail": "https://x/y" }}}]
        });
        assert_eq!(thumbnail_from_volumes(&body).as_deref(), Some("https://x/y"));
    }

    #[test]
    fn test_missing_records_yield_none() {
        assert_eq!(thumbnail_from_volumes(&json!({ "totalItems": 0 })), None);
        assert_eq!(thumbnail_from_volumes(&json!({ "items": [] })), None);
        assert_eq!(
            thumbnail_from_volumes(&json!({ "items": [{ "volumeInfo": { "title": "x" } }] })),
            None
        );
    }

    #[tokio::test]
    async fn test_unreachable_provider_yields_none() {
        let lookup = lookup_at("http://127.0.0.1:9/books/v1/volumes", None);
        assert_eq!(lookup.lookup("Neuromancer", "William Gibson").await, None);
    }

    #[tokio::test]
    async fn test_empty_title_skips_the_request() {
        let lookup = lookup_at("http://127.0.0.1:9/books/v1/volumes", None);
        assert_eq!(lookup.lookup("  ", "Anyone").await, None);
    }
}
