//! client extensions for tag autocompletion
use {
    crate::{
        client::BooruClient,
        error::*,
        models::{Tag, UpstreamSuggestion},
        query::normalize_tag,
    },
    reqwest::header::REFERER,
    tracing::{debug, instrument},
};

impl BooruClient {
    /// fetch tag suggestions for a partial query
    ///
    /// the query is trimmed and its whitespace turned into underscores first. an empty query
    /// never reaches the upstream
    #[instrument(skip(self))]
    pub async fn autocomplete(&self, query: &str) -> Result<Vec<Tag>> {
        let query = normalize_tag(query);
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .get(&self.endpoints.autocomplete_url)
            .query(&[("q", query.as_str())])
            .header(REFERER, &self.endpoints.referer)
            .send()
            .await?;
        let bytes = Self::check_status(response)?.bytes().await?;

        let items: Vec<UpstreamSuggestion> = serde_json::from_slice(&bytes)
            .map_err(|e| B34Error::UpstreamFormat(format!("autocomplete: {}", e)))?;
        let tags: Vec<Tag> = items.into_iter().map(Tag::from).collect();

        debug!(count = tags.len(), "fetched suggestions");
        Ok(tags)
    }
}

#[cfg(test)]
mod tests {
    use {
        crate::{
            client::{
                BooruClient,
                testing::{Canned, endpoints, serve},
            },
            error::B34Error,
            models::{TagSource, TagType},
        },
    };

    #[tokio::test]
    async fn test_autocomplete_maps_upstream_entries() {
        let (base, seen) = serve(|_| {
            Canned::ok(
                "application/json",
                r#"[
                    {"label": "blue_sky (1234)", "value": "blue_sky", "type": "general"},
                    {"label": "pok&eacute;mon (99)", "value": "pok&eacute;mon", "type": "copyright"}
                ]"#,
            )
        })
        .await;
        let client = BooruClient::with_endpoints(endpoints(&base)).unwrap();

        let tags = client.autocomplete("  blue  sky ").await.unwrap();

        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].label, "blue sky");
        assert_eq!(tags[0].count, 1234);
        assert_eq!(tags[0].source, TagSource::Rule34);
        assert_eq!(tags[1].label, "pokémon");
        assert_eq!(tags[1].kind, TagType::Copyright);

        let requests = seen.lock().unwrap();
        assert!(requests[0].starts_with("GET /autocomplete.php?q=blue_sky "));
        assert!(requests[0].to_lowercase().contains("referer: https://rule34.xxx/"));
    }

    #[tokio::test]
    async fn test_autocomplete_skips_empty_queries() {
        let (base, seen) = serve(|_| Canned::ok("application/json", "[]")).await;
        let client = BooruClient::with_endpoints(endpoints(&base)).unwrap();

        assert!(client.autocomplete("   ").await.unwrap().is_empty());
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_autocomplete_reports_upstream_failures() {
        let (base, _) = serve(|_| Canned::status(503)).await;
        let client = BooruClient::with_endpoints(endpoints(&base)).unwrap();

        let err = client.autocomplete("cat").await.unwrap_err();
        assert!(matches!(err, B34Error::Upstream { status: 503, .. }));
    }
}
