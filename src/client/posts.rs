//! client extensions for post listings
use {
    crate::{
        client::BooruClient,
        error::*,
        models::{Post, SearchPage, UpstreamPost},
        query::build_upstream_query,
    },
    tracing::{debug, instrument},
};

/// pull the `count` attribute out of the upstream's xml count response
pub fn parse_total_count(xml: &str) -> Option<u64> {
    const MARKER: &str = "<posts count=\"";

    let start = xml.find(MARKER)? + MARKER.len();
    let digits: String = xml[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();

    digits.parse().ok()
}

impl BooruClient {
    /// search posts with modifier-prefixed tag strings
    ///
    /// the listing and the total count are fetched concurrently. if either comes back empty the
    /// page is empty with a total of 0
    #[instrument(skip(self, query), fields(tags = query.len()))]
    pub async fn search_posts(&self, query: &[String], pid: Option<u32>) -> Result<SearchPage> {
        let tags = build_upstream_query(&self.endpoints.sort, query);
        debug!(tags = %tags, "searching posts");

        let (listing, count) = tokio::try_join!(
            self.fetch_dapi(&tags, self.endpoints.page_size, pid),
            self.fetch_dapi(&tags, 0, None)
        )?;

        if listing.trim().is_empty() || count.trim().is_empty() {
            debug!("upstream returned an empty body");
            return Ok(SearchPage::default());
        }

        let posts: Vec<UpstreamPost> = serde_json::from_str(&listing)
            .map_err(|e| B34Error::UpstreamFormat(format!("post listing: {}", e)))?;
        let total = parse_total_count(&count).unwrap_or(0);
        let data: Vec<Post> = posts.into_iter().map(Post::from).collect();

        debug!(count = data.len(), total, "fetched posts");
        Ok(SearchPage { data, total })
    }

    /// one dapi call. `limit = 0` returns the xml count document instead of posts
    async fn fetch_dapi(&self, tags: &str, limit: u32, pid: Option<u32>) -> Result<String> {
        let mut params: Vec<(&str, String)> = vec![
            ("page", "dapi".to_string()),
            ("s", "post".to_string()),
            ("q", "index".to_string()),
        ];

        if limit > 0 {
            params.push(("fields", "tag_info".to_string()));
            params.push(("json", "1".to_string()));
        }

        params.push(("limit", limit.to_string()));
        params.push(("tags", tags.to_string()));

        if let Some(pid) = pid {
            params.push(("pid", pid.to_string()));
        }

        let response = self
            .client
            .get(&self.endpoints.api_url)
            .query(&params)
            .send()
            .await?;

        Ok(Self::check_status(response)?.text().await?)
    }
}
