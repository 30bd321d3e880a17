//! routes for the relay
use {
    crate::{
        client::{
            BooruClient,
            media::{MediaPolicy, ProxyRejection},
        },
        models::{AutocompleteRequest, ErrorBody, SearchPage, Tag},
        serve::responses::{ApiError, ProxiedMedia},
    },
    rocket::{Request, State, catch, get, http::Status, post, serde::json::Json},
    serde_json::Value,
    std::sync::Arc,
    tracing::{debug, error, warn},
};

/// the state of the relay
pub struct AppState {
    /// the upstream client
    pub client: BooruClient,
    /// what the proxy may fetch
    pub media_policy: MediaPolicy,
}

impl AppState {
    /// initialize a new AppState
    pub fn new(client: BooruClient, media_policy: MediaPolicy) -> Self {
        Self {
            client,
            media_policy,
        }
    }
}

/// read the `query` array and optional `pid` out of a search body
fn parse_search_body(body: &str) -> Result<(Vec<String>, Option<u32>), ApiError> {
    let value: Value = serde_json::from_str(body).map_err(|e| {
        debug!(error = %e, "unreadable search body");
        ApiError::internal("Failed to fetch data")
    })?;

    let Some(items) = value.get("query").and_then(Value::as_array) else {
        return Err(ApiError::bad_request("Invalid query format"));
    };

    let query = items
        .iter()
        .map(|v| v.as_str().map(str::to_string))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| ApiError::bad_request("Invalid query format"))?;

    let pid = match value.get("pid") {
        None | Some(Value::Null) => None,
        Some(v) => Some(
            v.as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .ok_or_else(|| ApiError::bad_request("Invalid page"))?,
        ),
    };

    Ok((query, pid))
}

#[post("/api/autocomplete", data = "<body>")]
/// tag suggestions for a partial query
pub async fn autocomplete_handler(
    state: &State<Arc<AppState>>,
    body: String,
) -> Result<Json<Vec<Tag>>, ApiError> {
    let request: AutocompleteRequest = serde_json::from_str(&body).map_err(|e| {
        debug!(error = %e, "unreadable autocomplete body");
        ApiError::internal("Failed to fetch data")
    })?;

    state
        .client
        .autocomplete(&request.query)
        .await
        .map(Json)
        .map_err(|e| {
            error!(error = %e, "autocomplete failed");
            ApiError::internal("Failed to fetch data")
        })
}

#[post("/api/search", data = "<body>")]
/// one page of posts plus the total match count
pub async fn search_handler(
    state: &State<Arc<AppState>>,
    body: String,
) -> Result<Json<SearchPage>, ApiError> {
    let (query, pid) = parse_search_body(&body)?;

    state
        .client
        .search_posts(&query, pid)
        .await
        .map(Json)
        .map_err(|e| {
            error!(error = %e, "search failed");
            ApiError::internal("Failed to fetch data")
        })
}

#[get("/api/proxy?<query>")]
/// relay a media file from an allow-listed host
pub async fn proxy_handler(
    state: &State<Arc<AppState>>,
    query: Option<String>,
) -> Result<ProxiedMedia, ApiError> {
    let policy = &state.media_policy;

    let url = policy.check(query.as_deref()).map_err(|rejection| {
        warn!(requested = ?query, %rejection, "proxy request rejected");
        match rejection {
            ProxyRejection::Missing => ApiError::bad_request(rejection.to_string()),
            ProxyRejection::InvalidDomain => {
                ApiError::new(Status::Forbidden, rejection.to_string())
            }
            ProxyRejection::Unparseable => ApiError::internal(rejection.to_string()),
        }
    })?;

    let upstream = state.client.fetch_media(&url, policy).await.map_err(|e| {
        error!(error = %e, "media fetch failed");
        ApiError::internal("An unexpected error occurred")
    })?;

    if !upstream.status().is_success() {
        let status = Status::new(upstream.status().as_u16());
        return Err(ApiError::new(status, "Failed to fetch the resource"));
    }

    Ok(ProxiedMedia {
        upstream,
        cache_control: policy.cache_control(),
    })
}

#[catch(default)]
/// every unmatched request gets a JSON error body too
pub fn default_catcher(status: Status, _req: &Request<'_>) -> Json<ErrorBody> {
    Json(ErrorBody::new(status.reason_lossy()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search_body() {
        let (query, pid) = parse_search_body(r#"{"query": ["+a", "-b"], "pid": 2}"#).unwrap();
        assert_eq!(query, vec!["+a", "-b"]);
        assert_eq!(pid, Some(2));

        let (query, pid) = parse_search_body(r#"{"query": []}"#).unwrap();
        assert!(query.is_empty());
        assert_eq!(pid, None);
    }

    #[test]
    fn test_parse_search_body_rejects_non_arrays() {
        for body in [
            r#"{"query": "a b"}"#,
            r#"{"query": [1, 2]}"#,
            r#"{}"#,
            r#"{"query": ["a"], "pid": -1}"#,
        ] {
            let err = parse_search_body(body).unwrap_err();
            assert_eq!(err.status, Status::BadRequest, "{}", body);
        }
    }

    #[test]
    fn test_parse_search_body_unreadable_json() {
        let err = parse_search_body("not json").unwrap_err();
        assert_eq!(err.status, Status::InternalServerError);
    }
}
