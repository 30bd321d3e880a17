//! launching the relay
use {
    crate::{
        client::BooruClient,
        error::*,
        serve::{
            cfg::ServerConfig,
            routes::{
                AppState, autocomplete_handler, default_catcher, proxy_handler, search_handler,
            },
        },
    },
    rocket::{Build, Rocket, catchers, routes},
    std::sync::Arc,
    tracing::info,
};

/// the same-origin relay in front of the booru
#[derive(Clone)]
pub struct RelayServer {
    /// how to run
    config: ServerConfig,
}

impl RelayServer {
    /// make a new relay
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    /// run until shut down
    pub async fn serve(self) -> Result<()> {
        let client = BooruClient::new()?;
        let state = Arc::new(AppState::new(client, self.config.media_policy.clone()));
        let rocket = self.build_rocket(state);

        info!("base34 relay running at http://{}", self.config.bind_address);
        info!(
            "Media proxy: {}",
            if self.config.enable_proxy {
                "enabled"
            } else {
                "disabled"
            }
        );

        rocket.launch().await?;

        Ok(())
    }

    /// assemble the rocket instance without launching it
    pub fn build_rocket(&self, state: Arc<AppState>) -> Rocket<Build> {
        let figment = rocket::Config::figment()
            .merge(("address", self.config.bind_address.ip()))
            .merge(("port", self.config.bind_address.port()))
            .merge(("log_level", "off"))
            .merge(("cli_colors", false));

        let rocket = rocket::custom(figment)
            .manage(state)
            .mount("/", routes![autocomplete_handler, search_handler])
            .register("/", catchers![default_catcher]);

        if self.config.enable_proxy {
            rocket.mount("/", routes![proxy_handler])
        } else {
            rocket
        }
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            client::{
                media::MediaPolicy,
                testing::{Canned, endpoints, serve},
            },
            models::{ErrorBody, SearchPage, Tag},
        },
        rocket::{
            http::{ContentType, Status},
            local::asynchronous::Client,
        },
    };

    const LISTING: &str = r#"[{"id": 9, "file_url": "https://api-cdn.rule34.xxx/images/9.gif",
        "sample_url": "https://api-cdn.rule34.xxx/samples/9.jpg", "width": 1, "height": 1,
        "rating": "questionable", "score": 3, "tags": "x", "change": 1}]"#;

    fn fake_upstream(target: &str) -> Canned {
        if target.starts_with("/autocomplete.php") {
            Canned::ok(
                "application/json",
                r#"[{"label": "cat_ears (77)", "value": "cat_ears", "type": "general"}]"#,
            )
        } else if target.starts_with("/media/missing") {
            Canned::status(404)
        } else if target.starts_with("/media/") {
            Canned::ok("video/webm", b"\x1a\x45\xdf\xa3media".to_vec())
        } else if target.contains("limit=0") {
            Canned::ok("text/xml", r#"<posts count="1" offset="0"></posts>"#)
        } else {
            Canned::ok("application/json", LISTING)
        }
    }

    async fn relay(enable_proxy: bool) -> (Client, String) {
        let (base, _) = serve(fake_upstream).await;
        let policy = MediaPolicy {
            allowed_hosts: vec!["127.0.0.1".to_string()],
            cache_max_age: 600,
            user_agent: "relay-test".to_string(),
        };
        let config = ServerConfig::builder()
            .enable_proxy(enable_proxy)
            .media_policy(policy.clone())
            .build()
            .unwrap();
        let client = BooruClient::with_endpoints(endpoints(&base)).unwrap();
        let state = Arc::new(AppState::new(client, policy));
        let rocket = RelayServer::new(config).build_rocket(state);

        (Client::tracked(rocket).await.unwrap(), base)
    }

    #[tokio::test]
    async fn test_autocomplete_route() {
        let (client, _) = relay(true).await;

        let response = client
            .post("/api/autocomplete")
            .header(ContentType::JSON)
            .body(r#"{"query": "cat ears"}"#)
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::Ok);
        let tags: Vec<Tag> = response.into_json().await.unwrap();
        assert_eq!(tags[0].label, "cat ears");
        assert_eq!(tags[0].count, 77);
    }

    #[tokio::test]
    async fn test_autocomplete_route_empty_query() {
        let (client, _) = relay(true).await;

        let response = client
            .post("/api/autocomplete")
            .body(r#"{"query": "   "}"#)
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::Ok);
        assert_eq!(response.into_string().await.unwrap(), "[]");
    }

    #[tokio::test]
    async fn test_search_route() {
        let (client, _) = relay(true).await;

        let response = client
            .post("/api/search")
            .body(r#"{"query": ["+x"], "pid": 0}"#)
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::Ok);
        let page: SearchPage = response.into_json().await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.data[0].id, 9);
    }

    #[tokio::test]
    async fn test_search_route_rejects_non_array_query() {
        let (client, _) = relay(true).await;

        let response = client
            .post("/api/search")
            .body(r#"{"query": "x"}"#)
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::BadRequest);
        let body: ErrorBody = response.into_json().await.unwrap();
        assert_eq!(body.error, "Invalid query format");
    }

    #[tokio::test]
    async fn test_proxy_streams_allowed_media() {
        let (client, base) = relay(true).await;
        let target = urlencoding::encode(&format!("{}/media/clip.webm", base)).into_owned();

        let response = client
            .get(format!("/api/proxy?query={}", target))
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::Ok);
        assert_eq!(
            response.headers().get_one("Cache-Control"),
            Some("public, max-age=600")
        );
        assert_eq!(response.content_type(), Some(ContentType::new("video", "webm")));
        assert_eq!(
            response.into_bytes().await.unwrap(),
            b"\x1a\x45\xdf\xa3media".to_vec()
        );
    }

    #[tokio::test]
    async fn test_proxy_rejections() {
        let (client, base) = relay(true).await;

        let missing = client.get("/api/proxy").dispatch().await;
        assert_eq!(missing.status(), Status::BadRequest);

        let foreign = client
            .get("/api/proxy?query=https%3A%2F%2Fevil.example%2Fa.png")
            .dispatch()
            .await;
        assert_eq!(foreign.status(), Status::Forbidden);
        let body: ErrorBody = foreign.into_json().await.unwrap();
        assert_eq!(body.error, "Invalid domain");

        let target = urlencoding::encode(&format!("{}/media/missing.png", base)).into_owned();
        let gone = client
            .get(format!("/api/proxy?query={}", target))
            .dispatch()
            .await;
        assert_eq!(gone.status(), Status::NotFound);
        let body: ErrorBody = gone.into_json().await.unwrap();
        assert_eq!(body.error, "Failed to fetch the resource");
    }

    #[tokio::test]
    async fn test_proxy_can_be_disabled() {
        let (client, _) = relay(false).await;

        let response = client
            .get("/api/proxy?query=https%3A%2F%2Fapi-cdn.rule34.xxx%2Fa.png")
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::NotFound);
    }
}
