//! where a session gets its suggestions and posts from
use {
    crate::{
        client::BooruClient,
        error::*,
        models::{AutocompleteRequest, ErrorBody, SearchPage, SearchRequest, Tag},
    },
    async_trait::async_trait,
    reqwest::{Client, Response},
    serde::de::DeserializeOwned,
    std::time::Duration,
    tracing::{debug, instrument},
    url::Url,
};

/// the two operations a session needs
#[async_trait]
pub trait SearchApi: Send + Sync {
    /// tag suggestions for a partial query
    async fn autocomplete(&self, query: &str) -> Result<Vec<Tag>>;

    /// one page of posts for modifier-prefixed tag strings
    async fn search(&self, query: &[String], pid: Option<u32>) -> Result<SearchPage>;
}

#[async_trait]
impl SearchApi for BooruClient {
    async fn autocomplete(&self, query: &str) -> Result<Vec<Tag>> {
        BooruClient::autocomplete(self, query).await
    }

    async fn search(&self, query: &[String], pid: Option<u32>) -> Result<SearchPage> {
        self.search_posts(query, pid).await
    }
}

/// talks to a running relay over http
#[derive(Clone, Debug)]
pub struct RemoteApi {
    /// the http client
    client: Client,
    /// where the relay lives
    base: Url,
}

impl RemoteApi {
    /// a client for the relay at `base`, e.g. `http://127.0.0.1:3034`
    pub fn new(base: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(crate::getopt!(http.timeout_secs)))
            .connect_timeout(Duration::from_secs(crate::getopt!(http.connect_timeout_secs)))
            .build()?;

        Ok(Self {
            client,
            base: Url::parse(base)?,
        })
    }

    /// where the relay lives
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// decode a relay response, turning its error bodies into errors
    async fn read<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        let url = response.url().to_string();

        if status.is_success() {
            return Ok(response.json().await?);
        }

        match response.json::<ErrorBody>().await {
            Ok(body) => {
                debug!(status = status.as_u16(), error = %body.error, "relay refused request");
                Err(B34Error::Other(body.error))
            }
            Err(_) => Err(B34Error::Upstream {
                status: status.as_u16(),
                url,
            }),
        }
    }
}

#[async_trait]
impl SearchApi for RemoteApi {
    #[instrument(skip(self))]
    async fn autocomplete(&self, query: &str) -> Result<Vec<Tag>> {
        let response = self
            .client
            .post(self.base.join("/api/autocomplete")?)
            .json(&AutocompleteRequest {
                query: query.to_string(),
            })
            .send()
            .await?;

        Self::read(response).await
    }

    #[instrument(skip(self, query), fields(tags = query.len()))]
    async fn search(&self, query: &[String], pid: Option<u32>) -> Result<SearchPage> {
        let response = self
            .client
            .post(self.base.join("/api/search")?)
            .json(&SearchRequest {
                query: query.to_vec(),
                pid,
            })
            .send()
            .await?;

        Self::read(response).await
    }
}
