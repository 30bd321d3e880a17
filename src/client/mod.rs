//! rule34 api stuff
use {
    crate::{error::*, getopt, opt_and},
    color_eyre::eyre::Context,
    reqwest::{Client, Response},
    std::time::Duration,
    tracing::{debug, info},
};

pub mod autocomplete;
pub mod media;
pub mod posts;

/// where the client sends its requests
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoints {
    /// the dapi endpoint for listings and counts
    pub api_url: String,
    /// the tag autocompletion endpoint
    pub autocomplete_url: String,
    /// referer sent with autocompletion requests
    pub referer: String,
    /// sort directive every query starts with
    pub sort: String,
    /// posts per page
    pub page_size: u32,
}

impl Endpoints {
    /// read the endpoints from the loaded configuration
    pub fn from_config() -> Self {
        Self {
            api_url: getopt!(upstream.api_url),
            autocomplete_url: getopt!(upstream.autocomplete_url),
            referer: getopt!(upstream.referer),
            sort: getopt!(upstream.sort),
            page_size: getopt!(upstream.page_size),
        }
    }
}

/// the client
#[derive(Clone, Debug)]
pub struct BooruClient {
    /// the http client used for api requests
    pub client: Client,
    /// the http client used for media, which has no total timeout
    pub media_client: Client,
    /// where requests go
    pub endpoints: Endpoints,
}

impl BooruClient {
    /// make a new client from the loaded configuration
    pub fn new() -> Result<Self> {
        Self::with_endpoints(Endpoints::from_config())
    }

    /// make a new client that talks to the given endpoints
    pub fn with_endpoints(endpoints: Endpoints) -> Result<Self> {
        let client = Self::build_http_client(true)?;
        let media_client = Self::build_http_client(false)?;

        info!(
            api = %endpoints.api_url,
            autocomplete = %endpoints.autocomplete_url,
            "initialized http client"
        );

        Ok(Self {
            client,
            media_client,
            endpoints,
        })
    }

    /// build an http client based on the loaded configuration
    ///
    /// media responses are streamed for as long as they take, so they only get a connect timeout
    fn build_http_client(with_timeout: bool) -> Result<Client> {
        let mut client_builder = Client::builder()
            .user_agent(getopt!(http.user_agent))
            .connect_timeout(Duration::from_secs(getopt!(http.connect_timeout_secs)))
            .pool_max_idle_per_host(getopt!(http.pool_max_idle_per_host))
            .pool_idle_timeout(Duration::from_secs(getopt!(http.pool_idle_timeout_secs)));

        if with_timeout {
            client_builder = client_builder.timeout(Duration::from_secs(getopt!(http.timeout_secs)));
        }

        opt_and!(
            http.tcp_keepalive,
            client_builder =
                client_builder.tcp_keepalive(Duration::from_secs(getopt!(http.tcp_keepalive_secs)))
        );

        Ok(client_builder
            .build()
            .context("failed to build http client")?)
    }

    /// fail with [`B34Error::Upstream`] unless the response is a success
    pub(crate) fn check_status(response: Response) -> Result<Response> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        debug!(status = status.as_u16(), url = %response.url(), "upstream request failed");
        Err(B34Error::Upstream {
            status: status.as_u16(),
            url: response.url().to_string(),
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! a tiny fake upstream for client and relay tests
    use {
        super::Endpoints,
        std::sync::{Arc, Mutex},
        tokio::{
            io::{AsyncReadExt, AsyncWriteExt},
            net::TcpListener,
        },
    };

    /// a canned response
    #[derive(Clone, Debug)]
    pub struct Canned {
        pub status: u16,
        pub content_type: &'static str,
        pub body: Vec<u8>,
    }

    impl Canned {
        pub fn ok(content_type: &'static str, body: impl Into<Vec<u8>>) -> Self {
            Self {
                status: 200,
                content_type,
                body: body.into(),
            }
        }

        pub fn status(status: u16) -> Self {
            Self {
                status,
                content_type: "text/plain",
                body: b"nope".to_vec(),
            }
        }
    }

    /// the request lines the fake upstream has seen
    pub type Seen = Arc<Mutex<Vec<String>>>;

    /// serve responses picked by `route` on a random local port, returning its base url
    pub async fn serve<F>(route: F) -> (String, Seen)
    where
        F: Fn(&str) -> Canned + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let seen: Seen = Arc::default();
        let route = Arc::new(route);
        let log = seen.clone();

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                let route = route.clone();
                let log = log.clone();

                tokio::spawn(async move {
                    let mut buf = vec![0u8; 16 * 1024];
                    let mut read = 0;

                    loop {
                        let Ok(n) = socket.read(&mut buf[read..]).await else {
                            return;
                        };
                        if n == 0 {
                            return;
                        }
                        read += n;
                        if read == buf.len() || request_complete(&buf[..read]) {
                            break;
                        }
                    }

                    let head = String::from_utf8_lossy(&buf[..read]).to_string();
                    let line = head.lines().next().unwrap_or_default().to_string();
                    let target = line.split(' ').nth(1).unwrap_or_default().to_string();
                    log.lock().unwrap().push(head);

                    let canned = route(&target);
                    let header = format!(
                        "HTTP/1.1 {} X\r\ncontent-type: {}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
                        canned.status,
                        canned.content_type,
                        canned.body.len()
                    );

                    let _ = socket.write_all(header.as_bytes()).await;
                    let _ = socket.write_all(&canned.body).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        (format!("http://{}", addr), seen)
    }

    /// whether the headers and the whole `content-length` body have arrived
    fn request_complete(buf: &[u8]) -> bool {
        let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
            return false;
        };
        let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
        let length = head
            .lines()
            .find_map(|l| l.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);

        buf.len() >= end + 4 + length
    }

    /// endpoints pointing at a fake upstream
    pub fn endpoints(base: &str) -> Endpoints {
        Endpoints {
            api_url: format!("{}/index.php", base),
            autocomplete_url: format!("{}/autocomplete.php", base),
            referer: "https://rule34.xxx/".to_string(),
            sort: "sort:id:desc".to_string(),
            page_size: 20,
        }
    }
}
