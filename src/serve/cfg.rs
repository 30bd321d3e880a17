//! relay server configuration
use {
    crate::{client::media::MediaPolicy, getopt},
    std::net::{IpAddr, Ipv4Addr, SocketAddr},
};

/// how the relay is run
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// where to listen
    pub bind_address: SocketAddr,
    /// whether `/api/proxy` is mounted
    pub enable_proxy: bool,
    /// what the proxy may fetch
    pub media_policy: MediaPolicy,
}

impl ServerConfig {
    /// start building a config
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    /// a config built from the loaded settings
    pub fn from_settings() -> Result<Self, String> {
        let address: IpAddr = getopt!(server.address)
            .parse()
            .map_err(|e| format!("Invalid server address: {}", e))?;

        Self::builder()
            .bind_address(SocketAddr::new(address, getopt!(server.port)))
            .enable_proxy(getopt!(proxy.enabled))
            .media_policy(MediaPolicy::from_config())
            .build()
    }

    /// where the relay listens
    pub fn bind_address(&self) -> &SocketAddr {
        &self.bind_address
    }
}

/// builder for [`ServerConfig`]
#[derive(Default)]
pub struct ServerConfigBuilder {
    /// the listening address
    bind_address: Option<SocketAddr>,
    /// whether the proxy is mounted
    enable_proxy: Option<bool>,
    /// what the proxy may fetch
    media_policy: Option<MediaPolicy>,
}

impl ServerConfigBuilder {
    /// make a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// set the listening address
    pub fn bind_address(mut self, addr: SocketAddr) -> Self {
        self.bind_address = Some(addr);
        self
    }

    /// mount the media proxy or not
    pub fn enable_proxy(mut self, enabled: bool) -> Self {
        self.enable_proxy = Some(enabled);
        self
    }

    /// set what the proxy may fetch
    pub fn media_policy(mut self, policy: MediaPolicy) -> Self {
        self.media_policy = Some(policy);
        self
    }

    /// finish building
    pub fn build(self) -> Result<ServerConfig, String> {
        let enable_proxy = self.enable_proxy.unwrap_or(true);
        let media_policy = self.media_policy.unwrap_or_else(MediaPolicy::from_config);

        if enable_proxy && media_policy.allowed_hosts.is_empty() {
            return Err("The media proxy needs at least one allowed host".to_string());
        }

        Ok(ServerConfig {
            bind_address: self
                .bind_address
                .unwrap_or(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3034)),
            enable_proxy,
            media_policy,
        })
    }
}
