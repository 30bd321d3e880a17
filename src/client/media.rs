//! fetching media from the booru's cdn on behalf of the relay
use {
    crate::{client::BooruClient, error::*, getopt},
    reqwest::{Response, header::USER_AGENT},
    thiserror::Error,
    tracing::{debug, instrument},
    url::Url,
};

/// why a proxy target was turned away
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProxyRejection {
    /// nothing to fetch
    #[error("Query parameter is required")]
    Missing,
    /// the target's host isn't allow-listed
    #[error("Invalid domain")]
    InvalidDomain,
    /// the target isn't a url at all
    #[error("An unexpected error occurred")]
    Unparseable,
}

/// which media the relay may fetch, and how
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaPolicy {
    /// hostnames the proxy may fetch from, matched exactly
    pub allowed_hosts: Vec<String>,
    /// `max-age` attached to proxied responses
    pub cache_max_age: u64,
    /// user agent sent to the cdn
    pub user_agent: String,
}

impl MediaPolicy {
    /// read the policy from the loaded configuration
    pub fn from_config() -> Self {
        Self {
            allowed_hosts: getopt!(proxy.allowed_hosts),
            cache_max_age: getopt!(proxy.cache_max_age),
            user_agent: getopt!(proxy.user_agent),
        }
    }

    /// check a proxy target against the allow-list
    pub fn check(&self, target: Option<&str>) -> std::result::Result<Url, ProxyRejection> {
        let target = target
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(ProxyRejection::Missing)?;
        let url = Url::parse(target).map_err(|_| ProxyRejection::Unparseable)?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ProxyRejection::InvalidDomain);
        }

        let host = url.host_str().ok_or(ProxyRejection::InvalidDomain)?;
        if !self.allowed_hosts.iter().any(|h| h.eq_ignore_ascii_case(host)) {
            return Err(ProxyRejection::InvalidDomain);
        }

        Ok(url)
    }

    /// the `Cache-Control` value for proxied responses
    pub fn cache_control(&self) -> String {
        format!("public, max-age={}", self.cache_max_age)
    }
}

impl BooruClient {
    /// start fetching an allow-listed media url, returning the response before its body is read
    #[instrument(skip(self, policy), fields(url = %url))]
    pub async fn fetch_media(&self, url: &Url, policy: &MediaPolicy) -> Result<Response> {
        let response = self
            .media_client
            .get(url.clone())
            .header(USER_AGENT, &policy.user_agent)
            .send()
            .await?;

        debug!(status = response.status().as_u16(), "media response");
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> MediaPolicy {
        MediaPolicy {
            allowed_hosts: vec![
                "api-cdn-mp4.rule34.xxx".to_string(),
                "api-cdn.rule34.xxx".to_string(),
            ],
            cache_max_age: 31_536_000,
            user_agent: "test".to_string(),
        }
    }

    #[test]
    fn test_allowed_hosts_pass() {
        let url = policy()
            .check(Some("https://api-cdn.rule34.xxx/images/1/a.png"))
            .unwrap();
        assert_eq!(url.host_str(), Some("api-cdn.rule34.xxx"));
    }

    #[test]
    fn test_missing_target() {
        assert_eq!(policy().check(None), Err(ProxyRejection::Missing));
        assert_eq!(policy().check(Some("  ")), Err(ProxyRejection::Missing));
    }

    #[test]
    fn test_other_hosts_are_rejected() {
        let p = policy();
        assert_eq!(
            p.check(Some("https://evil.example/a.png")),
            Err(ProxyRejection::InvalidDomain)
        );
        assert_eq!(
            p.check(Some("https://api-cdn.rule34.xxx.evil.example/a.png")),
            Err(ProxyRejection::InvalidDomain)
        );
        assert_eq!(
            p.check(Some("file:///etc/passwd")),
            Err(ProxyRejection::InvalidDomain)
        );
        assert_eq!(p.check(Some("not a url")), Err(ProxyRejection::Unparseable));
    }

    #[test]
    fn test_cache_control() {
        assert_eq!(policy().cache_control(), "public, max-age=31536000");
    }
}
