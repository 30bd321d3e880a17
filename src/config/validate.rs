//! configuration validation stuff
use crate::{config::options::*, validator};

/// trait for validating config structs
pub trait Validate {
    /// validate the config
    fn validate(&self) -> Result<(), Vec<String>>;

    /// check if the config is valid
    fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

/// whether a string looks like an http(s) url
fn is_http_url(v: &str) -> bool {
    url::Url::parse(v).is_ok_and(|u| matches!(u.scheme(), "http" | "https"))
}

validator! { HttpConfig,
    pool_max_idle_per_host => |v: &usize| *v > 0,
        "must be greater than 0";
    pool_idle_timeout_secs => |v: &u64| *v > 0,
        "must be greater than 0";
    timeout_secs => |v: &u64| *v > 0,
        "must be greater than 0";
    connect_timeout_secs => |v: &u64| *v > 0,
        "must be greater than 0";
    tcp_keepalive_secs => |v: &u64| *v > 0,
        "must be greater than 0";
    user_agent => |v: &String| !v.trim().is_empty(),
        "must not be empty";
}

validator! { UpstreamCfg,
    api_url => |v: &String| is_http_url(v),
        "must be a valid http(s) url";
    autocomplete_url => |v: &String| is_http_url(v),
        "must be a valid http(s) url";
    referer => |v: &String| is_http_url(v),
        "must be a valid http(s) url";
    sort => |v: &String| !v.trim().is_empty() && !v.contains(char::is_whitespace),
        "must be a single non-empty directive";
    page_size => |v: &u32| *v >= 1 && *v <= 1000,
        "must be between 1 and 1000";
}

validator! { ServerCfg,
    address => |v: &String| v.parse::<std::net::IpAddr>().is_ok(),
        "must be a valid ip address";
    port => |v: &u16| *v > 0,
        "must be a valid port (1-65535)";
}

validator! { ProxyCfg,
    allowed_hosts => |v: &Vec<String>| v.iter().all(|h| !h.trim().is_empty()),
        "hosts must not be empty strings";
    cache_max_age => |v: &u64| *v <= 31_536_000,
        "must be at most one year (31536000)";
    user_agent => |v: &String| !v.trim().is_empty(),
        "must not be empty";
}

validator! { SessionCfg,
    debounce_ms => |v: &u64| *v <= 10_000,
        "must be at most 10000";
    remote => |v: &String| is_http_url(v),
        "must be a valid http(s) url";
    proxy_base => |v: &String| v.starts_with('/') || is_http_url(v),
        "must be an absolute path or an http(s) url";
}

/// a hundred years
const MAX_EXPIRY_DAYS: u64 = 36_500;

validator! { StorageCfg,
    dir => |v: &String| !v.trim().is_empty(),
        "must not be empty";
    expiry_days => |v: &u64| (1..=MAX_EXPIRY_DAYS).contains(v),
        "must be between 1 and 36500";
}

/// valid log levels
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

validator! { LoggingConfig,
    level => |v: &String| VALID_LOG_LEVELS.contains(&v.to_lowercase().as_str()),
        "must be one of: trace, debug, info, warn, error, off";
}

impl Validate for Base34 {
    fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors: Vec<String> = Vec::new();

        macro_rules! validate_nested {
            ($($field:ident),* $(,)?) => {
                $(
                    if let Some(ref nested) = self.$field {
                        if let Err(nested_errors) = nested.validate() {
                            for err in nested_errors {
                                errors.push(format!("{}.{}", stringify!($field), err));
                            }
                        }
                    }
                )*
            };
        }

        validate_nested!(http, upstream, server, proxy, session, storage, logging);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// format validation errors for display
pub fn format_validation_errors(errors: &[String]) -> String {
    let mut output = String::from("Configuration validation failed:\n");
    for (i, err) in errors.iter().enumerate() {
        output.push_str(&format!("  {}. {}\n", i + 1, err));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_errors_are_prefixed() {
        let cfg = Base34 {
            upstream: Some(UpstreamCfg {
                api_url: Some("ftp://nope".to_string()),
                ..UpstreamCfg::default()
            }),
            server: Some(ServerCfg {
                port: Some(0),
                ..ServerCfg::default()
            }),
            ..Base34::default()
        };

        let errors = cfg.validate().unwrap_err();
        assert!(errors.contains(&"upstream.api_url: must be a valid http(s) url".to_string()));
        assert!(errors.contains(&"server.port: must be a valid port (1-65535)".to_string()));
    }

    #[test]
    fn test_sort_directive_must_be_one_token() {
        let cfg = UpstreamCfg {
            sort: Some("sort:id desc".to_string()),
            ..UpstreamCfg::default()
        };

        assert!(!cfg.is_valid());
    }

    #[test]
    fn test_expiry_days_is_bounded() {
        let within = StorageCfg {
            expiry_days: Some(MAX_EXPIRY_DAYS),
            ..StorageCfg::default()
        };
        let zero = StorageCfg {
            expiry_days: Some(0),
            ..StorageCfg::default()
        };
        let huge = StorageCfg {
            expiry_days: Some(u64::MAX),
            ..StorageCfg::default()
        };

        assert!(within.is_valid());
        assert!(!zero.is_valid());
        assert!(!huge.is_valid());
    }

    #[test]
    fn test_format_validation_errors_numbers_lines() {
        let out = format_validation_errors(&["a: bad".to_string(), "b: worse".to_string()]);
        assert!(out.contains("  1. a: bad\n"));
        assert!(out.contains("  2. b: worse\n"));
    }
}
