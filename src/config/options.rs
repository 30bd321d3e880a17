//! every available configuration option and its type is listed in this file
use {
    crate::config::validate::{Validate, format_validation_errors},
    color_eyre::{
        Section, SectionExt,
        eyre::{Context, OptionExt, Result, eyre},
    },
    config::{Config, ConfigBuilder},
    schemars::JsonSchema,
    serde::{Deserialize, Serialize},
    smart_default::SmartDefault,
    std::path::{Path, PathBuf},
    tracing::info,
};

/// the name of the config file, both globally and locally
pub const CONFIG_FILE_NAME: &str = "base34.toml";

/// Configuration options for making HTTP requests
#[derive(Serialize, Deserialize, Clone, Debug, JsonSchema, SmartDefault)]
#[schemars(default)]
pub struct HttpConfig {
    /// Connection pool size per host
    #[default(Some(32))]
    pub pool_max_idle_per_host: Option<usize>,

    /// Connection pool idle timeout in seconds
    #[default(Some(90))]
    pub pool_idle_timeout_secs: Option<u64>,

    /// Request timeout in seconds
    #[default(Some(30))]
    pub timeout_secs: Option<u64>,

    /// Connection timeout in seconds
    #[default(Some(10))]
    pub connect_timeout_secs: Option<u64>,

    /// Enable keep-alive
    #[default(Some(true))]
    pub tcp_keepalive: Option<bool>,

    /// How many seconds to keep TCP alive for
    #[default(Some(60))]
    pub tcp_keepalive_secs: Option<u64>,

    /// User agent used for api requests
    #[default(Some(format!("{}/v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))))]
    pub user_agent: Option<String>,
}

/// Where and how to talk to the booru
#[derive(Serialize, Deserialize, Clone, Debug, JsonSchema, SmartDefault)]
#[schemars(default)]
pub struct UpstreamCfg {
    /// The dapi endpoint used for post listings and counts
    #[default(Some("https://api.rule34.xxx/index.php".to_string()))]
    pub api_url: Option<String>,

    /// The tag autocompletion endpoint
    #[default(Some("https://ac.rule34.xxx/autocomplete.php".to_string()))]
    pub autocomplete_url: Option<String>,

    /// Referer sent with autocompletion requests (the endpoint rejects requests without one)
    #[default(Some("https://rule34.xxx/".to_string()))]
    pub referer: Option<String>,

    /// The sort directive every query starts with
    #[default(Some("sort:id:desc".to_string()))]
    pub sort: Option<String>,

    #[schemars(range(min = 1, max = 1000))]
    /// How many posts to request per page
    #[default(Some(20))]
    pub page_size: Option<u32>,
}

/// Settings for the relay server
#[derive(Serialize, Deserialize, Clone, Debug, JsonSchema, SmartDefault)]
#[schemars(default)]
pub struct ServerCfg {
    /// The address to bind to
    #[default(Some("127.0.0.1".to_string()))]
    pub address: Option<String>,

    /// The port to listen on
    #[default(Some(3034))]
    pub port: Option<u16>,
}

/// Settings for the media proxy
#[derive(Serialize, Deserialize, Clone, Debug, JsonSchema, SmartDefault)]
#[schemars(default)]
pub struct ProxyCfg {
    /// Whether the relay serves `/api/proxy`
    #[default(Some(true))]
    pub enabled: Option<bool>,

    /// Hostnames the proxy is allowed to fetch from
    #[default(Some(vec![
        "api-cdn-mp4.rule34.xxx".to_string(),
        "api-cdn.rule34.xxx".to_string(),
    ]))]
    pub allowed_hosts: Option<Vec<String>>,

    /// `max-age` of the `Cache-Control` header on proxied media, in seconds
    #[default(Some(31_536_000))]
    pub cache_max_age: Option<u64>,

    /// User agent sent to the media cdn
    #[default(Some(
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
         Chrome/58.0.3029.110 Safari/537.3"
            .to_string()
    ))]
    pub user_agent: Option<String>,
}

/// Settings for client sessions
#[derive(Serialize, Deserialize, Clone, Debug, JsonSchema, SmartDefault)]
#[schemars(default)]
pub struct SessionCfg {
    /// How long to wait after the last keystroke before asking for suggestions
    #[default(Some(300))]
    pub debounce_ms: Option<u64>,

    /// Base url of a running relay (e.g. `http://127.0.0.1:3034`).
    /// When unset, sessions talk to the booru directly.
    #[default(None)]
    pub remote: Option<String>,

    /// The proxy route media urls are rewritten to
    #[default(Some("/api/proxy".to_string()))]
    pub proxy_base: Option<String>,
}

/// Settings for persisted client state
#[derive(Serialize, Deserialize, Clone, Debug, JsonSchema, SmartDefault)]
#[schemars(default)]
pub struct StorageCfg {
    /// Directory for persisted records, defaults to `<data dir>/base34`
    #[default(None)]
    pub dir: Option<String>,

    /// How many days a persisted record stays valid
    #[default(Some(365))]
    pub expiry_days: Option<u64>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, JsonSchema, SmartDefault)]
/// The format to log in
pub enum LoggingFormat {
    /// Use the compact output format
    Compact,

    /// Use an excessively pretty output format
    #[default]
    Pretty,
}

/// Settings for logging
#[derive(Serialize, Deserialize, Clone, Debug, JsonSchema, SmartDefault)]
#[schemars(default)]
pub struct LoggingConfig {
    /// Enable logging
    #[default(Some(true))]
    pub enable: Option<bool>,

    /// The max level to log at
    #[default(Some("info".to_string()))]
    pub level: Option<String>,

    /// The output format
    #[default(Some(LoggingFormat::Compact))]
    pub format: Option<LoggingFormat>,

    /// Enable ANSI escape codes for colors and stuff
    #[default(Some(true))]
    pub ansi: Option<bool>,

    /// Display event targets in log messages
    #[default(Some(false))]
    pub event_targets: Option<bool>,

    /// Display line numbers in log messages
    #[default(Some(false))]
    pub line_numbers: Option<bool>,
}

/// The base34 configuration
#[derive(Serialize, Deserialize, Clone, Debug, JsonSchema, SmartDefault)]
#[schemars(default)]
pub struct Base34 {
    /// HTTP settings
    #[default(Some(HttpConfig::default()))]
    pub http: Option<HttpConfig>,

    /// Upstream booru settings
    #[default(Some(UpstreamCfg::default()))]
    pub upstream: Option<UpstreamCfg>,

    /// Relay server settings
    #[default(Some(ServerCfg::default()))]
    pub server: Option<ServerCfg>,

    /// Media proxy settings
    #[default(Some(ProxyCfg::default()))]
    pub proxy: Option<ProxyCfg>,

    /// Client session settings
    #[default(Some(SessionCfg::default()))]
    pub session: Option<SessionCfg>,

    /// Persisted state settings
    #[default(Some(StorageCfg::default()))]
    pub storage: Option<StorageCfg>,

    /// Logging settings
    #[default(Some(LoggingConfig::default()))]
    pub logging: Option<LoggingConfig>,
}

impl Base34 {
    /// load config from default locations
    ///
    /// load prio: env > local > global > defaults
    pub fn load() -> Result<Self> {
        let global_config_path = Self::global_config_path()?;
        let mut builder = Self::create_builder(Self::default())?;

        if global_config_path.exists() {
            builder = builder.add_source(config::File::from(global_config_path).required(false));
        }

        if let Some(local_config) = Self::find_local_config()? {
            builder = builder.add_source(config::File::from(local_config).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("BASE34")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder.build().wrap_err("Failed to build configuration")?;
        let cfg: Base34 = settings
            .try_deserialize::<Base34>()
            .wrap_err("Failed to deserialize configuration")?;

        cfg.run_validation()?;
        info!("Configuration validation successful");

        Ok(cfg)
    }

    /// get the global config file path
    pub fn global_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_eyre("Unable to determine system config directory")
            .suggestion("Ensure XDG_CONFIG_HOME or HOME environment variables are set")
            .suggestion("On Windows, APPDATA should be set")?;

        Ok(config_dir.join(CONFIG_FILE_NAME))
    }

    /// write the defaults to the global config path if nothing is there yet
    pub fn ensure_global_config() -> Result<()> {
        let path = Self::global_config_path()?;

        if !path.exists() {
            Self::create_default_config(&path, &Self::default())?;
            info!(path = %path.display(), "Wrote default configuration");
        }

        Ok(())
    }

    /// create a config builder with defaults
    fn create_builder(defaults: Base34) -> Result<ConfigBuilder<config::builder::DefaultState>> {
        let builder = Config::builder();
        let config_source = Config::try_from(&defaults)
            .wrap_err("Failed to convert default Base34 struct to config source")?;

        Ok(builder.add_source(config_source))
    }

    /// run validation and return a pretty error if it fails
    fn run_validation(&self) -> Result<()> {
        self.validate()
            .map_err(|errors| {
                let formatted = format_validation_errors(&errors);
                eyre!(formatted)
            })
            .wrap_err("config validation failed")
            .suggestion(format!("Check your {} for invalid values", CONFIG_FILE_NAME))
            .suggestion("Run with default config to see valid options")
    }

    /// find the local config file
    fn find_local_config() -> Result<Option<PathBuf>> {
        let curr_dir = std::env::current_dir()
            .wrap_err("Failed to get current working directory")
            .suggestion("Ensure the current directory exists and is accessible")?;

        for ancestor in curr_dir.ancestors() {
            let config_path = ancestor.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                return Ok(Some(config_path));
            }
        }

        Ok(None)
    }

    /// create the default config file
    fn create_default_config(path: &Path, defaults: &Base34) -> Result<()> {
        let config_dir = path
            .parent()
            .ok_or_eyre("Unable to determine parent directory of config path")?;

        std::fs::create_dir_all(config_dir)
            .wrap_err("Failed to create config directory")
            .with_section(|| format!("{}", config_dir.display()).header("Directory:"))?;

        defaults
            .save_to_file(path)
            .wrap_err("Failed to write default configuration file")?;

        Ok(())
    }

    /// save config to a file
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let toml_str =
            toml::to_string_pretty(self).wrap_err("Failed to serialize config to TOML")?;

        std::fs::write(path, &toml_str)
            .wrap_err_with(|| format!("Failed to write config file: {}", path.display()))
            .with_section(|| path.display().to_string().header("File path"))
            .with_section(|| format!("{} bytes", toml_str.len()).header("Content size:"))?;

        Ok(())
    }
}
