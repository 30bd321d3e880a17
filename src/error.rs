//! error handling stuff
use thiserror::Error;

#[derive(Debug, Error)]
/// An error
pub enum B34Error {
    /// an IO error
    #[error("i/o error: {0}")]
    IO(#[from] std::io::Error),

    /// a report from color_eyre
    #[error("{0}")]
    EyreReport(#[from] color_eyre::Report),

    /// a report from miette
    #[error("{0}")]
    MietteReport(miette::Report),

    /// a reqwest error
    #[error("reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),

    /// a json error
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// a url parse error
    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    /// a miette hook install error
    #[error("error installing miette hook: {0}")]
    MietteInstall(#[from] miette::InstallError),

    /// a rocket error
    #[cfg(feature = "server")]
    #[error("rocket error: {0}")]
    Rocket(#[from] Box<rocket::Error>),

    /// the upstream returned a non-success status
    #[error("upstream returned {status} for {url}")]
    Upstream {
        /// the status code
        status: u16,
        /// the requested url
        url: String,
    },

    /// the upstream body couldn't be understood
    #[error("malformed upstream response: {0}")]
    UpstreamFormat(String),

    /// a custom error
    #[error("error: {0}")]
    Other(String),
}

impl From<String> for B34Error {
    fn from(value: String) -> Self {
        Self::Other(value)
    }
}

impl From<&str> for B34Error {
    fn from(value: &str) -> Self {
        Self::Other(value.to_string())
    }
}

impl From<miette::Report> for B34Error {
    fn from(value: miette::Report) -> Self {
        Self::MietteReport(value)
    }
}

#[cfg(feature = "server")]
impl From<rocket::Error> for B34Error {
    fn from(value: rocket::Error) -> Self {
        Self::Rocket(Box::new(value))
    }
}

/// A result using [`B34Error`] as the `Err` variant
pub type Result<T, U = B34Error> = miette::Result<T, U>;

/// bail
#[macro_export]
macro_rules! bail {
    ($msg:literal $(,)?) => {
        return Err($crate::error::B34Error::from(String::from($msg)))
    };

    ($err:expr $(,)?) => {
        return Err($crate::error::B34Error::from($err))
    };

    ($fmt:expr, $($arg:tt)*) => {
        return Err($crate::error::B34Error::from(format!($fmt, $($arg)*)))
    };
}
