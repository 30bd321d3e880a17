//! responders used by the relay routes
use {
    crate::models::ErrorBody,
    futures::{Stream, StreamExt, future::ready},
    rocket::{
        Request,
        http::{ContentType, Header, Status},
        response::{self, Responder, stream::ByteStream},
        serde::json::Json,
    },
    tracing::warn,
};

/// a JSON `{ "error": ... }` response with a status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// the status to respond with
    pub status: Status,
    /// the message to put in the body
    pub message: String,
}

impl ApiError {
    /// make a new api error
    pub fn new(status: Status, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// 400 with a message
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(Status::BadRequest, message)
    }

    /// 500 with a message
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(Status::InternalServerError, message)
    }
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        (self.status, Json(ErrorBody::new(self.message))).respond_to(req)
    }
}

/// pass chunks through until the first error, which ends the stream
pub fn until_first_error<S, T, E>(stream: S) -> impl Stream<Item = T>
where
    S: Stream<Item = std::result::Result<T, E>>,
    E: std::fmt::Display,
{
    stream
        .take_while(|chunk| {
            if let Err(e) = chunk {
                warn!(error = %e, "media stream interrupted");
            }
            ready(chunk.is_ok())
        })
        .filter_map(|chunk| ready(chunk.ok()))
}

/// an upstream media response relayed as a byte stream
pub struct ProxiedMedia {
    /// the upstream response, body not yet read
    pub upstream: reqwest::Response,
    /// the `Cache-Control` value to attach
    pub cache_control: String,
}

impl<'r> Responder<'r, 'r> for ProxiedMedia {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'r> {
        let status = Status::new(self.upstream.status().as_u16());
        let content_type = self
            .upstream
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(ContentType::parse_flexible)
            .unwrap_or(ContentType::Binary);
        let content_length = self.upstream.content_length();

        let body = until_first_error(self.upstream.bytes_stream());

        let mut response = ByteStream(body).respond_to(req)?;
        response.set_status(status);
        response.set_header(content_type);
        response.set_header(Header::new("Cache-Control", self.cache_control));

        if let Some(length) = content_length {
            response.set_header(Header::new("Content-Length", length.to_string()));
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use {super::*, futures::stream};

    #[tokio::test]
    async fn test_stream_ends_at_the_first_error() {
        let chunks = stream::iter(vec![
            Ok(b"ab".to_vec()),
            Ok(b"cd".to_vec()),
            Err("connection reset"),
            Ok(b"ef".to_vec()),
        ]);

        let relayed: Vec<Vec<u8>> = until_first_error(chunks).collect().await;
        assert_eq!(relayed, vec![b"ab".to_vec(), b"cd".to_vec()]);
    }
}
