//! Building payloads from HTTP responses.

use std::sync::Arc;

use payload_engine::{CodecContext, Format, NormalizationAdapter, Payload, PayloadError};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Response, StatusCode};
use thiserror::Error;
use tracing::debug;
use url::Url;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("network error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("server responded with HTTP {status}")]
    Status { status: StatusCode },
    #[error("cannot infer a format from content type '{0}'")]
    UnknownContentType(String),
    #[error(transparent)]
    Payload(#[from] PayloadError),
}

/// Maps a `Content-Type` header value to a format. Parameters such as
/// `charset` are ignored, and structured suffixes (`+json`, `+xml`) count.
pub fn format_from_content_type(content_type: &str) -> Option<Format> {
    let media_type = content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    match media_type.as_str() {
        "application/json" | "text/json" => Some(Format::Json),
        "application/xml" | "text/xml" => Some(Format::Xml),
        "application/yaml" | "application/x-yaml" | "text/yaml" | "text/x-yaml" => Some(Format::Yaml),
        "text/csv" | "application/csv" => Some(Format::Csv),
        other if other.ends_with("+json") => Some(Format::Json),
        other if other.ends_with("+xml") => Some(Format::Xml),
        _ => None,
    }
}

fn accept_header(format: Option<Format>) -> &'static str {
    match format {
        Some(Format::Json) => "application/json",
        Some(Format::Xml) => "application/xml",
        Some(Format::Yaml) => "application/yaml",
        Some(Format::Csv) => "text/csv",
        None => "application/json, application/xml;q=0.9, application/yaml;q=0.8, text/csv;q=0.7",
    }
}

/// Reads the body of a successful response into a payload. When `format` is
/// `None` it is inferred from the `Content-Type` header.
pub async fn parse_response(
    response: Response,
    format: Option<Format>,
    context: &CodecContext,
    adapter: Arc<dyn NormalizationAdapter>,
) -> Result<Payload, FetchError> {
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status { status });
    }

    let format = match format {
        Some(format) => format,
        None => {
            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .unwrap_or_default();
            format_from_content_type(content_type).ok_or_else(|| FetchError::UnknownContentType(content_type.to_string()))?
        }
    };

    let body = response.text().await?;
    debug!(%status, %format, bytes = body.len(), "parsing response body");
    Ok(Payload::parse(&body, format.as_str(), context, adapter)?)
}

/// Sends a GET request to `url` and parses the response.
pub async fn fetch_payload(
    client: &Client,
    url: &str,
    format: Option<Format>,
    context: &CodecContext,
    adapter: Arc<dyn NormalizationAdapter>,
) -> Result<Payload, FetchError> {
    let url = Url::parse(url)?;
    debug!(%url, "fetching payload");
    let response = client.get(url).header(ACCEPT, accept_header(format)).send().await?;
    parse_response(response, format, context, adapter).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_formats_from_content_types() {
        assert_eq!(format_from_content_type("application/json; charset=utf-8"), Some(Format::Json));
        assert_eq!(format_from_content_type("application/problem+json"), Some(Format::Json));
        assert_eq!(format_from_content_type("Text/XML"), Some(Format::Xml));
        assert_eq!(format_from_content_type("application/atom+xml"), Some(Format::Xml));
        assert_eq!(format_from_content_type("application/x-yaml"), Some(Format::Yaml));
        assert_eq!(format_from_content_type("text/csv;header=present"), Some(Format::Csv));
        assert_eq!(format_from_content_type("text/html"), None);
        assert_eq!(format_from_content_type(""), None);
    }
}
