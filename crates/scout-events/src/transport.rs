//! Server-sent-events transport.
//!
//! Opens `GET {url}` with `Accept: text/event-stream` and turns the response
//! body into [`StreamEvent`]s with `eventsource-stream`, which takes care of
//! chunk boundaries, multi-line `data:` fields, comments and `id:`/`retry:`
//! lines.

use std::time::Duration;

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures_util::{Stream, StreamExt};
use reqwest::header::{ACCEPT, AUTHORIZATION, CACHE_CONTROL, HeaderMap, HeaderName, HeaderValue};
use scout_core::config::EventsConfig;
use scout_core::error::{ScoutError, ScoutResult};
use tracing::debug;

use crate::{EventStream, StreamTransport};

/// Event name the notifier listens to.
pub const MESSAGE_EVENT: &str = "message";

/// One dispatched SSE event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEvent {
    /// `event:` field, `"message"` when the server sent none.
    pub event: String,
    pub data: String,
    pub id: String,
}

impl StreamEvent {
    pub fn message(data: impl Into<String>) -> Self {
        Self { event: MESSAGE_EVENT.to_string(), data: data.into(), id: String::new() }
    }

    pub fn is_message(&self) -> bool {
        self.event.is_empty() || self.event == MESSAGE_EVENT
    }
}

/// SSE over HTTP(S) with `reqwest`.
pub struct SseTransport {
    http: reqwest::Client,
    url: String,
    headers: HeaderMap,
}

impl SseTransport {
    pub fn new(config: &EventsConfig) -> ScoutResult<Self> {
        // No overall request timeout: the response body is meant to stay open.
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| ScoutError::Config(format!("http client: {e}")))?;
        Ok(Self { http, url: config.url.clone(), headers: build_headers(config)? })
    }
}

#[async_trait]
impl StreamTransport for SseTransport {
    async fn connect(&self) -> ScoutResult<EventStream> {
        let resp = self
            .http
            .get(&self.url)
            .headers(self.headers.clone())
            .send()
            .await
            .map_err(|e| ScoutError::Stream(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ScoutError::Stream(format!("HTTP {status}")));
        }
        debug!("[sse] {} responded {status}", self.url);
        Ok(sse_events(resp.bytes_stream()))
    }

    fn endpoint(&self) -> &str {
        &self.url
    }
}

/// Parse a raw SSE byte stream into [`StreamEvent`]s.
pub fn sse_events<S, B, E>(bytes: S) -> EventStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let events = bytes.eventsource().map(|item| match item {
        Ok(ev) => Ok(StreamEvent { event: ev.event, data: ev.data, id: ev.id }),
        Err(e) => Err(ScoutError::Stream(e.to_string())),
    });
    Box::pin(events)
}

fn build_headers(config: &EventsConfig) -> ScoutResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));

    if let Some(token) = &config.bearer_token {
        let value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| ScoutError::Config(format!("bearer_token: {e}")))?;
        headers.insert(AUTHORIZATION, value);
    }

    for (key, value) in &config.extra_headers {
        let name = HeaderName::from_bytes(key.as_bytes())
            .map_err(|e| ScoutError::Config(format!("header '{key}': {e}")))?;
        let value = HeaderValue::from_str(value).map_err(|e| ScoutError::Config(format!("header '{key}': {e}")))?;
        headers.insert(name, value);
    }
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use futures_util::stream;

    use super::*;

    fn chunks(parts: &[&'static str]) -> EventStream {
        let items: Vec<Result<&'static [u8], std::io::Error>> = parts.iter().map(|p| Ok(p.as_bytes())).collect();
        sse_events(stream::iter(items))
    }

    #[tokio::test]
    async fn parses_split_chunks() {
        let mut events = chunks(&[
            "data: {\"type\":\"conn",
            "ected\"}\n\n",
            "event: ping\ndata: x\n\n",
            "id: 7\ndata: line1\ndata: line2\n\n",
        ]);

        let first = events.next().await.unwrap().unwrap();
        assert!(first.is_message());
        assert_eq!(first.data, r#"{"type":"connected"}"#);

        let second = events.next().await.unwrap().unwrap();
        assert_eq!(second.event, "ping");
        assert!(!second.is_message());

        let third = events.next().await.unwrap().unwrap();
        assert_eq!(third.data, "line1\nline2");
        assert_eq!(third.id, "7");

        assert!(events.next().await.is_none());
    }

    #[tokio::test]
    async fn transport_error_surfaces_as_stream_error() {
        let items: Vec<Result<&'static [u8], std::io::Error>> = vec![
            Ok(&b"data: a\n\n"[..]),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
        ];
        let mut events = sse_events(stream::iter(items));
        assert_eq!(events.next().await.unwrap().unwrap().data, "a");
        assert!(matches!(events.next().await, Some(Err(ScoutError::Stream(_)))));
    }

    #[test]
    fn headers_include_auth_and_extras() {
        let mut config = EventsConfig::with_url("https://crm.test/events");
        config.bearer_token = Some("abc".into());
        config.extra_headers.insert("X-Tenant".into(), "acme".into());
        let headers = build_headers(&config).unwrap();
        assert_eq!(headers[ACCEPT], "text/event-stream");
        assert_eq!(headers[AUTHORIZATION], "Bearer abc");
        assert_eq!(headers["x-tenant"], "acme");

        config.extra_headers.insert("bad header".into(), "v".into());
        assert!(matches!(build_headers(&config), Err(ScoutError::Config(_))));
    }

    #[test]
    fn message_detection() {
        assert!(StreamEvent::message("{}").is_message());
        let unnamed = StreamEvent { event: String::new(), data: "{}".into(), id: String::new() };
        assert!(unnamed.is_message());
    }
}
