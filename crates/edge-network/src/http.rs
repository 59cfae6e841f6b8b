//! `reqwest` transport with bounded in-call retries.

use crate::{NetworkRequest, ResponseSink, Transport, TransportOutcome, TransportResult};
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Transport configuration.
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    /// Timeout for one attempt, connect through last body byte.
    pub request_timeout: Duration,
    /// Attempts per send, including the first.
    pub max_attempts: u32,
    /// Pause before the second attempt; doubled for each further one.
    pub backoff: Duration,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(5),
            max_attempts: 3,
            backoff: Duration::from_millis(500),
        }
    }
}

/// HTTP transport for edge requests.
pub struct HttpTransport {
    config: HttpTransportConfig,
    client: Client,
}

/// What one attempt produced.
enum Attempt {
    Done(TransportOutcome),
    Again {
        status: Option<u16>,
        retry_after: Option<Duration>,
        reason: String,
        body: Option<String>,
    },
}

impl HttpTransport {
    pub fn new(config: HttpTransportConfig) -> TransportResult<Self> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &HttpTransportConfig {
        &self.config
    }

    async fn attempt(&self, request: &NetworkRequest, sink: &mut dyn ResponseSink) -> Attempt {
        let headers = match header_map(request) {
            Ok(headers) => headers,
            Err(reason) => {
                return Attempt::Done(TransportOutcome::Unrecoverable {
                    status: None,
                    body: reason,
                })
            }
        };

        let builder = self.client.post(request.url.clone()).body(request.body.clone());

        let response = match builder.headers(headers).send().await {
            Ok(response) => response,
            Err(e) if e.is_builder() => {
                return Attempt::Done(TransportOutcome::Unrecoverable {
                    status: None,
                    body: e.to_string(),
                })
            }
            Err(e) => {
                return Attempt::Again {
                    status: None,
                    retry_after: None,
                    reason: e.to_string(),
                    body: None,
                }
            }
        };

        let status = response.status();
        if status.is_success() {
            let mut stream = response.bytes_stream();
            let mut delivered = false;
            while let Some(chunk) = stream.next().await {
                match chunk {
                    Ok(bytes) => {
                        delivered = true;
                        sink.on_chunk(&bytes);
                    }
                    // The sink already saw part of this body; a fresh attempt
                    // must start with a fresh sink, so hand it back to the queue.
                    Err(e) if delivered => {
                        return Attempt::Done(TransportOutcome::Retryable {
                            status: Some(status.as_u16()),
                            retry_after: None,
                            reason: format!("response stream interrupted: {}", e),
                            body: None,
                        })
                    }
                    Err(e) => {
                        return Attempt::Again {
                            status: Some(status.as_u16()),
                            retry_after: None,
                            reason: e.to_string(),
                            body: None,
                        }
                    }
                }
            }
            return Attempt::Done(TransportOutcome::Success {
                status: status.as_u16(),
            });
        }

        if is_retryable_status(status) {
            let retry_after = parse_retry_after(response.headers());
            let body = response.text().await.ok().filter(|body| !body.is_empty());
            return Attempt::Again {
                status: Some(status.as_u16()),
                retry_after,
                reason: format!("HTTP {}", status),
                body,
            };
        }

        let body = response.text().await.unwrap_or_default();
        Attempt::Done(TransportOutcome::Unrecoverable {
            status: Some(status.as_u16()),
            body,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: NetworkRequest, sink: &mut dyn ResponseSink) -> TransportOutcome {
        let max_attempts = self.config.max_attempts.max(1);
        let mut delay = self.config.backoff;
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!(url = %request.url, attempt, "Sending request");

            match self.attempt(&request, sink).await {
                Attempt::Done(outcome) => {
                    if let TransportOutcome::Success { status } = &outcome {
                        info!(url = %request.url, status, attempt, "Request succeeded");
                    }
                    return outcome;
                }
                Attempt::Again {
                    status,
                    retry_after,
                    reason,
                    body,
                } => {
                    // A server-specified wait is left to the queue.
                    if retry_after.is_some() || attempt >= max_attempts {
                        warn!(
                            url = %request.url,
                            attempt,
                            status = ?status,
                            retry_after_secs = ?retry_after.map(|d| d.as_secs()),
                            reason = %reason,
                            "Request failed, giving up for now"
                        );
                        return TransportOutcome::Retryable {
                            status,
                            retry_after,
                            reason,
                            body,
                        };
                    }

                    warn!(
                        url = %request.url,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        reason = %reason,
                        "Request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    delay = delay.saturating_mul(2);
                }
            }
        }
    }
}

fn header_map(request: &NetworkRequest) -> Result<HeaderMap, String> {
    let mut headers = HeaderMap::new();
    for (name, value) in &request.headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| format!("invalid header name {}: {}", name, e))?;
        let header_value =
            HeaderValue::from_str(value).map_err(|e| format!("invalid value for {}: {}", name, e))?;
        headers.insert(header_name, header_value);
    }
    Ok(headers)
}

/// Timeouts, throttling and server-side failures are worth another try.
pub(crate) fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
}

/// `Retry-After` in delta-seconds. HTTP-date values are ignored.
pub(crate) fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}
