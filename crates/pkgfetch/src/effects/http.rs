#[cfg(feature = "reqwest")]
mod reqwest_impl {
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    use futures_util::{StreamExt, future, stream};
    use reqwest::header::{IF_MODIFIED_SINCE, LAST_MODIFIED};
    use reqwest::redirect::Policy;

    use crate::core::is_same_origin;
    use crate::effects::transport::{
        Connector, EventStream, TransferEvent, TransferRequest, Transport, TransportConfig,
    };
    use crate::error::TransportError;

    const MAX_REDIRECTS: usize = 10;

    /// Builds a [`ReqwestTransport`] per session open.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct ReqwestConnector;

    impl Connector for ReqwestConnector {
        type Transport = ReqwestTransport;

        fn connect(&self, config: &TransportConfig) -> Result<ReqwestTransport, TransportError> {
            ReqwestTransport::new(config)
        }
    }

    /// Production transport backed by a pooled `reqwest::Client`.
    #[derive(Debug, Clone)]
    pub struct ReqwestTransport {
        client: reqwest::Client,
    }

    impl ReqwestTransport {
        pub fn new(config: &TransportConfig) -> Result<Self, TransportError> {
            let client = reqwest::Client::builder()
                .redirect(same_origin_policy())
                .pool_max_idle_per_host(1)
                .danger_accept_invalid_certs(config.tls_no_verify_peer)
                .danger_accept_invalid_hostnames(config.tls_no_verify_hostname)
                .connection_verbose(config.verbose)
                .build()
                .map_err(map_error)?;
            Ok(Self { client })
        }
    }

    fn same_origin_policy() -> Policy {
        Policy::custom(|attempt| {
            if attempt.previous().len() > MAX_REDIRECTS {
                return attempt.error("too many redirects");
            }
            let same_origin = attempt
                .previous()
                .first()
                .is_some_and(|origin| is_same_origin(origin, attempt.url()));
            if same_origin {
                attempt.follow()
            } else {
                attempt.stop()
            }
        })
    }

    impl Transport for ReqwestTransport {
        fn begin(&self, request: TransferRequest) -> Result<EventStream, TransportError> {
            let mut builder = self.client.get(request.url.clone());
            if let Some(mtime) = request.if_modified_since {
                let since = UNIX_EPOCH + Duration::from_secs(mtime.max(0) as u64);
                builder = builder.header(IF_MODIFIED_SINCE, httpdate::fmt_http_date(since));
            }
            if let Some(timeout) = request.timeout {
                builder = builder.timeout(timeout);
            }
            let http_request = builder.build().map_err(map_error)?;

            if request.verbose {
                tracing::debug!(url = %request.url, headers = ?http_request.headers(), "sending request");
            }

            let client = self.client.clone();
            let events = stream::once(async move { client.execute(http_request).await })
                .map(|result| -> EventStream {
                    match result {
                        Ok(response) => response_events(response),
                        Err(e) => Box::pin(stream::iter([Err::<TransferEvent, _>(map_error(e))])),
                    }
                })
                .flatten();
            Ok(Box::pin(events))
        }
    }

    fn response_events(response: reqwest::Response) -> EventStream {
        let status = response.status().as_u16();
        let total = response.content_length().unwrap_or(0);
        let filetime = response
            .headers()
            .get(LAST_MODIFIED)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| httpdate::parse_http_date(v).ok())
            .and_then(epoch_seconds);

        let mut headers = vec![Ok(TransferEvent::Header {
            status,
            line: format!("{:?} {}", response.version(), response.status()),
        })];
        headers.extend(response.headers().iter().map(|(name, value)| {
            Ok(TransferEvent::Header {
                status,
                line: format!("{}: {}", name, String::from_utf8_lossy(value.as_bytes())),
            })
        }));

        let body = response
            .bytes_stream()
            .scan(0u64, move |downloaded, chunk| {
                let events = match chunk {
                    Ok(bytes) => {
                        *downloaded += bytes.len() as u64;
                        vec![
                            Ok(TransferEvent::Data(bytes)),
                            Ok(TransferEvent::Progress {
                                downloaded: *downloaded,
                                total,
                            }),
                        ]
                    }
                    Err(e) => vec![Err(map_error(e))],
                };
                future::ready(Some(stream::iter(events)))
            })
            .flatten();

        let complete = stream::once(future::ready(Ok(TransferEvent::Complete { status, filetime })));

        Box::pin(stream::iter(headers).chain(body).chain(complete))
    }

    fn epoch_seconds(time: SystemTime) -> Option<i64> {
        time.duration_since(UNIX_EPOCH)
            .ok()
            .and_then(|d| i64::try_from(d.as_secs()).ok())
    }

    fn map_error(e: reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::Timeout
        } else if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else if e.is_redirect() {
            TransportError::Protocol(e.to_string())
        } else if e.is_body() || e.is_decode() {
            TransportError::Reset(e.to_string())
        } else {
            TransportError::Other(e.to_string())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_epoch_seconds() {
            let time = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
            assert_eq!(epoch_seconds(time), Some(1_700_000_000));
            assert_eq!(epoch_seconds(UNIX_EPOCH - Duration::from_secs(1)), None);
        }

        #[tokio::test]
        async fn test_builds_with_tls_overrides() {
            let config = TransportConfig {
                tls_no_verify_peer:     true,
                tls_no_verify_hostname: true,
                verbose:                true,
            };
            assert!(ReqwestConnector.connect(&config).is_ok());
        }

        #[tokio::test]
        async fn test_begin_is_lazy() {
            // Building the stream must not touch the network.
            let transport = ReqwestTransport::new(&TransportConfig::default()).unwrap();
            let request = TransferRequest::new("http://127.0.0.1:9/never".parse().unwrap())
                .if_modified_since(Some(1_700_000_000))
                .timeout(Some(Duration::from_secs(1)));
            assert!(transport.begin(request).is_ok());
        }
    }
}

#[cfg(feature = "reqwest")]
pub use reqwest_impl::{ReqwestConnector, ReqwestTransport};
