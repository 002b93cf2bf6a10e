//! Remote status logger
//!
//! Progress messages are mirrored to a status endpoint on the boat network
//! with a plain GET, the message carried in a query parameter. Delivery is
//! best effort: the crawl never waits for, or fails because of, the endpoint.

use crate::config::RemoteLogConfig;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// How long one log request may take
const LOG_TIMEOUT: Duration = Duration::from_secs(5);

/// Why a log message was not delivered
#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("log endpoint unavailable: {0}")]
    Unavailable(#[from] reqwest::Error),

    #[error("log endpoint answered HTTP {0}")]
    Rejected(u16),
}

#[derive(Debug)]
struct Endpoint {
    url: Url,
    param: String,
}

/// Sends status messages to the remote endpoint
///
/// Cloning is cheap; all clones share the HTTP client and endpoint.
#[derive(Debug, Clone)]
pub struct RemoteLogger {
    client: Client,
    endpoint: Option<Arc<Endpoint>>,
}

impl RemoteLogger {
    /// Creates a logger for the configured endpoint
    ///
    /// Without an endpoint, or with one that does not parse, the logger is
    /// disabled and every call is a no-op.
    pub fn new(client: Client, config: Option<&RemoteLogConfig>) -> Self {
        let endpoint = config.and_then(|config| match Url::parse(&config.endpoint) {
            Ok(url) => Some(Arc::new(Endpoint {
                url,
                param: config.param.clone(),
            })),
            Err(e) => {
                tracing::warn!("Remote logging disabled, bad endpoint {}: {}", config.endpoint, e);
                None
            }
        });

        Self { client, endpoint }
    }

    /// Creates a logger that never sends anything
    pub fn disabled(client: Client) -> Self {
        Self {
            client,
            endpoint: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.endpoint.is_some()
    }

    /// Sends a message in the background
    ///
    /// Returns immediately. Must be called from within a tokio runtime.
    pub fn log(&self, message: impl Into<String>) {
        if !self.is_enabled() {
            return;
        }

        let logger = self.clone();
        let message = message.into();
        tokio::spawn(async move {
            logger.send(&message).await;
        });
    }

    /// Sends a message and waits for the endpoint to answer
    ///
    /// Returns true if the endpoint accepted it. Failures are logged at debug
    /// level and otherwise ignored.
    pub async fn send(&self, message: &str) -> bool {
        match self.try_send(message).await {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!("Remote log message dropped: {}", e);
                false
            }
        }
    }

    async fn try_send(&self, message: &str) -> Result<(), LoggerError> {
        let Some(url) = self.request_url(message) else {
            return Ok(());
        };

        let response = self
            .client
            .get(url)
            .timeout(LOG_TIMEOUT)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(LoggerError::Rejected(response.status().as_u16()))
        }
    }

    /// Builds `endpoint?param=<urlencoded message>`
    fn request_url(&self, message: &str) -> Option<Url> {
        let endpoint = self.endpoint.as_ref()?;
        let mut url = endpoint.url.clone();
        url.query_pairs_mut().append_pair(&endpoint.param, message);
        Some(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(endpoint: &str) -> RemoteLogConfig {
        RemoteLogConfig {
            endpoint: endpoint.to_string(),
            param: "log".to_string(),
        }
    }

    #[test]
    fn test_request_url_encodes_message() {
        let logger = RemoteLogger::new(Client::new(), Some(&config("http://10.0.0.1:3000/log")));
        let url = logger.request_url("Articles remaining: 5 & counting").unwrap();
        assert_eq!(
            url.as_str(),
            "http://10.0.0.1:3000/log?log=Articles+remaining%3A+5+%26+counting"
        );
    }

    #[test]
    fn test_disabled_logger() {
        let logger = RemoteLogger::new(Client::new(), None);
        assert!(!logger.is_enabled());
        assert!(logger.request_url("hello").is_none());

        let bad = RemoteLogger::new(Client::new(), Some(&config("not a url")));
        assert!(!bad.is_enabled());
    }

    #[tokio::test]
    async fn test_send_delivers_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/log"))
            .and(query_param("log", "Starting to Cache News Files"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let logger = RemoteLogger::new(
            Client::new(),
            Some(&config(&format!("{}/log", server.uri()))),
        );
        assert!(logger.send("Starting to Cache News Files").await);
    }

    #[tokio::test]
    async fn test_send_swallows_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let logger = RemoteLogger::new(
            Client::new(),
            Some(&config(&format!("{}/log", server.uri()))),
        );
        assert!(!logger.send("hello").await);
    }

    #[tokio::test]
    async fn test_send_swallows_unreachable_endpoint() {
        let uri = {
            let server = MockServer::start().await;
            server.uri()
        };

        let logger = RemoteLogger::new(Client::new(), Some(&config(&format!("{}/log", uri))));
        assert!(!logger.send("hello").await);

        // Background delivery must not panic either
        logger.log("hello again");
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn test_disabled_logger_is_noop() {
        let logger = RemoteLogger::disabled(Client::new());
        logger.log("ignored");
        assert!(logger.send("ignored").await);
    }
}
