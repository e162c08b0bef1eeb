use log::debug;
use reqwest::Client;
use std::future::Future;
use std::time::{Duration, Instant};

use crate::client::{Transport, TransportError};

/// Plain-HTTP transport backed by a shared reqwest client.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

impl Transport for HttpTransport {
    fn get(
        &self,
        url: String,
        timeout: Duration,
    ) -> impl Future<Output = Result<String, TransportError>> + Send {
        let client = self.client.clone();
        async move {
            let start = Instant::now();
            let result = async {
                let response = client.get(&url).timeout(timeout).send().await?;
                response.text().await
            }
            .await;
            debug!("GET {} took: {} ms", url, start.elapsed().as_millis());

            result.map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout(timeout)
                } else {
                    TransportError::Request(e)
                }
            })
        }
    }
}
