//! Native HTTP transport using reqwest

use std::time::Duration;

use async_trait::async_trait;
use reqwest::redirect::Policy;
use reqwest::Client;

use super::{HttpError, ProbeMethod, ProbeTransport};

const MAX_REDIRECTS: usize = 10;

pub struct HttpClient {
    client: Client,
    user_agent: String,
}

impl HttpClient {
    pub fn new(user_agent: &str) -> Result<Self, HttpError> {
        let client = Client::builder()
            .redirect(Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| HttpError::RequestFailed {
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            user_agent: user_agent.to_string(),
        })
    }
}

#[async_trait]
impl ProbeTransport for HttpClient {
    async fn send(
        &self,
        method: ProbeMethod,
        url: &str,
        timeout: Duration,
    ) -> Result<u16, HttpError> {
        let request = match method {
            ProbeMethod::Head => self.client.head(url),
            ProbeMethod::Get => self.client.get(url),
        };

        let response = request
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .timeout(timeout)
            .send()
            .await
            .map_err(classify)?;

        Ok(response.status().as_u16())
    }
}

fn classify(err: reqwest::Error) -> HttpError {
    if err.is_timeout() {
        HttpError::Timeout
    } else if err.is_connect() {
        HttpError::Connection {
            message: err.to_string(),
        }
    } else if err.is_builder() {
        HttpError::InvalidUrl {
            url: err.url().map(|u| u.to_string()).unwrap_or_default(),
        }
    } else {
        HttpError::RequestFailed {
            message: err.to_string(),
        }
    }
}
