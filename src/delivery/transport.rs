use std::fmt::{self, Display};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::config::MailConfig;
use crate::error::Error;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OutboundMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// A per-address delivery failure. Logged by the dispatch loop, never
/// surfaced to a caller; campaigns have no caller at fire time.
#[derive(Clone, Debug)]
pub struct DispatchError {
    pub to: String,
    pub reason: String,
}

impl Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dispatch to {} failed: {}", self.to, self.reason)
    }
}

impl std::error::Error for DispatchError {}

#[async_trait]
pub trait MessageTransport: Send + Sync {
    async fn send(&self, message: &OutboundMessage) -> Result<(), DispatchError>;
}

/// Mail-API client: one JSON POST per message, bearer-authenticated.
pub struct HttpMailer {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl HttpMailer {
    pub fn new(config: &MailConfig) -> Result<HttpMailer, Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(HttpMailer {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl MessageTransport for HttpMailer {
    async fn send(&self, message: &OutboundMessage) -> Result<(), DispatchError> {
        #[derive(Serialize)]
        struct Payload<'a> {
            from: &'a str,
            to: &'a str,
            subject: &'a str,
            html: &'a str,
        }

        let dispatch_error = |reason: String| DispatchError {
            to: message.to.clone(),
            reason,
        };

        self.client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&Payload {
                from: &message.from,
                to: &message.to,
                subject: &message.subject,
                html: &message.body,
            })
            .send()
            .await
            .map_err(|err| dispatch_error(err.to_string()))?
            .error_for_status()
            .map_err(|err| dispatch_error(err.to_string()))?;

        Ok(())
    }
}
