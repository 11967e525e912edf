use futures::{stream, StreamExt};
use tracing::warn;

pub mod template;
pub mod transport;

use transport::{DispatchError, MessageTransport, OutboundMessage};

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct DeliveryOutcome {
    pub delivered: usize,
    pub failed: usize,
}

/// Dispatch one campaign firing: the rendered body goes to every resolved
/// address with bounded concurrency. A per-address failure is logged and
/// does not abort the rest of the batch; there are no retries.
pub async fn deliver_campaign(
    transport: &dyn MessageTransport,
    from: &str,
    subject: &str,
    body: &str,
    recipients: Vec<String>,
    concurrency: usize,
) -> DeliveryOutcome {
    let results: Vec<Result<(), DispatchError>> = stream::iter(recipients)
        .map(|to| {
            let message = OutboundMessage {
                from: from.to_string(),
                to,
                subject: subject.to_string(),
                body: body.to_string(),
            };
            async move {
                let result = transport.send(&message).await;
                if let Err(err) = &result {
                    warn!(to = %message.to, %err, "per-address dispatch failed");
                }
                result
            }
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let failed = results.iter().filter(|result| result.is_err()).count();
    DeliveryOutcome {
        delivered: results.len() - failed,
        failed,
    }
}

#[cfg(test)]
mod tests {
    use super::transport::test::MockTransport;
    use super::*;

    #[tokio::test]
    async fn delivers_one_message_per_address() {
        let transport = MockTransport::new();
        let recipients = vec!["a@x.com".to_string(), "b@x.com".to_string()];

        let outcome = deliver_campaign(
            &transport,
            "news@example.com",
            "Newsletter",
            "<p>hello</p>",
            recipients,
            4,
        )
        .await;

        assert_eq!(outcome, DeliveryOutcome { delivered: 2, failed: 0 });
        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert!(sent.iter().all(|m| m.body == "<p>hello</p>"));
        assert!(sent.iter().all(|m| m.from == "news@example.com"));
    }

    #[tokio::test]
    async fn a_failing_address_does_not_abort_the_batch() {
        let transport = MockTransport::failing(vec!["bad@x.com".to_string()]);
        let recipients = vec![
            "a@x.com".to_string(),
            "bad@x.com".to_string(),
            "b@x.com".to_string(),
        ];

        let outcome = deliver_campaign(
            &transport,
            "news@example.com",
            "Newsletter",
            "<p>hello</p>",
            recipients,
            1,
        )
        .await;

        assert_eq!(outcome, DeliveryOutcome { delivered: 2, failed: 1 });
        let mut sent_to = transport.sent_to();
        sent_to.sort();
        assert_eq!(sent_to, vec!["a@x.com", "b@x.com"]);
    }

    #[tokio::test]
    async fn an_empty_recipient_list_is_a_quiet_no_op() {
        let transport = MockTransport::new();

        let outcome = deliver_campaign(
            &transport,
            "news@example.com",
            "Newsletter",
            "<p>hello</p>",
            Vec::new(),
            4,
        )
        .await;

        assert_eq!(outcome, DeliveryOutcome::default());
        assert!(transport.sent.lock().unwrap().is_empty());
    }
}
