//! Notification fan-out seam.
//!
//! Domain events are published to the message bus for the downstream
//! notification/chat delivery services. Publishing is fire-and-forget:
//! a failure is logged and never fails the triggering request.

use crate::domain::events::DomainEvent;

#[derive(Clone)]
pub struct Notifier {
    nats: Option<async_nats::Client>,
}

impl Notifier {
    pub fn new(nats: Option<async_nats::Client>) -> Self {
        Self { nats }
    }

    pub fn publish(&self, events: Vec<DomainEvent>) {
        let Some(client) = self.nats.clone() else {
            return;
        };
        if events.is_empty() {
            return;
        }
        tokio::spawn(async move {
            for event in events {
                let subject = event.subject();
                let payload = match serde_json::to_vec(&event) {
                    Ok(payload) => payload,
                    Err(e) => {
                        tracing::error!(subject, error = %e, "failed to encode event");
                        continue;
                    }
                };
                if let Err(e) = client.publish(subject.to_string(), payload.into()).await {
                    tracing::warn!(subject, error = %e, "event publish failed");
                }
            }
        });
    }
}
