//! Inbound side of the relay: turns codes-delivery messages into store batches.
//!
//! The sender never learns what happened to its message. Every outcome is
//! logged here and the HTTP layer always answers with an empty acknowledgment.

use super::Store;
use passcode::{Code, SLOT_COUNT, StoreError};
use serde::Deserialize;
use std::sync::Arc;

/// Form fields of an inbound SMS webhook.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InboundMessage {
    #[serde(rename = "Body", default)]
    pub body: String,
    #[serde(rename = "From", default)]
    pub from: Option<String>,
    #[serde(rename = "AccountSid", default)]
    pub account_sid: Option<String>,
}

/// What became of one inbound message.
#[derive(Debug)]
pub enum IngestOutcome {
    /// A batch of `count` codes replaced the store contents.
    Stored { count: usize },
    /// Not a codes-delivery message, or not from the configured account.
    Ignored,
    /// A codes-delivery message with a malformed batch. The store is unchanged.
    Rejected(StoreError),
    /// The batch was valid but the store could not take it.
    Failed(StoreError),
}

impl IngestOutcome {
    fn log(&self) {
        match self {
            Self::Stored { count } => tracing::info!(count, "Stored new passcode batch"),
            Self::Ignored => tracing::debug!("Message is not a codes delivery, ignoring"),
            Self::Rejected(e) => tracing::warn!("Rejected passcode batch: {e}"),
            Self::Failed(e) => tracing::error!("Failed to store passcode batch: {e}"),
        }
    }
}

pub struct IngestAdapter {
    store: Arc<Store>,
    marker: String,
    account_sid: Option<String>,
}

impl IngestAdapter {
    pub fn new(store: Arc<Store>, marker: impl Into<String>, account_sid: Option<String>) -> Self {
        Self {
            store,
            marker: marker.into(),
            account_sid,
        }
    }

    /// Handles a full webhook message, checking the sending account first.
    pub fn ingest_message(&self, message: &InboundMessage) -> IngestOutcome {
        if let Some(expected) = &self.account_sid {
            if message.account_sid.as_deref() != Some(expected.as_str()) {
                tracing::warn!(
                    from = message.from.as_deref().unwrap_or("unknown"),
                    "Ignoring message from unexpected messaging account"
                );
                return IngestOutcome::Ignored;
            }
        }
        tracing::info!(
            from = message.from.as_deref().unwrap_or("unknown"),
            "Message received"
        );
        self.ingest(&message.body)
    }

    /// Stores the codes carried by `payload`, if it is a codes-delivery
    /// message.
    ///
    /// Every token is validated before the store is touched, so one bad token
    /// leaves the previous batch and cursor in place.
    pub fn ingest(&self, payload: &str) -> IngestOutcome {
        let outcome = self.apply(payload);
        outcome.log();
        outcome
    }

    fn apply(&self, payload: &str) -> IngestOutcome {
        let Some(tokens) = self.extract_tokens(payload) else {
            return IngestOutcome::Ignored;
        };

        let codes = match self.validate(&tokens) {
            Ok(codes) => codes,
            Err(e) => return IngestOutcome::Rejected(e),
        };

        match self.store.replace(&codes) {
            Ok(()) => IngestOutcome::Stored { count: codes.len() },
            Err(e) if e.is_invalid_input() => IngestOutcome::Rejected(e),
            Err(e) => IngestOutcome::Failed(e),
        }
    }

    /// Splits the text after the marker into tokens, or `None` when the
    /// payload does not start with the marker.
    fn extract_tokens<'a>(&self, payload: &'a str) -> Option<Vec<&'a str>> {
        payload
            .trim_start()
            .strip_prefix(self.marker.as_str())
            .map(|rest| rest.split_whitespace().collect())
    }

    fn validate(&self, tokens: &[&str]) -> Result<Vec<Code>, StoreError> {
        if tokens.is_empty() {
            return Err(StoreError::InvalidCodeFormat {
                reason: "codes-delivery message carried no codes".to_string(),
            });
        }
        if tokens.len() > SLOT_COUNT {
            return Err(StoreError::InvalidCodeFormat {
                reason: format!(
                    "codes-delivery message carried {} codes, at most {SLOT_COUNT} fit",
                    tokens.len()
                ),
            });
        }
        let layout = self.store.layout();
        tokens
            .iter()
            .map(|token| Code::parse(token, layout))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use passcode::{Cursor, Dispense, StoreOptions};
    use tempfile::TempDir;

    const MARKER: &str = "SMS passcodes:";

    fn adapter(account_sid: Option<&str>) -> (TempDir, Arc<Store>, IngestAdapter) {
        let dir = tempfile::tempdir().unwrap();
        let store =
            Arc::new(Store::open(dir.path().join("codes.bin"), StoreOptions::default()).unwrap());
        let adapter = IngestAdapter::new(
            Arc::clone(&store),
            MARKER,
            account_sid.map(str::to_string),
        );
        (dir, store, adapter)
    }

    #[test]
    fn stores_codes_in_message_order() {
        let (_dir, store, adapter) = adapter(None);
        let outcome = adapter.ingest("SMS passcodes: 1111111 2222222\n3333333");
        assert!(matches!(outcome, IngestOutcome::Stored { count: 3 }));

        assert_eq!(store.next().unwrap().unwrap_ready(), "1111111");
        assert_eq!(store.next().unwrap().unwrap_ready(), "2222222");
        assert_eq!(store.next().unwrap().unwrap_ready(), "3333333");
        assert_eq!(store.next().unwrap(), Dispense::OutOfCodes);
    }

    #[test]
    fn leading_whitespace_before_marker_is_tolerated() {
        let (_dir, _store, adapter) = adapter(None);
        let outcome = adapter.ingest("  \nSMS passcodes: 1111111");
        assert!(matches!(outcome, IngestOutcome::Stored { count: 1 }));
    }

    #[test]
    fn other_messages_are_ignored() {
        let (_dir, store, adapter) = adapter(None);
        assert!(matches!(adapter.ingest("hello there"), IngestOutcome::Ignored));
        assert!(matches!(
            adapter.ingest("Your code is 1234567"),
            IngestOutcome::Ignored
        ));
        assert_eq!(store.cursor().unwrap(), Cursor::Exhausted);
    }

    #[test]
    fn one_bad_token_rejects_the_whole_batch() {
        let (_dir, store, adapter) = adapter(None);
        adapter.ingest("SMS passcodes: 1111111 2222222 3333333");
        store.next().unwrap();
        let before = store.image().unwrap();

        let outcome = adapter.ingest("SMS passcodes: 4444444 555555 6666666");
        assert!(matches!(
            outcome,
            IngestOutcome::Rejected(StoreError::InvalidCodeFormat { .. })
        ));
        assert_eq!(store.image().unwrap(), before);
        assert_eq!(store.next().unwrap().unwrap_ready(), "2222222");
    }

    #[test]
    fn empty_and_oversized_batches_are_rejected() {
        let (_dir, store, adapter) = adapter(None);
        assert!(matches!(
            adapter.ingest("SMS passcodes:   "),
            IngestOutcome::Rejected(_)
        ));

        let eleven = vec!["1234567"; SLOT_COUNT + 1].join(" ");
        assert!(matches!(
            adapter.ingest(&format!("{MARKER} {eleven}")),
            IngestOutcome::Rejected(_)
        ));
        assert_eq!(store.cursor().unwrap(), Cursor::Exhausted);
    }

    #[test]
    fn account_mismatch_is_ignored() {
        let (_dir, store, adapter) = adapter(Some("AC123"));
        let mut message = InboundMessage {
            body: "SMS passcodes: 1111111".to_string(),
            from: Some("+15555550100".to_string()),
            account_sid: Some("AC999".to_string()),
        };
        assert!(matches!(
            adapter.ingest_message(&message),
            IngestOutcome::Ignored
        ));
        message.account_sid = None;
        assert!(matches!(
            adapter.ingest_message(&message),
            IngestOutcome::Ignored
        ));
        assert_eq!(store.cursor().unwrap(), Cursor::Exhausted);

        message.account_sid = Some("AC123".to_string());
        assert!(matches!(
            adapter.ingest_message(&message),
            IngestOutcome::Stored { count: 1 }
        ));
    }
}
