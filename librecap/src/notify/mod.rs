use thiserror::Error;

use crate::log::*;

pub mod ntfy;

pub use ntfy::{NtfyConfig, NtfyNotifier};

/// A notification the endpoint accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivered {
    pub status: u16,
}

#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("{0}")]
    Transport(#[from] reqwest::Error),
}

impl DeliveryError {
    pub fn status(&self) -> Option<u16> {
        match self {
            DeliveryError::Status { status, .. } => Some(*status),
            DeliveryError::Transport(err) => err.status().map(|s| s.as_u16()),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, DeliveryError::Transport(err) if err.is_timeout())
    }
}

/// Something that can push a recap to its destination. Sending happens once,
/// synchronously, with no retries.
pub trait Notifier: std::fmt::Debug {
    fn notify(&self, message: &str) -> Result<Delivered, DeliveryError>;
}

/// Send `message` and report how it went. Failures are logged as warnings
/// and never returned; the result only says whether the message got through.
#[tracing::instrument(skip(message))]
pub fn deliver(notifier: &dyn Notifier, message: &str) -> bool {
    match notifier.notify(message) {
        Ok(delivered) => {
            info!("sent recap notification, status {}", delivered.status);
            println!("* sent recap notification to ntfy");
            true
        }
        Err(err) => {
            let detail = warning_for(&err);
            warn!("{}", detail);
            eprintln!("* warning: {}", detail);
            false
        }
    }
}

/// Operator-facing warning for a failed delivery.
pub fn warning_for(err: &DeliveryError) -> String {
    match err {
        DeliveryError::Status { status, body } => {
            format!("failed to send ntfy notification, status {status}: {body}")
        }
        DeliveryError::Transport(err) => format!("error sending ntfy notification: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    #[derive(Debug, Default)]
    struct RecordingNotifier {
        sent: RefCell<Vec<String>>,
        reject_with: Option<u16>,
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, message: &str) -> Result<Delivered, DeliveryError> {
            self.sent.borrow_mut().push(message.to_string());
            match self.reject_with {
                Some(status) => Err(DeliveryError::Status {
                    status,
                    body: "slow down".into(),
                }),
                None => Ok(Delivered { status: 200 }),
            }
        }
    }

    #[test]
    fn test_deliver_reports_success() {
        let notifier = RecordingNotifier::default();
        assert!(deliver(&notifier, "recap"));
        assert_eq!(vec!["recap".to_string()], *notifier.sent.borrow());
    }

    #[test]
    fn test_deliver_swallows_rejection() {
        let notifier = RecordingNotifier {
            reject_with: Some(429),
            ..Default::default()
        };
        assert!(!deliver(&notifier, "recap"));
        assert_eq!(1, notifier.sent.borrow().len());
    }

    #[test]
    fn test_warning_mentions_status_and_body() {
        let err = DeliveryError::Status {
            status: 429,
            body: "slow down".into(),
        };
        assert_eq!(Some(429), err.status());
        assert!(!err.is_timeout());
        assert_eq!(
            "failed to send ntfy notification, status 429: slow down",
            warning_for(&err)
        );
    }
}
