//! Delivery of messages to tenants.

use thiserror::Error;
use tracing::info;

use crate::config::NotifierChannel;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    #[error("{0} delivery is not supported")]
    Unsupported(&'static str),

    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// Delivers a message to a recipient.
#[allow(async_fn_in_trait)]
pub trait Notifier {
    async fn notify(&self, recipient: &str, message: &str) -> Result<(), NotifyError>;
}

/// Prints to standard output. Always succeeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    async fn notify(&self, recipient: &str, message: &str) -> Result<(), NotifyError> {
        info!(recipient, "console notification");
        println!("To {}: {}", recipient, message);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EmailNotifier;

impl Notifier for EmailNotifier {
    async fn notify(&self, _recipient: &str, _message: &str) -> Result<(), NotifyError> {
        Err(NotifyError::Unsupported("email"))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SmsNotifier;

impl Notifier for SmsNotifier {
    async fn notify(&self, _recipient: &str, _message: &str) -> Result<(), NotifyError> {
        Err(NotifyError::Unsupported("sms"))
    }
}

/// Notifier picked from configuration.
#[derive(Debug, Clone, Copy)]
pub enum Channel {
    Console(ConsoleNotifier),
    Email(EmailNotifier),
    Sms(SmsNotifier),
}

impl From<NotifierChannel> for Channel {
    fn from(channel: NotifierChannel) -> Self {
        match channel {
            NotifierChannel::Console => Channel::Console(ConsoleNotifier),
            NotifierChannel::Email => Channel::Email(EmailNotifier),
            NotifierChannel::Sms => Channel::Sms(SmsNotifier),
        }
    }
}

impl Notifier for Channel {
    async fn notify(&self, recipient: &str, message: &str) -> Result<(), NotifyError> {
        match self {
            Channel::Console(notifier) => notifier.notify(recipient, message).await,
            Channel::Email(notifier) => notifier.notify(recipient, message).await,
            Channel::Sms(notifier) => notifier.notify(recipient, message).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_console_always_succeeds() {
        let channel = Channel::from(NotifierChannel::Console);
        assert_eq!(channel.notify("ada@x", "hello").await, Ok(()));
    }

    #[tokio::test]
    async fn test_email_and_sms_unsupported() {
        let email = Channel::from(NotifierChannel::Email);
        let sms = Channel::from(NotifierChannel::Sms);
        assert_eq!(
            email.notify("ada@x", "hello").await,
            Err(NotifyError::Unsupported("email"))
        );
        assert_eq!(
            sms.notify("555", "hello").await,
            Err(NotifyError::Unsupported("sms"))
        );
    }
}
