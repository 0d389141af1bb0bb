/// Transactional email
///
/// Actions notify people (welcome mail with a temporary password, trip
/// assignment, shipment status) through an [`EmailSender`]. Sending never
/// blocks or fails the action: [`dispatch_email`] spawns the send and only logs
/// the outcome.
///
/// Two senders exist:
///
/// - [`HttpEmailSender`]: posts `{from, to, subject, text}` as JSON to
///   `<api_url>/emails` with a bearer API key
/// - [`LogEmailSender`]: writes the message to the log, used when no email API
///   is configured
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use fleetdesk_shared::integrations::email::{dispatch_email, EmailMessage, EmailSender, LogEmailSender};
///
/// # async fn example() {
/// let sender: Arc<dyn EmailSender> = Arc::new(LogEmailSender::new("FleetDesk <noreply@fleetdesk.local>"));
/// dispatch_email(sender, EmailMessage::trip_assigned("driver@example.com", "Lyon", "Paris", "2026-10-20 08:00 UTC"));
/// # }
/// ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Error type for email delivery
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    /// Could not reach the email API
    #[error("Email request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Email API answered with a non-success status
    #[error("Email API rejected the message with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// A plain-text email
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub text: String,
}

impl EmailMessage {
    /// Account created by an administrator
    pub fn welcome(to: &str, name: Option<&str>, temporary_password: &str) -> Self {
        let greeting = name.map_or_else(|| "Hello".to_string(), |n| format!("Hello {}", n));

        Self {
            to: to.to_string(),
            subject: "Your FleetDesk account".to_string(),
            text: format!(
                "{},\n\nAn account has been created for you.\n\n\
                 Email: {}\nTemporary password: {}\n\n\
                 You will be asked to choose a new password when you first sign in.",
                greeting, to, temporary_password
            ),
        }
    }

    /// A trip was assigned to a driver
    pub fn trip_assigned(to: &str, origin: &str, destination: &str, scheduled_at: &str) -> Self {
        Self {
            to: to.to_string(),
            subject: "New trip assigned".to_string(),
            text: format!(
                "A new trip has been assigned to you.\n\n\
                 From: {}\nTo: {}\nScheduled: {}",
                origin, destination, scheduled_at
            ),
        }
    }

    /// A shipment changed status
    pub fn shipment_status(to: &str, tracking_number: &str, status: &str) -> Self {
        Self {
            to: to.to_string(),
            subject: format!("Shipment {} is now {}", tracking_number, status),
            text: format!(
                "Your shipment {} changed status to {}.",
                tracking_number, status
            ),
        }
    }
}

/// Something that can deliver an [`EmailMessage`]
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError>;
}

#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

/// Sends email through an HTTP JSON API
#[derive(Debug, Clone)]
pub struct HttpEmailSender {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    from: String,
}

impl HttpEmailSender {
    /// Creates a sender posting to `<api_url>/emails`
    pub fn new(
        api_url: &str,
        api_key: impl Into<String>,
        from: impl Into<String>,
    ) -> Result<Self, EmailError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/emails", api_url.trim_end_matches('/')),
            api_key: api_key.into(),
            from: from.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl EmailSender for HttpEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        let body = SendEmailRequest {
            from: &self.from,
            to: &message.to,
            subject: &message.subject,
            text: &message.text,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmailError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        debug!(to = %message.to, subject = %message.subject, "Email accepted by API");
        Ok(())
    }
}

/// Logs messages instead of sending them
#[derive(Debug, Clone)]
pub struct LogEmailSender {
    from: String,
}

impl LogEmailSender {
    pub fn new(from: impl Into<String>) -> Self {
        Self { from: from.into() }
    }
}

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        info!(
            from = %self.from,
            to = %message.to,
            subject = %message.subject,
            "Email not sent (no email API configured)"
        );
        Ok(())
    }
}

/// Sends `message` in the background
///
/// Failures are logged and never reach the caller.
pub fn dispatch_email(sender: Arc<dyn EmailSender>, message: EmailMessage) {
    tokio::spawn(async move {
        if let Err(e) = sender.send(&message).await {
            warn!(to = %message.to, subject = %message.subject, error = %e, "Failed to send email");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSender {
        sent: Mutex<Vec<EmailMessage>>,
    }

    #[async_trait]
    impl EmailSender for RecordingSender {
        async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    struct FailingSender;

    #[async_trait]
    impl EmailSender for FailingSender {
        async fn send(&self, _message: &EmailMessage) -> Result<(), EmailError> {
            Err(EmailError::Rejected {
                status: 500,
                body: "down".to_string(),
            })
        }
    }

    #[test]
    fn test_welcome_message_contains_password() {
        let message = EmailMessage::welcome("d@example.com", Some("Dana"), "Tmp#Pass99");

        assert_eq!(message.to, "d@example.com");
        assert!(message.text.starts_with("Hello Dana"));
        assert!(message.text.contains("Tmp#Pass99"));
    }

    #[test]
    fn test_shipment_status_subject() {
        let message = EmailMessage::shipment_status("c@example.com", "SHP-ABCDEFGHIJ", "DELIVERED");
        assert_eq!(message.subject, "Shipment SHP-ABCDEFGHIJ is now DELIVERED");
    }

    #[test]
    fn test_http_sender_endpoint() {
        let sender = HttpEmailSender::new("https://mail.example.com/", "key", "from@example.com")
            .unwrap();
        assert_eq!(sender.endpoint(), "https://mail.example.com/emails");
    }

    #[tokio::test]
    async fn test_log_sender_succeeds() {
        let sender = LogEmailSender::new("noreply@example.com");
        let message = EmailMessage::trip_assigned("d@example.com", "Lyon", "Paris", "tomorrow");

        assert!(sender.send(&message).await.is_ok());
    }

    #[tokio::test]
    async fn test_dispatch_email_sends_in_background() {
        let sender = Arc::new(RecordingSender::default());
        let message = EmailMessage::trip_assigned("d@example.com", "Lyon", "Paris", "tomorrow");

        dispatch_email(sender.clone(), message.clone());

        for _ in 0..50 {
            if !sender.sent.lock().unwrap().is_empty() {
                break;
            }
            tokio::task::yield_now().await;
        }

        assert_eq!(sender.sent.lock().unwrap().as_slice(), &[message]);
    }

    #[tokio::test]
    async fn test_dispatch_email_swallows_failures() {
        dispatch_email(
            Arc::new(FailingSender),
            EmailMessage::shipment_status("c@example.com", "SHP-ABCDEFGHIJ", "IN_TRANSIT"),
        );
        tokio::task::yield_now().await;
    }
}
