//! Mailchimp Transactional (Mandrill) client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{Notifier, ResultSummary};
use crate::config::{API_KEY_ENV, MailConfig, SENDER_EMAIL_ENV};
use crate::error::{Error, Result};

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    key: &'a str,
    message: Message<'a>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    html: String,
    subject: String,
    from_email: &'a str,
    from_name: &'a str,
    to: Vec<Recipient<'a>>,
}

#[derive(Debug, Serialize)]
struct Recipient<'a> {
    email: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
}

/// Per-recipient outcome returned by `messages/send`
#[derive(Debug, Deserialize)]
struct SendStatus {
    #[serde(default)]
    email: String,
    status: String,
    #[serde(default)]
    reject_reason: Option<String>,
}

/// Body of a non-2xx API reply
#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Sends result summaries through Mandrill
#[derive(Clone)]
pub struct MandrillNotifier {
    http_client: HttpClient,
    api_key: Option<String>,
    sender_email: Option<String>,
    sender_name: String,
    base_url: String,
}

impl std::fmt::Debug for MandrillNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MandrillNotifier")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.is_some())
            .field("sender_email", &self.sender_email)
            .finish()
    }
}

impl MandrillNotifier {
    /// Build a notifier; a missing key or sender only fails at send time
    pub fn new(config: &MailConfig) -> Result<Self> {
        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(Error::NotifierNetwork)?;

        Ok(Self {
            http_client,
            api_key: config.api_key.clone(),
            sender_email: config.sender_email.clone(),
            sender_name: config.sender_name.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some() && self.sender_email.is_some()
    }

    fn credentials(&self) -> Result<(&str, &str)> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| Error::NotifierConfig(format!("{} is not set", API_KEY_ENV)))?;
        let sender = self.sender_email.as_deref().ok_or_else(|| {
            Error::NotifierConfig(format!(
                "no sender address; set {} or mail.sender_email",
                SENDER_EMAIL_ENV
            ))
        })?;
        Ok((api_key, sender))
    }
}

#[async_trait]
impl Notifier for MandrillNotifier {
    async fn notify(&self, summary: &ResultSummary) -> Result<()> {
        let (api_key, sender) = self.credentials()?;

        let request = SendRequest {
            key: api_key,
            message: Message {
                html: summary.render_html()?,
                subject: summary.subject(),
                from_email: sender,
                from_name: &self.sender_name,
                to: vec![Recipient {
                    email: &summary.student_email,
                    kind: "to",
                }],
            },
        };

        let url = format!("{}/messages/send", self.base_url);
        debug!(url = %url, recipient = %summary.student_email, "Sending result email");

        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_builder() {
                    Error::NotifierConfig(format!("invalid mail.base_url: {}", e))
                } else {
                    Error::NotifierNetwork(e)
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(Error::NotifierNetwork)?;

        if !status.is_success() {
            let detail = serde_json::from_str::<ApiError>(&body)
                .ok()
                .and_then(|e| e.message.or(e.name))
                .unwrap_or_else(|| body.trim().to_string());
            warn!(status = %status, detail = %detail, "Mail API returned an error");
            return Err(Error::NotifierRemote(format!("HTTP {}: {}", status, detail)));
        }

        let statuses: Vec<SendStatus> = serde_json::from_str(&body)
            .map_err(|e| Error::NotifierRemote(format!("unexpected response: {}", e)))?;

        if let Some(refused) = statuses
            .iter()
            .find(|s| s.status == "rejected" || s.status == "invalid")
        {
            let reason = refused.reject_reason.as_deref().unwrap_or("no reason given");
            warn!(email = %refused.email, status = %refused.status, reason, "Recipient refused");
            return Err(Error::NotifierRemote(format!(
                "{} was {} ({})",
                refused.email, refused.status, reason
            )));
        }

        info!(recipient = %summary.student_email, project = %summary.project_name, "Result email sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn mail_config(base_url: &str) -> MailConfig {
        MailConfig {
            api_key: Some("test-key".to_string()),
            sender_email: Some("games@example.org".to_string()),
            base_url: base_url.to_string(),
            timeout_secs: 5,
            ..Default::default()
        }
    }

    fn summary() -> ResultSummary {
        ResultSummary {
            student_name: "Anna".to_string(),
            student_email: "anna@example.org".to_string(),
            project_name: "Quiz".to_string(),
            score: "9".to_string(),
            time_spent: "01:02".to_string(),
        }
    }

    #[tokio::test]
    async fn test_notify_posts_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages/send"))
            .and(body_partial_json(json!({
                "key": "test-key",
                "message": {
                    "subject": "Results of 'Quiz' for Anna",
                    "from_email": "games@example.org",
                    "from_name": "Game Platform",
                    "to": [{"email": "anna@example.org", "type": "to"}]
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"email": "anna@example.org", "status": "sent", "_id": "abc"}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = MandrillNotifier::new(&mail_config(&server.uri())).unwrap();
        notifier.notify(&summary()).await.expect("notify should succeed");
    }

    #[tokio::test]
    async fn test_queued_status_is_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages/send"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"email": "anna@example.org", "status": "queued"}
            ])))
            .mount(&server)
            .await;

        let notifier = MandrillNotifier::new(&mail_config(&server.uri())).unwrap();
        assert!(notifier.notify(&summary()).await.is_ok());
    }

    #[tokio::test]
    async fn test_rejected_recipient_is_remote_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages/send"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"email": "anna@example.org", "status": "rejected", "reject_reason": "unsigned"}
            ])))
            .mount(&server)
            .await;

        let notifier = MandrillNotifier::new(&mail_config(&server.uri())).unwrap();
        match notifier.notify(&summary()).await {
            Err(Error::NotifierRemote(msg)) => assert!(msg.contains("unsigned")),
            other => panic!("expected NotifierRemote, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_api_error_is_remote_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages/send"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "status": "error",
                "code": -1,
                "name": "Invalid_Key",
                "message": "Invalid API key"
            })))
            .mount(&server)
            .await;

        let notifier = MandrillNotifier::new(&mail_config(&server.uri())).unwrap();
        let err = notifier.notify(&summary()).await.unwrap_err();
        assert_eq!(err.code(), "E601");
        assert!(err.to_string().contains("Invalid API key"));
    }

    #[tokio::test]
    async fn test_missing_credentials_is_config_error() {
        let mut config = mail_config("http://127.0.0.1:1");
        config.api_key = None;
        let notifier = MandrillNotifier::new(&config).unwrap();
        assert!(!notifier.is_configured());
        assert!(matches!(
            notifier.notify(&summary()).await,
            Err(Error::NotifierConfig(_))
        ));

        let mut config = mail_config("http://127.0.0.1:1");
        config.sender_email = None;
        let notifier = MandrillNotifier::new(&config).unwrap();
        assert!(matches!(
            notifier.notify(&summary()).await,
            Err(Error::NotifierConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_network_error() {
        let notifier = MandrillNotifier::new(&mail_config("http://127.0.0.1:1")).unwrap();
        let err = notifier.notify(&summary()).await.unwrap_err();
        assert!(matches!(err, Error::NotifierNetwork(_)));
        assert_eq!(err.code(), "E602");
    }
}
