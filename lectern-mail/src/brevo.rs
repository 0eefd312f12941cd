//! Brevo transactional email API.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

use crate::{Address, Email, MailError, Result, Transport};

/// Production endpoint for sending a transactional email.
pub const BREVO_ENDPOINT: &str = "https://api.brevo.com/v3/smtp/email";

/// Brevo configuration.
#[derive(Debug, Clone)]
pub struct BrevoConfig {
    pub api_key: String,
    /// Defaults to [`BREVO_ENDPOINT`]; override for testing.
    pub endpoint: String,
    /// Whole-request deadline.
    pub timeout: Duration,
}

impl BrevoConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: BREVO_ENDPOINT.to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Sends through Brevo's HTTP API.
pub struct BrevoTransport {
    client: Client,
    config: BrevoConfig,
}

impl BrevoTransport {
    pub fn new(config: BrevoConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(MailError::Config("Brevo API key is empty".to_string()));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| MailError::Config(e.to_string()))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &BrevoConfig {
        &self.config
    }
}

#[async_trait]
impl Transport for BrevoTransport {
    async fn send(&self, email: &Email) -> Result<()> {
        email.validate()?;

        let payload = BrevoPayload::from_email(email)?;

        debug!(
            to = ?email.to.iter().map(|a| &a.email).collect::<Vec<_>>(),
            subject = ?email.subject,
            attachments = email.attachments.len(),
            "Sending email via Brevo"
        );

        let response = self
            .client
            .post(&self.config.endpoint)
            .header("api-key", &self.config.api_key)
            .header("accept", "application/json")
            .json(&payload)
            .send()
            .await?;

        let status = response.status();

        if status.is_success() {
            let message_id = response
                .json::<BrevoResponse>()
                .await
                .ok()
                .and_then(|r| r.message_id);
            debug!(message_id = ?message_id, "Email accepted by Brevo");
            Ok(())
        } else if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(60);
            Err(MailError::RateLimited(retry_after))
        } else {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<BrevoErrorBody>(&body)
                .ok()
                .and_then(|e| e.message)
                .unwrap_or(body);
            Err(MailError::Provider {
                status: status.as_u16(),
                message,
            })
        }
    }

    fn name(&self) -> &'static str {
        "brevo"
    }
}

/// Request body of `POST /v3/smtp/email`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BrevoPayload<'a> {
    sender: Contact<'a>,
    to: Vec<Contact<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    cc: Vec<Contact<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    bcc: Vec<Contact<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<Contact<'a>>,
    subject: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    html_content: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text_content: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attachment: Vec<BrevoAttachment<'a>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    headers: BTreeMap<&'a str, &'a str>,
}

#[derive(Debug, Serialize)]
struct Contact<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

impl<'a> From<&'a Address> for Contact<'a> {
    fn from(address: &'a Address) -> Self {
        Self {
            email: &address.email,
            name: address.name.as_deref(),
        }
    }
}

#[derive(Debug, Serialize)]
struct BrevoAttachment<'a> {
    name: &'a str,
    content: String,
    #[serde(rename = "type")]
    content_type: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BrevoResponse {
    message_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BrevoErrorBody {
    message: Option<String>,
}

impl<'a> BrevoPayload<'a> {
    fn from_email(email: &'a Email) -> Result<Self> {
        let sender = email.from.as_ref().ok_or(MailError::MissingField("from"))?;

        Ok(Self {
            sender: sender.into(),
            to: email.to.iter().map(Contact::from).collect(),
            cc: email.cc.iter().map(Contact::from).collect(),
            bcc: email.bcc.iter().map(Contact::from).collect(),
            reply_to: email.reply_to.as_ref().map(Contact::from),
            subject: email.subject.as_deref().unwrap_or_default(),
            html_content: email.html.as_deref(),
            text_content: email.text.as_deref(),
            attachment: email
                .attachments
                .iter()
                .map(|a| BrevoAttachment {
                    name: &a.filename,
                    content: a.to_base64(),
                    content_type: &a.content_type,
                })
                .collect(),
            headers: email
                .headers
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect(),
        })
    }
}
