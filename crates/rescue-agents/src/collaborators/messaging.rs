//! Messaging collaborators: customer email and SMS.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

use crate::collaborators::http_client;
use crate::collaborators::secrets::{
    CachedSecret, SecretStore, SENDGRID_API_KEY, TWILIO_ACCOUNT_SID, TWILIO_AUTH_TOKEN,
};
use crate::contracts::SendReceipt;
use crate::error::CollaboratorError;

/// SMS bodies are clamped to this many characters, ellipsis included.
pub const SMS_MAX_CHARS: usize = 160;

/// Email sending contract.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send_email(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<SendReceipt, CollaboratorError>;
}

/// SMS sending contract. Bodies are expected to be pre-clamped with
/// [`clamp_sms_body`].
#[async_trait]
pub trait SmsSender: Send + Sync {
    async fn send_sms(&self, recipient: &str, body: &str)
        -> Result<SendReceipt, CollaboratorError>;
}

/// Truncate a message to [`SMS_MAX_CHARS`] characters total, ending in
/// an ellipsis when truncated.
pub fn clamp_sms_body(body: &str) -> String {
    if body.chars().count() <= SMS_MAX_CHARS {
        return body.to_string();
    }
    let head: String = body.chars().take(SMS_MAX_CHARS - 3).collect();
    format!("{head}...")
}

/// Wrap a plain-text body in the standard HTML email scaffold.
fn format_html_email(body: &str) -> String {
    let html_body = body.replace('\n', "<br>");
    format!(
        "<html>\n<body style=\"font-family: Arial, sans-serif; line-height: 1.6; color: #333;\">\n\
         <div style=\"max-width: 600px; margin: 0 auto; padding: 20px;\">\n\
         {html_body}\n\
         <br><br>\n\
         <div style=\"border-top: 1px solid #eee; padding-top: 20px; margin-top: 20px;\">\n\
         <p style=\"font-size: 12px; color: #666;\">\n\
         This message was sent by our Customer Experience Rescue system to ensure \
         your issue is resolved quickly. If you need further assistance, please \
         contact our support team.\n\
         </p>\n</div>\n</div>\n</body>\n</html>"
    )
}

/// SendGrid-style email client.
pub struct HttpEmailSender {
    client: reqwest::Client,
    from_email: String,
    secrets: Arc<dyn SecretStore>,
    api_key: CachedSecret,
}

impl HttpEmailSender {
    pub fn new(
        from_email: &str,
        secrets: Arc<dyn SecretStore>,
        timeout: Duration,
    ) -> Result<Self, CollaboratorError> {
        Ok(Self {
            client: http_client(timeout)?,
            from_email: from_email.to_string(),
            secrets,
            api_key: CachedSecret::new(SENDGRID_API_KEY),
        })
    }
}

#[async_trait]
impl EmailSender for HttpEmailSender {
    async fn send_email(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<SendReceipt, CollaboratorError> {
        let api_key = self.api_key.get(self.secrets.as_ref()).await?;
        let payload = json!({
            "personalizations": [{
                "to": [{"email": recipient}],
                "subject": subject,
            }],
            "from": {"email": self.from_email},
            "content": [{
                "type": "text/html",
                "value": format_html_email(body),
            }],
            "categories": ["cx-rescue"],
        });

        info!(recipient, "Sending email");
        let resp = self
            .client
            .post("https://api.sendgrid.com/v3/mail/send")
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(CollaboratorError::Transport(format!(
                "email endpoint returned {status}"
            )));
        }

        let message_id = resp
            .headers()
            .get("X-Message-Id")
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        Ok(SendReceipt {
            success: true,
            message_id,
            error: None,
        })
    }
}

/// Twilio-style SMS client (form-encoded, basic auth).
pub struct HttpSmsSender {
    client: reqwest::Client,
    from_number: String,
    secrets: Arc<dyn SecretStore>,
    account_sid: CachedSecret,
    auth_token: CachedSecret,
}

impl HttpSmsSender {
    pub fn new(
        from_number: &str,
        secrets: Arc<dyn SecretStore>,
        timeout: Duration,
    ) -> Result<Self, CollaboratorError> {
        Ok(Self {
            client: http_client(timeout)?,
            from_number: from_number.to_string(),
            secrets,
            account_sid: CachedSecret::new(TWILIO_ACCOUNT_SID),
            auth_token: CachedSecret::new(TWILIO_AUTH_TOKEN),
        })
    }
}

#[async_trait]
impl SmsSender for HttpSmsSender {
    async fn send_sms(
        &self,
        recipient: &str,
        body: &str,
    ) -> Result<SendReceipt, CollaboratorError> {
        let account_sid = self.account_sid.get(self.secrets.as_ref()).await?.to_string();
        let auth_token = self.auth_token.get(self.secrets.as_ref()).await?;
        let url = format!(
            "https://api.twilio.com/2010-04-01/Accounts/{account_sid}/Messages.json"
        );

        info!(recipient, "Sending SMS");
        let resp = self
            .client
            .post(&url)
            .basic_auth(&account_sid, Some(auth_token))
            .form(&[
                ("To", recipient),
                ("From", self.from_number.as_str()),
                ("Body", body),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(CollaboratorError::Transport(format!(
                "SMS endpoint returned {status}"
            )));
        }

        let data: Value = resp
            .json()
            .await
            .map_err(|e| CollaboratorError::Payload(e.to_string()))?;
        Ok(SendReceipt {
            success: true,
            message_id: data.get("sid").and_then(Value::as_str).map(String::from),
            error: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_short_body_untouched() {
        let body = "Your refund has been processed.";
        assert_eq!(clamp_sms_body(body), body);
    }

    #[test]
    fn test_clamp_long_body_to_160_with_ellipsis() {
        let body = "x".repeat(200);
        let clamped = clamp_sms_body(&body);
        assert_eq!(clamped.chars().count(), 160);
        assert!(clamped.ends_with("..."));
    }

    #[test]
    fn test_clamp_exact_limit_untouched() {
        let body = "y".repeat(160);
        assert_eq!(clamp_sms_body(&body), body);
    }

    #[test]
    fn test_clamp_respects_multibyte_chars() {
        let body = "é".repeat(200);
        let clamped = clamp_sms_body(&body);
        assert_eq!(clamped.chars().count(), 160);
        assert!(clamped.ends_with("..."));
    }

    #[test]
    fn test_html_email_wraps_body() {
        let html = format_html_email("Line one\nLine two");
        assert!(html.contains("Line one<br>Line two"));
        assert!(html.contains("Customer Experience Rescue"));
    }
}
