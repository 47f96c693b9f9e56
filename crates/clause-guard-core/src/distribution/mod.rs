//! Email distribution of the compliance report.
//!
//! A send is a single attempt: recipient validation, lazy credential lookup,
//! then one transport call. Every outcome is folded into a [`Delivery`].

use std::{collections::HashMap, path::PathBuf};

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::artifacts::ArtifactError;
use crate::clauses::{EmptyInput, RiskDistribution};

mod settings;
pub mod smtp;

pub use settings::{MailSettings, SmtpDefaults, DEFAULT_SMTP_HOST};
pub use smtp::SmtpMailTransport;

pub const DEFAULT_SUBJECT: &str = "Compliance Report - Contract Analysis";
/// Content-ID under which the chart is embedded in the HTML body.
pub const CHART_CONTENT_ID: &str = "risk-chart";

#[derive(Debug, Error)]
pub enum DistributionError {
    #[error("Please enter recipient email.")]
    MissingRecipient,
    #[error("{0}")]
    Configuration(String),
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    #[error(transparent)]
    EmptyInput(#[from] EmptyInput),
    #[error("{0:#}")]
    Transport(anyhow::Error),
}

/// Outcome of one distribution attempt, ready to show to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Delivery {
    pub success: bool,
    pub message: String,
}

impl Delivery {
    pub fn sent(recipient: &str) -> Self {
        Self {
            success: true,
            message: format!("Compliance report sent to {recipient}"),
        }
    }

    pub fn failed(err: &DistributionError) -> Self {
        let message = match err {
            DistributionError::MissingRecipient => err.to_string(),
            _ => format!("Failed to send email: {err}"),
        };
        Self {
            success: false,
            message,
        }
    }
}

impl From<Result<String, DistributionError>> for Delivery {
    fn from(result: Result<String, DistributionError>) -> Self {
        match result {
            Ok(recipient) => Delivery::sent(&recipient),
            Err(err) => Delivery::failed(&err),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub path: PathBuf,
    pub content_type: &'static str,
}

/// Fully composed message handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub recipient: String,
    pub subject: String,
    pub html: String,
    pub attachment: Option<PathBuf>,
    pub inline_image: Option<InlineImage>,
}

/// Request as issued by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportEmail {
    pub recipient: String,
    pub subject: String,
    /// HTML-capable summary text.
    pub body: String,
    pub attachment: Option<PathBuf>,
    pub chart: Option<InlineImage>,
}

/// Performs exactly one delivery attempt.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn deliver(&self, settings: &MailSettings, email: &OutgoingEmail) -> AnyResult<()>;
}

/// Where credentials are looked up when a send is attempted.
#[derive(Debug, Clone, Default)]
pub enum CredentialSource {
    #[default]
    Environment,
    Fixed(HashMap<String, String>),
}

impl CredentialSource {
    fn resolve(&self, defaults: &SmtpDefaults) -> Result<MailSettings, DistributionError> {
        match self {
            CredentialSource::Environment => MailSettings::from_env(defaults),
            CredentialSource::Fixed(vars) => MailSettings::from_map(vars.clone(), defaults),
        }
    }
}

pub struct DistributionService<T: MailTransport> {
    transport: T,
    credentials: CredentialSource,
    defaults: SmtpDefaults,
}

impl<T: MailTransport> DistributionService<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            credentials: CredentialSource::Environment,
            defaults: SmtpDefaults::default(),
        }
    }

    pub fn with_credentials(mut self, credentials: CredentialSource) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_defaults(mut self, defaults: SmtpDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Attempt delivery once. Never fails: errors come back as an unsuccessful [`Delivery`].
    #[instrument(name = "send_report", skip_all)]
    pub async fn send(&self, request: &ReportEmail) -> Delivery {
        let delivery = Delivery::from(self.try_send(request).await);
        debug!(success = delivery.success, "{}", delivery.message);
        delivery
    }

    async fn try_send(&self, request: &ReportEmail) -> Result<String, DistributionError> {
        let recipient = validate_recipient(&request.recipient)?;
        let settings = self.credentials.resolve(&self.defaults)?;
        let email = OutgoingEmail {
            recipient: recipient.to_string(),
            subject: request.subject.clone(),
            html: html_document(&request.body, request.chart.is_some()),
            attachment: request.attachment.clone(),
            inline_image: request.chart.clone(),
        };
        self.transport
            .deliver(&settings, &email)
            .await
            .map_err(DistributionError::Transport)?;
        Ok(email.recipient)
    }
}

/// Reject a blank recipient before any artifact or network work happens.
pub fn validate_recipient(recipient: &str) -> Result<&str, DistributionError> {
    let trimmed = recipient.trim();
    if trimmed.is_empty() {
        Err(DistributionError::MissingRecipient)
    } else {
        Ok(trimmed)
    }
}

/// Deterministic message body: High-risk count and compliance rate.
pub fn compose_body(distribution: &RiskDistribution) -> Result<String, EmptyInput> {
    let rate = distribution.compliance_rate().ok_or(EmptyInput)?;
    Ok(format!(
        "Dear Compliance Team,<br><br>\
         Please find attached the compliance report.<br><br>\
         ⚠️ High Risk Clauses: {high}<br>\
         ✅ Compliance Rate: {rate:.1}%<br><br>\
         Regards,<br>AI Compliance Checker",
        high = distribution.high,
    ))
}

/// Wrap the summary text in the HTML envelope, referencing the inline chart when present.
pub fn html_document(body: &str, with_chart: bool) -> String {
    let chart = if with_chart {
        format!(
            "\n    <p><img src=\"cid:{CHART_CONTENT_ID}\" alt=\"Risk Level Distribution\"></p>"
        )
    } else {
        String::new()
    };
    format!(
        "<html>\n  <body>\n    <h2>📋 Compliance Report</h2>\n    <p>{body}</p>{chart}\n  </body>\n</html>\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use once_cell::sync::Lazy;
    use std::env;
    use std::sync::Mutex;

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    fn clear_mail_env() {
        for key in [
            MailSettings::SENDER_ENV,
            MailSettings::PASSWORD_ENV,
            MailSettings::HOST_ENV,
            MailSettings::PORT_ENV,
        ] {
            env::remove_var(key);
        }
    }

    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<OutgoingEmail>>,
        fail_with: Option<&'static str>,
    }

    impl RecordingTransport {
        fn attempts(&self) -> usize {
            self.sent.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl MailTransport for RecordingTransport {
        async fn deliver(&self, _settings: &MailSettings, email: &OutgoingEmail) -> AnyResult<()> {
            self.sent.lock().unwrap().push(email.clone());
            match self.fail_with {
                Some(reason) => Err(anyhow::anyhow!(reason)),
                None => Ok(()),
            }
        }
    }

    fn credentials() -> CredentialSource {
        CredentialSource::Fixed(HashMap::from([
            (MailSettings::SENDER_ENV.to_string(), "alerts@example.com".to_string()),
            (MailSettings::PASSWORD_ENV.to_string(), "secret".to_string()),
        ]))
    }

    fn request(recipient: &str) -> ReportEmail {
        ReportEmail {
            recipient: recipient.into(),
            subject: DEFAULT_SUBJECT.into(),
            body: "body".into(),
            attachment: None,
            chart: Some(InlineImage {
                path: PathBuf::from("/tmp/chart.svg"),
                content_type: "image/svg+xml",
            }),
        }
    }

    #[tokio::test]
    async fn blank_recipient_fails_without_network_attempt() {
        let service =
            DistributionService::new(RecordingTransport::default()).with_credentials(credentials());
        let delivery = service.send(&request("")).await;
        assert!(!delivery.success);
        assert_eq!(delivery.message, "Please enter recipient email.");
        assert_eq!(service.transport().attempts(), 0);

        let delivery = service.send(&request("   ")).await;
        assert!(!delivery.success);
        assert_eq!(service.transport().attempts(), 0);
    }

    #[tokio::test]
    async fn missing_credentials_report_remediation() {
        let service = DistributionService::new(RecordingTransport::default())
            .with_credentials(CredentialSource::Fixed(HashMap::new()));
        let delivery = service.send(&request("legal@example.com")).await;
        assert!(!delivery.success);
        assert!(delivery.message.starts_with("Failed to send email:"));
        assert!(delivery.message.contains("ALERT_EMAIL and ALERT_EMAIL_PASSWORD"));
        assert_eq!(service.transport().attempts(), 0);
    }

    #[tokio::test]
    async fn successful_send_reports_recipient() {
        let service =
            DistributionService::new(RecordingTransport::default()).with_credentials(credentials());
        let delivery = service.send(&request(" legal@example.com ")).await;
        assert_eq!(delivery, Delivery::sent("legal@example.com"));
        let sent = service.transport().sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].recipient, "legal@example.com");
        assert!(sent[0].html.contains("cid:risk-chart"));
    }

    #[tokio::test]
    async fn transport_failure_is_single_attempt() {
        let transport = RecordingTransport {
            fail_with: Some("connection refused"),
            ..Default::default()
        };
        let service = DistributionService::new(transport).with_credentials(credentials());
        let delivery = service.send(&request("legal@example.com")).await;
        assert!(!delivery.success);
        assert_eq!(delivery.message, "Failed to send email: connection refused");
        assert_eq!(service.transport().attempts(), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn unrelated_non_utf8_env_var_still_yields_delivery() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let _guard = ENV_LOCK.lock().unwrap();
        clear_mail_env();
        env::set_var("CLAUSE_GUARD_OPAQUE", OsStr::from_bytes(b"\xFF\xFE"));

        let service = DistributionService::new(RecordingTransport::default());
        let delivery = service.send(&request("legal@example.com")).await;
        env::remove_var("CLAUSE_GUARD_OPAQUE");

        assert!(!delivery.success);
        assert!(delivery.message.contains("Email credentials not set"));
        assert_eq!(service.transport().attempts(), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_utf8_credential_is_a_configuration_failure() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let _guard = ENV_LOCK.lock().unwrap();
        clear_mail_env();
        env::set_var(MailSettings::SENDER_ENV, OsStr::from_bytes(b"alerts\xFF@example.com"));
        env::set_var(MailSettings::PASSWORD_ENV, "secret");

        let service = DistributionService::new(RecordingTransport::default());
        let delivery = service.send(&request("legal@example.com")).await;
        clear_mail_env();

        assert_eq!(
            delivery.message,
            "Failed to send email: ALERT_EMAIL must be valid UTF-8"
        );
        assert_eq!(service.transport().attempts(), 0);
    }

    #[tokio::test]
    async fn environment_credentials_are_read_at_send_time() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_mail_env();
        let service = DistributionService::new(RecordingTransport::default());
        env::set_var(MailSettings::SENDER_ENV, "alerts@example.com");
        env::set_var(MailSettings::PASSWORD_ENV, "secret");

        let delivery = service.send(&request("legal@example.com")).await;
        clear_mail_env();

        assert_eq!(delivery, Delivery::sent("legal@example.com"));
        assert_eq!(service.transport().attempts(), 1);
    }

    #[test]
    fn body_reports_high_count_and_rate() {
        let body = compose_body(&RiskDistribution {
            high: 3,
            medium: 2,
            low: 5,
        })
        .unwrap();
        assert!(body.contains("High Risk Clauses: 3<br>"));
        assert!(body.contains("Compliance Rate: 70.0%"));
    }

    #[test]
    fn body_rounds_to_one_decimal() {
        let body = compose_body(&RiskDistribution {
            high: 1,
            medium: 0,
            low: 2,
        })
        .unwrap();
        assert!(body.contains("Compliance Rate: 66.7%"));
    }

    #[test]
    fn body_requires_clauses() {
        assert_eq!(compose_body(&RiskDistribution::default()), Err(EmptyInput));
    }

    #[test]
    fn html_envelope_embeds_chart_only_when_present() {
        assert!(html_document("x", true).contains("cid:risk-chart"));
        assert!(!html_document("x", false).contains("<img"));
        assert!(html_document("hello", false).contains("<p>hello</p>"));
    }
}
