use std::{
    collections::HashMap,
    env::{self, VarError},
};

use super::DistributionError;

pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";

/// Values from a configuration file, used when the matching env var is unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SmtpDefaults {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Sender identity and relay settings, resolved at send time.
#[derive(Clone, PartialEq, Eq)]
pub struct MailSettings {
    pub sender: String,
    pub password: String,
    pub smtp_host: String,
    pub smtp_port: Option<u16>,
}

impl std::fmt::Debug for MailSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailSettings")
            .field("sender", &self.sender)
            .field("password", &"<redacted>")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .finish()
    }
}

impl MailSettings {
    pub const SENDER_ENV: &'static str = "ALERT_EMAIL";
    pub const PASSWORD_ENV: &'static str = "ALERT_EMAIL_PASSWORD";
    pub const HOST_ENV: &'static str = "ALERT_SMTP_HOST";
    pub const PORT_ENV: &'static str = "ALERT_SMTP_PORT";

    /// Load settings from environment variables.
    ///
    /// * `ALERT_EMAIL`: sender address (required).
    /// * `ALERT_EMAIL_PASSWORD`: sender credential (required).
    /// * `ALERT_SMTP_HOST`: relay host (default: `smtp.gmail.com`).
    /// * `ALERT_SMTP_PORT`: relay port (default: the relay's submission port).
    ///
    /// Only these keys are read; other entries in the environment never affect the result.
    pub fn from_env(defaults: &SmtpDefaults) -> Result<Self, DistributionError> {
        let mut vars = HashMap::new();
        for key in [
            Self::SENDER_ENV,
            Self::PASSWORD_ENV,
            Self::HOST_ENV,
            Self::PORT_ENV,
        ] {
            match env::var(key) {
                Ok(value) => {
                    vars.insert(key.to_string(), value);
                }
                Err(VarError::NotPresent) => {}
                Err(VarError::NotUnicode(_)) => {
                    return Err(DistributionError::Configuration(format!(
                        "{key} must be valid UTF-8"
                    )));
                }
            }
        }
        Self::from_map(vars, defaults)
    }

    pub(crate) fn from_map(
        vars: HashMap<String, String>,
        defaults: &SmtpDefaults,
    ) -> Result<Self, DistributionError> {
        let non_blank = |key: &str| {
            vars.get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let (Some(sender), Some(password)) =
            (non_blank(Self::SENDER_ENV), non_blank(Self::PASSWORD_ENV))
        else {
            return Err(DistributionError::Configuration(format!(
                "Email credentials not set. Use {} and {} env vars.",
                Self::SENDER_ENV,
                Self::PASSWORD_ENV
            )));
        };

        let smtp_host = non_blank(Self::HOST_ENV)
            .or_else(|| defaults.host.clone())
            .unwrap_or_else(|| DEFAULT_SMTP_HOST.to_string());
        let smtp_port = match non_blank(Self::PORT_ENV) {
            Some(raw) => Some(raw.parse::<u16>().map_err(|_| {
                DistributionError::Configuration(format!(
                    "{} must be a port number (got `{raw}`)",
                    Self::PORT_ENV
                ))
            })?),
            None => defaults.port,
        };

        Ok(Self {
            sender,
            password,
            smtp_host,
            smtp_port,
        })
    }
}
