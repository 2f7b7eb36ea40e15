use std::str::FromStr;

use lettre::{
    message::{Mailbox, MultiPart},
    transport::smtp::authentication::Credentials,
    Address, Message, SmtpTransport, Transport,
};
use log::{debug, info};

use super::{AlertMessage, AlertOptions, Notifier};
use crate::error::{ReportError, Result};

/// SMTP relay settings.
///
/// Env contract for [`SmtpSettings::from_env`]:
/// - host: `EMAIL_HOST` (required)
/// - port: `EMAIL_PORT` (default `587`)
/// - secure: `EMAIL_SECURE` (`true` for implicit TLS, default `false` = STARTTLS)
/// - user / pass: `EMAIL_USER`, `EMAIL_PASS` (both or neither)
/// - sender: `EMAIL_FROM` (falls back to `EMAIL_USER`)
#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub secure: bool,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl SmtpSettings {
    pub fn from_env() -> Result<Self> {
        let host = env_var("EMAIL_HOST")
            .ok_or_else(|| ReportError::InvalidConfig("missing EMAIL_HOST".to_string()))?;
        let port = env_var("EMAIL_PORT")
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(587);
        let secure = env_var("EMAIL_SECURE")
            .as_deref()
            .and_then(parse_bool)
            .unwrap_or(false);
        let username = env_var("EMAIL_USER");
        let password = env_var("EMAIL_PASS");
        if username.is_some() ^ password.is_some() {
            return Err(ReportError::InvalidConfig(
                "set both EMAIL_USER and EMAIL_PASS, or neither".to_string(),
            ));
        }
        let from = env_var("EMAIL_FROM")
            .or_else(|| username.clone())
            .ok_or_else(|| {
                ReportError::InvalidConfig("missing sender (EMAIL_FROM or EMAIL_USER)".to_string())
            })?;

        Ok(Self {
            host,
            port,
            secure,
            username,
            password,
            from,
        })
    }
}

impl AlertOptions {
    /// Recipients from `EMAIL_RECIPIENTS`, dashboard link from `DASHBOARD_URL`.
    pub fn from_env() -> Self {
        let options = Self {
            recipients: Vec::new(),
            dashboard_url: env_var("DASHBOARD_URL"),
        };
        match env_var("EMAIL_RECIPIENTS") {
            Some(list) => options.with_recipient_list(&list),
            None => options,
        }
    }
}

pub struct SmtpNotifier {
    settings: SmtpSettings,
}

impl SmtpNotifier {
    pub fn new(settings: SmtpSettings) -> Self {
        Self { settings }
    }

    fn build_message(&self, recipients: &[String], message: &AlertMessage) -> Result<Message> {
        let from = mailbox(&self.settings.from, "sender")?;
        let mut builder = Message::builder()
            .from(from.clone())
            .reply_to(from)
            .subject(message.subject.clone());
        for recipient in recipients {
            builder = builder.to(mailbox(recipient, "recipient")?);
        }
        builder
            .multipart(MultiPart::alternative_plain_html(
                message.text_body.clone(),
                message.html_body.clone(),
            ))
            .map_err(|e| ReportError::Notification(e.to_string()))
    }

    fn transport(&self) -> Result<SmtpTransport> {
        let cfg = &self.settings;
        let relay = if cfg.secure {
            SmtpTransport::relay(&cfg.host)
        } else {
            SmtpTransport::starttls_relay(&cfg.host)
        };
        let mut builder = relay
            .map_err(|e| ReportError::Notification(e.to_string()))?
            .port(cfg.port);

        if let (Some(username), Some(password)) = (&cfg.username, &cfg.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }
        Ok(builder.build())
    }
}

fn mailbox(raw: &str, role: &str) -> Result<Mailbox> {
    let address = Address::from_str(raw.trim())
        .map_err(|e| ReportError::Notification(format!("invalid {} email '{}': {}", role, raw, e)))?;
    Ok(Mailbox::new(None, address))
}

impl Notifier for SmtpNotifier {
    fn send(&self, recipients: &[String], message: &AlertMessage) -> Result<()> {
        let email = self.build_message(recipients, message)?;
        debug!(
            "Connecting to {}:{} (secure: {})",
            self.settings.host, self.settings.port, self.settings.secure
        );
        let response = self
            .transport()?
            .send(&email)
            .map_err(|e| ReportError::Notification(e.to_string()))?;
        info!("Alert email accepted: {:?}", response.code());
        Ok(())
    }
}
