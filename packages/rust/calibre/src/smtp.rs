//! Digest delivery via `calibre-smtp`.
//!
//! Credentials come from the environment (optionally seeded from a `.env`
//! file by the CLI), never from the config file.

use std::ffi::OsString;
use std::path::Path;

use tokio::process::Command;
use tracing::info;

use sourcemark_shared::{Result, SourcemarkError};

/// The external delivery binary, expected on `PATH`.
const CALIBRE_SMTP: &str = "calibre-smtp";

/// Message body accompanying the attached digest.
const MESSAGE_BODY: &str = "Your digest is attached.";

/// SMTP relay settings resolved from the environment.
#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub server: String,
    pub port: String,
    pub user: String,
    pub password: String,
    pub from: String,
    pub destination: String,
}

impl SmtpSettings {
    /// Resolve settings from `SMTP_SERVER`, `SMTP_PORT`, `SMTP_USER`,
    /// `SMTP_PASSWORD`, `SMTP_FROM`, and `DESTINATION_EMAIL`.
    ///
    /// A missing or empty variable is a config error naming the variable.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            server: require_env("SMTP_SERVER")?,
            port: require_env("SMTP_PORT")?,
            user: require_env("SMTP_USER")?,
            password: require_env("SMTP_PASSWORD")?,
            from: require_env("SMTP_FROM")?,
            destination: require_env("DESTINATION_EMAIL")?,
        })
    }

    /// Argument vector passed to `calibre-smtp`. The attachment's file name
    /// doubles as the subject.
    pub fn send_args(&self, attachment: &Path, subject: &str) -> Vec<OsString> {
        vec![
            OsString::from("--attachment"),
            attachment.as_os_str().to_os_string(),
            OsString::from("--relay"),
            OsString::from(&self.server),
            OsString::from("--port"),
            OsString::from(&self.port),
            OsString::from("--username"),
            OsString::from(&self.user),
            OsString::from("--password"),
            OsString::from(&self.password),
            OsString::from("--encryption-method"),
            OsString::from("TLS"),
            OsString::from("--subject"),
            OsString::from(subject),
            OsString::from(&self.from),
            OsString::from(&self.destination),
            OsString::from(MESSAGE_BODY),
        ]
    }

    /// Mail `attachment` to the configured destination.
    pub async fn send(&self, attachment: &Path) -> Result<()> {
        let subject = attachment
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "digest.epub".to_string());

        // The password stays out of the logs.
        info!(
            destination = %self.destination,
            relay = %self.server,
            subject = %subject,
            "sending digest"
        );

        let status = Command::new(CALIBRE_SMTP)
            .args(self.send_args(attachment, &subject))
            .status()
            .await
            .map_err(|e| {
                SourcemarkError::Delivery(format!("failed to launch {CALIBRE_SMTP}: {e}"))
            })?;

        if !status.success() {
            return Err(SourcemarkError::Delivery(format!(
                "{CALIBRE_SMTP} exited with {status}"
            )));
        }

        Ok(())
    }
}

fn require_env(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(SourcemarkError::config(format!(
            "{name} is not set — required for email delivery"
        ))),
    }
}
