use crate::error::{NotifyError, Result};
use crate::Notifier;
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use netmon_common::types::{Alert, EmailConfig};

/// SMTP delivery channel. Addresses are validated up front so a broken
/// channel definition fails at create time, not at the first alert.
pub struct EmailNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Vec<Mailbox>,
}

impl EmailNotifier {
    pub fn new(config: &EmailConfig) -> Result<Self> {
        if config.smtp_host.trim().is_empty() {
            return Err(NotifyError::InvalidConfig(
                "smtp_host must not be empty".to_string(),
            ));
        }
        if config.to.is_empty() {
            return Err(NotifyError::InvalidConfig(
                "at least one recipient is required".to_string(),
            ));
        }

        let from: Mailbox = config.from.parse().map_err(|e| {
            NotifyError::InvalidConfig(format!("invalid from address '{}': {e}", config.from))
        })?;
        let to = config
            .to
            .iter()
            .map(|addr| {
                addr.parse().map_err(|e| {
                    NotifyError::InvalidConfig(format!("invalid recipient '{addr}': {e}"))
                })
            })
            .collect::<Result<Vec<Mailbox>>>()?;

        let mut builder = if config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
                .map_err(|e| NotifyError::SmtpError(e.to_string()))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
        };
        builder = builder.port(config.smtp_port);

        if let (Some(user), Some(pass)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from,
            to,
        })
    }
}

fn device_label(alert: &Alert) -> &str {
    alert
        .host_name
        .as_deref()
        .or(alert.host_id.as_deref())
        .unwrap_or("unknown")
}

pub(crate) fn format_body(alert: &Alert) -> String {
    let value_lines = match (alert.value, alert.threshold) {
        (Some(value), Some(threshold)) => {
            format!("\nValue: {value:.2}\nThreshold: {threshold:.2}")
        }
        (Some(value), None) => format!("\nValue: {value:.2}"),
        _ => String::new(),
    };
    format!(
        "Alert: {severity}\nRule: {rule}\nDevice: {device}{value_lines}\nMessage: {message}\nTime: {time}",
        severity = alert.severity,
        rule = alert.rule_name,
        device = device_label(alert),
        value_lines = value_lines,
        message = alert.message,
        time = alert.triggered_at.to_rfc3339(),
    )
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn send(&self, alert: &Alert) -> Result<()> {
        let subject = format!(
            "[netmon][{}] {} - {}",
            alert.severity,
            alert.rule_name,
            device_label(alert)
        );
        let body = format_body(alert);

        let mut last_err = None;

        for recipient in &self.to {
            let email = Message::builder()
                .from(self.from.clone())
                .to(recipient.clone())
                .subject(&subject)
                .header(ContentType::TEXT_PLAIN)
                .body(body.clone())
                .map_err(|e| NotifyError::SmtpError(e.to_string()))?;

            let mut result = Ok(());
            for attempt in 0..3u32 {
                result = self.transport.send(email.clone()).await.map(|_| ());
                match &result {
                    Ok(()) => break,
                    Err(e) => {
                        tracing::warn!(
                            attempt = attempt + 1,
                            recipient = %recipient,
                            error = %e,
                            "Email send failed, retrying"
                        );
                        if attempt < 2 {
                            tokio::time::sleep(std::time::Duration::from_millis(
                                100 * 2u64.pow(attempt),
                            ))
                            .await;
                        }
                    }
                }
            }

            if let Err(e) = result {
                tracing::error!(recipient = %recipient, error = %e, "Email send failed after 3 retries");
                last_err = Some(NotifyError::SmtpError(e.to_string()));
            }
        }

        match last_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn kind(&self) -> &'static str {
        "email"
    }
}
