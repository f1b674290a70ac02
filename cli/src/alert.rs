use lettre::{Message, SmtpTransport, Transport};

use crate::config::EmailConfig;

const ALERT_SUBJECT: &str = "Bridge error alert!";

/// Best-effort error alert to the configured recipients. Failures are
/// logged, never propagated: an unreachable relay must not mask the
/// original bridge error.
pub fn send_failure_alert(email: &EmailConfig, body: &str) {
    if let Err(err) = try_send(email, body) {
        log::warn!("could not send alert mail: {err}");
    }
}

fn try_send(email: &EmailConfig, body: &str) -> anyhow::Result<()> {
    let mut builder = Message::builder()
        .from(email.sender.parse()?)
        .subject(ALERT_SUBJECT);
    for recipient in email.recipients() {
        builder = builder.to(recipient.parse()?);
    }
    let message = builder.body(body.to_string())?;

    let transport = SmtpTransport::builder_dangerous(&email.smtp).build();
    transport.send(&message)?;
    Ok(())
}
