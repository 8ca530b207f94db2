use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use motioncore::output::Notifier;
use motioncore::prelude::{StageError, StageResult};
use std::fs;
use std::path::{Path, PathBuf};

/// Account and relay settings for outbound mail.
#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub server: String,
    pub port: u16,
    pub account: String,
    pub password: String,
    pub recipients: Vec<String>,
}

/// Sends each notification as one STARTTLS-authenticated message with the
/// snapshot attached as `image/jpeg`.
pub struct SmtpNotifier {
    from: Mailbox,
    to: Vec<Mailbox>,
    transport: SmtpTransport,
}

impl SmtpNotifier {
    pub fn new(settings: &SmtpSettings) -> StageResult<Self> {
        let from = parse_mailbox(&settings.account)?;
        let to = settings
            .recipients
            .iter()
            .map(|address| parse_mailbox(address))
            .collect::<StageResult<Vec<_>>>()?;
        if to.is_empty() {
            return Err(StageError::InvalidConfig(
                "at least one recipient is required".into(),
            ));
        }

        let transport = SmtpTransport::starttls_relay(&settings.server)
            .map_err(|err| {
                StageError::InvalidConfig(format!("smtp relay {}: {}", settings.server, err))
            })?
            .port(settings.port)
            .credentials(Credentials::new(
                settings.account.clone(),
                settings.password.clone(),
            ))
            .build();

        Ok(Self {
            from,
            to,
            transport,
        })
    }

    fn compose(&self, subject: &str, body: &str, attachments: &[PathBuf]) -> StageResult<Message> {
        build_message(&self.from, &self.to, subject, body, attachments)
    }
}

impl Notifier for SmtpNotifier {
    fn notify(&mut self, subject: &str, body: &str, attachments: &[PathBuf]) -> StageResult<()> {
        let message = self.compose(subject, body, attachments)?;
        self.transport
            .send(&message)
            .map(|_| ())
            .map_err(|err| StageError::Notification(err.to_string()))
    }
}

fn parse_mailbox(address: &str) -> StageResult<Mailbox> {
    address
        .parse::<Mailbox>()
        .map_err(|err| StageError::InvalidConfig(format!("bad address {:?}: {}", address, err)))
}

fn build_message(
    from: &Mailbox,
    to: &[Mailbox],
    subject: &str,
    body: &str,
    attachments: &[PathBuf],
) -> StageResult<Message> {
    let mut builder = Message::builder().from(from.clone()).subject(subject);
    for recipient in to {
        builder = builder.to(recipient.clone());
    }

    let jpeg = ContentType::parse("image/jpeg")
        .map_err(|err| StageError::Notification(err.to_string()))?;
    let mut parts = MultiPart::mixed().singlepart(SinglePart::plain(body.to_string()));
    for path in attachments {
        let bytes = fs::read(path).map_err(|err| {
            StageError::Notification(format!("reading attachment {}: {}", path.display(), err))
        })?;
        parts = parts.singlepart(Attachment::new(attachment_name(path)).body(bytes, jpeg.clone()));
    }

    builder
        .multipart(parts)
        .map_err(|err| StageError::Notification(err.to_string()))
}

fn attachment_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "snapshot.jpg".to_string())
}
