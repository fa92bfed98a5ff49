//! Conversion of synthetic messages into RFC 5322 messages

use lettre::message::header::ContentType;
use lettre::message::{Attachment as MimeAttachment, Mailbox, MultiPart, SinglePart};
use lettre::Message;
use smtp_bench_core::{SyntheticMail, TransportError};

/// Build a wire-ready message with generated Message-ID and current Date
///
/// Messages without an attachment are a single `text/plain` part; with one
/// they become `multipart/mixed`.
pub fn compose(mail: &SyntheticMail) -> Result<Message, TransportError> {
    let from: Mailbox = mail
        .from
        .parse()
        .map_err(|e| TransportError::InvalidMessage(format!("sender {:?}: {e}", mail.from)))?;
    let to: Mailbox = mail
        .to
        .parse()
        .map_err(|e| TransportError::InvalidMessage(format!("recipient {:?}: {e}", mail.to)))?;

    let builder = Message::builder()
        .from(from)
        .to(to)
        .subject(mail.subject.as_str())
        .message_id(None)
        .date_now();

    let text = SinglePart::plain(mail.body.clone());

    let message = match &mail.attachment {
        None => builder.singlepart(text),
        Some(attachment) => {
            let content_type = ContentType::parse(&attachment.content_type)
                .map_err(|e| TransportError::InvalidMessage(e.to_string()))?;
            let part = MimeAttachment::new(attachment.filename.clone())
                .body(attachment.data.clone(), content_type);
            builder.multipart(MultiPart::mixed().singlepart(text).singlepart(part))
        }
    };

    message.map_err(|e| TransportError::InvalidMessage(e.to_string()))
}
