//! Synthetic message data passed from the message source to the transport

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Smallest attachment drawn when attachments are enabled
pub const ATTACHMENT_MIN_BYTES: usize = 256;

/// Largest attachment drawn when attachments are enabled
pub const ATTACHMENT_MAX_BYTES: usize = 64 * 1024;

/// Size and shape parameters of every synthetic message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageShape {
    /// Exact subject length in characters
    pub subject_len: usize,

    /// Minimum body length in bytes (inclusive)
    pub min_bytes: usize,

    /// Maximum body length in bytes (inclusive)
    pub max_bytes: usize,

    /// Append one random binary attachment
    #[serde(default)]
    pub attachment: bool,
}

impl Default for MessageShape {
    fn default() -> Self {
        Self {
            subject_len: 32,
            min_bytes: 200,
            max_bytes: 2000,
            attachment: false,
        }
    }
}

impl MessageShape {
    /// Inclusive bounds used to draw the attachment size
    pub fn attachment_bounds(&self) -> (usize, usize) {
        (
            self.min_bytes.min(ATTACHMENT_MIN_BYTES),
            self.max_bytes.min(ATTACHMENT_MAX_BYTES),
        )
    }

    /// Validate the size bounds
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_bytes > self.max_bytes {
            return Err(ConfigError::InvalidShape(format!(
                "min bytes ({}) exceeds max bytes ({})",
                self.min_bytes, self.max_bytes
            )));
        }
        Ok(())
    }
}

/// A binary attachment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// File name announced in the MIME part
    pub filename: String,

    /// MIME type of the part
    pub content_type: String,

    /// Raw content
    pub data: Vec<u8>,
}

/// One synthetic message, independent of any wire format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntheticMail {
    /// Sender address
    pub from: String,

    /// Recipient address
    pub to: String,

    /// Subject line
    pub subject: String,

    /// Plain text body
    pub body: String,

    /// Optional binary attachment
    pub attachment: Option<Attachment>,
}
