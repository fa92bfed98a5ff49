//! Synthetic message generation
//!
//! This crate provides the `MessageSource` used by smtp-bench workers:
//! random printable subjects and bodies of configurable size, with an
//! optional random binary attachment.

#![warn(missing_docs)]
#![warn(clippy::all)]

use rand::Rng;
use smtp_bench_core::{
    Attachment, ComposeError, MessageShape, MessageSource, SyntheticMail,
};

/// Characters subjects and bodies are drawn from
pub const ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789 _-.,:;!@#$%^&*()[]{}";

/// File name of the generated attachment
pub const ATTACHMENT_FILENAME: &str = "blob.bin";

/// MIME type of the generated attachment
pub const ATTACHMENT_CONTENT_TYPE: &str = "application/octet-stream";

/// Random printable string of exactly `len` characters from [`ALPHABET`]
pub fn random_text<R: Rng>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

/// Build one message with the given random source
///
/// # Errors
/// Returns [`ComposeError::InvalidShape`] if `min_bytes > max_bytes`.
pub fn build_message<R: Rng>(
    rng: &mut R,
    from: &str,
    to: &str,
    shape: &MessageShape,
) -> Result<SyntheticMail, ComposeError> {
    shape
        .validate()
        .map_err(|e| ComposeError::InvalidShape(e.to_string()))?;

    let subject = random_text(rng, shape.subject_len);
    let body_len = rng.gen_range(shape.min_bytes..=shape.max_bytes);
    let body = random_text(rng, body_len);

    let attachment = shape.attachment.then(|| {
        let (lo, hi) = shape.attachment_bounds();
        let mut data = vec![0u8; rng.gen_range(lo..=hi)];
        rng.fill(&mut data[..]);
        Attachment {
            filename: ATTACHMENT_FILENAME.to_string(),
            content_type: ATTACHMENT_CONTENT_TYPE.to_string(),
            data,
        }
    });

    Ok(SyntheticMail {
        from: from.to_string(),
        to: to.to_string(),
        subject,
        body,
        attachment,
    })
}

/// Message factory with fixed sender, recipient and shape
///
/// Uses the calling thread's RNG for every build, so concurrent workers
/// share no mutable state.
#[derive(Debug, Clone)]
pub struct MessageFactory {
    from: String,
    to: String,
    shape: MessageShape,
}

impl MessageFactory {
    /// Create a factory
    ///
    /// # Errors
    /// Returns [`ComposeError::InvalidShape`] if the size bounds are inverted.
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        shape: MessageShape,
    ) -> Result<Self, ComposeError> {
        shape
            .validate()
            .map_err(|e| ComposeError::InvalidShape(e.to_string()))?;

        Ok(Self {
            from: from.into(),
            to: to.into(),
            shape,
        })
    }

    /// Configured shape
    pub fn shape(&self) -> &MessageShape {
        &self.shape
    }
}

impl MessageSource for MessageFactory {
    fn name(&self) -> &str {
        "random"
    }

    fn build(&self) -> Result<SyntheticMail, ComposeError> {
        build_message(&mut rand::thread_rng(), &self.from, &self.to, &self.shape)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn in_alphabet(s: &str) -> bool {
        s.bytes().all(|b| ALPHABET.contains(&b))
    }

    #[test]
    fn test_alphabet_contents() {
        assert_eq!(ALPHABET.len(), 26 + 26 + 10 + 21);
        assert!(ALPHABET.contains(&b' '));
        assert!(!ALPHABET.contains(&b'\n'));
    }

    #[test]
    fn test_default_shape() {
        let factory =
            MessageFactory::new("test@local.test", "sink@local.test", MessageShape::default())
                .unwrap();

        for _ in 0..50 {
            let mail = factory.build().unwrap();
            assert_eq!(mail.subject.chars().count(), 32);
            assert!(in_alphabet(&mail.subject));
            assert!((200..=2000).contains(&mail.body.len()));
            assert!(in_alphabet(&mail.body));
            assert!(mail.attachment.is_none());
            assert_eq!(mail.from, "test@local.test");
            assert_eq!(mail.to, "sink@local.test");
        }
    }

    #[test]
    fn test_attachment_size_bounds() {
        let shape = MessageShape {
            attachment: true,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..50 {
            let mail = build_message(&mut rng, "a@x", "b@x", &shape).unwrap();
            let attachment = mail.attachment.expect("attachment requested");
            assert!((200..=2000).contains(&attachment.data.len()));
            assert_eq!(attachment.filename, "blob.bin");
            assert_eq!(attachment.content_type, "application/octet-stream");
        }
    }

    #[test]
    fn test_attachment_clamped_to_64k() {
        let shape = MessageShape {
            subject_len: 4,
            min_bytes: 10,
            max_bytes: 200_000,
            attachment: true,
        };
        let mut rng = StdRng::seed_from_u64(11);

        for _ in 0..20 {
            let mail = build_message(&mut rng, "a@x", "b@x", &shape).unwrap();
            let len = mail.attachment.unwrap().data.len();
            assert!((10..=65536).contains(&len));
        }
    }

    #[test]
    fn test_fixed_body_length() {
        let shape = MessageShape {
            subject_len: 0,
            min_bytes: 64,
            max_bytes: 64,
            attachment: false,
        };
        let mail = build_message(&mut StdRng::seed_from_u64(1), "a@x", "b@x", &shape).unwrap();
        assert!(mail.subject.is_empty());
        assert_eq!(mail.body.len(), 64);
    }

    #[test]
    fn test_builds_are_independent() {
        let factory =
            MessageFactory::new("a@x", "b@x", MessageShape::default()).unwrap();
        let first = factory.build().unwrap();
        let second = factory.build().unwrap();

        assert_eq!(first.subject.len(), second.subject.len());
        assert_ne!(first.subject, second.subject);
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let shape = MessageShape {
            min_bytes: 500,
            max_bytes: 100,
            ..Default::default()
        };
        let err = MessageFactory::new("a@x", "b@x", shape).unwrap_err();
        assert!(err.to_string().starts_with("invalid message shape"));

        let err = build_message(&mut rand::thread_rng(), "a@x", "b@x", &shape).unwrap_err();
        assert!(matches!(err, ComposeError::InvalidShape(_)));
    }

    #[test]
    fn test_seeded_rng_is_reproducible() {
        let shape = MessageShape::default();
        let a = build_message(&mut StdRng::seed_from_u64(42), "a@x", "b@x", &shape).unwrap();
        let b = build_message(&mut StdRng::seed_from_u64(42), "a@x", "b@x", &shape).unwrap();
        assert_eq!(a, b);
    }
}
