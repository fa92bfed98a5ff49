//! SMTP transport for smtp-bench
//!
//! This crate provides the `MailConnector` implementation used by workers.
//! Each worker gets its own persistent session:
//!
//! - TCP connect with a timeout
//! - Optional STARTTLS upgrade
//! - Optional PLAIN/LOGIN authentication
//! - Any number of sends, then QUIT

#![warn(missing_docs)]
#![warn(clippy::all)]

mod compose;
mod connection;

#[cfg(test)]
mod fake_server;

pub use compose::compose;
pub use connection::{SmtpConnection, SmtpConnector};
