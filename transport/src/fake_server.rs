//! Minimal in-process SMTP responder for transport tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ServerBehavior {
    pub(crate) reject_auth: bool,
    pub(crate) reject_recipients: bool,
    /// Reject only the first `n` RCPT commands across all sessions
    pub(crate) reject_first_recipients: usize,
    /// Refuse sessions beyond this many with a 421 greeting; 0 = unlimited
    pub(crate) max_sessions: usize,
}

#[derive(Default)]
struct Counters {
    sessions: AtomicUsize,
    logins: AtomicUsize,
    recipients: AtomicUsize,
    delivered: AtomicUsize,
}

pub(crate) struct FakeSmtpServer {
    port: u16,
    counters: Arc<Counters>,
}

impl FakeSmtpServer {
    pub(crate) async fn start(behavior: ServerBehavior) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let counters = Arc::new(Counters::default());

        let shared = Arc::clone(&counters);
        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let session = shared.sessions.fetch_add(1, Ordering::SeqCst) + 1;
                if behavior.max_sessions > 0 && session > behavior.max_sessions {
                    let _ = stream.write_all(b"421 4.3.2 too many sessions\r\n").await;
                    continue;
                }
                let counters = Arc::clone(&shared);
                tokio::spawn(async move {
                    let _ = serve(stream, behavior, counters).await;
                });
            }
        });

        Self { port, counters }
    }

    /// A local port with nothing listening on it
    pub(crate) async fn unused_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    }

    pub(crate) fn port(&self) -> u16 {
        self.port
    }

    pub(crate) fn sessions(&self) -> usize {
        self.counters.sessions.load(Ordering::SeqCst)
    }

    pub(crate) fn logins(&self) -> usize {
        self.counters.logins.load(Ordering::SeqCst)
    }

    pub(crate) fn delivered(&self) -> usize {
        self.counters.delivered.load(Ordering::SeqCst)
    }
}

async fn serve(
    stream: TcpStream,
    behavior: ServerBehavior,
    counters: Arc<Counters>,
) -> std::io::Result<()> {
    let (read, mut write) = stream.into_split();
    let mut lines = BufReader::new(read).lines();

    write.write_all(b"220 fake.local ESMTP ready\r\n").await?;

    while let Some(line) = lines.next_line().await? {
        let command = line.to_ascii_uppercase();

        let reply: &[u8] = if command.starts_with("EHLO") || command.starts_with("HELO") {
            b"250-fake.local\r\n250 AUTH PLAIN LOGIN\r\n"
        } else if command.starts_with("AUTH") {
            if behavior.reject_auth {
                b"535 5.7.8 authentication credentials invalid\r\n"
            } else {
                counters.logins.fetch_add(1, Ordering::SeqCst);
                b"235 2.7.0 authentication successful\r\n"
            }
        } else if command.starts_with("MAIL FROM") {
            b"250 2.1.0 ok\r\n"
        } else if command.starts_with("RCPT TO") {
            let seen = counters.recipients.fetch_add(1, Ordering::SeqCst);
            if behavior.reject_recipients || seen < behavior.reject_first_recipients {
                b"550 5.1.1 mailbox unavailable\r\n"
            } else {
                b"250 2.1.5 ok\r\n"
            }
        } else if command == "DATA" {
            write.write_all(b"354 end data with <CR><LF>.<CR><LF>\r\n").await?;
            while let Some(data) = lines.next_line().await? {
                if data == "." {
                    break;
                }
            }
            counters.delivered.fetch_add(1, Ordering::SeqCst);
            b"250 2.0.0 queued\r\n"
        } else if command.starts_with("RSET") || command.starts_with("NOOP") {
            b"250 2.0.0 ok\r\n"
        } else if command.starts_with("QUIT") {
            write.write_all(b"221 2.0.0 bye\r\n").await?;
            return Ok(());
        } else {
            b"502 5.5.2 command not recognized\r\n"
        };

        write.write_all(reply).await?;
    }

    Ok(())
}
