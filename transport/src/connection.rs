//! SMTP connections over lettre's async client

use async_trait::async_trait;
use lettre::transport::smtp::authentication::{Credentials, Mechanism};
use lettre::transport::smtp::client::{AsyncSmtpConnection, TlsParameters};
use lettre::transport::smtp::extension::ClientId;
use lettre::transport::smtp::Error as SmtpError;
use smtp_bench_core::{
    MailConnection, MailConnector, SyntheticMail, TransportConfig, TransportError,
};

use crate::compose::compose;

/// Authentication mechanisms offered, in order of preference
const AUTH_MECHANISMS: &[Mechanism] = &[Mechanism::Plain, Mechanism::Login];

/// Opens one SMTP session per worker
///
/// # Example
///
/// ```rust,ignore
/// let connector = SmtpConnector::new(config.transport.clone());
/// let mut conn = connector.open(0).await?;
/// conn.send(&mail).await?;
/// conn.close().await?;
/// ```
#[derive(Debug, Clone)]
pub struct SmtpConnector {
    config: TransportConfig,
    client_id: ClientId,
}

impl SmtpConnector {
    /// Create a connector for the given endpoint
    pub fn new(config: TransportConfig) -> Self {
        let client_id = match &config.hello_name {
            Some(name) => ClientId::Domain(name.clone()),
            None => ClientId::default(),
        };
        Self { config, client_id }
    }

    /// Get the transport configuration
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    fn tls_parameters(&self) -> Result<TlsParameters, TransportError> {
        TlsParameters::builder(self.config.host.clone())
            .dangerous_accept_invalid_certs(self.config.accept_invalid_certs)
            .build()
            .map_err(|e| TransportError::Tls(e.to_string()))
    }

    async fn establish(&self, conn: &mut AsyncSmtpConnection) -> Result<(), TransportError> {
        if self.config.starttls {
            if !conn.can_starttls() {
                return Err(TransportError::Tls(
                    "server does not advertise STARTTLS".into(),
                ));
            }
            conn.starttls(self.tls_parameters()?, &self.client_id)
                .await
                .map_err(|e| TransportError::Tls(e.to_string()))?;
        }

        if let Some((user, pass)) = self.config.credentials() {
            let credentials = Credentials::new(user.to_string(), pass.to_string());
            conn.auth(AUTH_MECHANISMS, &credentials)
                .await
                .map_err(|e| TransportError::Auth(e.to_string()))?;
        }

        Ok(())
    }

    /// Connect, then upgrade and authenticate as configured
    async fn connect(&self) -> Result<AsyncSmtpConnection, TransportError> {
        let mut conn = AsyncSmtpConnection::connect_tokio1(
            (self.config.host.as_str(), self.config.port),
            Some(self.config.connect_timeout),
            &self.client_id,
            None,
            None,
        )
        .await
        .map_err(|e| TransportError::Connect(e.to_string()))?;

        if let Err(e) = self.establish(&mut conn).await {
            conn.abort().await;
            return Err(e);
        }

        Ok(conn)
    }
}

#[async_trait]
impl MailConnector for SmtpConnector {
    fn transport_name(&self) -> &str {
        "smtp"
    }

    async fn open(&self, worker_id: usize) -> Result<Box<dyn MailConnection>, TransportError> {
        let inner = self.connect().await?;

        tracing::debug!(
            worker_id,
            host = %self.config.host,
            port = self.config.port,
            starttls = self.config.starttls,
            authenticated = self.config.credentials().is_some(),
            "SMTP session established"
        );

        Ok(Box::new(SmtpConnection {
            connector: self.clone(),
            worker_id,
            inner,
            reconnects: 0,
        }))
    }
}

/// One worker's SMTP session
///
/// lettre aborts the session on any failed command, including a plain
/// recipient rejection. The next send opens a fresh session with the same
/// endpoint, STARTTLS and login settings.
pub struct SmtpConnection {
    connector: SmtpConnector,
    worker_id: usize,
    inner: AsyncSmtpConnection,
    reconnects: usize,
}

impl SmtpConnection {
    async fn ensure_session(&mut self) -> Result<(), TransportError> {
        if !self.inner.has_broken() {
            return Ok(());
        }

        // A failed re-open is this send's failure; the next send tries again.
        self.inner = self.connector.connect().await?;
        self.reconnects += 1;
        tracing::debug!(
            worker_id = self.worker_id,
            reconnects = self.reconnects,
            "SMTP session re-established"
        );
        Ok(())
    }

    fn map_send_error(&self, err: SmtpError) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout(self.connector.config.connect_timeout)
        } else if err.is_permanent() || err.is_transient() {
            TransportError::Rejected(err.to_string())
        } else {
            TransportError::Other(err.to_string())
        }
    }
}

#[async_trait]
impl MailConnection for SmtpConnection {
    async fn send(&mut self, mail: &SyntheticMail) -> Result<(), TransportError> {
        let message = compose(mail)?;
        self.ensure_session().await?;
        self.inner
            .send(message.envelope(), &message.formatted())
            .await
            .map(|_| ())
            .map_err(|e| self.map_send_error(e))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if self.inner.has_broken() {
            return Ok(());
        }
        self.inner
            .quit()
            .await
            .map(|_| ())
            .map_err(|e| TransportError::Other(e.to_string()))
    }
}

impl std::fmt::Debug for SmtpConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConnection")
            .field("worker_id", &self.worker_id)
            .field("broken", &self.inner.has_broken())
            .field("reconnects", &self.reconnects)
            .finish()
    }
}
