use chrono::Utc;
use log::debug;
use openssl::ssl::{HandshakeError, Ssl, SslContext, SslMethod, SslRef, SslVerifyMode};
use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::certificate::{classify, CertInfo, Classification};
use crate::error::ProbeError;
use crate::target::sni_host;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Result of probing one target.
#[derive(Debug)]
pub enum HostOutcome {
    /// DNS, TCP or TLS failure; counts as one problem.
    ConnectError(ProbeError),
    /// The handshake completed and the presented chain was classified.
    Classified(Classification),
}

impl HostOutcome {
    /// How much this host adds to the exit status: 1 for a connect error,
    /// otherwise one per expired certificate.
    pub fn problems(&self) -> usize {
        match self {
            HostOutcome::ConnectError(_) => 1,
            HostOutcome::Classified(classification) => classification.expired.len(),
        }
    }
}

/// Connects to a normalized `host:port` target and classifies its chain.
///
/// Implementations must not panic on network failures; every failure mode is
/// returned as [`HostOutcome::ConnectError`].
pub trait Prober: Sync {
    fn probe(&self, address: &str) -> HostOutcome;
}

/// Prober backed by an OpenSSL client handshake over a blocking TCP socket.
#[derive(Debug, Clone)]
pub struct TlsProber {
    timeout: Duration,
}

impl TlsProber {
    pub fn new(timeout: Duration) -> TlsProber {
        TlsProber { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Performs the handshake and returns the peer chain in the order the
    /// peer sent it. The connection is closed before returning.
    pub fn fetch_chain(&self, address: &str) -> Result<Vec<CertInfo>, ProbeError> {
        // Trust-chain and hostname verification stay off: only the validity
        // window is inspected, so self-signed and untrusted chains must still
        // complete the handshake.
        let mut context = SslContext::builder(SslMethod::tls())?;
        context.set_verify(SslVerifyMode::empty());
        let context = context.build();

        let mut connector = Ssl::new(&context)?;
        if let Some(host) = sni_host(address) {
            connector.set_hostname(host)?;
        }

        let tcp_stream = connect(address, self.timeout)?;
        tcp_stream.set_read_timeout(Some(self.timeout))?;
        tcp_stream.set_write_timeout(Some(self.timeout))?;

        let mut stream = connector
            .connect(tcp_stream)
            .map_err(|e| handshake_error(address, self.timeout, e))?;
        let chain = peer_chain(stream.ssl())?;
        debug!("[{}] peer presented {} certificate(s)", address, chain.len());

        if let Err(e) = stream.shutdown() {
            debug!("[{}] TLS shutdown failed: {}", address, e);
        }
        Ok(chain)
    }
}

impl Default for TlsProber {
    fn default() -> Self {
        TlsProber::new(DEFAULT_TIMEOUT)
    }
}

impl Prober for TlsProber {
    fn probe(&self, address: &str) -> HostOutcome {
        match self.fetch_chain(address) {
            Ok(chain) => HostOutcome::Classified(classify(chain, Utc::now())),
            Err(e) => HostOutcome::ConnectError(e),
        }
    }
}

fn connect(address: &str, timeout: Duration) -> Result<TcpStream, ProbeError> {
    let addrs: Vec<SocketAddr> = match address.to_socket_addrs() {
        Ok(addrs) => addrs.collect(),
        Err(e) if e.kind() == io::ErrorKind::InvalidInput => {
            return Err(ProbeError::InvalidInput {
                field: "target".to_string(),
                reason: format!("{}: {}", address, e),
            })
        }
        Err(source) => {
            return Err(ProbeError::DnsResolution {
                target: address.to_string(),
                source,
            })
        }
    };

    let mut last_error = io::Error::new(io::ErrorKind::NotFound, "no addresses resolved");
    if addrs.is_empty() {
        return Err(ProbeError::DnsResolution {
            target: address.to_string(),
            source: last_error,
        });
    }

    for addr in addrs {
        debug!("[{}] connecting to {}", address, addr);
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                debug!("[{}] connect to {} failed: {}", address, addr, e);
                last_error = e;
            }
        }
    }

    if last_error.kind() == io::ErrorKind::TimedOut {
        return Err(ProbeError::Timeout {
            operation: format!("connect to {} after {:?}", address, timeout),
        });
    }
    Err(ProbeError::ConnectionFailed {
        address: address.to_string(),
        source: last_error,
    })
}

/// A blocking socket whose read or write timeout fires surfaces as an
/// interrupted handshake; that is the timeout, not a protocol failure.
fn handshake_error(address: &str, timeout: Duration, e: HandshakeError<TcpStream>) -> ProbeError {
    let timed_out = match &e {
        HandshakeError::WouldBlock(_) => true,
        HandshakeError::Failure(mid) => mid.error().io_error().map_or(false, |io_error| {
            matches!(
                io_error.kind(),
                io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
            )
        }),
        HandshakeError::SetupFailure(_) => false,
    };
    if timed_out {
        ProbeError::Timeout {
            operation: format!("TLS handshake with {} after {:?}", address, timeout),
        }
    } else {
        e.into()
    }
}

fn peer_chain(ssl: &SslRef) -> Result<Vec<CertInfo>, ProbeError> {
    if let Some(chain) = ssl.peer_cert_chain() {
        if !chain.is_empty() {
            return chain.iter().map(CertInfo::from_x509).collect();
        }
    }
    match ssl.peer_certificate() {
        Some(cert) => Ok(vec![CertInfo::from_x509(&cert)?]),
        None => Err(ProbeError::CertificateError {
            reason: "peer presented no certificate".to_string(),
        }),
    }
}
