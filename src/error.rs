//! Error types for host probing.
//!
//! Every variant here ends up as a connect error for the host being probed:
//! it is reported once and counts as one problem, but never aborts the run.

use std::fmt;
use std::io;

/// Error raised while connecting to a host or reading its certificate chain.
#[derive(Debug)]
pub enum ProbeError {
    /// DNS resolution failed for the given target
    DnsResolution {
        /// The target (host:port) that failed to resolve
        target: String,
        /// The underlying I/O error
        source: io::Error,
    },

    /// TCP connection failed to every resolved address
    ConnectionFailed {
        /// The address (host:port) that connection failed to
        address: String,
        /// The underlying I/O error
        source: io::Error,
    },

    /// TLS handshake failed
    HandshakeFailed {
        /// Details about why the handshake failed
        details: String,
    },

    /// The peer presented no certificate or one that could not be read
    CertificateError {
        /// Description of what went wrong
        reason: String,
    },

    /// Network operation timeout
    Timeout {
        /// Description of which operation timed out
        operation: String,
    },

    /// The target string could not be turned into an address
    InvalidInput {
        /// Which field/parameter was invalid
        field: String,
        /// Why it was invalid
        reason: String,
    },

    /// OpenSSL error occurred
    OpenSSLError {
        /// The underlying OpenSSL error
        details: String,
    },

    /// Generic I/O error
    IoError {
        /// The underlying I/O error
        source: io::Error,
    },

    /// A generic error with a custom message
    Other {
        /// Error message
        message: String,
    },
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DnsResolution { target, source } => {
                write!(f, "failed to resolve {}: {}", target, source)
            }
            Self::ConnectionFailed { address, source } => {
                write!(f, "connection to {} failed: {}", address, source)
            }
            Self::HandshakeFailed { details } => {
                write!(f, "TLS handshake failed: {}", details)
            }
            Self::CertificateError { reason } => {
                write!(f, "certificate error: {}", reason)
            }
            Self::Timeout { operation } => {
                write!(f, "operation timed out: {}", operation)
            }
            Self::InvalidInput { field, reason } => {
                write!(f, "invalid input for '{}': {}", field, reason)
            }
            Self::OpenSSLError { details } => {
                write!(f, "OpenSSL error: {}", details)
            }
            Self::IoError { source } => {
                write!(f, "I/O error: {}", source)
            }
            Self::Other { message } => {
                write!(f, "{}", message)
            }
        }
    }
}

impl std::error::Error for ProbeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::DnsResolution { source, .. } => Some(source),
            Self::ConnectionFailed { source, .. } => Some(source),
            Self::IoError { source } => Some(source),
            _ => None,
        }
    }
}

impl From<io::Error> for ProbeError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => Self::Timeout {
                operation: e.to_string(),
            },
            _ => Self::IoError { source: e },
        }
    }
}

impl From<&str> for ProbeError {
    fn from(s: &str) -> Self {
        Self::Other {
            message: s.to_string(),
        }
    }
}

impl From<String> for ProbeError {
    fn from(s: String) -> Self {
        Self::Other { message: s }
    }
}

impl From<openssl::error::ErrorStack> for ProbeError {
    fn from(e: openssl::error::ErrorStack) -> Self {
        Self::OpenSSLError {
            details: e.to_string(),
        }
    }
}

impl<S: fmt::Debug> From<openssl::ssl::HandshakeError<S>> for ProbeError {
    fn from(e: openssl::ssl::HandshakeError<S>) -> Self {
        Self::HandshakeFailed {
            details: format!("{}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_error_display() {
        let err = ProbeError::InvalidInput {
            field: "target".to_string(),
            reason: "missing host".to_string(),
        };
        assert_eq!(err.to_string(), "invalid input for 'target': missing host");
    }

    #[test]
    fn test_error_from_str() {
        let err: ProbeError = "test error".into();
        assert_eq!(err.to_string(), "test error");
    }

    #[test]
    fn test_timed_out_io_error_becomes_timeout() {
        let err: ProbeError = io::Error::new(io::ErrorKind::TimedOut, "connect timed out").into();
        match err {
            ProbeError::Timeout { operation } => assert_eq!(operation, "connect timed out"),
            other => panic!("expected Timeout, got {:?}", other),
        }
    }

    #[test]
    fn test_handshake_error_conversion() {
        let stack = openssl::error::ErrorStack::get();
        let err: ProbeError =
            openssl::ssl::HandshakeError::<std::net::TcpStream>::SetupFailure(stack).into();
        assert!(matches!(err, ProbeError::HandshakeFailed { .. }));
    }

    #[test]
    fn test_connection_failed_exposes_source() {
        let err = ProbeError::ConnectionFailed {
            address: "127.0.0.1:1".to_string(),
            source: io::Error::new(io::ErrorKind::ConnectionRefused, "refused"),
        };
        assert!(err.source().is_some());
        assert!(err.to_string().starts_with("connection to 127.0.0.1:1 failed"));
    }
}
