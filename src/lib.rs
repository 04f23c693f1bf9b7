//! Probes TLS endpoints and reports certificates outside their validity window.
//!
//! Each target (`host` or `host:port`, port 443 by default) gets its own TLS
//! handshake, run concurrently with the others. Every certificate the peer
//! presents is checked against the current time; the number of connect
//! failures plus expired certificates is the overall result.
//!
//! Trust-chain, hostname, revocation and cipher checks are out of scope: the
//! handshake deliberately accepts any chain so that expiry can be inspected on
//! self-signed or privately rooted deployments too.
//!
//! ```no_run
//! let problems = certexpchk::run(&["example.com", "example.org:8443"], false);
//! std::process::exit(problems.min(255) as i32);
//! ```

pub mod certificate;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod probe;
pub mod report;
pub mod target;

pub use certificate::{classify, CertInfo, Classification};
pub use coordinator::{problem_count, run, Coordinator, HostReport};
pub use error::ProbeError;
pub use probe::{HostOutcome, Prober, TlsProber, DEFAULT_TIMEOUT};
pub use report::{Reporter, SilentReporter, TextReporter};
pub use target::normalize_target;
