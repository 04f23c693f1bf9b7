use lazy_static::lazy_static;
use log::{debug, warn};
use prometheus::{labels, register_gauge, Gauge};

use certexpchk::{HostOutcome, HostReport};

lazy_static! {
    static ref CERTEXPCHK_EXPIRED_CERTIFICATES: Gauge = register_gauge!(
        "certexpchk_expired_certificates",
        "certificates outside their validity window"
    )
    .expect("metric registers once");
    static ref CERTEXPCHK_VALID_CERTIFICATES: Gauge = register_gauge!(
        "certexpchk_valid_certificates",
        "certificates inside their validity window"
    )
    .expect("metric registers once");
    static ref CERTEXPCHK_CONNECT_ERROR: Gauge = register_gauge!(
        "certexpchk_connect_error",
        "1 when the host could not be reached or the handshake failed"
    )
    .expect("metric registers once");
}

/// Gauge values for one host: (expired, valid, connect error).
pub fn host_values(outcome: &HostOutcome) -> (f64, f64, f64) {
    match outcome {
        HostOutcome::ConnectError(_) => (0.0, 0.0, 1.0),
        HostOutcome::Classified(c) => (c.expired.len() as f64, c.unexpired.len() as f64, 0.0),
    }
}

/// Pushes one group of gauges per host to a Prometheus Push Gateway.
///
/// `prometheus_address` is the gateway root (e.g. `http://localhost:9091`);
/// the `/metrics/job/...` path is appended by the push client. Groups are
/// keyed by host only, so each run replaces the previous values for a host.
/// Failures are logged; they never affect the exit status.
pub fn prometheus_metrics(reports: &[HostReport], prometheus_address: &str) {
    for report in reports {
        let (expired, valid, connect_error) = host_values(&report.outcome);
        CERTEXPCHK_EXPIRED_CERTIFICATES.set(expired);
        CERTEXPCHK_VALID_CERTIFICATES.set(valid);
        CERTEXPCHK_CONNECT_ERROR.set(connect_error);

        let metric_families = prometheus::gather();
        let pushed = prometheus::push_metrics(
            "certexpchk",
            labels! {
                "instance".to_owned() => "certexpchk".to_owned(),
                "host".to_owned() => report.target.to_owned(),
            },
            prometheus_address,
            metric_families,
            None,
        );

        match pushed {
            Ok(_) => debug!("[{}] metrics pushed to {}", report.target, prometheus_address),
            Err(e) => warn!("[{}] failed to push metrics to prometheus: {}", report.target, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread;

    /// Answers one HTTP request with 202 and returns its request line.
    fn capture_request_line(listener: TcpListener) -> thread::JoinHandle<String> {
        thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream);
            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();

            let mut content_length = 0;
            loop {
                let mut header = String::new();
                reader.read_line(&mut header).unwrap();
                let header = header.trim_end();
                if header.is_empty() {
                    break;
                }
                if let Some((name, value)) = header.split_once(':') {
                    if name.eq_ignore_ascii_case("content-length") {
                        content_length = value.trim().parse().unwrap();
                    }
                }
            }
            let mut body = vec![0u8; content_length];
            reader.read_exact(&mut body).unwrap();

            let mut stream = reader.into_inner();
            stream
                .write_all(b"HTTP/1.1 202 Accepted\r\ncontent-length: 0\r\nconnection: close\r\n\r\n")
                .unwrap();
            request_line.trim_end().to_string()
        })
    }

    #[test]
    fn test_push_path_is_grouped_by_host() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let address = format!("http://{}", listener.local_addr().unwrap());
        let server = capture_request_line(listener);

        let reports = vec![HostReport {
            target: "a.test:443".to_string(),
            outcome: HostOutcome::ConnectError("refused".into()),
        }];
        prometheus_metrics(&reports, &address);

        let request_line = server.join().unwrap();
        assert!(
            request_line.starts_with("PUT /metrics/job/certexpchk/"),
            "{}",
            request_line
        );
        assert!(request_line.contains("/host/a.test:443"), "{}", request_line);
        assert!(request_line.contains("/instance/certexpchk"), "{}", request_line);
        assert!(!request_line.contains("/status/"), "{}", request_line);
        assert_eq!(request_line.matches("/metrics/job").count(), 1);
    }
}
