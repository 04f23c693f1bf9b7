//! Rendering of probe results.
//!
//! Progress and verdict lines are written to stderr as hosts finish, in
//! whatever order they finish. The summary table and the JSON document are
//! rendered once all hosts are done and follow the input order.

use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use strum_macros::Display;

use crate::certificate::CertInfo;
use crate::coordinator::HostReport;
use crate::probe::HostOutcome;

/// Receives per-host events from the coordinator's workers.
///
/// Methods are called concurrently from several threads.
pub trait Reporter: Sync {
    /// A probe for `target` is about to start.
    fn probing(&self, target: &str);
    /// The probe for `target` finished with `outcome`.
    fn host_done(&self, target: &str, outcome: &HostOutcome);
}

/// Line-oriented reporter writing to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextReporter {
    verbose: bool,
}

impl TextReporter {
    pub fn new(verbose: bool) -> TextReporter {
        TextReporter { verbose }
    }
}

impl Reporter for TextReporter {
    fn probing(&self, target: &str) {
        if let Some(line) = progress_line(target, self.verbose) {
            eprintln!("{}", line);
        }
    }

    fn host_done(&self, target: &str, outcome: &HostOutcome) {
        for line in outcome_lines(target, outcome, self.verbose) {
            eprintln!("{}", line);
        }
    }
}

/// Reporter that prints nothing, for library callers that only want the count.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentReporter;

impl Reporter for SilentReporter {
    fn probing(&self, _target: &str) {}
    fn host_done(&self, _target: &str, _outcome: &HostOutcome) {}
}

pub fn progress_line(target: &str, verbose: bool) -> Option<String> {
    if verbose {
        Some(format!("[{}] getting and checking cert...", target))
    } else {
        None
    }
}

/// Lines describing one host's outcome.
///
/// Every problem yields exactly one line. Valid certificates are only listed
/// in verbose mode, and only when the host has no expired certificate.
pub fn outcome_lines(target: &str, outcome: &HostOutcome, verbose: bool) -> Vec<String> {
    match outcome {
        HostOutcome::ConnectError(e) => vec![format!("[{}] {}", target, e)],
        HostOutcome::Classified(classification) if classification.any_expired() => classification
            .expired
            .iter()
            .map(|cert| {
                format!(
                    "[{}] cert of {} has expired! ({} - {})",
                    target,
                    cert.summary(),
                    cert.not_before_display(),
                    cert.not_after_display()
                )
            })
            .collect(),
        HostOutcome::Classified(classification) if verbose => classification
            .unexpired
            .iter()
            .map(|cert| format!("[{}] cert of {} has not yet expired.", target, cert.summary()))
            .collect(),
        HostOutcome::Classified(_) => Vec::new(),
    }
}

#[derive(Serialize, Display, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "UPPERCASE")]
pub enum HostStatus {
    Ok,
    Expired,
    Error,
}

impl HostStatus {
    pub fn of(outcome: &HostOutcome) -> HostStatus {
        match outcome {
            HostOutcome::ConnectError(_) => HostStatus::Error,
            HostOutcome::Classified(c) if c.any_expired() => HostStatus::Expired,
            HostOutcome::Classified(_) => HostStatus::Ok,
        }
    }
}

/// Per-host table, one row per target.
pub fn summary_table(reports: &[HostReport]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Host", "Status", "Expired", "Valid", "Detail"]);

    for report in reports {
        let status = HostStatus::of(&report.outcome);
        let row = match &report.outcome {
            HostOutcome::ConnectError(e) => vec![
                report.target.clone(),
                status.to_string(),
                "-".to_string(),
                "-".to_string(),
                e.to_string(),
            ],
            HostOutcome::Classified(c) => vec![
                report.target.clone(),
                status.to_string(),
                c.expired.len().to_string(),
                c.unexpired.len().to_string(),
                c.expired
                    .iter()
                    .map(|cert| format!("{} ({})", cert.summary(), cert.not_after_display()))
                    .collect::<Vec<_>>()
                    .join("\n"),
            ],
        };
        table.add_row(row);
    }
    table
}

#[derive(Serialize)]
struct JsonCert {
    subject: String,
    not_before: String,
    not_after: String,
}

impl From<&CertInfo> for JsonCert {
    fn from(cert: &CertInfo) -> Self {
        JsonCert {
            subject: cert.summary(),
            not_before: cert.not_before.to_rfc3339(),
            not_after: cert.not_after.to_rfc3339(),
        }
    }
}

#[derive(Serialize)]
struct JsonHost<'a> {
    host: &'a str,
    status: HostStatus,
    problems: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    expired: Vec<JsonCert>,
    unexpired: Vec<JsonCert>,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    problems: usize,
    hosts: Vec<JsonHost<'a>>,
}

/// Pretty-printed JSON document covering every host.
pub fn json_report(reports: &[HostReport]) -> Result<String, serde_json::Error> {
    let hosts = reports
        .iter()
        .map(|report| {
            let (error, expired, unexpired) = match &report.outcome {
                HostOutcome::ConnectError(e) => (Some(e.to_string()), Vec::new(), Vec::new()),
                HostOutcome::Classified(c) => (
                    None,
                    c.expired.iter().map(JsonCert::from).collect(),
                    c.unexpired.iter().map(JsonCert::from).collect(),
                ),
            };
            JsonHost {
                host: &report.target,
                status: HostStatus::of(&report.outcome),
                problems: report.outcome.problems(),
                error,
                expired,
                unexpired,
            }
        })
        .collect();

    serde_json::to_string_pretty(&JsonReport {
        problems: crate::coordinator::problem_count(reports),
        hosts,
    })
}
