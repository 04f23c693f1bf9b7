//! Concurrent fan-out over all targets.
//!
//! Every target gets its own worker thread unless a concurrency cap is set,
//! in which case that many workers pull targets from a shared cursor. Workers
//! send their outcome back over a channel; counting happens after every worker
//! has been joined, so no counter is shared between threads.

use log::debug;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;

use crate::probe::{HostOutcome, Prober, TlsProber};
use crate::report::{Reporter, TextReporter};
use crate::target::normalize_target;

/// Outcome of one target, keyed by its normalized `host:port` form.
#[derive(Debug)]
pub struct HostReport {
    pub target: String,
    pub outcome: HostOutcome,
}

pub struct Coordinator<P, R> {
    prober: P,
    reporter: R,
    max_concurrency: Option<usize>,
}

impl<P: Prober, R: Reporter> Coordinator<P, R> {
    pub fn new(prober: P, reporter: R) -> Self {
        Coordinator {
            prober,
            reporter,
            max_concurrency: None,
        }
    }

    /// Caps the number of simultaneous probes. `None` means one worker per
    /// target.
    pub fn with_max_concurrency(mut self, max_concurrency: Option<usize>) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    /// Probes every target and waits for all of them.
    ///
    /// The returned reports follow the order of `targets`; reporter events
    /// are emitted in completion order.
    pub fn probe_all<S: AsRef<str>>(&self, targets: &[S]) -> Vec<HostReport> {
        let addresses: Vec<String> = targets
            .iter()
            .map(|t| normalize_target(t.as_ref()))
            .collect();
        if addresses.is_empty() {
            return Vec::new();
        }

        let workers = match self.max_concurrency {
            Some(cap) => cap.clamp(1, addresses.len()),
            None => addresses.len(),
        };
        debug!("probing {} target(s) with {} worker(s)", addresses.len(), workers);

        let cursor = AtomicUsize::new(0);
        let (sender, receiver) = mpsc::channel();
        thread::scope(|scope| {
            for _ in 0..workers {
                let sender = sender.clone();
                let cursor = &cursor;
                let addresses = &addresses;
                scope.spawn(move || loop {
                    let index = cursor.fetch_add(1, Ordering::Relaxed);
                    let address = match addresses.get(index) {
                        Some(address) => address,
                        None => break,
                    };
                    self.reporter.probing(address);
                    let outcome = self.prober.probe(address);
                    self.reporter.host_done(address, &outcome);
                    if sender.send((index, outcome)).is_err() {
                        break;
                    }
                });
            }
        });
        drop(sender);

        let mut slots: Vec<Option<HostOutcome>> = addresses.iter().map(|_| None).collect();
        for (index, outcome) in receiver {
            slots[index] = Some(outcome);
        }

        addresses
            .into_iter()
            .zip(slots)
            .filter_map(|(target, outcome)| outcome.map(|outcome| HostReport { target, outcome }))
            .collect()
    }

    /// Probes every target and returns the number of problems found.
    pub fn run<S: AsRef<str>>(&self, targets: &[S]) -> usize {
        problem_count(&self.probe_all(targets))
    }
}

/// Connect errors plus expired certificates, over all hosts.
pub fn problem_count(reports: &[HostReport]) -> usize {
    reports.iter().map(|r| r.outcome.problems()).sum()
}

/// Probes `targets` with the default prober, reporting on stderr, and
/// returns the number of problems (0 means every host is healthy).
pub fn run<S: AsRef<str>>(targets: &[S], verbose: bool) -> usize {
    Coordinator::new(TlsProber::default(), TextReporter::new(verbose)).run(targets)
}
