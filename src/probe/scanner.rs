//! Scan orchestration
//!
//! A single target is scanned sequentially: negotiate, reset only when
//! HTTP/2 was negotiated, classify. Batches spread targets over a fixed
//! number of scoped worker threads. Results are handed out in input order as
//! soon as every earlier target is done, so a long run can be written out
//! row by row.

use super::{
    classify, negotiate, probe_reset, NegotiationOutcome, ProbeError, ResetOutcome, ScanConfig, ScanResult,
    ScanTarget, VulnerabilityStatus,
};
use crate::source::SourceAddrs;
use chrono::{DateTime, Local};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;

/// Runs scans with one configuration and one set of source addresses
pub struct Scanner {
    config: ScanConfig,
    source: SourceAddrs,
}

impl Scanner {
    pub fn new(config: ScanConfig, source: SourceAddrs) -> Self {
        Scanner { config, source }
    }

    /// Scan one URL
    ///
    /// Always produces a result; a panic inside the probes is contained and
    /// reported as ERROR.
    pub fn scan_target(&self, url: &str) -> ScanResult {
        let started = Local::now();
        log::info!("Checking {}...", url);

        let (status, detail) = match panic::catch_unwind(AssertUnwindSafe(|| self.run_probes(url))) {
            Ok(verdict) => verdict,
            Err(payload) => {
                let err = ProbeError::UnexpectedState(format!("probe panicked: {}", panic_message(&*payload)));
                log::warn!("{}: {}", url, err);
                (VulnerabilityStatus::Error, err.to_string())
            }
        };

        if detail.is_empty() {
            log::info!("{}: {}", url, status);
        } else {
            log::info!("{}: {} ({})", url, status, detail);
        }

        self.result(url, started, status, detail)
    }

    /// Scan every URL, `workers` at a time; results follow input order
    pub fn scan_all(&self, urls: &[String]) -> Vec<ScanResult> {
        let mut results = Vec::with_capacity(urls.len());
        self.scan_each(urls, |result| results.push(result));
        results
    }

    /// Scan every URL, `workers` at a time, passing each result to `emit`
    ///
    /// `emit` runs on the calling thread, once per URL and in input order. A
    /// result that finished early waits only for the targets listed before it.
    pub fn scan_each<F>(&self, urls: &[String], mut emit: F)
    where
        F: FnMut(ScanResult),
    {
        if urls.is_empty() {
            return;
        }

        let workers = self.config.workers().min(urls.len());
        let next = AtomicUsize::new(0);
        let (tx, rx) = mpsc::channel();

        let mut slots: Vec<Option<ScanResult>> = vec![None; urls.len()];
        let mut emitted = 0;

        thread::scope(|scope| {
            for _ in 0..workers {
                let tx = tx.clone();
                let next = &next;
                scope.spawn(move || loop {
                    let index = next.fetch_add(1, Ordering::Relaxed);
                    let Some(url) = urls.get(index) else {
                        break;
                    };
                    if tx.send((index, self.scan_target(url))).is_err() {
                        break;
                    }
                });
            }
            drop(tx);

            for (index, result) in rx {
                slots[index] = Some(result);
                while let Some(ready) = slots.get_mut(emitted).and_then(Option::take) {
                    emit(ready);
                    emitted += 1;
                }
            }
        });

        for (slot, url) in slots.into_iter().zip(urls).skip(emitted) {
            emit(slot.unwrap_or_else(|| {
                let err = ProbeError::UnexpectedState("worker exited without a result".to_string());
                self.result(url, Local::now(), VulnerabilityStatus::Error, err.to_string())
            }));
        }
    }

    fn run_probes(&self, url: &str) -> (VulnerabilityStatus, String) {
        let timeout = self.config.timeout();

        let (negotiation, reset) = match ScanTarget::parse(url) {
            Ok(target) => {
                let target = target.with_proxy(self.config.proxy().cloned());
                let negotiation = negotiate(&target, timeout);
                let reset = match negotiation {
                    NegotiationOutcome::NegotiatedH2 => probe_reset(&target, timeout),
                    _ => ResetOutcome::NotAttempted,
                };
                (negotiation, reset)
            }
            Err(e) => (NegotiationOutcome::ConnectionError(e.to_string()), ResetOutcome::NotAttempted),
        };

        classify(&negotiation, &reset)
    }

    fn result(&self, url: &str, timestamp: DateTime<Local>, status: VulnerabilityStatus, detail: String) -> ScanResult {
        ScanResult {
            timestamp,
            source_internal_ip: self.source.internal,
            source_external_ip: self.source.external,
            url: url.to_string(),
            status,
            detail,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
