// Scan session context
// Owns the per-scan shared state handed to every Auditor

use crate::issue::IssueRegistry;
use crate::redundancy::RedundancyFilter;
use crate::trainer::Trainer;

/// State that lives for one scan: audited keys, logged issues and the
/// elements the scan already knows about.
#[derive(Debug, Default)]
pub struct ScanSession {
    pub filter: RedundancyFilter,
    pub registry: IssueRegistry,
    pub trainer: Trainer,
}

impl ScanSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start over: forget audited keys, known elements and all issues
    pub fn reset(&self) {
        self.filter.reset();
        self.registry.clear();
        self.trainer.reset();
    }
}
