// Scan-wide configuration for seedprobe
// Read-only once a scan starts

use crate::elements::ElementKind;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub audit_links: bool,
    pub audit_forms: bool,
    pub audit_cookies: bool,
    pub audit_headers: bool,
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Requests allowed in flight at once
    pub max_concurrency: usize,
    pub pool_max_idle_per_host: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            audit_links: true,
            audit_forms: true,
            audit_cookies: true,
            audit_headers: true,
            timeout_secs: 30,
            user_agent: format!("seedprobe/{}", env!("CARGO_PKG_VERSION")),
            max_concurrency: 20,
            pool_max_idle_per_host: 10,
        }
    }
}

impl ScanConfig {
    /// Whether auditing of `kind` is globally enabled
    pub fn audits(&self, kind: ElementKind) -> bool {
        match kind {
            ElementKind::Link => self.audit_links,
            ElementKind::Form => self.audit_forms,
            ElementKind::Cookie => self.audit_cookies,
            ElementKind::Header => self.audit_headers,
        }
    }
}
