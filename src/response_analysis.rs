// Response analysis for seedprobe
// Heuristics for servers that answer 200 to missing resources

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref SOFT_NOT_FOUND: Regex = Regex::new(
        r"(?i)(404\s*-?\s*not found|page not found|file not found|does not exist|no such file|cannot be found)"
    )
    .unwrap();
}

/// Whether a 200 response body is really a "not found" page.
pub fn is_soft_not_found(body: &str) -> bool {
    SOFT_NOT_FOUND.is_match(body)
}
