// Issues and the shared results registry for seedprobe

use crate::elements::ElementKind;
use crate::models::Method;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Scope an issue was found in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IssueElement {
    Link,
    Form,
    Cookie,
    Header,
    Body,
    Path,
}

impl From<ElementKind> for IssueElement {
    fn from(kind: ElementKind) -> Self {
        match kind {
            ElementKind::Link => IssueElement::Link,
            ElementKind::Form => IssueElement::Form,
            ElementKind::Cookie => IssueElement::Cookie,
            ElementKind::Header => IssueElement::Header,
        }
    }
}

impl fmt::Display for IssueElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueElement::Link => write!(f, "link"),
            IssueElement::Form => write!(f, "form"),
            IssueElement::Cookie => write!(f, "cookie"),
            IssueElement::Header => write!(f, "header"),
            IssueElement::Body => write!(f, "body"),
            IssueElement::Path => write!(f, "path"),
        }
    }
}

/// A logged finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub name: String,
    /// Name of the module that logged it
    pub mod_name: String,
    pub url: String,
    pub method: Method,
    pub elem: IssueElement,
    /// Name of the affected input
    pub id: String,
    pub injected: String,
    pub regexp: Option<String>,
    pub regexp_match: Option<String>,
    /// False until a separate confirmation pass validates the finding
    pub verification: bool,
    /// Auxiliary data; pattern-based findings carry `regexp`, `match` and `element`
    pub opts: BTreeMap<String, String>,
}

impl Issue {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mod_name: String::new(),
            url: url.into(),
            method: Method::GET,
            elem: IssueElement::Body,
            id: String::new(),
            injected: String::new(),
            regexp: None,
            regexp_match: None,
            verification: false,
            opts: BTreeMap::new(),
        }
    }

    pub fn with_element(mut self, elem: IssueElement) -> Self {
        self.elem = elem;
        self.opts.insert("element".to_string(), elem.to_string());
        self
    }

    pub fn with_input(mut self, id: impl Into<String>, injected: impl Into<String>) -> Self {
        self.id = id.into();
        self.injected = injected.into();
        self
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Record the detection pattern and matched fragment
    pub fn with_match(mut self, regexp: impl Into<String>, matched: impl Into<String>) -> Self {
        let regexp = regexp.into();
        let matched = matched.into();
        self.opts.insert("regexp".to_string(), regexp.clone());
        self.opts.insert("match".to_string(), matched.clone());
        self.regexp = Some(regexp);
        self.regexp_match = Some(matched);
        self
    }

    /// Hook for a confirmation pass; nothing in the engine calls it
    pub fn set_verification(&mut self, verified: bool) {
        self.verification = verified;
    }
}

/// Append-only, insertion-ordered collection of issues shared by all audits.
#[derive(Debug, Default)]
pub struct IssueRegistry {
    issues: RwLock<Vec<Issue>>,
}

impl IssueRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self, issue: Issue) {
        self.issues.write().push(issue);
    }

    pub fn extend(&self, issues: impl IntoIterator<Item = Issue>) {
        self.issues.write().extend(issues);
    }

    /// Snapshot of everything logged so far
    pub fn results(&self) -> Vec<Issue> {
        self.issues.read().clone()
    }

    pub fn first(&self) -> Option<Issue> {
        self.issues.read().first().cloned()
    }

    pub fn len(&self) -> usize {
        self.issues.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.read().is_empty()
    }

    pub fn clear(&self) {
        self.issues.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_issue_carries_aux_options() {
        let issue = Issue::new("XSS", "http://test.local/?q=x")
            .with_element(IssueElement::Link)
            .with_match("(?i)<script>", "<SCRIPT>");

        assert_eq!(issue.opts.get("element").map(String::as_str), Some("link"));
        assert_eq!(issue.opts.get("regexp").map(String::as_str), Some("(?i)<script>"));
        assert_eq!(issue.opts.get("match").map(String::as_str), Some("<SCRIPT>"));
        assert_eq!(issue.regexp.as_deref(), Some("(?i)<script>"));
        assert!(!issue.verification);
    }

    #[test]
    fn registry_keeps_insertion_order_without_dedup() {
        let registry = IssueRegistry::new();
        registry.log(Issue::new("A", "http://test.local/"));
        registry.log(Issue::new("A", "http://test.local/"));
        registry.extend(vec![Issue::new("B", "http://test.local/")]);

        let names: Vec<String> = registry.results().into_iter().map(|i| i.name).collect();
        assert_eq!(names, vec!["A", "A", "B"]);
        assert_eq!(registry.first().map(|i| i.name), Some("A".to_string()));
    }

    #[test]
    fn snapshot_is_detached_from_later_logs() {
        let registry = IssueRegistry::new();
        registry.log(Issue::new("A", "http://test.local/"));
        let snapshot = registry.results();
        registry.log(Issue::new("B", "http://test.local/"));

        assert_eq!(snapshot.len(), 1);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn clear_empties_the_registry() {
        let registry = IssueRegistry::new();
        registry.log(Issue::new("A", "http://test.local/"));
        registry.clear();
        assert!(registry.is_empty());
    }

    #[test]
    fn verification_is_settable() {
        let mut issue = Issue::new("A", "http://test.local/");
        issue.set_verification(true);
        assert!(issue.verification);
    }
}
