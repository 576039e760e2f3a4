// Injectable Element Model
//
// Uniform representation of every surface a seed can be injected into:
//
// - mod.rs: ElementKind + Element (identifier, value, mutation, request building)
// - page:   Page snapshot and its link/form/cookie/header collections
// - parser: Page extraction from a raw Response (used by the trainer)
//
// Architecture:
//   parser.rs (Response -> Page)
//       ↓
//   page.rs (Page -> enumerate Elements)
//       ↓
//   mod.rs (Element -> injected copy -> Request)
//       ↑
//   auditor.rs (drives enumeration and mutation per format)

pub mod page;
pub mod parser;

pub use page::*;

use crate::error::{AuditError, Result};
use crate::models::{Method, Request};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::{form_urlencoded, Url};

/// The fixed set of injectable surface kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ElementKind {
    Link,
    Form,
    Cookie,
    Header,
}

impl ElementKind {
    /// All kinds in enumeration order
    pub fn all() -> Vec<ElementKind> {
        vec![
            ElementKind::Link,
            ElementKind::Form,
            ElementKind::Cookie,
            ElementKind::Header,
        ]
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementKind::Link => write!(f, "link"),
            ElementKind::Form => write!(f, "form"),
            ElementKind::Cookie => write!(f, "cookie"),
            ElementKind::Header => write!(f, "header"),
        }
    }
}

impl FromStr for ElementKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "link" | "links" => Ok(ElementKind::Link),
            "form" | "forms" => Ok(ElementKind::Form),
            "cookie" | "cookies" => Ok(ElementKind::Cookie),
            "header" | "headers" => Ok(ElementKind::Header),
            other => Err(format!("Unknown element kind: {}", other)),
        }
    }
}

/// One injectable input.
///
/// `inputs` holds every sibling input of the owning link/form/cookie jar so a
/// mutated copy can rebuild the full request with only `name` altered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub kind: ElementKind,
    /// Owning URL (link/form action, or the page URL for cookies and headers)
    pub action: String,
    pub method: Method,
    pub name: String,
    /// Original value of the input
    pub value: String,
    pub inputs: Vec<(String, String)>,
    /// The injected string, present only on mutated copies
    pub injected: Option<String>,
}

impl Element {
    /// Stable identifier derived from (kind, owning URL, input name)
    pub fn id(&self) -> String {
        format!("{}:{}:{}", self.kind, self.action, self.name)
    }

    /// Current value of the audited input (the injected one on mutated copies)
    pub fn current_value(&self) -> &str {
        self.injected.as_deref().unwrap_or(&self.value)
    }

    /// A copy carrying `value` in place of the audited input. `self` is untouched.
    pub fn with_injected_value(&self, value: &str) -> Element {
        let mut mutated = self.clone();
        for (name, v) in mutated.inputs.iter_mut() {
            if *name == self.name {
                *v = value.to_string();
            }
        }
        mutated.injected = Some(value.to_string());
        mutated
    }

    /// Build the HTTP request that submits this element's inputs.
    pub fn to_request(&self) -> Result<Request> {
        let mut url = Url::parse(&self.action).map_err(|source| AuditError::InvalidUrl {
            url: self.action.clone(),
            source,
        })?;

        let request = match self.kind {
            ElementKind::Link => {
                set_query(&mut url, &self.inputs);
                Request::get(url.to_string())
            }
            ElementKind::Form => match self.method {
                Method::POST => {
                    let body = form_urlencoded::Serializer::new(String::new())
                        .extend_pairs(&self.inputs)
                        .finish();
                    Request::post(url.to_string(), body)
                }
                _ => {
                    set_query(&mut url, &self.inputs);
                    Request::get(url.to_string())
                }
            },
            ElementKind::Cookie => {
                let jar = self
                    .inputs
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, encode_cookie_value(v)))
                    .collect::<Vec<_>>()
                    .join("; ");
                Request::get(url.to_string()).with_header("Cookie", jar)
            }
            ElementKind::Header => {
                let mut req = Request::get(url.to_string());
                for (name, value) in &self.inputs {
                    req = req.with_header(name.clone(), encode_header_value(value));
                }
                req
            }
        };

        Ok(request)
    }
}

fn set_query(url: &mut Url, inputs: &[(String, String)]) {
    if inputs.is_empty() {
        return;
    }
    url.query_pairs_mut().clear().extend_pairs(inputs);
}

fn encode_cookie_value(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// Percent-encode control bytes, which are not valid in a header value
fn encode_header_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if c.is_ascii_control() && c != '\t' {
            out.push_str(&format!("%{:02X}", c as u8));
        } else {
            out.push(c);
        }
    }
    out
}
