// Page snapshot and element enumeration
//
// A Page is immutable once built; training replaces it wholesale.

use super::{Element, ElementKind};
use crate::error::{AuditError, Result};
use crate::models::Method;
use std::collections::HashSet;
use url::Url;

/// A link with a query string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// URL without query or fragment
    pub action: String,
    pub inputs: Vec<(String, String)>,
}

impl Link {
    pub fn new(action: impl Into<String>, inputs: Vec<(String, String)>) -> Self {
        Self {
            action: action.into(),
            inputs,
        }
    }

    /// Split a full URL into its action and query inputs
    pub fn from_url(raw: &str) -> Result<Self> {
        let mut url = Url::parse(raw).map_err(|source| AuditError::InvalidUrl {
            url: raw.to_string(),
            source,
        })?;
        let inputs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        url.set_query(None);
        url.set_fragment(None);
        Ok(Self {
            action: url.to_string(),
            inputs,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Form {
    pub action: String,
    pub method: Method,
    pub inputs: Vec<(String, String)>,
}

impl Form {
    pub fn new(action: impl Into<String>, method: Method, inputs: Vec<(String, String)>) -> Self {
        Self {
            action: action.into(),
            method,
            inputs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Immutable snapshot of a fetched resource and its injectable surfaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub url: String,
    pub method: Method,
    pub body: String,
    pub links: Vec<Link>,
    pub forms: Vec<Form>,
    pub cookies: Vec<Cookie>,
    pub headers: Vec<Header>,
}

impl Page {
    pub fn new(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: Method::GET,
            body: body.into(),
            links: Vec::new(),
            forms: Vec::new(),
            cookies: Vec::new(),
            headers: Vec::new(),
        }
    }

    pub fn with_link(mut self, link: Link) -> Self {
        self.links.push(link);
        self
    }

    pub fn with_form(mut self, form: Form) -> Self {
        self.forms.push(form);
        self
    }

    pub fn with_cookie(mut self, cookie: Cookie) -> Self {
        self.cookies.push(cookie);
        self
    }

    pub fn with_header(mut self, header: Header) -> Self {
        self.headers.push(header);
        self
    }

    /// Every injectable element of the requested kinds.
    ///
    /// Links come before forms, forms before cookies, cookies before headers,
    /// each in discovery order. Inputs resolving to an identifier already
    /// returned are skipped, so a name repeated inside one form is audited once.
    pub fn elements(&self, kinds: &[ElementKind]) -> Vec<Element> {
        let mut seen = HashSet::new();
        let mut elements = Vec::new();

        for kind in ElementKind::all() {
            if !kinds.contains(&kind) {
                continue;
            }
            for element in self.elements_of(kind) {
                if seen.insert(element.id()) {
                    elements.push(element);
                }
            }
        }

        elements
    }

    /// Identifiers of every element on the page, all kinds
    pub fn element_ids(&self) -> HashSet<String> {
        self.elements(&ElementKind::all())
            .iter()
            .map(Element::id)
            .collect()
    }

    fn elements_of(&self, kind: ElementKind) -> Vec<Element> {
        match kind {
            ElementKind::Link => self
                .links
                .iter()
                .flat_map(|link| expand(kind, &link.action, Method::GET, &link.inputs))
                .collect(),
            ElementKind::Form => self
                .forms
                .iter()
                .flat_map(|form| expand(kind, &form.action, form.method, &form.inputs))
                .collect(),
            ElementKind::Cookie => {
                let jar: Vec<(String, String)> = self
                    .cookies
                    .iter()
                    .map(|c| (c.name.clone(), c.value.clone()))
                    .collect();
                expand(kind, &self.url, Method::GET, &jar)
            }
            ElementKind::Header => self
                .headers
                .iter()
                .flat_map(|h| {
                    expand(
                        kind,
                        &self.url,
                        Method::GET,
                        &[(h.name.clone(), h.value.clone())],
                    )
                })
                .collect(),
        }
    }
}

/// One element per input of a single link/form/jar
fn expand(
    kind: ElementKind,
    action: &str,
    method: Method,
    inputs: &[(String, String)],
) -> Vec<Element> {
    inputs
        .iter()
        .map(|(name, value)| Element {
            kind,
            action: action.to_string(),
            method,
            name: name.clone(),
            value: value.clone(),
            inputs: inputs.to_vec(),
            injected: None,
        })
        .collect()
}
