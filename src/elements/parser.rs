// Response → Page extraction
// Uses scraper for HTML and url for resolving relative actions

use super::page::{Cookie, Form, Link, Page};
use crate::models::{Method, Response};
use lazy_static::lazy_static;
use scraper::{Html, Selector};
use tracing::trace;
use url::Url;

lazy_static! {
    static ref ANCHOR: Selector = Selector::parse("a[href]").unwrap();
    static ref FORM: Selector = Selector::parse("form").unwrap();
    static ref FIELD: Selector =
        Selector::parse("input[name], select[name], textarea[name]").unwrap();
}

impl Page {
    /// Parse a response into a new Page.
    ///
    /// Links are the response URL itself and every anchor carrying a query
    /// string; forms default their action to the page URL and their method to
    /// GET; cookies come from Set-Cookie headers. Parsed pages have no header
    /// surfaces.
    pub fn from_response(response: &Response) -> Page {
        let mut page = Page::new(response.url.clone(), response.body.clone());
        page.method = response.method;

        let base = Url::parse(&response.url).ok();
        let document = Html::parse_document(&response.body);

        if let Ok(link) = Link::from_url(&response.url) {
            if !link.inputs.is_empty() {
                page.links.push(link);
            }
        }

        for anchor in document.select(&ANCHOR) {
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            let Some(resolved) = resolve(base.as_ref(), href) else {
                trace!("Skipping unresolvable href {}", href);
                continue;
            };
            if let Ok(link) = Link::from_url(&resolved) {
                if !link.inputs.is_empty() && !page.links.contains(&link) {
                    page.links.push(link);
                }
            }
        }

        for form in document.select(&FORM) {
            let action = form
                .value()
                .attr("action")
                .filter(|a| !a.trim().is_empty())
                .and_then(|a| resolve(base.as_ref(), a))
                .unwrap_or_else(|| response.url.clone());
            let method = form
                .value()
                .attr("method")
                .and_then(|m| m.parse::<Method>().ok())
                .unwrap_or(Method::GET);

            let inputs: Vec<(String, String)> = form
                .select(&FIELD)
                .filter_map(|field| {
                    let name = field.value().attr("name")?;
                    let value = field.value().attr("value").unwrap_or_default();
                    Some((name.to_string(), value.to_string()))
                })
                .collect();

            if !inputs.is_empty() {
                page.forms.push(Form::new(action, method, inputs));
            }
        }

        for raw in response.header_values("Set-Cookie") {
            if let Some(cookie) = parse_set_cookie(raw) {
                page.cookies.push(cookie);
            }
        }

        page
    }
}

fn resolve(base: Option<&Url>, href: &str) -> Option<String> {
    let resolved = match base {
        Some(base) => base.join(href).ok()?,
        None => Url::parse(href).ok()?,
    };
    matches!(resolved.scheme(), "http" | "https").then(|| resolved.to_string())
}

/// `name=value; Path=/; HttpOnly` → Cookie(name, value)
fn parse_set_cookie(raw: &str) -> Option<Cookie> {
    let pair = raw.split(';').next()?.trim();
    let (name, value) = pair.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some(Cookie::new(name, value.trim()))
}
