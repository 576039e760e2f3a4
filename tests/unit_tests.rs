/// Unit tests for core seedprobe modules
/// Tests models, element requests, seed formats and the redundancy filter
use seedprobe::config::ScanConfig;
use seedprobe::elements::{Cookie, ElementKind, Form, Header, Link, Page};
use seedprobe::models::{Method, Request};
use seedprobe::mutator::{format_seed, Format};
use seedprobe::redundancy::{RedundancyFilter, RedundancyKey};

fn page() -> Page {
    Page::new("http://test.local/", "")
        .with_link(Link::from_url("http://test.local/item?id=1&sort=asc").unwrap())
        .with_form(Form::new(
            "http://test.local/login",
            Method::POST,
            vec![
                ("user".to_string(), "guest".to_string()),
                ("pass".to_string(), String::new()),
            ],
        ))
        .with_cookie(Cookie::new("session", "abc"))
        .with_cookie(Cookie::new("theme", "dark"))
        .with_header(Header::new("Referer", "http://test.local/"))
}

#[test]
fn test_method_display() {
    // Test that Method enum can be converted to string
    assert_eq!(Method::GET.to_string(), "GET");
    assert_eq!(Method::POST.to_string(), "POST");
    assert_eq!(Method::HEAD.to_string(), "HEAD");
}

#[test]
fn test_method_parse_is_case_insensitive() {
    assert_eq!("post".parse::<Method>().unwrap(), Method::POST);
    assert_eq!("Get".parse::<Method>().unwrap(), Method::GET);
    assert!("BREW".parse::<Method>().is_err());
}

#[test]
fn test_post_request_is_form_encoded() {
    let request = Request::post("http://test.local/login", "user=guest");
    assert_eq!(request.method, Method::POST);
    assert_eq!(
        request.header("content-type"),
        Some("application/x-www-form-urlencoded")
    );
    assert_eq!(request.body.as_deref(), Some("user=guest"));
}

#[test]
fn test_page_enumerates_one_element_per_input() {
    let elements = page().elements(&ElementKind::all());
    let ids: Vec<String> = elements.iter().map(|e| e.id()).collect();
    assert_eq!(
        ids,
        vec![
            "link:http://test.local/item:id",
            "link:http://test.local/item:sort",
            "form:http://test.local/login:user",
            "form:http://test.local/login:pass",
            "cookie:http://test.local/:session",
            "cookie:http://test.local/:theme",
            "header:http://test.local/:Referer",
        ]
    );
}

#[test]
fn test_page_filters_by_kind() {
    let cookies = page().elements(&[ElementKind::Cookie]);
    assert_eq!(cookies.len(), 2);
    assert!(cookies.iter().all(|e| e.kind == ElementKind::Cookie));
}

#[test]
fn test_link_request_carries_injected_query() {
    let link = page().elements(&[ElementKind::Link]).remove(0);
    let request = link.with_injected_value("' OR 1=1").to_request().unwrap();

    assert_eq!(request.method, Method::GET);
    assert_eq!(request.url, "http://test.local/item?id=%27+OR+1%3D1&sort=asc");
    // The source element keeps its original value
    assert_eq!(link.current_value(), "1");
}

#[test]
fn test_form_request_carries_injected_body() {
    let form = page().elements(&[ElementKind::Form]).remove(1);
    let request = form.with_injected_value("a&b").to_request().unwrap();

    assert_eq!(request.method, Method::POST);
    assert_eq!(request.url, "http://test.local/login");
    assert_eq!(request.body.as_deref(), Some("user=guest&pass=a%26b"));
}

#[test]
fn test_cookie_request_sends_whole_jar() {
    let session = page().elements(&[ElementKind::Cookie]).remove(0);
    let request = session.with_injected_value("x y").to_request().unwrap();

    assert_eq!(request.header("Cookie"), Some("session=x+y; theme=dark"));
    assert_eq!(request.body, None);
}

#[test]
fn test_header_request_sets_named_header() {
    let header = page().elements(&[ElementKind::Header]).remove(0);
    let request = header.with_injected_value("<probe>").to_request().unwrap();

    assert_eq!(request.url, "http://test.local/");
    assert_eq!(request.header("referer"), Some("<probe>"));
}

#[test]
fn test_invalid_action_is_an_error() {
    let page = Page::new("not a url", "").with_cookie(Cookie::new("a", "b"));
    let cookie = page.elements(&[ElementKind::Cookie]).remove(0);
    assert!(cookie.to_request().is_err());
}

#[test]
fn test_seed_formats() {
    assert_eq!(format_seed("X", "orig", Format::Straight), "X");
    assert_eq!(format_seed("X", "orig", Format::Append), "origX");
    assert_eq!(format_seed("X", "orig", Format::Null), "X\0");
    assert_eq!(format_seed("X", "orig", Format::Semicolon), "X;");
    assert_eq!(format_seed("", "", Format::Append), "");
}

#[test]
fn test_redundancy_filter_admits_once() {
    let filter = RedundancyFilter::new();
    let key = RedundancyKey::new(ElementKind::Link, "link:http://test.local/item:id", "X");

    assert!(filter.should_audit(key.clone(), false));
    assert!(!filter.should_audit(key.clone(), false));
    assert!(filter.should_audit(key.clone(), true));
    assert_eq!(filter.len(), 1);

    // Same input, different payload is a different unit
    let other = RedundancyKey::new(ElementKind::Link, "link:http://test.local/item:id", "Y");
    assert!(filter.should_audit(other, false));
    assert_eq!(filter.len(), 2);
}

#[test]
fn test_config_toggles_kinds() {
    let config: ScanConfig = serde_json::from_str(r#"{"audit_headers": false}"#).unwrap();
    assert!(config.audits(ElementKind::Link));
    assert!(!config.audits(ElementKind::Header));
    assert_eq!(config.max_concurrency, 20);
}
