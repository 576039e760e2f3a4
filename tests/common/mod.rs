// Shared fixtures for seedprobe integration tests
// An in-memory Transport that reflects every submitted value back in the body
#![allow(dead_code)]

use async_trait::async_trait;
use seedprobe::auditor::{Auditor, ModuleInfo};
use seedprobe::config::ScanConfig;
use seedprobe::elements::Page;
use seedprobe::engine::Transport;
use seedprobe::error::TransportError;
use seedprobe::models::{Request, Response};
use seedprobe::queue::DispatchQueue;
use seedprobe::session::ScanSession;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use url::{form_urlencoded, Url};

/// Echoes query values, form body values, cookie values and other header
/// values, one per line. Hosts containing "down" fail; paths containing
/// "missing" answer 404.
#[derive(Default)]
pub struct EchoTransport {
    pub sent: AtomicUsize,
    pub urls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl EchoTransport {
    pub fn sent(&self) -> usize {
        self.sent.load(Ordering::SeqCst)
    }

    /// Most requests ever inside send() at the same time
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn respond(&self, request: Request) -> Result<Response, TransportError> {
        let url = Url::parse(&request.url).map_err(|e| TransportError::InvalidRequest {
            url: request.url.clone(),
            reason: e.to_string(),
        })?;
        if url.host_str().is_some_and(|h| h.contains("down")) {
            return Err(TransportError::NoResponse {
                url: request.url,
                reason: "connection refused".to_string(),
            });
        }

        let mut reflected: Vec<String> = url.query_pairs().map(|(_, v)| v.into_owned()).collect();
        if let Some(body) = &request.body {
            reflected.extend(form_urlencoded::parse(body.as_bytes()).map(|(_, v)| v.into_owned()));
        }
        for (name, value) in &request.headers {
            if name.eq_ignore_ascii_case("Cookie") {
                let jar = value.replace("; ", "&");
                reflected.extend(form_urlencoded::parse(jar.as_bytes()).map(|(_, v)| v.into_owned()));
            } else if !name.eq_ignore_ascii_case("Content-Type") {
                reflected.push(value.clone());
            }
        }

        let status = if url.path().contains("missing") { 404 } else { 200 };
        let mut response = Response::new(status, request.url, reflected.join("\n"));
        response.method = request.method;
        Ok(response)
    }
}

#[async_trait]
impl Transport for EchoTransport {
    async fn send(&self, request: Request) -> Result<Response, TransportError> {
        self.sent.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().push(request.url.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(5)).await;
        let result = self.respond(request);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

pub struct Harness {
    pub transport: Arc<EchoTransport>,
    pub session: Arc<ScanSession>,
    pub auditor: Auditor,
}

pub fn harness(page: Page) -> Harness {
    harness_with_config(page, ScanConfig::default())
}

pub fn harness_with_config(page: Page, config: ScanConfig) -> Harness {
    let transport = Arc::new(EchoTransport::default());
    let session = Arc::new(ScanSession::new());
    let queue = DispatchQueue::new(transport.clone(), config.max_concurrency);
    let auditor = Auditor::new(
        ModuleInfo::new("test_module", "Seed reflected"),
        page,
        Arc::clone(&session),
        queue,
        Arc::new(config),
    );
    Harness {
        transport,
        session,
        auditor,
    }
}
