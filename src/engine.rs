// Async HTTP transport for seedprobe
// Uses reqwest and tokio; the audit core only sees the Transport trait

use crate::auth::AuthStrategy;
use crate::config::ScanConfig;
use crate::error::TransportError;
use crate::models::{Request, Response};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Sends one request and yields its response, or a terminal failure.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: Request) -> Result<Response, TransportError>;
}

pub struct AttackEngine {
    pub client: Client,
    auth: Option<Box<dyn AuthStrategy>>,
}

impl AttackEngine {
    pub fn new(config: &ScanConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client, auth: None })
    }

    pub fn with_auth(mut self, auth: impl AuthStrategy + 'static) -> Self {
        self.auth = Some(Box::new(auth));
        self
    }

    /// Turn `request` into a reqwest request with auth, headers and body applied
    pub fn build_request(&self, request: &Request) -> Result<reqwest::Request, TransportError> {
        let method = reqwest::Method::from_bytes(request.method.to_string().as_bytes())
            .map_err(|e| TransportError::InvalidRequest {
                url: request.url.clone(),
                reason: e.to_string(),
            })?;

        let mut req = self.client.request(method, &request.url);
        if let Some(auth) = &self.auth {
            req = auth.apply_auth(req);
        }
        for (name, value) in &request.headers {
            req = req.header(name, value);
        }
        if let Some(body) = &request.body {
            req = req.body(body.clone());
        }

        req.build()
            .map_err(|e| TransportError::from_reqwest(e, &request.url))
    }
}

#[async_trait]
impl Transport for AttackEngine {
    async fn send(&self, request: Request) -> Result<Response, TransportError> {
        let built = self.build_request(&request)?;
        let resp = self
            .client
            .execute(built)
            .await
            .map_err(|e| TransportError::from_reqwest(e, &request.url))?;

        let status = resp.status().as_u16();
        let url = resp.url().to_string();
        let headers = resp
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
            .collect();
        let body = resp
            .text()
            .await
            .map_err(|e| TransportError::from_reqwest(e, &url))?;

        Ok(Response {
            status,
            url,
            method: request.method,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticTokenAuth;
    use crate::elements::{ElementKind, Header, Page};
    use crate::mutator::{format_seed, Format};

    #[test]
    fn engine_builds_from_default_config() {
        let engine = AttackEngine::new(&ScanConfig::default());
        assert!(engine.is_ok());
    }

    #[tokio::test]
    async fn unreachable_host_is_a_transport_failure() {
        let config = ScanConfig {
            timeout_secs: 2,
            ..ScanConfig::default()
        };
        let engine = AttackEngine::new(&config)
            .unwrap()
            .with_auth(StaticTokenAuth {
                token: "t".to_string(),
            });
        let result = engine.send(Request::get("http://127.0.0.1:1/")).await;
        assert!(matches!(
            result,
            Err(TransportError::NoResponse { ref url, .. }) if url == "http://127.0.0.1:1/"
        ));
    }

    #[test]
    fn null_formatted_header_element_builds() {
        let engine = AttackEngine::new(&ScanConfig::default()).unwrap();
        let page = Page::new("http://test.local/", "").with_header(Header::new("Referer", ""));
        let element = page.elements(&[ElementKind::Header]).remove(0);
        let injected = format_seed("probe", &element.value, Format::Null);

        let request = element.with_injected_value(&injected).to_request().unwrap();
        let built = engine.build_request(&request).unwrap();
        assert_eq!(built.headers()["referer"], "probe%00");
        assert_eq!(built.url().as_str(), "http://test.local/");
    }

    #[test]
    fn build_failure_is_located_at_the_request_url() {
        let engine = AttackEngine::new(&ScanConfig::default()).unwrap();
        let request = Request::get("http://test.local/a").with_header("X-Raw", "bad\0value");

        match engine.build_request(&request) {
            Err(TransportError::InvalidRequest { url, .. }) => assert_eq!(url, "http://test.local/a"),
            other => panic!("expected InvalidRequest, got {:?}", other),
        }
    }
}
