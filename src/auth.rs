// Authentication strategies for seedprobe
// Applied by the reqwest transport to every outgoing request

pub trait AuthStrategy: Send + Sync {
    fn apply_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder;
}

pub struct StaticTokenAuth {
    pub token: String,
}

impl AuthStrategy for StaticTokenAuth {
    fn apply_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.bearer_auth(&self.token)
    }
}

/// Key sent in a fixed header, e.g. `X-Api-Key`
pub struct ApiKeyAuth {
    pub header: String,
    pub key: String,
}

impl AuthStrategy for ApiKeyAuth {
    fn apply_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header(self.header.as_str(), self.key.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategies_set_their_headers() {
        let client = reqwest::Client::new();

        let req = StaticTokenAuth { token: "abc".to_string() }
            .apply_auth(client.get("http://test.local/"))
            .build()
            .unwrap();
        assert_eq!(req.headers()["authorization"], "Bearer abc");

        let req = ApiKeyAuth {
            header: "X-Api-Key".to_string(),
            key: "k1".to_string(),
        }
        .apply_auth(client.get("http://test.local/"))
        .build()
        .unwrap();
        assert_eq!(req.headers()["x-api-key"], "k1");
    }
}
