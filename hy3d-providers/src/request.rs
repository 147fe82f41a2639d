use serde::{Deserialize, Serialize};

/// A fully-resolved HTTP call, independent of the client library that sends it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    /// JSON text.
    pub body: String,
}

impl std::fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redacted_headers: Vec<(String, String)> = self
            .headers
            .iter()
            .map(|(k, v)| {
                let v = if is_sensitive_header(k) {
                    "[REDACTED]".into()
                } else {
                    v.clone()
                };
                (k.clone(), v)
            })
            .collect();

        // Image submissions embed a data URL; only the size is useful in logs.
        let body_summary = format!("Json(len={})", self.body.len());

        f.debug_struct("HttpRequest")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &redacted_headers)
            .field("body", &body_summary)
            .finish()
    }
}

fn is_sensitive_header(name: &str) -> bool {
    name.eq_ignore_ascii_case("authorization") || name.to_ascii_lowercase().contains("api-key")
}

impl HttpRequest {
    pub fn post_json(url: impl Into<String>, authorization: impl Into<String>, payload: &serde_json::Value) -> Self {
        Self {
            method: "POST".into(),
            url: url.into(),
            headers: vec![
                ("Authorization".into(), authorization.into()),
                ("Content-Type".into(), "application/json".into()),
            ],
            body: payload.to_string(),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn json_body(&self) -> Option<serde_json::Value> {
        serde_json::from_str(&self.body).ok()
    }
}
