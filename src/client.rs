use crate::state::{Mode, SystemSnapshot};

/// Thin HTTP client for the master's operator surface. Every call is a
/// single request: no retries, no timeouts beyond transport defaults.
#[derive(Clone)]
pub struct ApiClient {
    base: String,
    http: reqwest::Client,
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("backend returned {0}")]
    Api(reqwest::StatusCode),
}

/// A missed read is a normal outcome, not a failure path.
#[derive(Debug, PartialEq, Eq)]
pub enum GetOutcome {
    Found(String),
    NotFound,
}

impl ApiClient {
    pub fn new(base: &str) -> Self {
        let trimmed = base.trim().trim_end_matches('/');
        let base = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            trimmed.to_string()
        } else {
            format!("http://{}", trimmed)
        };
        Self {
            base,
            http: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    pub async fn status(&self) -> Result<SystemSnapshot, ClientError> {
        let resp = self.http.get(format!("{}/status", self.base)).send().await?;
        if !resp.status().is_success() {
            return Err(ClientError::Api(resp.status()));
        }
        // A malformed payload surfaces as the same logged failure as an
        // unreachable backend.
        Ok(resp.json::<SystemSnapshot>().await?)
    }

    pub async fn switch_mode(&self, mode: Mode) -> Result<(), ClientError> {
        let resp = self
            .http
            .post(format!("{}/config", self.base))
            .json(&serde_json::json!({ "mode": mode.as_str() }))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(ClientError::Api(resp.status()));
        }
        Ok(())
    }

    pub async fn put(&self, key: &str, value: &str) -> Result<String, ClientError> {
        let resp = self
            .http
            .get(format!("{}/put", self.base))
            .query(&[("key", key), ("value", value)])
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(ClientError::Api(resp.status()));
        }
        Ok(resp.text().await?)
    }

    pub async fn get(&self, key: &str) -> Result<GetOutcome, ClientError> {
        let resp = self
            .http
            .get(format!("{}/get", self.base))
            .query(&[("key", key)])
            .send()
            .await?;
        if resp.status().is_success() {
            Ok(GetOutcome::Found(resp.text().await?))
        } else {
            Ok(GetOutcome::NotFound)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::future::IntoFuture;
    use std::sync::{Arc, Mutex};

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(axum::serve(listener, router).into_future());
        format!("http://{}", addr)
    }

    #[test]
    fn test_base_url_normalization() {
        assert_eq!(ApiClient::new("localhost:8080/").base_url(), "http://localhost:8080");
        assert_eq!(
            ApiClient::new("https://ring.example").base_url(),
            "https://ring.example"
        );
    }

    #[tokio::test]
    async fn test_status_round_trip() {
        let router = Router::new().route(
            "/status",
            get(|| async {
                Json(json!({
                    "nodes": ["127.0.0.1:9001"],
                    "mode": "sync",
                    "stats": [{"address": "127.0.0.1:9001", "key_count": 1, "request_rate": 2, "keys": ["k"]}],
                    "config": {"replicas": 20}
                }))
            }),
        );
        let base = serve(router).await;

        let snap = ApiClient::new(&base).status().await.unwrap();
        assert_eq!(snap.nodes, vec!["127.0.0.1:9001"]);
        assert_eq!(snap.stats[0].key_count, 1);
        assert_eq!(snap.config.replicas, 20);
    }

    #[tokio::test]
    async fn test_status_malformed_payload_is_error() {
        let router = Router::new().route("/status", get(|| async { "not json" }));
        let base = serve(router).await;

        assert!(ApiClient::new(&base).status().await.is_err());
    }

    #[tokio::test]
    async fn test_switch_mode_sends_json_body() {
        let seen: Arc<Mutex<Option<Value>>> = Arc::new(Mutex::new(None));
        let seen_handler = seen.clone();
        let router = Router::new().route(
            "/config",
            post(move |Json(body): Json<Value>| {
                let seen = seen_handler.clone();
                async move {
                    *seen.lock().unwrap() = Some(body);
                    StatusCode::OK
                }
            }),
        );
        let base = serve(router).await;

        ApiClient::new(&base).switch_mode(Mode::Async).await.unwrap();
        assert_eq!(*seen.lock().unwrap(), Some(json!({"mode": "async"})));
    }

    #[tokio::test]
    async fn test_put_forwards_query_params() {
        let router = Router::new().route(
            "/put",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                format!("stored {}={}", q["key"], q["value"])
            }),
        );
        let base = serve(router).await;

        let body = ApiClient::new(&base).put("color", "teal").await.unwrap();
        assert_eq!(body, "stored color=teal");
    }

    #[tokio::test]
    async fn test_get_found_returns_value() {
        let router = Router::new().route("/get", get(|| async { "teal" }));
        let base = serve(router).await;

        let outcome = ApiClient::new(&base).get("color").await.unwrap();
        assert_eq!(outcome, GetOutcome::Found("teal".to_string()));
    }

    #[tokio::test]
    async fn test_get_non_200_is_not_found_not_error() {
        let router = Router::new().route(
            "/get",
            get(|| async { (StatusCode::NOT_FOUND, "no such key") }),
        );
        let base = serve(router).await;

        let outcome = ApiClient::new(&base).get("missing").await.unwrap();
        assert_eq!(outcome, GetOutcome::NotFound);
    }
}
