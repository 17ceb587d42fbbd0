//! Transport-specific [`ApiCaller`] implementations for OneBot v11.
//!
//! | Transport | Caller | Strategy |
//! |-----------|--------|---------|
//! | WebSocket | [`WsApiCaller`] | Echo matching: the request carries `echo.seq`, the response is routed back through the [`ResultStore`]. |
//! | HTTP | [`HttpApiCaller`] | POST to `{api_root}/{action}`; the HTTP response body is the API response. |
//!
//! Callers return the raw response envelope. [`handle_api_result`] turns an
//! envelope into the action's data.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::result_store::ResultStore;
use cinder_core::{ApiError, ApiResult};

// =============================================================================
// ApiCaller trait
// =============================================================================

/// How a bot's API calls reach the OneBot implementation.
#[async_trait]
pub trait ApiCaller: Send + Sync {
    /// Sends one action and returns the response envelope.
    async fn call(&self, action: &str, params: Value) -> ApiResult<Value>;

    /// Short transport name for logs.
    fn transport(&self) -> &'static str;
}

/// Unwraps a response envelope.
///
/// `status: "failed"` becomes [`ApiError::ActionFailed`]; otherwise the
/// `data` field is returned, or null when it is absent or the envelope is not
/// an object.
pub fn handle_api_result(result: Value) -> ApiResult<Value> {
    let Value::Object(mut envelope) = result else {
        return Ok(Value::Null);
    };
    if envelope.get("status").and_then(Value::as_str) == Some("failed") {
        return Err(ApiError::ActionFailed {
            retcode: envelope.get("retcode").and_then(Value::as_i64),
        });
    }
    Ok(envelope.remove("data").unwrap_or(Value::Null))
}

// =============================================================================
// WsApiCaller
// =============================================================================

/// [`ApiCaller`] for a WebSocket connection.
///
/// Each call:
/// 1. Allocates a sequence number and registers it with the shared store.
/// 2. Sends `{"action", "params", "echo": {"seq"}}` as text on the
///    connection's outbound channel.
/// 3. Waits for the store to deliver the matching response.
pub struct WsApiCaller {
    outbound: mpsc::Sender<String>,
    store: Arc<ResultStore>,
    api_timeout: Duration,
}

impl WsApiCaller {
    pub fn new(
        outbound: mpsc::Sender<String>,
        store: Arc<ResultStore>,
        api_timeout: Duration,
    ) -> Self {
        Self {
            outbound,
            store,
            api_timeout,
        }
    }
}

#[async_trait]
impl ApiCaller for WsApiCaller {
    async fn call(&self, action: &str, params: Value) -> ApiResult<Value> {
        let seq = self.store.next_seq();
        let pending = self.store.register(seq);

        let request = json!({
            "action": action,
            "params": params,
            "echo": {"seq": seq},
        });
        debug!(action = %action, seq, "Calling OneBot API via WebSocket");
        trace!(request = %request, "API request");

        self.outbound
            .send(serde_json::to_string(&request)?)
            .await
            .map_err(|_| ApiError::Network("WebSocket connection closed".to_string()))?;

        pending.wait(self.api_timeout).await
    }

    fn transport(&self) -> &'static str {
        "websocket"
    }
}

// =============================================================================
// HttpApiCaller
// =============================================================================

/// [`ApiCaller`] for the HTTP API.
///
/// A bot without a configured API root cannot make calls; every call then
/// fails with [`ApiError::ApiNotAvailable`] before anything is sent.
pub struct HttpApiCaller {
    client: Client,
    api_root: Option<String>,
    access_token: Option<String>,
    api_timeout: Duration,
}

impl HttpApiCaller {
    pub fn new(
        client: Client,
        api_root: Option<String>,
        access_token: Option<String>,
        api_timeout: Duration,
    ) -> Self {
        Self {
            client,
            api_root,
            access_token,
            api_timeout,
        }
    }

    fn endpoint(&self, action: &str) -> ApiResult<Url> {
        let root = self.api_root.as_deref().ok_or(ApiError::ApiNotAvailable)?;
        let url = if root.ends_with('/') {
            format!("{root}{action}")
        } else {
            format!("{root}/{action}")
        };
        Url::parse(&url).map_err(|_| ApiError::Network("API root url invalid".to_string()))
    }
}

#[async_trait]
impl ApiCaller for HttpApiCaller {
    async fn call(&self, action: &str, params: Value) -> ApiResult<Value> {
        let url = self.endpoint(action)?;
        debug!(action = %action, url = %url, "Calling OneBot API via HTTP");

        let mut request = self
            .client
            .post(url)
            .json(&params)
            .timeout(self.api_timeout);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Network(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Network(format!(
                "HTTP request received unexpected status code: {}",
                status.as_u16()
            )));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| ApiError::Network(format!("HTTP response is not JSON: {e}")))
    }

    fn transport(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http_caller(api_root: Option<String>, token: Option<&str>) -> HttpApiCaller {
        HttpApiCaller::new(
            Client::new(),
            api_root,
            token.map(str::to_string),
            Duration::from_secs(5),
        )
    }

    #[test]
    fn test_handle_api_result() {
        assert_eq!(
            handle_api_result(json!({"status": "ok", "retcode": 0, "data": {"a": 1}})).unwrap(),
            json!({"a": 1})
        );
        assert_eq!(
            handle_api_result(json!({"status": "ok", "retcode": 0})).unwrap(),
            Value::Null
        );
        assert_eq!(handle_api_result(json!("odd")).unwrap(), Value::Null);
        assert_eq!(
            handle_api_result(json!({"status": "failed", "retcode": 100})).unwrap_err(),
            ApiError::ActionFailed { retcode: Some(100) }
        );
    }

    #[tokio::test]
    async fn test_ws_call_sends_envelope() {
        let store = Arc::new(ResultStore::new());
        let (tx, mut rx) = mpsc::channel(4);
        let caller = WsApiCaller::new(tx, Arc::clone(&store), Duration::from_secs(5));

        let responder = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                let sent: Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
                assert_eq!(sent["action"], "get_status");
                assert_eq!(sent["params"], json!({"x": 1}));
                let seq = sent["echo"]["seq"].clone();
                assert!(store.resolve(&json!({
                    "status": "ok", "retcode": 0, "data": {"online": true}, "echo": {"seq": seq}
                })));
            })
        };

        let envelope = caller.call("get_status", json!({"x": 1})).await.unwrap();
        responder.await.unwrap();
        assert_eq!(envelope["data"]["online"], true);
        assert_eq!(store.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_ws_call_on_closed_connection() {
        let store = Arc::new(ResultStore::new());
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let caller = WsApiCaller::new(tx, Arc::clone(&store), Duration::from_secs(5));

        let err = caller.call("get_status", json!({})).await.unwrap_err();
        assert!(err.is_network());
        assert_eq!(store.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_http_call_posts_params() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/send_msg")
            .match_header("authorization", "Bearer secret")
            .match_body(mockito::Matcher::Json(json!({"message": "hi"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"status":"ok","retcode":0,"data":{"message_id":3}}"#)
            .create_async()
            .await;

        let caller = http_caller(Some(server.url()), Some("secret"));
        let envelope = caller.call("send_msg", json!({"message": "hi"})).await.unwrap();

        mock.assert_async().await;
        assert_eq!(envelope["data"]["message_id"], 3);
    }

    #[tokio::test]
    async fn test_http_error_status_is_network_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/get_status")
            .with_status(502)
            .create_async()
            .await;

        let caller = http_caller(Some(format!("{}/", server.url())), None);
        let err = caller.call("get_status", json!({})).await.unwrap_err();
        assert!(err.is_network());
    }

    #[tokio::test]
    async fn test_http_without_api_root() {
        let caller = http_caller(None, None);
        let err = caller.call("get_status", json!({})).await.unwrap_err();
        assert_eq!(err, ApiError::ApiNotAvailable);
    }

    #[tokio::test]
    async fn test_http_invalid_api_root() {
        let caller = http_caller(Some("not a url".to_string()), None);
        let err = caller.call("get_status", json!({})).await.unwrap_err();
        assert!(err.is_network());
    }
}
