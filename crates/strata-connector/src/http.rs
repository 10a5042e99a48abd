//! Outbound HTTP with the dispatch error policy baked in.

use reqwest::header::{CACHE_CONTROL, CONTENT_TYPE};
use reqwest::Client;
use serde_json::Value;
use tracing::{info, warn};

/// POSTs a JSON body and swallows every failure.
///
/// Non-2xx responses and transport errors (timeout, refused connection,
/// unresolvable URL) are logged at warn; the caller treats the dispatch as
/// completed either way.
pub async fn post_json(client: &Client, url: &str, body: &Value) {
    let result = client
        .post(url)
        .header(CACHE_CONTROL, "no-cache")
        .header(CONTENT_TYPE, "application/json")
        .json(body)
        .send()
        .await;

    match result {
        Ok(response) if response.status().is_success() => {
            info!(status = %response.status(), url, "Dispatch delivered");
        }
        Ok(response) => {
            warn!(status = %response.status(), url, "REQ UNAVAILABLE");
        }
        Err(e) => {
            warn!(url, error = %e, "UNAVAILABLE: transport error");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_post_json_sends_headers_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/trigger/spark"))
            .and(header("Cache-Control", "no-cache"))
            .and(header("Content-Type", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
            .expect(1)
            .mount(&server)
            .await;

        let client = Client::new();
        let url = format!("{}/trigger/spark", server.uri());
        post_json(&client, &url, &json!({ "job_id": "job-1" })).await;
    }

    #[tokio::test]
    async fn test_post_json_swallows_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = Client::new();
        post_json(&client, &server.uri(), &json!({})).await;
    }

    #[tokio::test]
    async fn test_post_json_swallows_transport_errors() {
        let client = Client::new();
        // Nothing listens here; the error is logged, not raised.
        post_json(&client, "http://127.0.0.1:1/trigger", &json!({})).await;
    }
}
