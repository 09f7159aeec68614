//! GET/POST with JSON bodies.

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{HttpError, Result};

/// A reusable client for JSON requests.
#[derive(Clone, Debug, Default)]
pub struct JsonClient {
    client: reqwest::Client,
}

impl JsonClient {
    /// Wrap an existing `reqwest` client (for custom timeouts or TLS).
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// GET `url` and decode the 200 response body as `T`.
    #[tracing::instrument(skip(self))]
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let resp = self.client.get(url).send().await?;
        decode(resp).await
    }

    /// POST `body` as JSON to `url` and decode the 200 response body as `T`.
    #[tracing::instrument(skip(self, body))]
    pub async fn post_json<B, T>(&self, url: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let resp = self.send_post(url, body).await?;
        decode(resp).await
    }

    /// POST `body` as JSON to `url`, ignoring the 200 response body.
    #[tracing::instrument(skip(self, body))]
    pub async fn post<B: Serialize + ?Sized>(&self, url: &str, body: &B) -> Result<()> {
        let _ = self.send_post(url, body).await?;
        Ok(())
    }

    async fn send_post<B: Serialize + ?Sized>(&self, url: &str, body: &B) -> Result<reqwest::Response> {
        let payload = serde_json::to_vec(body)?;
        let resp = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .await?;
        check_status(resp).await
    }
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status().as_u16();
    if status != 200 {
        let body = resp.text().await.unwrap_or_default();
        debug!(status, "non-200 response");
        return Err(HttpError::Status { status, body });
    }
    Ok(resp)
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    let resp = check_status(resp).await?;
    let bytes = resp.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// GET `url` with a fresh client and decode the response as `T`.
pub async fn get_json<T: DeserializeOwned>(url: &str) -> Result<T> {
    JsonClient::default().get_json(url).await
}

/// POST `body` with a fresh client and decode the response as `T`.
pub async fn post_json<B, T>(url: &str, body: &B) -> Result<T>
where
    B: Serialize + ?Sized,
    T: DeserializeOwned,
{
    JsonClient::default().post_json(url, body).await
}

/// POST `body` with a fresh client, discarding the response body.
pub async fn post<B: Serialize + ?Sized>(url: &str, body: &B) -> Result<()> {
    JsonClient::default().post(url, body).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde::Deserialize;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Debug, PartialEq, Deserialize)]
    struct Node {
        id: String,
        port: u16,
    }

    #[tokio::test]
    async fn get_json_decodes_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/node"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "n1", "port": 7890})))
            .mount(&server)
            .await;

        let node: Node = get_json(&format!("{}/node", server.uri())).await.unwrap();
        assert_eq!(
            node,
            Node {
                id: "n1".into(),
                port: 7890
            }
        );
    }

    #[tokio::test]
    async fn get_json_rejects_non_200() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("no such node"))
            .mount(&server)
            .await;

        let err = get_json::<Node>(&server.uri()).await.unwrap_err();
        assert_matches!(err, HttpError::Status { status: 404, ref body } if body == "no such node");
    }

    #[tokio::test]
    async fn other_2xx_is_still_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;

        let err = post(&server.uri(), &json!({})).await.unwrap_err();
        assert_matches!(err, HttpError::Status { status: 201, .. });
    }

    #[tokio::test]
    async fn post_json_sends_body_and_decodes_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/register"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({"name": "edge"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "n2", "port": 1})))
            .expect(1)
            .mount(&server)
            .await;

        let node: Node = post_json(&format!("{}/register", server.uri()), &json!({"name": "edge"}))
            .await
            .unwrap();
        assert_eq!(node.id, "n2");
    }

    #[tokio::test]
    async fn post_ignores_response_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        post(&server.uri(), &json!({"ok": true})).await.unwrap();
    }

    #[tokio::test]
    async fn malformed_body_is_json_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{"))
            .mount(&server)
            .await;

        let err = JsonClient::default()
            .get_json::<Node>(&server.uri())
            .await
            .unwrap_err();
        assert_matches!(err, HttpError::Json(_));
    }

    #[tokio::test]
    async fn unreachable_host_is_request_error() {
        let err = get_json::<Node>("http://127.0.0.1:1/").await.unwrap_err();
        assert_matches!(err, HttpError::Request(_));
    }
}
