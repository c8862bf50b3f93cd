//! Namespace API client
//!
//! Creates and deletes namespaces through the GraphQL endpoint at `{url}/graphql`.
//! Each call is a single request with no retry.

use crate::error::{CloudError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

const CREATE_NAMESPACE: &str = "mutation CreateSpace($name: String!) { createSpace(name: $name) { id } }";
const DELETE_NAMESPACE: &str = "mutation DeleteSpace($id: String!) { deleteSpace(id: $id) { id } }";

/// Maximum length of a namespace name (DNS label)
const MAX_NAME_LEN: usize = 63;

/// Namespace API client
pub struct CloudClient {
    client: reqwest::Client,
    url: String,
    token: String,
}

impl CloudClient {
    /// Create a client for the API at `url` authenticated with `token`
    pub fn new(url: &str, token: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/graphql", self.url)
    }

    /// Create a namespace and return its id
    pub async fn create_namespace(&self, name: &str) -> Result<String> {
        validate_namespace_name(name)?;

        tracing::info!("Creating namespace: {}", name);
        let data: CreateData = self
            .mutate(CREATE_NAMESPACE, serde_json::json!({ "name": name }))
            .await?;

        Ok(data.create_space.id)
    }

    /// Delete a namespace
    pub async fn delete_namespace(&self, id: &str) -> Result<()> {
        validate_namespace_name(id)?;

        tracing::info!("Deleting namespace: {}", id);
        let _: DeleteData = self
            .mutate(DELETE_NAMESPACE, serde_json::json!({ "id": id }))
            .await?;

        Ok(())
    }

    async fn mutate<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T> {
        let request_body = GraphqlRequest { query, variables };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.token)
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(CloudError::Unauthorized);
        }

        let body = response.text().await?;
        if !status.is_success() {
            return Err(CloudError::Http {
                status: status.as_u16(),
                body,
            });
        }

        parse_response(&body)
    }
}

/// Check a namespace name against DNS label rules
///
/// Lowercase alphanumerics and `-`, starting and ending with an alphanumeric.
pub fn validate_namespace_name(name: &str) -> Result<()> {
    let invalid = |reason: &str| CloudError::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(invalid("name is empty"));
    }

    if name.len() > MAX_NAME_LEN {
        return Err(invalid("name is longer than 63 characters"));
    }

    if let Some(c) = name
        .chars()
        .find(|c| !c.is_ascii_lowercase() && !c.is_ascii_digit() && *c != '-')
    {
        return Err(invalid(&format!("invalid character '{}'", c)));
    }

    if name.starts_with('-') || name.ends_with('-') {
        return Err(invalid("name must start and end with an alphanumeric character"));
    }

    Ok(())
}

/// Decode a GraphQL response body, surfacing the first error message
fn parse_response<T: DeserializeOwned>(body: &str) -> Result<T> {
    let response: GraphqlResponse<T> = serde_json::from_str(body)?;

    if let Some(error) = response.errors.first() {
        return Err(CloudError::Api(error.message.clone()));
    }

    response.data.ok_or(CloudError::EmptyResponse)
}

// ============ API Types ============

#[derive(Debug, Serialize)]
struct GraphqlRequest<'a> {
    query: &'a str,
    variables: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct GraphqlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Debug, Deserialize)]
struct GraphqlError {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateData {
    create_space: Namespace,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeleteData {
    #[allow(dead_code)]
    delete_space: Namespace,
}

#[derive(Debug, Deserialize)]
struct Namespace {
    id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn test_validate_namespace_name() {
        assert!(validate_namespace_name("my-space").is_ok());
        assert!(validate_namespace_name("a1").is_ok());

        assert!(validate_namespace_name("").is_err());
        assert!(validate_namespace_name("My-Space").is_err());
        assert!(validate_namespace_name("-space").is_err());
        assert!(validate_namespace_name("space-").is_err());
        assert!(validate_namespace_name("space\"){ id }").is_err());
        assert!(validate_namespace_name(&"a".repeat(64)).is_err());
    }

    #[test]
    fn test_parse_create_response() {
        let data: CreateData =
            parse_response(r#"{"data": {"createSpace": {"id": "my-space"}}}"#).unwrap();
        assert_eq!(data.create_space.id, "my-space");
    }

    #[test]
    fn test_parse_graphql_error() {
        let result: Result<CreateData> = parse_response(
            r#"{"data": null, "errors": [{"message": "namespace already exists"}]}"#,
        );
        assert!(matches!(result, Err(CloudError::Api(ref msg)) if msg == "namespace already exists"));
    }

    #[test]
    fn test_parse_empty_data() {
        let result: Result<DeleteData> = parse_response(r#"{"data": null}"#);
        assert!(matches!(result, Err(CloudError::EmptyResponse)));
    }

    /// Serve a single canned HTTP response and hand back the raw request
    async fn serve_once(status: &'static str, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];

            // read headers plus Content-Length bytes of body
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request).to_string();
                if let Some(header_end) = text.find("\r\n\r\n") {
                    let content_length = text[..header_end]
                        .lines()
                        .find_map(|line| {
                            let (name, value) = line.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if request.len() >= header_end + 4 + content_length {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();

            String::from_utf8_lossy(&request).to_string()
        });

        (url, handle)
    }

    #[tokio::test]
    async fn test_create_namespace_request() {
        let (url, server) =
            serve_once("200 OK", r#"{"data": {"createSpace": {"id": "my-space"}}}"#).await;

        let client = CloudClient::new(&url, "tok123");
        let id = client.create_namespace("my-space").await.unwrap();
        assert_eq!(id, "my-space");

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /graphql "));
        assert!(request.to_lowercase().contains("authorization: bearer tok123"));
        assert!(request.contains("createSpace"));
        assert!(request.contains(r#""name":"my-space""#));
    }

    #[tokio::test]
    async fn test_delete_namespace_request() {
        let (url, server) =
            serve_once("200 OK", r#"{"data": {"deleteSpace": {"id": "my-space"}}}"#).await;

        let client = CloudClient::new(&format!("{}/", url), "tok123");
        client.delete_namespace("my-space").await.unwrap();

        let request = server.await.unwrap();
        assert!(request.contains("deleteSpace"));
        assert!(request.contains(r#""id":"my-space""#));
    }

    #[tokio::test]
    async fn test_unauthorized() {
        let (url, _server) = serve_once("401 Unauthorized", "{}").await;

        let client = CloudClient::new(&url, "expired");
        let result = client.create_namespace("my-space").await;
        assert!(matches!(result, Err(CloudError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_invalid_name_is_rejected_before_request() {
        // nothing listens on this port
        let client = CloudClient::new("http://127.0.0.1:9", "tok123");
        let result = client.delete_namespace("Bad Name").await;
        assert!(matches!(result, Err(CloudError::InvalidName { .. })));
    }
}
