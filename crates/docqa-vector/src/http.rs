//! Shared helpers for HTTP collaborators

use docqa_core::{Collaborator, DocqaError, Result};
use reqwest::{Client, Response};
use std::time::Duration;

/// Build an HTTP client with a request timeout
pub fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| DocqaError::ConfigError(format!("Failed to build HTTP client: {e}")))
}

/// Map a transport failure to the error taxonomy
pub fn request_error(
    collaborator: Collaborator,
    timeout: Duration,
    e: reqwest::Error,
) -> DocqaError {
    if e.is_timeout() {
        DocqaError::Timeout {
            collaborator,
            timeout,
        }
    } else {
        DocqaError::unavailable(collaborator, format!("Request failed: {e}"))
    }
}

/// Turn a non-2xx response into an error, keeping the body for diagnostics
pub async fn check_status(collaborator: Collaborator, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(DocqaError::HttpStatus {
        collaborator,
        status: status.as_u16(),
        body,
    })
}

/// Read the whole body as text
pub async fn read_body(collaborator: Collaborator, response: Response) -> Result<String> {
    response
        .text()
        .await
        .map_err(|e| DocqaError::unavailable(collaborator, format!("Failed to read body: {e}")))
}
