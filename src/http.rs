//! HTTP helpers
//!
//! Run `reqwest` requests under a retry policy. A fresh `RequestBuilder` is
//! built for every attempt, and error statuses are turned into errors so that
//! status classification applies to them.

use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::RequestError;
use crate::policy::RetryPolicy;

/// Send a request with retry, returning the first successful response.
///
/// Responses with a 4xx/5xx status become `reqwest::Error`s carrying that
/// status; transport failures carry none.
pub async fn send_with_retry<F>(
    policy: &RetryPolicy<reqwest::Error>,
    make_request: F,
) -> Result<Response, reqwest::Error>
where
    F: Fn() -> RequestBuilder,
{
    policy
        .execute(|| {
            let request = make_request();
            async move { request.send().await?.error_for_status() }
        })
        .await
}

/// Send a request with retry and decode the JSON body of the successful response.
///
/// Body decoding happens once, after the retry loop, and is not retried.
pub async fn fetch_json<T, F>(
    policy: &RetryPolicy<RequestError>,
    make_request: F,
) -> Result<T, RequestError>
where
    T: DeserializeOwned,
    F: Fn() -> RequestBuilder,
{
    let response = policy
        .execute(|| {
            let request = make_request();
            async move {
                let response = request.send().await?;
                let status = response.status();
                if status.is_client_error() || status.is_server_error() {
                    let body = match response.text().await {
                        Ok(body) => body,
                        Err(e) => {
                            debug!(
                                status = status.as_u16(),
                                error = %e,
                                "failed to read error response body"
                            );
                            String::new()
                        }
                    };
                    return Err(RequestError::api(status.as_u16(), error_message(status, body)));
                }
                Ok(response)
            }
        })
        .await?;

    debug!(status = response.status().as_u16(), "decoding response body");
    response
        .json::<T>()
        .await
        .map_err(|e| RequestError::Other(format!("failed to decode response: {e}")))
}

fn error_message(status: reqwest::StatusCode, body: String) -> String {
    if body.trim().is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        body
    }
}
