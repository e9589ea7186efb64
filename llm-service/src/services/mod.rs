//! Provider clients. Each one owns a preconfigured `reqwest::Client` and
//! speaks its provider's wire format; shared plumbing lives here.

pub mod anthropic_service;
pub mod ollama_service;
pub mod open_ai_service;

use std::time::{Duration, Instant};

use reqwest::header::{self, HeaderMap, HeaderValue};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, error};

use crate::{
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{AiLlmError, HttpError, ProviderError, ProviderErrorKind, make_snippet},
};

/// Checks that `cfg` targets `expected` and has a usable endpoint.
///
/// Returns the endpoint without trailing slash.
pub(crate) fn validate_profile(
    cfg: &LlmModelConfig,
    expected: LlmProvider,
) -> Result<String, AiLlmError> {
    if cfg.provider != expected {
        return Err(ProviderError::new(expected, ProviderErrorKind::InvalidProvider).into());
    }
    let endpoint = cfg.endpoint.trim();
    if endpoint.is_empty() || !(endpoint.starts_with("http://") || endpoint.starts_with("https://"))
    {
        return Err(ProviderError::new(
            expected,
            ProviderErrorKind::InvalidEndpoint(cfg.endpoint.clone()),
        )
        .into());
    }
    Ok(endpoint.trim_end_matches('/').to_string())
}

/// Inserts a header whose value comes from configuration (API keys).
pub(crate) fn secret_header(
    headers: &mut HeaderMap,
    provider: LlmProvider,
    name: header::HeaderName,
    value: &str,
) -> Result<(), AiLlmError> {
    let value = HeaderValue::from_str(value).map_err(|e| {
        ProviderError::new(
            provider,
            ProviderErrorKind::Decode(format!("invalid API key header: {e}")),
        )
    })?;
    headers.insert(name, value);
    Ok(())
}

/// Builds an HTTP client with JSON content type, the given headers and timeout.
pub(crate) fn build_client(
    mut headers: HeaderMap,
    timeout: Duration,
) -> Result<reqwest::Client, AiLlmError> {
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    Ok(reqwest::Client::builder()
        .timeout(timeout)
        .default_headers(headers)
        .build()?)
}

/// POSTs `body` as JSON and decodes a JSON answer.
///
/// Non-2xx statuses become [`ProviderErrorKind::HttpStatus`], undecodable
/// bodies become [`ProviderErrorKind::Decode`], client timeouts become
/// [`AiLlmError::Timeout`].
pub(crate) async fn post_json<B, R>(
    client: &reqwest::Client,
    provider: LlmProvider,
    url: &str,
    body: &B,
    timeout: Duration,
) -> Result<R, AiLlmError>
where
    B: Serialize + ?Sized,
    R: DeserializeOwned,
{
    let started = Instant::now();
    debug!(%provider, %url, "POST");

    let resp = client
        .post(url)
        .json(body)
        .send()
        .await
        .map_err(|e| AiLlmError::from_transport(e, timeout))?;

    if !resp.status().is_success() {
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        let snippet = make_snippet(&text);

        error!(
            %status,
            %url,
            %snippet,
            %provider,
            latency_ms = started.elapsed().as_millis(),
            "provider returned non-success status"
        );

        return Err(ProviderError::new(
            provider,
            ProviderErrorKind::HttpStatus(HttpError {
                status,
                url: url.to_string(),
                snippet,
            }),
        )
        .into());
    }

    match resp.json::<R>().await {
        Ok(v) => {
            debug!(
                %provider,
                %url,
                latency_ms = started.elapsed().as_millis(),
                "provider call completed"
            );
            Ok(v)
        }
        Err(e) if e.is_timeout() => Err(AiLlmError::Timeout(timeout)),
        Err(e) => {
            error!(
                error = %e,
                %provider,
                %url,
                latency_ms = started.elapsed().as_millis(),
                "failed to decode provider response"
            );
            Err(ProviderError::new(provider, ProviderErrorKind::Decode(format!("serde error: {e}"))).into())
        }
    }
}
