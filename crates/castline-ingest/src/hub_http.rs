//! HTTP implementation of [`HubClient`] against a Hub's REST API.
//!
//! Not-found is an expected answer (`Ok(None)` from `cast_by_id`); every
//! other non-success status and transport failure surfaces as an error
//! for the caller to retry.

use std::time::Duration;

use castline_core::id::Fid;
use castline_proto::{
  hub::HubClient,
  wire::{Message, MessagesPage},
};
use reqwest::StatusCode;
use thiserror::Error;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Connection settings for a Hub's HTTP API.
#[derive(Debug, Clone)]
pub struct HubConfig {
  /// Base URL, e.g. `https://hub.example.com` (no trailing slash needed).
  pub base_url:  String,
  /// Request timeout applied to every call.
  pub timeout:   Duration,
  /// Page size requested from paged endpoints.
  pub page_size: u32,
}

impl HubConfig {
  pub fn new(base_url: impl Into<String>) -> Self {
    Self {
      base_url:  base_url.into(),
      timeout:   Duration::from_secs(10),
      page_size: 100,
    }
  }
}

// ─── Error ───────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum HttpHubError {
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),
}

// ─── Client ──────────────────────────────────────────────────────────────────

/// A Hub client over the `/v1` HTTP API.
///
/// Cloning is cheap — the inner `reqwest` client is reference-counted.
#[derive(Clone)]
pub struct HttpHubClient {
  client:    reqwest::Client,
  base_url:  String,
  page_size: u32,
}

impl HttpHubClient {
  pub fn new(config: &HubConfig) -> Result<Self, HttpHubError> {
    let client = reqwest::Client::builder().timeout(config.timeout).build()?;
    Ok(Self {
      client,
      base_url: config.base_url.trim_end_matches('/').to_string(),
      page_size: config.page_size,
    })
  }

  async fn fetch_page(
    &self,
    path: &str,
    fid: Fid,
    page_token: Option<&str>,
  ) -> Result<MessagesPage, HttpHubError> {
    let mut request = self
      .client
      .get(format!("{}{path}", self.base_url))
      .query(&[
        ("fid", fid.to_string()),
        ("pageSize", self.page_size.to_string()),
      ]);
    if let Some(token) = page_token {
      request = request.query(&[("pageToken", token)]);
    }

    Ok(request.send().await?.error_for_status()?.json().await?)
  }
}

impl HubClient for HttpHubClient {
  type Error = HttpHubError;

  async fn cast_by_id(
    &self,
    fid: Fid,
    hash: &str,
  ) -> Result<Option<Message>, HttpHubError> {
    let response = self
      .client
      .get(format!("{}/v1/castById", self.base_url))
      .query(&[("fid", fid.to_string()), ("hash", hash.to_string())])
      .send()
      .await?;

    if response.status() == StatusCode::NOT_FOUND {
      return Ok(None);
    }
    Ok(Some(response.error_for_status()?.json().await?))
  }

  async fn casts_by_fid(
    &self,
    fid: Fid,
    page_token: Option<&str>,
  ) -> Result<MessagesPage, HttpHubError> {
    self.fetch_page("/v1/castsByFid", fid, page_token).await
  }

  async fn reactions_by_fid(
    &self,
    fid: Fid,
    page_token: Option<&str>,
  ) -> Result<MessagesPage, HttpHubError> {
    self.fetch_page("/v1/reactionsByFid", fid, page_token).await
  }

  async fn links_by_fid(
    &self,
    fid: Fid,
    page_token: Option<&str>,
  ) -> Result<MessagesPage, HttpHubError> {
    self.fetch_page("/v1/linksByFid", fid, page_token).await
  }

  async fn verifications_by_fid(
    &self,
    fid: Fid,
    page_token: Option<&str>,
  ) -> Result<MessagesPage, HttpHubError> {
    self.fetch_page("/v1/verificationsByFid", fid, page_token).await
  }

  async fn user_data_by_fid(
    &self,
    fid: Fid,
    page_token: Option<&str>,
  ) -> Result<MessagesPage, HttpHubError> {
    self.fetch_page("/v1/userDataByFid", fid, page_token).await
  }

  async fn username_proofs_by_fid(
    &self,
    fid: Fid,
    page_token: Option<&str>,
  ) -> Result<MessagesPage, HttpHubError> {
    self.fetch_page("/v1/userNameProofsByFid", fid, page_token).await
  }
}
