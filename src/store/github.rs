//! GitHub-hosted document store.
//!
//! The roster lives as one JSON file in a repository: reads go through the
//! raw content endpoint, writes through the contents API, which only accepts
//! a new blob when the presented file SHA matches the current one. That SHA
//! check is the entire concurrency story; there is no lock between reading
//! the token and submitting the write.
use std::time::Duration;

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{RevisionToken, StoreError};
use crate::model::Document;

/// Host configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubConfig {
    /// Repository owner
    pub owner: String,

    /// Repository name
    pub repo: String,

    /// Branch holding the document
    pub branch: String,

    /// Path of the document file inside the repository
    pub file_path: String,

    /// Token with contents write access
    pub token: String,

    /// Override for the API endpoint (tests point this at a local host)
    pub api_base: Option<String>,

    /// Override for the raw content endpoint
    pub raw_base: Option<String>,
}

impl GithubConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let owner = std::env::var("GITHUB_OWNER").context("GITHUB_OWNER not set in .env")?;
        let repo = std::env::var("GITHUB_REPO").context("GITHUB_REPO not set in .env")?;
        let branch = std::env::var("GITHUB_BRANCH").unwrap_or_else(|_| "main".to_string());
        let file_path =
            std::env::var("GITHUB_FILE_PATH").unwrap_or_else(|_| "roster.json".to_string());
        let token = std::env::var("GITHUB_TOKEN").context("GITHUB_TOKEN not set in .env")?;

        Ok(Self {
            owner,
            repo,
            branch,
            file_path,
            token,
            api_base: None,
            raw_base: None,
        })
    }

    /// Contents-API URL for the document file
    pub fn contents_url(&self) -> String {
        let base = self.api_base.as_deref().unwrap_or("https://api.github.com");
        format!(
            "{}/repos/{}/{}/contents/{}",
            base, self.owner, self.repo, self.file_path
        )
    }

    /// Raw read URL for the document file
    pub fn raw_url(&self) -> String {
        let base = self
            .raw_base
            .as_deref()
            .unwrap_or("https://raw.githubusercontent.com");
        format!(
            "{}/{}/{}/{}/{}",
            base, self.owner, self.repo, self.branch, self.file_path
        )
    }
}

/// Stateless client for the hosted document; every call is a network call.
pub struct GithubStore {
    config: GithubConfig,
    client: Client,
}

impl GithubStore {
    /// Create a new store client
    pub fn new(config: GithubConfig) -> Result<Self> {
        // GitHub rejects requests without a User-Agent.
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("roster/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { config, client })
    }

    /// Fetch the current document from the raw read path.
    pub async fn read(&self) -> Result<Document, StoreError> {
        let response = self
            .client
            .get(self.config.raw_url())
            .send()
            .await
            .map_err(|e| StoreError::Fetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(StoreError::Fetch(format!(
                "{} returned {}",
                self.config.raw_url(),
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| StoreError::Fetch(e.to_string()))?;

        Ok(serde_json::from_str(&body)?)
    }

    /// Fetch the authoritative revision token for the document file.
    pub async fn current_revision(&self) -> Result<RevisionToken, StoreError> {
        let response = self
            .client
            .get(self.config.contents_url())
            .query(&[("ref", self.config.branch.as_str())])
            .header(header::AUTHORIZATION, self.auth_header())
            .header(header::ACCEPT, "application/vnd.github+json")
            .send()
            .await
            .map_err(|e| StoreError::Metadata(e.to_string()))?;

        if !response.status().is_success() {
            return Err(StoreError::Metadata(format!(
                "metadata request returned {}",
                response.status()
            )));
        }

        let meta: serde_json::Value = response
            .json()
            .await
            .map_err(|e| StoreError::Metadata(e.to_string()))?;

        match meta.get("sha").and_then(|sha| sha.as_str()) {
            Some(sha) => Ok(RevisionToken::new(sha)),
            None => Err(StoreError::Metadata(
                "metadata response carries no file sha".to_string(),
            )),
        }
    }

    /// Submit a new document guarded by the current revision token.
    ///
    /// The token is re-fetched here, immediately before the submit, never
    /// reused from an earlier `read()`. Writers can still race between the
    /// two steps; the host's sha check at submit time resolves that race and
    /// surfaces the loss as [`StoreError::Conflict`].
    pub async fn write(
        &self,
        document: &Document,
        message: &str,
    ) -> Result<RevisionToken, StoreError> {
        let revision = self.current_revision().await?;
        self.write_at(document, &revision, message).await
    }

    /// Submit a new document guarded by an explicit revision token.
    pub async fn write_at(
        &self,
        document: &Document,
        revision: &RevisionToken,
        message: &str,
    ) -> Result<RevisionToken, StoreError> {
        let content = serde_json::to_string_pretty(document)?;
        let body = json!({
            "message": message,
            "content": BASE64.encode(content),
            "sha": revision.as_str(),
            "branch": self.config.branch,
        });

        let response = self
            .client
            .put(self.config.contents_url())
            .header(header::AUTHORIZATION, self.auth_header())
            .header(header::ACCEPT, "application/vnd.github+json")
            .json(&body)
            .send()
            .await
            .map_err(|e| StoreError::Write(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::CONFLICT {
            let detail = response.text().await.unwrap_or_default();
            return Err(StoreError::Conflict {
                revision: revision.clone(),
                detail,
            });
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(StoreError::Write(format!("{status} - {detail}")));
        }

        let reply: serde_json::Value = response
            .json()
            .await
            .map_err(|e| StoreError::Write(e.to_string()))?;

        match reply.pointer("/content/sha").and_then(|sha| sha.as_str()) {
            Some(sha) => Ok(RevisionToken::new(sha)),
            None => Err(StoreError::Write(
                "write response carries no content sha".to_string(),
            )),
        }
    }

    fn auth_header(&self) -> String {
        format!("Bearer {}", self.config.token)
    }
}
