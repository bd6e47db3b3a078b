//! PR Submitter (spec.md §4.H). REST client shape mirrors the teacher's
//! `bootstrap::fetch_github_issues`/`fetch_github_issues_blocking`: build a
//! header set once, run the actual HTTP call on a blocking thread, check
//! `status().is_success()`, and deserialize only the fields the caller
//! needs — not the destination service's whole schema.

use serde::{Deserialize, Serialize};

use crate::error::{SyncError, SyncErrorKind, SyncResult};

#[derive(Debug, Clone)]
pub struct PullRequestRequest {
    pub organization: String,
    pub project: String,
    pub repo_id: uuid::Uuid,
    pub source_ref: String,
    pub target_ref: String,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestResult {
    pub id: String,
    pub url: String,
}

#[derive(Serialize)]
struct CreatePullRequestBody {
    #[serde(rename = "sourceRefName")]
    source_ref_name: String,
    #[serde(rename = "targetRefName")]
    target_ref_name: String,
    title: String,
    description: String,
}

#[derive(Deserialize)]
struct CreatePullRequestResponse {
    #[serde(rename = "pullRequestId")]
    pull_request_id: serde_json::Value,
    url: Option<String>,
}

fn endpoint(req: &PullRequestRequest) -> String {
    format!(
        "https://dev.azure.com/{organization}/{project}/_apis/git/repositories/{repo_id}/pullrequests?api-version=7.1",
        organization = req.organization,
        project = req.project,
        repo_id = req.repo_id,
    )
}

fn submit_blocking(req: PullRequestRequest, session_token: String) -> SyncResult<PullRequestResult> {
    use reqwest::blocking::Client;
    use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};

    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(USER_AGENT, HeaderValue::from_static("avm-sync"));
    let basic = base64_basic_auth(&session_token);
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&basic).map_err(|err| {
            SyncError::new(
                SyncErrorKind::PRCreateFailed,
                format!("building authorization header: {err}"),
            )
        })?,
    );

    let client = Client::builder()
        .default_headers(headers)
        .build()
        .map_err(|err| SyncError::new(SyncErrorKind::PRCreateFailed, format!("building http client: {err}")))?;

    let body = CreatePullRequestBody {
        source_ref_name: req.source_ref.clone(),
        target_ref_name: req.target_ref.clone(),
        title: req.title.clone(),
        description: req.description.clone(),
    };

    let response = client
        .post(endpoint(&req))
        .json(&body)
        .send()
        .map_err(|err| SyncError::new(SyncErrorKind::PRCreateFailed, format!("sending request: {err}")))?;

    if !response.status().is_success() {
        return Err(SyncError::new(
            SyncErrorKind::PRCreateFailed,
            format!("pull request API returned {}", response.status()),
        ));
    }

    let parsed: CreatePullRequestResponse = response
        .json()
        .map_err(|err| SyncError::new(SyncErrorKind::PRCreateFailed, format!("parsing response body: {err}")))?;

    Ok(PullRequestResult {
        id: parsed.pull_request_id.to_string(),
        url: parsed.url.unwrap_or_default(),
    })
}

fn base64_basic_auth(session_token: &str) -> String {
    use base64::Engine;
    let raw = format!(":{session_token}");
    format!("Basic {}", base64::engine::general_purpose::STANDARD.encode(raw))
}

/// Submit a pull request on a blocking thread, per spec.md §4.H. Any
/// non-success response maps to `PRCreateFailed`; there is no retry here —
/// the Orchestrator decides whether a rerun is warranted.
pub async fn submit_pull_request(
    req: PullRequestRequest,
    session_token: String,
) -> SyncResult<PullRequestResult> {
    tokio::task::spawn_blocking(move || submit_blocking(req, session_token))
        .await
        .map_err(|err| SyncError::new(SyncErrorKind::PRCreateFailed, format!("submitter task panicked: {err}")))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_embeds_repo_coordinates() {
        let req = PullRequestRequest {
            organization: "contoso".to_string(),
            project: "platform".to_string(),
            repo_id: uuid::Uuid::nil(),
            source_ref: "refs/heads/feat/avm-module-sync/rvm-res-azurerm-storage-account".to_string(),
            target_ref: "refs/heads/main".to_string(),
            title: "feat(module): Synced AVM module rvm-res-azurerm-storage-account".to_string(),
            description: "Synced from https://example.invalid/avm-res-storage-account".to_string(),
        };
        let url = endpoint(&req);
        assert!(url.contains("contoso"));
        assert!(url.contains("platform"));
        assert!(url.contains(&uuid::Uuid::nil().to_string()));
    }

    #[test]
    fn basic_auth_header_encodes_empty_username() {
        let header = base64_basic_auth("sometoken");
        assert!(header.starts_with("Basic "));
    }
}
