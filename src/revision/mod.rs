//! Revision Client: queries a source host (GitHub) for the latest commit
//! of a branch, and maintains a local working copy via the system `git`.

mod probe;

use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;

use crate::error::{Result, SupervisorError};

pub use probe::reachable;

/// Behavior the Config Loader, Reconciler, and Supervisor loop depend on.
/// A trait so tests can substitute a fake without touching the network.
#[async_trait]
pub trait RevisionApi: Send + Sync {
  async fn latest_commit(
    &self,
    owner: &str,
    repo: &str,
    branch: &str,
  ) -> Result<String>;

  async fn clone(
    &self,
    url: &str,
    branch: &str,
    target_dir: &Path,
  ) -> Result<PathBuf>;
}

pub struct RevisionClient {
  http: reqwest::Client,
  access_token: Option<String>,
}

impl RevisionClient {
  pub fn new(access_token: Option<String>) -> Self {
    Self {
      http: reqwest::Client::builder()
        .user_agent("ros-supervisor")
        .build()
        .expect("failed to build http client"),
      access_token,
    }
  }

  async fn current_head(&self, repo_dir: &Path) -> Option<String> {
    let output = Command::new("git")
      .args(["rev-parse", "HEAD"])
      .current_dir(repo_dir)
      .output()
      .await
      .ok()?;
    if !output.status.success() {
      return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }

  async fn current_branch(&self, repo_dir: &Path) -> Option<String> {
    let output = Command::new("git")
      .args(["rev-parse", "--abbrev-ref", "HEAD"])
      .current_dir(repo_dir)
      .output()
      .await
      .ok()?;
    if !output.status.success() {
      return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }

  async fn remote_head(&self, url: &str, branch: &str) -> Option<String> {
    let output = Command::new("git")
      .args(["ls-remote", url, branch])
      .output()
      .await
      .ok()?;
    if !output.status.success() {
      return None;
    }
    String::from_utf8_lossy(&output.stdout)
      .lines()
      .next()
      .and_then(|line| line.split_whitespace().next())
      .map(str::to_string)
  }

  async fn clone_fresh(
    &self,
    url: &str,
    branch: &str,
    target_dir: &Path,
  ) -> Result<()> {
    let _ = tokio::fs::remove_dir_all(target_dir).await;
    let output = Command::new("git")
      .args([
        "clone",
        url,
        "--branch",
        branch,
        "--single-branch",
        target_dir.to_str().unwrap_or_default(),
      ])
      .output()
      .await
      .map_err(|e| SupervisorError::Network(e.into()))?;
    if !output.status.success() {
      return Err(SupervisorError::Network(anyhow::anyhow!(
        "git clone failed: {}",
        String::from_utf8_lossy(&output.stderr)
      )));
    }
    Ok(())
  }
}

#[derive(Debug, Deserialize)]
struct CommitResponse {
  sha: String,
}

#[async_trait]
impl RevisionApi for RevisionClient {
  async fn latest_commit(
    &self,
    owner: &str,
    repo: &str,
    branch: &str,
  ) -> Result<String> {
    let url = format!(
      "https://api.github.com/repos/{owner}/{repo}/commits/{branch}"
    );
    let mut request = self.http.get(&url);
    if let Some(token) = &self.access_token {
      request = request.bearer_auth(token);
    }
    let response = request
      .send()
      .await
      .map_err(|e| SupervisorError::Network(e.into()))?;

    match response.status().as_u16() {
      200 => {
        let body: CommitResponse = response
          .json()
          .await
          .map_err(|e| SupervisorError::Network(e.into()))?;
        Ok(body.sha)
      }
      401 | 403 => Err(SupervisorError::auth(format!(
        "github rejected credentials for {owner}/{repo}"
      ))),
      404 => Err(SupervisorError::Network(anyhow::anyhow!(
        "unknown repository {owner}/{repo}"
      ))),
      other => Err(SupervisorError::Network(anyhow::anyhow!(
        "unexpected status {other} from github"
      ))),
    }
  }

  async fn clone(
    &self,
    url: &str,
    branch: &str,
    target_dir: &Path,
  ) -> Result<PathBuf> {
    let host_reachable = reachable("github.com").await;

    if !target_dir.exists() {
      if !host_reachable {
        return Err(SupervisorError::Network(anyhow::anyhow!(
          "github.com unreachable and no existing clone at {target_dir:?}"
        )));
      }
      self.clone_fresh(url, branch, target_dir).await?;
      return Ok(target_dir.to_path_buf());
    }

    if !host_reachable {
      tracing::warn!(
        "github.com unreachable; reusing existing clone at {target_dir:?}"
      );
      return Ok(target_dir.to_path_buf());
    }

    let local_head = self.current_head(target_dir).await;
    let local_branch = self.current_branch(target_dir).await;
    let remote_head = self.remote_head(url, branch).await;

    let unchanged = local_branch.as_deref() == Some(branch)
      && local_head.is_some()
      && local_head == remote_head;

    if !unchanged {
      self.clone_fresh(url, branch, target_dir).await?;
    }
    Ok(target_dir.to_path_buf())
  }
}

/// Convenience used by the Config Loader and Reconciler: clone if absent,
/// otherwise ensure the working copy matches the branch head.
pub async fn pull_or_clone(
  client: &dyn RevisionApi,
  url: &str,
  branch: &str,
  root_dir: &Path,
  dir_name: &str,
) -> Result<PathBuf> {
  let target = root_dir.join(dir_name);
  tokio::fs::create_dir_all(root_dir)
    .await
    .context("failed to create revision working directory")
    .map_err(SupervisorError::Network)?;
  client.clone(url, branch, &target).await
}
