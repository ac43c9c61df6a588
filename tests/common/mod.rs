//! Fakes shared by the integration suites: a `RuntimeApi` and a
//! `RevisionApi` that never touch a real daemon or network.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use ros_supervisor::error::Result;
use ros_supervisor::revision::RevisionApi;
use ros_supervisor::runtime::{
  BuildOptions, ContainerInfo, ContainerSpec, ImageInfo, NetworkInfo,
  NetworkSpec, RuntimeApi,
};

#[derive(Default)]
pub struct FakeRuntime {
  pub containers: Mutex<Vec<ContainerInfo>>,
  pub images: Mutex<Vec<ImageInfo>>,
  pub networks: Mutex<Vec<NetworkInfo>>,
  pub next_id: Mutex<u64>,
}

impl FakeRuntime {
  pub fn new() -> Self {
    Self::default()
  }

  fn fresh_id(&self, prefix: &str) -> String {
    let mut counter = self.next_id.lock().unwrap();
    *counter += 1;
    format!("{prefix}{counter}")
  }
}

#[async_trait]
impl RuntimeApi for FakeRuntime {
  async fn list_containers(&self) -> Result<Vec<ContainerInfo>> {
    Ok(self.containers.lock().unwrap().clone())
  }

  async fn create_container(&self, spec: &ContainerSpec) -> Result<String> {
    let id = self.fresh_id("container-");
    self.containers.lock().unwrap().push(ContainerInfo {
      id: id.clone(),
      name: spec.name.clone(),
      image: spec.image.clone(),
      running: false,
    });
    Ok(id)
  }

  async fn start_container(&self, id: &str) -> Result<()> {
    let mut containers = self.containers.lock().unwrap();
    if let Some(c) = containers.iter_mut().find(|c| c.id == id) {
      c.running = true;
    }
    Ok(())
  }

  async fn stop_container(&self, id: &str) -> Result<()> {
    let mut containers = self.containers.lock().unwrap();
    if let Some(c) = containers.iter_mut().find(|c| c.id == id) {
      c.running = false;
    }
    Ok(())
  }

  async fn remove_container(&self, id: &str) -> Result<()> {
    self.containers.lock().unwrap().retain(|c| c.id != id);
    Ok(())
  }

  async fn list_images(&self) -> Result<Vec<ImageInfo>> {
    Ok(self.images.lock().unwrap().clone())
  }

  async fn build_image(
    &self,
    _context_dir: &Path,
    options: BuildOptions,
  ) -> Result<String> {
    let id = self.fresh_id("sha256:fakeimage");
    self.images.lock().unwrap().push(ImageInfo {
      id: id.clone(),
      repo_tags: options.tags,
    });
    Ok(id)
  }

  async fn inspect_network(&self, name: &str) -> Result<Option<NetworkInfo>> {
    Ok(self.networks.lock().unwrap().iter().find(|n| n.name == name).cloned())
  }

  async fn create_network(&self, spec: &NetworkSpec) -> Result<String> {
    let id = self.fresh_id("network-");
    self
      .networks
      .lock()
      .unwrap()
      .push(NetworkInfo { id: id.clone(), name: spec.name.clone() });
    Ok(id)
  }

  async fn remove_network(&self, id: &str) -> Result<()> {
    self.networks.lock().unwrap().retain(|n| n.id != id);
    Ok(())
  }

  async fn list_networks(&self) -> Result<Vec<NetworkInfo>> {
    Ok(self.networks.lock().unwrap().clone())
  }
}

#[derive(Default)]
pub struct FakeRevision {
  /// keyed by `owner/repo/branch`
  pub upstream: Mutex<HashMap<String, String>>,
  pub clones: Mutex<Vec<PathBuf>>,
}

impl FakeRevision {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn set_latest(&self, owner: &str, repo: &str, branch: &str, sha: &str) {
    self
      .upstream
      .lock()
      .unwrap()
      .insert(format!("{owner}/{repo}/{branch}"), sha.to_string());
  }
}

#[async_trait]
impl RevisionApi for FakeRevision {
  async fn latest_commit(
    &self,
    owner: &str,
    repo: &str,
    branch: &str,
  ) -> Result<String> {
    Ok(
      self
        .upstream
        .lock()
        .unwrap()
        .get(&format!("{owner}/{repo}/{branch}"))
        .cloned()
        .unwrap_or_else(|| "initial-sha".to_string()),
    )
  }

  async fn clone(
    &self,
    _url: &str,
    _branch: &str,
    target_dir: &Path,
  ) -> Result<PathBuf> {
    self.clones.lock().unwrap().push(target_dir.to_path_buf());
    Ok(target_dir.to_path_buf())
  }
}

pub const COMPOSE_YAML: &str = r#"
services:
  core:
    build:
      context: .
    restart: always
  prod:
    build:
      context: .
    restart: always
    depends_on: []
  cons:
    build:
      context: .
    restart: always
    depends_on:
      - prod
networks:
  default:
    driver: bridge
"#;

pub const SUPERVISOR_YAML: &str = r#"
context:
  use_git_context: false
  url: ""
  branch: ""
services:
  prod:
    type: producer
    repos:
      - url: https://github.com/acme/prod-repo
        branch: main
        current_commit: aaa
  cons:
    type: consumer
    depends_on: []
    repos:
      - url: https://github.com/acme/cons-repo
        branch: main
        current_commit: bbb
"#;

pub async fn write_fixture_project(dir: &Path) -> (PathBuf, PathBuf) {
  let compose_path = dir.join("docker-compose.yml");
  let supervisor_path = dir.join("ros-supervisor.yml");
  tokio::fs::write(&compose_path, COMPOSE_YAML).await.unwrap();
  tokio::fs::write(&supervisor_path, SUPERVISOR_YAML).await.unwrap();
  (compose_path, supervisor_path)
}
