//! The long-lived state machine: Await cfg → Load → Reconcile →
//! Supervise, looping back to Reconcile whenever an operator command
//! arrives. Runs until the shared [`CancellationToken`] is cancelled.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::config_loader::{self, LoadInputs};
use crate::error::Result;
use crate::model::{Command, Project};
use crate::reconciler::Reconciler;
use crate::revision::RevisionApi;
use crate::runtime::RuntimeApi;
use crate::store::Store;

pub struct SupervisorLoop<'a> {
  pub runtime: &'a dyn RuntimeApi,
  pub revision: &'a dyn RevisionApi,
  pub store: &'a Store,
  pub compose_path: PathBuf,
  pub supervisor_path: PathBuf,
  pub working_dir: PathBuf,
  pub project_name: String,
  pub state_file_path: PathBuf,
  pub tick: Duration,
  pub command: Arc<Mutex<Command>>,
  pub cancel: CancellationToken,
  /// `None` in `production`; otherwise the hosts file to keep in sync
  /// with the project's service names.
  pub hosts_file_path: Option<PathBuf>,
}

impl<'a> SupervisorLoop<'a> {
  async fn await_config(&self) {
    loop {
      if self.compose_path.exists() && self.supervisor_path.exists() {
        return;
      }
      tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(1)) => {}
        _ = self.cancel.cancelled() => return,
      }
    }
  }

  async fn load(&self) -> Result<Project> {
    config_loader::load(
      LoadInputs {
        compose_path: &self.compose_path,
        supervisor_path: &self.supervisor_path,
        working_dir: &self.working_dir,
        project_name: self.project_name.clone(),
      },
      self.revision,
    )
    .await
  }

  async fn write_state_file(&self, project: &Project) -> Result<()> {
    let yaml = config_loader::serialize_services(
      &project.services.iter().cloned().chain(project.core.clone()).collect::<Vec<_>>(),
    )?;
    tokio::fs::write(&self.state_file_path, yaml).await.map_err(|e| {
      crate::error::SupervisorError::State(anyhow::anyhow!(
        "failed to write {:?}: {e}",
        self.state_file_path
      ))
    })
  }

  fn is_first_run(&self) -> bool {
    !self.state_file_path.exists()
  }

  async fn take_command(&self) -> Command {
    let mut guard = self.command.lock().await;
    let taken = guard.clone();
    guard.reset();
    taken
  }

  async fn poll_tick(&self, project: &mut Project) -> Result<bool> {
    let reconciler =
      Reconciler::new(self.runtime, self.revision, self.store);
    let names: Vec<String> = project
      .services
      .iter()
      .chain(project.core.iter())
      .map(|s| s.name.clone())
      .collect();

    for name in names {
      let repo_specs: Vec<(String, String, String)> = project
        .find_service(&name)
        .map(|s| {
          s.repos
            .iter()
            .map(|r| (r.owner.clone(), r.name.clone(), r.branch.clone()))
            .collect()
        })
        .unwrap_or_default();

      let mut needs_update = false;
      for (owner, repo_name, branch) in repo_specs {
        match self.revision.latest_commit(&owner, &repo_name, &branch).await {
          Ok(latest) => {
            if let Some(service) = project.find_service_mut(&name) {
              for repo in &mut service.repos {
                if repo.owner == owner && repo.name == repo_name {
                  repo.upstream_commit = latest.clone();
                  if repo.is_update_ready() {
                    needs_update = true;
                  }
                }
              }
            }
          }
          Err(e) => {
            tracing::warn!("failed to check upstream for {name}: {e}");
          }
        }
      }

      if needs_update {
        if let Err(e) = reconciler.update_service(project, &name).await {
          tracing::warn!("update_service({name}) failed: {e}");
        }
      }
    }

    let command = self.command.lock().await;
    Ok(command.is_set())
  }

  async fn refresh_hosts_file(&self, project: &Project) {
    if let Some(hosts_path) = &self.hosts_file_path {
      if let Err(e) = crate::hosts::write_entries(hosts_path, project).await {
        tracing::warn!("failed to update hosts file: {e}");
      }
    }
  }

  /// Await cfg → Load. Load runs exactly once per process lifetime; every
  /// later cycle routes straight between Reconcile and Supervise without
  /// touching the Config Loader again, so a command that only asks for
  /// `update_services` never wipes `core`'s in-memory image/container ids
  /// by rebuilding the `Project` from disk.
  pub async fn run(&self) -> Result<()> {
    if self.cancel.is_cancelled() {
      return Ok(());
    }
    self.await_config().await;
    if self.cancel.is_cancelled() {
      return Ok(());
    }

    let mut project = loop {
      match self.load().await {
        Ok(p) => break p,
        Err(e) if self.is_first_run() => {
          tracing::error!("fatal config error on bootstrap: {e}");
          return Err(e);
        }
        Err(e) => {
          tracing::warn!("failed to load config, retrying: {e}");
          tokio::select! {
            _ = tokio::time::sleep(self.tick) => {}
            _ = self.cancel.cancelled() => return Ok(()),
          }
          if self.cancel.is_cancelled() {
            return Ok(());
          }
        }
      }
    };

    let reconciler = Reconciler::new(self.runtime, self.revision, self.store);

    if self.is_first_run() {
      reconciler.first_run(&mut project).await?;
      self.write_state_file(&project).await?;
    } else {
      let mut cmd = self.take_command().await;
      if cmd.is_set() {
        reconciler.reconcile_with_command(&mut project, &mut cmd).await?;
        self.write_state_file(&project).await?;
      } else {
        reconciler.observe_and_attach(&mut project).await?;
      }
    }
    self.refresh_hosts_file(&project).await;

    loop {
      loop {
        tokio::select! {
          _ = tokio::time::sleep(self.tick) => {}
          _ = self.cancel.cancelled() => return Ok(()),
        }
        if self.cancel.is_cancelled() {
          return Ok(());
        }
        match self.poll_tick(&mut project).await {
          Ok(command_pending) => {
            if command_pending {
              break;
            }
          }
          Err(e) => tracing::warn!("supervise tick failed: {e}"),
        }
      }

      let mut cmd = self.take_command().await;
      reconciler.reconcile_with_command(&mut project, &mut cmd).await?;
      self.write_state_file(&project).await?;
      self.refresh_hosts_file(&project).await;
    }
  }
}

