//! Parses compose + supervisor YAML into a [`crate::model::Project`],
//! classifying services by role and associating them with upstream repos.

mod convert;
mod raw;

use std::collections::HashSet;
use std::path::Path;

use crate::error::{Result, SupervisorError};
use crate::model::{Project, Repo, Service, ServiceRole};
use crate::revision::RevisionApi;

use raw::{RawComposeFile, RawSupervisorFile};

pub struct LoadInputs<'a> {
  pub compose_path: &'a Path,
  pub supervisor_path: &'a Path,
  pub working_dir: &'a Path,
  pub project_name: String,
}

pub async fn load(
  inputs: LoadInputs<'_>,
  revision: &dyn RevisionApi,
) -> Result<Project> {
  let supervisor_bytes = tokio::fs::read(inputs.supervisor_path)
    .await
    .map_err(|e| {
      SupervisorError::config(format!(
        "failed to read supervisor file {:?}: {e}",
        inputs.supervisor_path
      ))
    })?;
  let supervisor_file: RawSupervisorFile =
    serde_yaml_ng::from_slice(&supervisor_bytes).map_err(|e| {
      SupervisorError::config(format!("malformed supervisor yaml: {e}"))
    })?;

  if let Some(context) = &supervisor_file.context {
    if context.use_git_context {
      revision
        .clone(&context.url, &context.branch, inputs.working_dir)
        .await?;
    }
  }

  let compose_bytes =
    tokio::fs::read(inputs.compose_path).await.map_err(|e| {
      SupervisorError::config(format!(
        "failed to read compose file {:?}: {e}",
        inputs.compose_path
      ))
    })?;
  let compose_file: RawComposeFile = serde_yaml_ng::from_slice(&compose_bytes)
    .map_err(|e| {
      SupervisorError::config(format!("malformed compose yaml: {e}"))
    })?;

  let working_dir_str = inputs.working_dir.to_string_lossy().to_string();

  let mut services = Vec::new();
  for (name, raw_service) in compose_file.services {
    services.push(convert::convert_service(
      &name,
      raw_service,
      &working_dir_str,
    )?);
  }
  let networks = compose_file
    .networks
    .into_iter()
    .map(|(name, raw)| convert::convert_network(&name, raw))
    .collect::<Vec<_>>();

  let volumes = compose_file
    .volumes
    .into_keys()
    .map(|name| crate::model::Volume { name })
    .collect::<Vec<_>>();

  let mut project = Project {
    name: inputs.project_name,
    working_dir: working_dir_str,
    core: None,
    services,
    networks,
    volumes,
    raw_compose: compose_bytes,
  };

  // Pull `core` out into its own slot.
  if let Some(idx) = project.services.iter().position(|s| s.name == "core") {
    project.core = Some(project.services.remove(idx));
  }

  let project_name = project.name.clone();
  for service in project.services.iter_mut().chain(project.core.iter_mut()) {
    service.image = crate::model::Image::new(&project_name, &service.name);
    service.container =
      crate::model::Container::new(&project_name, &service.name);
  }

  apply_supervisor_config(&mut project, supervisor_file, revision).await?;

  project.validate()?;

  Ok(project)
}

async fn apply_supervisor_config(
  project: &mut Project,
  supervisor_file: RawSupervisorFile,
  revision: &dyn RevisionApi,
) -> Result<()> {
  let compose_names: Vec<String> = project
    .services
    .iter()
    .chain(project.core.iter())
    .map(|s| s.name.clone())
    .collect();

  for (supervisor_name, raw) in supervisor_file.services {
    let matched_name = compose_names
      .iter()
      .find(|compose_name| {
        compose_name.contains(supervisor_name.as_str())
          || supervisor_name.contains(compose_name.as_str())
      })
      .cloned()
      .ok_or_else(|| {
        SupervisorError::config(format!(
          "supervisor service `{supervisor_name}` has no matching compose service"
        ))
      })?;

    let role = parse_role(&raw.kind)?;

    let mut repos = Vec::new();
    for raw_repo in raw.repos {
      let mut repo = Repo::from_url(&raw_repo.url, &raw_repo.branch)
        .ok_or_else(|| {
          SupervisorError::config(format!(
            "repo url `{}` has no github.com component",
            raw_repo.url
          ))
        })?;
      match raw_repo.current_commit {
        Some(commit) => repo.current_commit = commit,
        None => {
          repo.current_commit = revision
            .latest_commit(&repo.owner, &repo.name, &repo.branch)
            .await?;
        }
      }
      repos.push(repo);
    }

    let service = project
      .find_service_mut(&matched_name)
      .expect("matched_name came from project's own service list");
    service.role = Some(role);
    service.repos = repos;
    // Supervisor-declared depends_on supplements compose depends_on,
    // deduplicated, preserving compose order first.
    let mut seen: HashSet<String> =
      service.depends_on.iter().cloned().collect();
    for dep in raw.depends_on {
      if seen.insert(dep.clone()) {
        service.depends_on.push(dep);
      }
    }
  }

  validate_depends_on(project)?;

  Ok(())
}

fn parse_role(raw: &str) -> Result<ServiceRole> {
  match raw {
    "producer" => Ok(ServiceRole::Producer),
    "distributor" => Ok(ServiceRole::Distributor),
    "consumer" => Ok(ServiceRole::Consumer),
    other => Err(SupervisorError::config(format!(
      "unknown supervisor service role `{other}`"
    ))),
  }
}

fn validate_depends_on(project: &Project) -> Result<()> {
  let names: HashSet<&str> = project
    .services
    .iter()
    .chain(project.core.iter())
    .map(|s| s.name.as_str())
    .collect();
  for service in project.services.iter().chain(project.core.iter()) {
    for dep in &service.depends_on {
      if !names.contains(dep.as_str()) {
        return Err(SupervisorError::config(format!(
          "service `{}` depends on unknown service `{dep}`",
          service.name
        )));
      }
    }
  }
  Ok(())
}

/// Round-trips a loaded project back to supervisor-yaml-shaped bytes, for
/// the "processed" config persisted by the Store.
pub fn serialize_services(services: &[Service]) -> Result<String> {
  serde_yaml_ng::to_string(services).map_err(|e| {
    SupervisorError::State(anyhow::anyhow!(
      "failed to serialize processed services: {e}"
    ))
  })
}
