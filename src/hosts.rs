//! Writes `hostname -> 127.0.0.1` mappings into a local hosts file, so
//! intra-stack DNS resolves when every service runs on one machine.
//! Idempotent: a sentinel marker delimits supervisor-managed lines; each
//! write truncates everything after the marker and rewrites it.

use std::path::Path;

use crate::error::{Result, SupervisorError};
use crate::model::Project;

const MARKER: &str = "# --- ros-supervisor managed entries, do not edit below ---";

fn to_state_err(err: impl std::fmt::Display) -> SupervisorError {
  SupervisorError::State(anyhow::anyhow!(err.to_string()))
}

pub async fn write_entries(path: &Path, project: &Project) -> Result<()> {
  let existing = tokio::fs::read_to_string(path).await.unwrap_or_default();
  let preserved = existing.split(MARKER).next().unwrap_or("").trim_end();

  let mut out = String::new();
  out.push_str(preserved);
  if !preserved.is_empty() {
    out.push('\n');
  }
  out.push_str(MARKER);
  out.push('\n');

  for service in project.services.iter().chain(project.core.iter()) {
    out.push_str(&format!("127.0.0.1\t{}\n", service.name));
  }

  tokio::fs::write(path, out).await.map_err(to_state_err)?;
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::Service;

  #[tokio::test]
  async fn rewrite_is_idempotent_and_preserves_prefix() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hosts");
    tokio::fs::write(&path, "127.0.0.1\tlocalhost\n").await.unwrap();

    let project = Project {
      services: vec![Service { name: "prod".into(), ..Default::default() }],
      ..Default::default()
    };

    write_entries(&path, &project).await.unwrap();
    write_entries(&path, &project).await.unwrap();

    let contents = tokio::fs::read_to_string(&path).await.unwrap();
    assert_eq!(contents.matches("localhost").count(), 1);
    assert_eq!(contents.matches("prod").count(), 1);
  }
}
