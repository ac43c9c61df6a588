//! Durable per-service persistence. Backed by `sled`, an embedded
//! key/value store — grounded in `other_examples`' pairing of `sled`
//! with `bollard` for an analogous container-management daemon.
//!
//! Two trees: `projects` (keyed by project name) and `services` (keyed
//! by `"{name}\0{version}"`, mirroring the `(name, version)` upsert key
//! named in the data model).

use crate::error::{Result, SupervisorError};
use crate::model::ServiceRecord;

fn to_state_err(err: impl std::fmt::Display) -> SupervisorError {
  SupervisorError::State(anyhow::anyhow!(err.to_string()))
}

fn service_key(name: &str, version: u64) -> Vec<u8> {
  format!("{name}\0{version}").into_bytes()
}

pub struct Store {
  projects: sled::Tree,
  services: sled::Tree,
}

impl Store {
  pub fn open(path: &str) -> Result<Self> {
    let db = sled::open(path).map_err(to_state_err)?;
    let projects = db.open_tree("projects").map_err(to_state_err)?;
    let services = db.open_tree("services").map_err(to_state_err)?;
    Ok(Self { projects, services })
  }

  pub fn has_prior_run(&self, project_name: &str) -> Result<bool> {
    Ok(self.projects.contains_key(project_name).map_err(to_state_err)?)
  }

  pub fn record_project(&self, project_name: &str) -> Result<()> {
    self
      .projects
      .insert(project_name, project_name.as_bytes())
      .map_err(to_state_err)?;
    self.projects.flush().map_err(to_state_err)?;
    Ok(())
  }

  /// Upsert-by-`(name, version)`: overwrites any existing record under
  /// the same key.
  pub fn add_service(&self, record: &ServiceRecord) -> Result<()> {
    let key = service_key(&record.name, record.version);
    let bytes = serde_json::to_vec(record).map_err(to_state_err)?;
    self.services.insert(key, bytes).map_err(to_state_err)?;
    self.services.flush().map_err(to_state_err)?;
    Ok(())
  }

  pub fn get_service(
    &self,
    name: &str,
    version: u64,
  ) -> Result<Option<ServiceRecord>> {
    let key = service_key(name, version);
    match self.services.get(key).map_err(to_state_err)? {
      Some(bytes) => {
        let record = serde_json::from_slice(&bytes).map_err(to_state_err)?;
        Ok(Some(record))
      }
      None => Ok(None),
    }
  }

  /// Latest-version record for `name`, scanning the `name\0` prefix.
  pub fn latest_service(&self, name: &str) -> Result<Option<ServiceRecord>> {
    let prefix = format!("{name}\0");
    let mut latest: Option<ServiceRecord> = None;
    for entry in self.services.scan_prefix(prefix.as_bytes()) {
      let (_, bytes) = entry.map_err(to_state_err)?;
      let record: ServiceRecord =
        serde_json::from_slice(&bytes).map_err(to_state_err)?;
      if latest.as_ref().map(|l| record.version > l.version).unwrap_or(true)
      {
        latest = Some(record);
      }
    }
    Ok(latest)
  }

  fn update<F>(&self, name: &str, version: u64, apply: F) -> Result<()>
  where
    F: FnOnce(&mut ServiceRecord),
  {
    let mut record = self
      .get_service(name, version)?
      .ok_or_else(|| SupervisorError::config(format!("no store record for {name}@{version}")))?;
    apply(&mut record);
    self.add_service(&record)
  }

  pub fn update_image_id(
    &self,
    name: &str,
    version: u64,
    image_id: String,
  ) -> Result<()> {
    self.update(name, version, |r| r.image_id = Some(image_id))
  }

  pub fn update_container_id(
    &self,
    name: &str,
    version: u64,
    container_id: String,
  ) -> Result<()> {
    self.update(name, version, |r| r.container_id = Some(container_id))
  }

  pub fn update_network_id(
    &self,
    name: &str,
    version: u64,
    network_id: String,
  ) -> Result<()> {
    self.update(name, version, |r| r.network_id = Some(network_id))
  }

  pub fn update_volume_id(
    &self,
    name: &str,
    version: u64,
    volume_id: String,
  ) -> Result<()> {
    self.update(name, version, |r| r.volume_id = Some(volume_id))
  }

  pub fn update_docker_config(
    &self,
    name: &str,
    version: u64,
    raw_docker_yaml: String,
  ) -> Result<()> {
    self.update(name, version, |r| r.raw_docker_yaml = raw_docker_yaml)
  }

  pub fn update_supervisor_config(
    &self,
    name: &str,
    version: u64,
    raw_supervisor_yaml: String,
  ) -> Result<()> {
    self.update(name, version, |r| r.raw_supervisor_yaml = raw_supervisor_yaml)
  }

  pub fn update_processed(
    &self,
    name: &str,
    version: u64,
    processed_yaml: String,
  ) -> Result<()> {
    self.update(name, version, |r| r.processed_yaml = processed_yaml)
  }

  pub fn delete_service(&self, name: &str, version: u64) -> Result<()> {
    let key = service_key(name, version);
    self.services.remove(key).map_err(to_state_err)?;
    self.services.flush().map_err(to_state_err)?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn sample(name: &str, version: u64) -> ServiceRecord {
    ServiceRecord {
      name: name.to_string(),
      version,
      project_id: "demo".to_string(),
      image_id: None,
      container_id: None,
      network_id: None,
      volume_id: None,
      raw_docker_yaml: String::new(),
      raw_supervisor_yaml: String::new(),
      processed_yaml: String::new(),
    }
  }

  #[test]
  fn upsert_overwrites_same_name_and_version() {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::open(dir.path().to_str().unwrap()).unwrap();
    store.add_service(&sample("prod", 1)).unwrap();
    store.update_image_id("prod", 1, "sha256:abc".to_string()).unwrap();
    let record = store.get_service("prod", 1).unwrap().unwrap();
    assert_eq!(record.image_id.as_deref(), Some("sha256:abc"));
  }

  #[test]
  fn latest_service_picks_highest_version() {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::open(dir.path().to_str().unwrap()).unwrap();
    store.add_service(&sample("prod", 1)).unwrap();
    store.add_service(&sample("prod", 2)).unwrap();
    let latest = store.latest_service("prod").unwrap().unwrap();
    assert_eq!(latest.version, 2);
  }

  #[test]
  fn missing_record_update_is_state_error() {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::open(dir.path().to_str().unwrap()).unwrap();
    let result = store.update_image_id("ghost", 1, "x".to_string());
    assert!(result.is_err());
  }

  #[test]
  fn prior_run_detection() {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::open(dir.path().to_str().unwrap()).unwrap();
    assert!(!store.has_prior_run("demo").unwrap());
    store.record_project("demo").unwrap();
    assert!(store.has_prior_run("demo").unwrap());
  }
}
