//! Typed project model. Produced by [`crate::config_loader`], ordered by
//! [`crate::orderer`], and mutated in place by [`crate::reconciler`].

mod repo;
mod service;

pub use repo::Repo;
pub use service::{
  DeviceMapping, NetworkAttachment, Resources, RestartPolicy, Service,
  ServicePort, ServiceRole, ServiceVolume, VolumeType,
};

use std::collections::{HashMap, HashSet};

/// Image identity for a built service. Named `{project}_{service}:{tag}`.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Image {
  pub id: Option<String>,
  pub name: String,
  pub tag: String,
  pub created_at: Option<i64>,
}

impl Image {
  pub fn new(project: &str, service: &str) -> Self {
    Self {
      id: None,
      name: format!("{project}_{service}"),
      tag: "latest".into(),
      created_at: None,
    }
  }

  pub fn reference(&self) -> String {
    format!("{}:{}", self.name, self.tag)
  }
}

/// Container identity for a running service.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Container {
  pub id: Option<String>,
  pub name: String,
}

impl Container {
  pub fn new(project: &str, service: &str) -> Self {
    Self {
      id: None,
      name: format!("{project}_{service}"),
    }
  }
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct IpamConfig {
  pub subnet: Option<String>,
  pub gateway: Option<String>,
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Network {
  pub id: Option<String>,
  pub name: String,
  pub driver: Option<String>,
  pub ipam: Vec<IpamConfig>,
  pub check_duplicate: bool,
  pub internal: bool,
  pub attachable: bool,
  pub enable_ipv6: bool,
  pub labels: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Volume {
  pub name: String,
}

/// The root entity: a fully loaded, normalized project.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Project {
  pub name: String,
  pub working_dir: String,
  pub core: Option<Service>,
  pub services: Vec<Service>,
  pub networks: Vec<Network>,
  pub volumes: Vec<Volume>,
  #[serde(skip)]
  pub raw_compose: Vec<u8>,
}

impl Project {
  /// Index of a service by name, searching both `core` and `services`.
  pub fn find_service(&self, name: &str) -> Option<&Service> {
    if let Some(core) = &self.core {
      if core.name == name {
        return Some(core);
      }
    }
    self.services.iter().find(|s| s.name == name)
  }

  pub fn find_service_mut(&mut self, name: &str) -> Option<&mut Service> {
    if let Some(core) = &mut self.core {
      if core.name == name {
        return Some(core);
      }
    }
    self.services.iter_mut().find(|s| s.name == name)
  }

  /// Validate the invariants named in the data model: every service's
  /// networks exist, service names are unique, network names are unique.
  pub fn validate(&self) -> crate::error::Result<()> {
    let mut seen_services = HashSet::new();
    let mut all = self.services.iter().chain(self.core.iter());
    for service in all.by_ref() {
      if !seen_services.insert(&service.name) {
        return Err(crate::error::SupervisorError::config(format!(
          "duplicate service name {}",
          service.name
        )));
      }
    }
    let mut seen_networks = HashSet::new();
    for network in &self.networks {
      if !seen_networks.insert(&network.name) {
        return Err(crate::error::SupervisorError::config(format!(
          "duplicate network name {}",
          network.name
        )));
      }
    }
    let network_names: HashSet<_> =
      self.networks.iter().map(|n| n.name.as_str()).collect();
    for service in self.services.iter().chain(self.core.iter()) {
      for attachment in &service.networks {
        if !network_names.contains(attachment.name.as_str()) {
          return Err(crate::error::SupervisorError::config(format!(
            "service {} references unknown network {}",
            service.name, attachment.name
          )));
        }
      }
    }
    Ok(())
  }
}

/// Operator-issued update command. Mutated by the control endpoint,
/// consumed and reset by the Supervisor loop.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Command {
  pub update_core: bool,
  pub update_services: bool,
}

impl Command {
  pub fn is_set(&self) -> bool {
    self.update_core || self.update_services
  }

  pub fn reset(&mut self) {
    self.update_core = false;
    self.update_services = false;
  }
}

/// Durable per-service snapshot. Uniqueness: `(name, version)`.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ServiceRecord {
  pub name: String,
  pub version: u64,
  pub project_id: String,
  pub image_id: Option<String>,
  pub container_id: Option<String>,
  pub network_id: Option<String>,
  pub volume_id: Option<String>,
  pub raw_docker_yaml: String,
  pub raw_supervisor_yaml: String,
  pub processed_yaml: String,
}
