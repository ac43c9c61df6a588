use std::collections::HashMap;

use crate::model::Service;

#[derive(Debug, Clone, Default)]
pub struct ContainerInfo {
  pub id: String,
  pub name: String,
  pub image: String,
  pub running: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ImageInfo {
  pub id: String,
  pub repo_tags: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NetworkInfo {
  pub id: String,
  pub name: String,
}

#[derive(Debug, Clone)]
pub struct NetworkSpec {
  pub name: String,
  pub driver: Option<String>,
  pub ipam: Vec<crate::model::IpamConfig>,
  pub check_duplicate: bool,
  pub internal: bool,
  pub attachable: bool,
  pub enable_ipv6: bool,
  pub labels: HashMap<String, String>,
}

impl From<&crate::model::Network> for NetworkSpec {
  fn from(network: &crate::model::Network) -> Self {
    Self {
      name: network.name.clone(),
      driver: network.driver.clone(),
      ipam: network.ipam.clone(),
      check_duplicate: network.check_duplicate,
      internal: network.internal,
      attachable: network.attachable,
      enable_ipv6: network.enable_ipv6,
      labels: network.labels.clone(),
    }
  }
}

/// Build-image request. The context is tarred+gzipped by the caller and
/// streamed to the runtime.
pub struct BuildOptions {
  pub tags: Vec<String>,
  pub dockerfile: String,
  pub build_args: HashMap<String, String>,
  pub remove: bool,
  pub suppress_output: bool,
}

/// A fully resolved container-create request, derived from a [`Service`].
#[derive(Debug, Clone)]
pub struct ContainerSpec {
  pub name: String,
  pub image: String,
  pub hostname: String,
  pub user: String,
  pub command: Vec<String>,
  pub entrypoint: Vec<String>,
  pub environment: Vec<String>,
  pub working_dir: String,
  pub tty: bool,
  pub privileged: bool,
  pub ipc_mode: String,
  pub cap_add: Vec<String>,
  pub cap_drop: Vec<String>,
  pub sysctls: HashMap<String, String>,
  pub binds: Vec<String>,
  pub port_bindings: Vec<(String, String, String)>, // (container_port/proto, host_ip, host_port)
  pub devices: Vec<(String, String, String)>, // (host_path, container_path, perms)
  pub cpu_period: Option<i64>,
  pub cpu_quota: Option<i64>,
  pub memory: Option<i64>,
  pub memory_swap: Option<i64>,
  pub oom_kill_disable: bool,
  pub cgroup_parent: Option<String>,
  pub exposed_ports: Vec<String>,
  pub restart_name: String,
  pub restart_max_retries: i64,
  pub network_name: String,
  pub network_aliases: Vec<String>,
  pub network_ipv4: Option<String>,
}

impl ContainerSpec {
  pub fn from_service(service: &Service, network_name: &str) -> Self {
    let (restart_name, restart_max_retries) = match &service.restart {
      crate::model::RestartPolicy::Always => ("always".to_string(), 0),
      crate::model::RestartPolicy::UnlessStopped => {
        ("unless-stopped".to_string(), 0)
      }
      crate::model::RestartPolicy::OnFailure { max_retries } => {
        ("on-failure".to_string(), *max_retries as i64)
      }
      crate::model::RestartPolicy::No => ("no".to_string(), 0),
    };

    let binds = service
      .volumes
      .iter()
      .filter(|v| !v.source.is_empty() && !v.destination.is_empty())
      .map(|v| {
        if v.option.is_empty() {
          format!("{}:{}", v.source, v.destination)
        } else {
          format!("{}:{}:{}", v.source, v.destination, v.option)
        }
      })
      .collect();

    let port_bindings = service
      .ports
      .iter()
      .map(|p| {
        (
          format!("{}/{}", p.target, p.protocol),
          p.host_ip.clone(),
          p.host_port.clone(),
        )
      })
      .collect();

    let devices = service
      .device_mappings()
      .into_iter()
      .map(|d| (d.path_on_host, d.path_in_container, d.permissions))
      .collect();

    let network = service.networks.first();

    Self {
      name: service.container.name.clone(),
      image: service.image.reference(),
      hostname: service.hostname.clone(),
      user: service.user.clone(),
      command: service.command.clone(),
      entrypoint: service.entrypoint.clone(),
      environment: service.environment.clone(),
      working_dir: service.working_dir.clone(),
      tty: service.tty,
      privileged: service.privileged,
      ipc_mode: service.ipc_mode.clone(),
      cap_add: service.cap_add.clone(),
      cap_drop: service.cap_drop.clone(),
      sysctls: service.sysctls.clone(),
      binds,
      port_bindings,
      devices,
      cpu_period: service.resources.cpu_period,
      cpu_quota: service.resources.cpu_quota,
      memory: service.resources.memory_limit,
      memory_swap: service.resources.mem_swap_limit,
      oom_kill_disable: service.resources.oom_kill_disable,
      cgroup_parent: service.cgroup_parent.first().cloned(),
      exposed_ports: service.expose.clone(),
      restart_name,
      restart_max_retries,
      network_name: network
        .map(|n| n.name.clone())
        .unwrap_or_else(|| network_name.to_string()),
      network_aliases: network
        .map(|n| n.aliases.clone())
        .unwrap_or_else(|| vec![service.name.clone()]),
      network_ipv4: network.and_then(|n| n.ipv4.clone()),
    }
  }
}
