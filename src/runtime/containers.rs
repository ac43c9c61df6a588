//! Helpers converting our [`ContainerSpec`]/bollard types back and forth.
//! Kept as free functions (rather than another trait impl) because a
//! single trait impl for [`RuntimeClient`] must live in one block; see
//! `runtime/mod.rs`.

use std::collections::HashMap;

use bollard::models::{
  ContainerCreateBody, ContainerSummaryStateEnum, DeviceMapping,
  EndpointIpamConfig, EndpointSettings, HostConfig, NetworkingConfig,
  PortBinding, RestartPolicy, RestartPolicyNameEnum,
};
use bollard::secret::ContainerSummary;

use super::{ContainerInfo, ContainerSpec};

pub fn to_container_info(summary: ContainerSummary) -> ContainerInfo {
  ContainerInfo {
    id: summary.id.unwrap_or_default(),
    name: summary
      .names
      .unwrap_or_default()
      .into_iter()
      .next()
      .unwrap_or_default()
      .trim_start_matches('/')
      .to_string(),
    image: summary.image.unwrap_or_default(),
    running: summary.state == Some(ContainerSummaryStateEnum::RUNNING),
  }
}

fn port_bindings(
  spec: &ContainerSpec,
) -> HashMap<String, Option<Vec<PortBinding>>> {
  let mut map: HashMap<String, Option<Vec<PortBinding>>> = HashMap::new();
  for (container_port, host_ip, host_port) in &spec.port_bindings {
    map
      .entry(container_port.clone())
      .or_insert_with(|| Some(Vec::new()))
      .get_or_insert_with(Vec::new)
      .push(PortBinding {
        host_ip: Some(host_ip.clone()),
        host_port: Some(host_port.clone()),
      });
  }
  map
}

/// Normalizes a compose `expose` entry (`"8080"` or `"8080/udp"`) to the
/// `port/proto` keys bollard's exposed-ports map expects.
fn exposed_port_key(raw: &str) -> String {
  if raw.contains('/') {
    raw.to_string()
  } else {
    format!("{raw}/tcp")
  }
}

fn restart_policy(spec: &ContainerSpec) -> RestartPolicy {
  let name = match spec.restart_name.as_str() {
    "always" => RestartPolicyNameEnum::ALWAYS,
    "unless-stopped" => RestartPolicyNameEnum::UNLESS_STOPPED,
    "on-failure" => RestartPolicyNameEnum::ON_FAILURE,
    _ => RestartPolicyNameEnum::NO,
  };
  RestartPolicy {
    name: Some(name),
    maximum_retry_count: Some(spec.restart_max_retries as i64),
  }
}

pub fn to_create_body(spec: &ContainerSpec) -> ContainerCreateBody {
  let endpoint_config = EndpointSettings {
    aliases: Some(spec.network_aliases.clone()),
    ip_address: spec.network_ipv4.clone(),
    ipam_config: spec.network_ipv4.as_ref().map(|ip| EndpointIpamConfig {
      ipv4_address: Some(ip.clone()),
      ..Default::default()
    }),
    ..Default::default()
  };
  let mut endpoints_config = HashMap::new();
  endpoints_config.insert(spec.network_name.clone(), endpoint_config);

  let host_config = HostConfig {
    binds: Some(spec.binds.clone()),
    cap_add: Some(spec.cap_add.clone()),
    cap_drop: Some(spec.cap_drop.clone()),
    privileged: Some(spec.privileged),
    port_bindings: Some(port_bindings(spec)),
    restart_policy: Some(restart_policy(spec)),
    sysctls: Some(spec.sysctls.clone()),
    ipc_mode: if spec.ipc_mode.is_empty() {
      None
    } else {
      Some(spec.ipc_mode.clone())
    },
    cpu_period: spec.cpu_period,
    cpu_quota: spec.cpu_quota,
    memory: spec.memory,
    memory_swap: spec.memory_swap,
    oom_kill_disable: Some(spec.oom_kill_disable),
    cgroup_parent: spec.cgroup_parent.clone(),
    devices: Some(
      spec
        .devices
        .iter()
        .map(|(host, container, perms)| DeviceMapping {
          path_on_host: Some(host.clone()),
          path_in_container: Some(container.clone()),
          cgroup_permissions: Some(perms.clone()),
        })
        .collect(),
    ),
    ..Default::default()
  };

  let exposed_ports = spec
    .exposed_ports
    .iter()
    .map(|port| (exposed_port_key(port), HashMap::new()))
    .collect();

  ContainerCreateBody {
    hostname: Some(spec.hostname.clone()),
    user: Some(spec.user.clone()),
    tty: Some(spec.tty),
    cmd: Some(spec.command.clone()),
    entrypoint: Some(spec.entrypoint.clone()),
    image: Some(spec.image.clone()),
    working_dir: Some(spec.working_dir.clone()),
    env: Some(spec.environment.clone()),
    exposed_ports: Some(exposed_ports),
    stop_signal: Some("SIGTERM".to_string()),
    host_config: Some(host_config),
    networking_config: Some(NetworkingConfig {
      endpoints_config: Some(endpoints_config),
    }),
    ..Default::default()
  }
}
