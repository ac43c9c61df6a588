use std::collections::HashMap;

use super::{Container, Image, Repo};

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ServiceRole {
  Producer,
  Distributor,
  Consumer,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum RestartPolicy {
  Always,
  OnFailure { max_retries: u32 },
  No,
  UnlessStopped,
}

impl Default for RestartPolicy {
  fn default() -> Self {
    RestartPolicy::No
  }
}

impl RestartPolicy {
  /// Parses the compose `restart` string. An unparseable retry count after
  /// `on-failure:` is treated as 0, per spec.
  pub fn parse(raw: &str) -> Self {
    let mut parts = raw.splitn(2, ':');
    let name = parts.next().unwrap_or_default();
    let count = parts.next();
    match name {
      "always" => RestartPolicy::Always,
      "unless-stopped" => RestartPolicy::UnlessStopped,
      "on-failure" => RestartPolicy::OnFailure {
        max_retries: count.and_then(|c| c.parse().ok()).unwrap_or(0),
      },
      _ => RestartPolicy::No,
    }
  }

  pub fn should_autostart(&self) -> bool {
    matches!(self, RestartPolicy::Always | RestartPolicy::UnlessStopped)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum VolumeType {
  Bind,
  Mount,
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ServiceVolume {
  pub kind: Option<VolumeType>,
  pub source: String,
  pub destination: String,
  pub option: String,
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ServicePort {
  pub target: String,
  pub protocol: String,
  pub host_ip: String,
  pub host_port: String,
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct NetworkAttachment {
  pub name: String,
  pub aliases: Vec<String>,
  pub ipv4: Option<String>,
}

/// A parsed `devices` string: `a:b:c`, `a:b`, or `a`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DeviceMapping {
  pub path_on_host: String,
  pub path_in_container: String,
  pub permissions: String,
}

impl DeviceMapping {
  pub fn parse(raw: &str) -> Self {
    let parts: Vec<&str> = raw.split(':').collect();
    match parts.as_slice() {
      [a, b, c] => DeviceMapping {
        path_on_host: a.to_string(),
        path_in_container: b.to_string(),
        permissions: c.to_string(),
      },
      [a, b] => DeviceMapping {
        path_on_host: a.to_string(),
        path_in_container: b.to_string(),
        permissions: "rwm".to_string(),
      },
      [a] => DeviceMapping {
        path_on_host: a.to_string(),
        path_in_container: a.to_string(),
        permissions: "rwm".to_string(),
      },
      _ => DeviceMapping {
        path_on_host: raw.to_string(),
        path_in_container: raw.to_string(),
        permissions: "rwm".to_string(),
      },
    }
  }
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Resources {
  pub cpu_period: Option<i64>,
  pub cpu_quota: Option<i64>,
  pub memory_limit: Option<i64>,
  pub mem_swap_limit: Option<i64>,
  pub oom_kill_disable: bool,
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ServiceBuild {
  pub context: String,
  pub dockerfile: String,
  pub args: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Service {
  pub name: String,
  pub hostname: String,
  pub user: String,
  pub build: ServiceBuild,
  pub command: Vec<String>,
  pub entrypoint: Vec<String>,
  pub environment: Vec<String>,
  pub depends_on: Vec<String>,
  pub devices: Vec<String>,
  pub networks: Vec<NetworkAttachment>,
  pub ports: Vec<ServicePort>,
  pub volumes: Vec<ServiceVolume>,
  pub resources: Resources,
  pub restart: RestartPolicy,
  pub privileged: bool,
  pub tty: bool,
  pub ipc_mode: String,
  pub sysctls: HashMap<String, String>,
  pub cap_add: Vec<String>,
  pub cap_drop: Vec<String>,
  pub working_dir: String,
  pub cgroup_parent: Vec<String>,
  pub expose: Vec<String>,
  pub env_file: Vec<String>,
  pub image: Image,
  pub container: Container,

  // supervisor-layer attributes
  pub role: Option<ServiceRole>,
  pub repos: Vec<Repo>,
}

impl Service {
  pub fn device_mappings(&self) -> Vec<DeviceMapping> {
    self.devices.iter().map(|d| DeviceMapping::parse(d)).collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn restart_policy_with_count() {
    assert_eq!(
      RestartPolicy::parse("on-failure:5"),
      RestartPolicy::OnFailure { max_retries: 5 }
    );
  }

  #[test]
  fn restart_policy_without_count_defaults_zero() {
    assert_eq!(
      RestartPolicy::parse("on-failure"),
      RestartPolicy::OnFailure { max_retries: 0 }
    );
  }

  #[test]
  fn restart_policy_non_integer_tail_is_zero() {
    assert_eq!(
      RestartPolicy::parse("on-failure:abc"),
      RestartPolicy::OnFailure { max_retries: 0 }
    );
  }

  #[test]
  fn device_mapping_variants() {
    let full = DeviceMapping::parse("/dev/a:/dev/b:r");
    assert_eq!(full.path_on_host, "/dev/a");
    assert_eq!(full.path_in_container, "/dev/b");
    assert_eq!(full.permissions, "r");

    let two = DeviceMapping::parse("/dev/a:/dev/b");
    assert_eq!(two.path_on_host, "/dev/a");
    assert_eq!(two.path_in_container, "/dev/b");
    assert_eq!(two.permissions, "rwm");

    let one = DeviceMapping::parse("/dev/a");
    assert_eq!(one.path_on_host, "/dev/a");
    assert_eq!(one.path_in_container, "/dev/a");
    assert_eq!(one.permissions, "rwm");
  }
}
