use std::collections::HashMap;
use std::path::Path;

use indexmap::IndexMap;

use crate::error::{Result, SupervisorError};
use crate::model::{
  NetworkAttachment, Resources, RestartPolicy, Service, ServicePort,
  ServiceVolume, VolumeType,
};

use super::raw::{RawBuildField, RawNetwork, RawService};

/// Parses a compose memory limit string: `k|m|g` suffix (case-insensitive)
/// in bytes, no suffix means literal bytes. Fails on any other trailing
/// character or an empty numeric part.
pub fn parse_memory(raw: &str) -> Result<i64> {
  let raw = raw.trim();
  if raw.is_empty() {
    return Err(SupervisorError::config("empty memory limit"));
  }
  let last = raw.chars().last().unwrap();
  let (digits, multiplier) = match last {
    'k' | 'K' => (&raw[..raw.len() - 1], 1024i64),
    'm' | 'M' => (&raw[..raw.len() - 1], 1024 * 1024),
    'g' | 'G' => (&raw[..raw.len() - 1], 1024 * 1024 * 1024),
    _ => (raw, 1),
  };
  digits
    .parse::<i64>()
    .map(|n| n * multiplier)
    .map_err(|_| {
      SupervisorError::config(format!("malformed memory limit `{raw}`"))
    })
}

/// Parses a compose `cpus` string (e.g. "1.5") into a cgroup quota, using
/// a fixed period of 100000us.
pub fn parse_cpu_quota(raw: &str) -> Result<(i64, i64)> {
  const PERIOD: i64 = 100_000;
  let cpus: f64 = raw
    .trim()
    .parse()
    .map_err(|_| SupervisorError::config(format!("malformed cpus `{raw}`")))?;
  Ok((PERIOD, (cpus * PERIOD as f64) as i64))
}

/// `src:dst[:opt]` → structured bind volume.
pub fn parse_volume(raw: &str) -> ServiceVolume {
  let parts: Vec<&str> = raw.split(':').collect();
  match parts.as_slice() {
    [source, destination, option, ..] => ServiceVolume {
      kind: Some(VolumeType::Bind),
      source: source.to_string(),
      destination: destination.to_string(),
      option: option.to_string(),
    },
    [source, destination] => ServiceVolume {
      kind: Some(VolumeType::Bind),
      source: source.to_string(),
      destination: destination.to_string(),
      option: String::new(),
    },
    [source] => ServiceVolume {
      kind: Some(VolumeType::Bind),
      source: source.to_string(),
      destination: source.to_string(),
      option: String::new(),
    },
    [] => ServiceVolume::default(),
  }
}

/// Reads a compose `env_file` entry (`KEY=VALUE` per line, blank lines and
/// `#`-comments skipped), resolved relative to `working_dir` unless
/// absolute.
fn read_env_file(working_dir: &str, path: &str) -> Result<Vec<String>> {
  let resolved = Path::new(path);
  let resolved = if resolved.is_absolute() {
    resolved.to_path_buf()
  } else {
    Path::new(working_dir).join(resolved)
  };
  let contents = std::fs::read_to_string(&resolved).map_err(|e| {
    SupervisorError::config(format!(
      "failed to read env_file {resolved:?}: {e}"
    ))
  })?;
  Ok(
    contents
      .lines()
      .map(str::trim)
      .filter(|line| !line.is_empty() && !line.starts_with('#'))
      .map(str::to_string)
      .collect(),
  )
}

/// Merges `env_file` entries with explicit `environment` entries, explicit
/// entries overriding an `env_file` value for the same key while keeping
/// each key's first-seen position.
fn merge_environment(base: Vec<String>, overrides: Vec<String>) -> Vec<String> {
  let mut merged: IndexMap<String, String> = IndexMap::new();
  for entry in base.into_iter().chain(overrides) {
    match entry.split_once('=') {
      Some((key, value)) => {
        merged.insert(key.to_string(), value.to_string());
      }
      None => {
        merged.insert(entry, String::new());
      }
    }
  }
  merged.into_iter().map(|(k, v)| format!("{k}={v}")).collect()
}

/// `host:container` → ServicePort with protocol `tcp`, host ip `0.0.0.0`.
pub fn parse_port(raw: &str) -> ServicePort {
  let mut parts = raw.splitn(2, ':');
  let host_port = parts.next().unwrap_or_default().to_string();
  let target = parts.next().unwrap_or(&host_port).to_string();
  ServicePort {
    target,
    protocol: "tcp".to_string(),
    host_ip: "0.0.0.0".to_string(),
    host_port,
  }
}

pub fn convert_service(
  name: &str,
  raw: RawService,
  working_dir: &str,
) -> Result<Service> {
  let mut service = Service {
    name: name.to_string(),
    ..Default::default()
  };

  // `container_name` is parsed but intentionally not applied: the data
  // model's naming invariant pins every container to `{project}_{name}`
  // regardless of what compose requests, so reconciliation can always
  // find a service's container by a name it derives itself.
  let _ = raw.container_name;

  service.hostname = raw.hostname.unwrap_or_default();
  service.user = raw.user.unwrap_or_default();
  service.working_dir = raw.working_dir.unwrap_or_default();
  service.depends_on = raw.depends_on;
  service.privileged = raw.privileged.unwrap_or_default();
  service.tty = raw.tty.unwrap_or_default();
  service.ipc_mode = raw.ipc_mode.unwrap_or_default();
  service.sysctls = raw.sysctls;
  service.cap_add = raw.cap_add;
  service.cap_drop = raw.cap_drop;
  service.devices = raw.devices;
  service.cgroup_parent = raw.cgroup_parent;
  service.expose = raw.expose;
  service.env_file = raw.env_file;

  let mut from_env_files = Vec::new();
  for file in &service.env_file {
    from_env_files.extend(read_env_file(working_dir, file)?);
  }
  let explicit_env =
    raw.environment.map(|env| env.into_ordered()).unwrap_or_default();
  service.environment = merge_environment(from_env_files, explicit_env);
  if let Some(cmd) = raw.command {
    service.command = match cmd {
      super::raw::StringOrList::Single(s) => {
        s.split_whitespace().map(str::to_string).collect()
      }
      super::raw::StringOrList::List(l) => l,
    };
  }
  if let Some(ep) = raw.entrypoint {
    service.entrypoint = match ep {
      super::raw::StringOrList::Single(s) => {
        s.split_whitespace().map(str::to_string).collect()
      }
      super::raw::StringOrList::List(l) => l,
    };
  }

  service.restart = raw
    .restart
    .map(|r| RestartPolicy::parse(&r))
    .unwrap_or(RestartPolicy::No);

  service.volumes = raw.volumes.iter().map(|v| parse_volume(v)).collect();
  service.ports = raw.ports.iter().map(|p| parse_port(p)).collect();

  if let Some(networks) = raw.networks {
    service.networks = networks
      .into_iter()
      .map(|(name, net)| NetworkAttachment {
        name,
        aliases: net.aliases,
        ipv4: net.ipv4_address,
      })
      .collect();
  }

  let build = match raw.build {
    Some(RawBuildField::Context(context)) => {
      crate::model::ServiceBuild {
        context,
        dockerfile: "Dockerfile".to_string(),
        args: HashMap::new(),
      }
    }
    Some(RawBuildField::Full(build)) => crate::model::ServiceBuild {
      context: build.context.unwrap_or_else(|| working_dir.to_string()),
      dockerfile: build
        .dockerfile
        .unwrap_or_else(|| "Dockerfile".to_string()),
      args: build
        .args
        .map(|a| {
          a.into_ordered()
            .into_iter()
            .filter_map(|kv| {
              let mut parts = kv.splitn(2, '=');
              Some((
                parts.next()?.to_string(),
                parts.next().unwrap_or_default().to_string(),
              ))
            })
            .collect()
        })
        .unwrap_or_default(),
    },
    None => crate::model::ServiceBuild {
      context: working_dir.to_string(),
      dockerfile: "Dockerfile".to_string(),
      args: HashMap::new(),
    },
  };
  service.build = build;

  let mut resources = Resources::default();
  if let Some(deploy) = raw.deploy {
    if let Some(limits) = deploy.resources.and_then(|r| r.limits) {
      if let Some(cpus) = limits.cpus {
        let (period, quota) = parse_cpu_quota(&cpus)?;
        resources.cpu_period = Some(period);
        resources.cpu_quota = Some(quota);
      }
      if let Some(memory) = limits.memory {
        resources.memory_limit = Some(parse_memory(&memory)?);
      }
      if let Some(memswap) = limits.memswap_limit {
        resources.mem_swap_limit = Some(parse_memory(&memswap)?);
      }
    }
  }
  service.resources = resources;

  service.image = crate::model::Image::new("project", name);
  service.container = crate::model::Container::new("project", name);

  Ok(service)
}

pub fn convert_network(name: &str, raw: RawNetwork) -> crate::model::Network {
  crate::model::Network {
    id: None,
    name: name.to_string(),
    driver: raw.driver,
    ipam: raw
      .ipam
      .map(|ipam| {
        ipam
          .config
          .into_iter()
          .map(|c| crate::model::IpamConfig {
            subnet: c.subnet,
            gateway: c.gateway,
          })
          .collect()
      })
      .unwrap_or_default(),
    check_duplicate: true,
    internal: raw.internal,
    attachable: raw.attachable,
    enable_ipv6: raw.enable_ipv6,
    labels: raw.labels,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn memory_with_suffix() {
    assert_eq!(parse_memory("1k").unwrap(), 1024);
    assert_eq!(parse_memory("1m").unwrap(), 1024 * 1024);
    assert_eq!(parse_memory("1g").unwrap(), 1024 * 1024 * 1024);
  }

  #[test]
  fn memory_without_suffix_is_literal_bytes() {
    assert_eq!(parse_memory("512").unwrap(), 512);
  }

  #[test]
  fn malformed_memory_suffix_is_config_error() {
    assert!(parse_memory("5GG").is_err());
  }

  #[test]
  fn volume_with_one_colon() {
    let v = parse_volume("a:b");
    assert_eq!(v.source, "a");
    assert_eq!(v.destination, "b");
    assert_eq!(v.option, "");
  }

  #[test]
  fn volume_with_two_colons() {
    let v = parse_volume("a:b:ro");
    assert_eq!(v.source, "a");
    assert_eq!(v.destination, "b");
    assert_eq!(v.option, "ro");
  }

  #[test]
  fn port_parses_defaults() {
    let p = parse_port("8080:80");
    assert_eq!(p.host_port, "8080");
    assert_eq!(p.target, "80");
    assert_eq!(p.protocol, "tcp");
    assert_eq!(p.host_ip, "0.0.0.0");
  }

  #[test]
  fn explicit_environment_overrides_env_file_same_key() {
    let merged = merge_environment(
      vec!["A=from_file".to_string(), "B=from_file".to_string()],
      vec!["A=from_compose".to_string()],
    );
    assert_eq!(
      merged,
      vec!["A=from_compose".to_string(), "B=from_file".to_string()]
    );
  }

  #[test]
  fn read_env_file_skips_blank_lines_and_comments() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
      dir.path().join(".env"),
      "# a comment\n\nFOO=bar\nBAZ=qux\n",
    )
    .unwrap();
    let entries =
      read_env_file(dir.path().to_str().unwrap(), ".env").unwrap();
    assert_eq!(entries, vec!["FOO=bar".to_string(), "BAZ=qux".to_string()]);
  }
}
