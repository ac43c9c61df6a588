//! Loosely-typed mirror of the compose/supervisor YAML schemas. Kept
//! deliberately permissive (lots of `Option`, an untagged enum for the
//! places compose actually admits a union) so malformed input surfaces as
//! a `ConfigError` at the conversion step rather than a serde error with
//! a confusing message.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::Deserialize;

#[derive(Debug, Deserialize, Default)]
pub struct RawComposeFile {
  /// Declaration order matters: the Orderer's dependency-count tiebreak
  /// and the Config Loader's substring association both fall back to
  /// "first in the file wins", so this can't be a `HashMap`.
  #[serde(default)]
  pub services: IndexMap<String, RawService>,
  #[serde(default)]
  pub networks: HashMap<String, RawNetwork>,
  #[serde(default)]
  pub volumes: HashMap<String, Option<serde_yaml_ng::Value>>,
}

/// Compose allows `environment`/`command`/`entrypoint` as either a list or
/// a mapping/string. This is the "tagged-variant" union the design notes
/// call for.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum StringOrList {
  Single(String),
  List(Vec<String>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum EnvList {
  List(Vec<String>),
  Map(HashMap<String, String>),
}

impl EnvList {
  pub fn into_ordered(self) -> Vec<String> {
    match self {
      EnvList::List(list) => list,
      EnvList::Map(map) => {
        map.into_iter().map(|(k, v)| format!("{k}={v}")).collect()
      }
    }
  }
}

#[derive(Debug, Deserialize, Default)]
pub struct RawBuild {
  pub context: Option<String>,
  pub dockerfile: Option<String>,
  pub args: Option<EnvList>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawBuildField {
  Context(String),
  Full(RawBuild),
}

#[derive(Debug, Deserialize, Default)]
pub struct RawServiceNetwork {
  pub ipv4_address: Option<String>,
  #[serde(default)]
  pub aliases: Vec<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct RawLimits {
  pub cpus: Option<String>,
  pub memory: Option<String>,
  pub memswap_limit: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct RawResourceSpec {
  pub limits: Option<RawLimits>,
}

#[derive(Debug, Deserialize, Default)]
pub struct RawDeploy {
  pub resources: Option<RawResourceSpec>,
}

#[derive(Debug, Deserialize, Default)]
pub struct RawService {
  pub build: Option<RawBuildField>,
  pub container_name: Option<String>,
  pub hostname: Option<String>,
  pub user: Option<String>,
  #[serde(default)]
  pub depends_on: Vec<String>,
  pub environment: Option<EnvList>,
  pub command: Option<StringOrList>,
  pub entrypoint: Option<StringOrList>,
  pub restart: Option<String>,
  pub networks: Option<HashMap<String, RawServiceNetwork>>,
  #[serde(default)]
  pub volumes: Vec<String>,
  #[serde(default)]
  pub ports: Vec<String>,
  #[serde(default)]
  pub devices: Vec<String>,
  pub privileged: Option<bool>,
  pub tty: Option<bool>,
  pub ipc_mode: Option<String>,
  #[serde(default)]
  pub sysctls: HashMap<String, String>,
  #[serde(default)]
  pub cap_add: Vec<String>,
  #[serde(default)]
  pub cap_drop: Vec<String>,
  pub working_dir: Option<String>,
  #[serde(default)]
  pub cgroup_parent: Vec<String>,
  #[serde(default)]
  pub expose: Vec<String>,
  #[serde(default)]
  pub env_file: Vec<String>,
  pub deploy: Option<RawDeploy>,
}

#[derive(Debug, Deserialize, Default)]
pub struct RawIpam {
  #[serde(default)]
  pub config: Vec<RawIpamConfig>,
}

#[derive(Debug, Deserialize, Default)]
pub struct RawIpamConfig {
  pub subnet: Option<String>,
  pub gateway: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct RawNetwork {
  pub driver: Option<String>,
  pub ipam: Option<RawIpam>,
  #[serde(default)]
  pub internal: bool,
  #[serde(default)]
  pub attachable: bool,
  #[serde(default)]
  pub enable_ipv6: bool,
  #[serde(default)]
  pub labels: HashMap<String, String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct RawGitContext {
  #[serde(default)]
  pub use_git_context: bool,
  #[serde(default)]
  pub url: String,
  #[serde(default)]
  pub branch: String,
}

#[derive(Debug, Deserialize)]
pub struct RawSupervisorRepo {
  pub url: String,
  pub branch: String,
  pub current_commit: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawSupervisorService {
  #[serde(rename = "type")]
  pub kind: String,
  #[serde(default)]
  pub depends_on: Vec<String>,
  #[serde(default)]
  pub repos: Vec<RawSupervisorRepo>,
}

#[derive(Debug, Deserialize, Default)]
pub struct RawSupervisorFile {
  pub context: Option<RawGitContext>,
  #[serde(default)]
  pub services: HashMap<String, RawSupervisorService>,
}
