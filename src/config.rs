//! Environment configuration, parsed once via `envy` and cached behind a
//! `OnceLock` for the rest of the process lifetime.

use std::sync::OnceLock;

use serde::Deserialize;

fn default_update_frequency() -> String {
  "10".to_string()
}

fn default_db_path() -> String {
  "/supervisor/db".to_string()
}

fn default_hosts_file_path() -> String {
  "/etc/hosts".to_string()
}

fn default_state_file_path() -> String {
  "/supervisor/supervisor_services.yml".to_string()
}

fn default_dev_env() -> String {
  "development".to_string()
}

fn default_logging_level() -> String {
  "info".to_string()
}

#[derive(Debug, Deserialize)]
pub struct Env {
  pub supervisor_docker_project_path: String,
  pub supervisor_docker_compose_file: String,
  pub supervisor_config_file: String,
  pub github_access_token: Option<String>,
  #[serde(default = "default_update_frequency")]
  pub update_frequency: String,
  #[serde(default = "default_logging_level")]
  pub logging_level: String,
  pub logging_path: Option<String>,
  pub hostmachine_name: Option<String>,
  #[serde(default = "default_dev_env")]
  pub dev_env: String,
  #[serde(default = "default_db_path")]
  pub db_path: String,
  #[serde(default = "default_hosts_file_path")]
  pub hosts_file_path: String,
  #[serde(default = "default_state_file_path")]
  pub state_file_path: String,
  #[serde(default)]
  pub control_bind_ip: Option<String>,
  #[serde(default)]
  pub control_port: Option<u16>,
}

/// Poll interval between Supervise ticks. Malformed values fall back to
/// the 10 s default with a logged warning, since the field is a raw,
/// unvalidated string.
impl Env {
  pub fn update_frequency(&self) -> std::time::Duration {
    match self.update_frequency.parse::<u64>() {
      Ok(secs) => std::time::Duration::from_secs(secs),
      Err(_) => {
        tracing::warn!(
          "UPDATE_FREQUENCY={:?} is not a valid integer number of seconds; defaulting to 10s",
          self.update_frequency
        );
        std::time::Duration::from_secs(10)
      }
    }
  }

  pub fn control_bind_ip(&self) -> String {
    self.control_bind_ip.clone().unwrap_or_else(|| "0.0.0.0".to_string())
  }

  pub fn control_port(&self) -> u16 {
    self.control_port.unwrap_or(8120)
  }
}

pub fn env() -> &'static Env {
  static ENV: OnceLock<Env> = OnceLock::new();
  ENV.get_or_init(|| {
    envy::from_env().expect("failed to parse supervisor environment")
  })
}
