#[macro_use]
extern crate tracing;

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use ros_supervisor::model::Command;
use ros_supervisor::revision::RevisionClient;
use ros_supervisor::runtime::RuntimeClient;
use ros_supervisor::store::Store;
use ros_supervisor::supervisor::SupervisorLoop;
use ros_supervisor::{config, control};

fn init_logging(env: &config::Env) {
  use tracing_subscriber::EnvFilter;

  let filter = EnvFilter::try_new(&env.logging_level)
    .unwrap_or_else(|_| EnvFilter::new("info"));
  let subscriber = tracing_subscriber::fmt().with_env_filter(filter);

  match &env.logging_path {
    Some(path) => {
      let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .expect("failed to open log file");
      subscriber.with_writer(file).init();
    }
    None => subscriber.init(),
  }
}

async fn app() -> anyhow::Result<()> {
  dotenvy::dotenv().ok();
  let env = config::env();
  init_logging(env);

  info!("ros-supervisor starting (dev_env={})", env.dev_env);

  let revision = RevisionClient::new(env.github_access_token.clone());
  let runtime = RuntimeClient::connect()?;
  let store = Store::open(&env.db_path)?;

  let working_dir = PathBuf::from(&env.supervisor_docker_project_path);
  let compose_path = PathBuf::from(&env.supervisor_docker_compose_file);
  let supervisor_path = PathBuf::from(&env.supervisor_config_file);
  let state_file_path = PathBuf::from(&env.state_file_path);

  let project_name = working_dir
    .file_name()
    .map(|n| n.to_string_lossy().to_string())
    .unwrap_or_else(|| "ros".to_string());

  let command = Arc::new(Mutex::new(Command::default()));
  let cancel = CancellationToken::new();

  let hosts_file_path = if env.dev_env == "production" {
    None
  } else {
    Some(PathBuf::from(&env.hosts_file_path))
  };

  let supervisor_loop = SupervisorLoop {
    runtime: &runtime,
    revision: &revision,
    store: &store,
    compose_path,
    supervisor_path,
    working_dir,
    project_name,
    state_file_path,
    tick: env.update_frequency(),
    command: command.clone(),
    cancel: cancel.clone(),
    hosts_file_path,
  };
  let loop_future = supervisor_loop.run();
  let control_future =
    control::serve(env.control_bind_ip(), env.control_port(), command);

  let mut term_signal =
    tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
  let mut int_signal =
    tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())?;

  tokio::pin!(loop_future);
  tokio::pin!(control_future);

  loop {
    tokio::select! {
      res = &mut loop_future => {
        res?;
        break;
      }
      res = &mut control_future => {
        res?;
        break;
      }
      _ = term_signal.recv() => {
        info!("received SIGTERM, shutting down");
        cancel.cancel();
      }
      _ = int_signal.recv() => {
        info!("received SIGINT, shutting down");
        cancel.cancel();
      }
    }
  }

  Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  app().await
}
