mod common;

use std::path::Path;

use common::{write_fixture_project, FakeRevision};
use ros_supervisor::config_loader::{load, LoadInputs};
use ros_supervisor::model::ServiceRole;

#[tokio::test]
async fn loads_compose_and_supervisor_yaml_into_project() {
  let dir = tempfile::tempdir().unwrap();
  let (compose_path, supervisor_path) =
    write_fixture_project(dir.path()).await;
  let revision = FakeRevision::new();

  let project = load(
    LoadInputs {
      compose_path: &compose_path,
      supervisor_path: &supervisor_path,
      working_dir: dir.path(),
      project_name: "demo".to_string(),
    },
    &revision,
  )
  .await
  .expect("fixture project should load");

  assert!(project.core.is_some());
  assert_eq!(project.services.len(), 2);

  let prod = project.find_service("prod").unwrap();
  assert_eq!(prod.role, Some(ServiceRole::Producer));
  assert_eq!(prod.repos.len(), 1);
  assert_eq!(prod.repos[0].current_commit, "aaa");
  assert_eq!(prod.image.name, "demo_prod");
  assert_eq!(prod.container.name, "demo_prod");

  let cons = project.find_service("cons").unwrap();
  assert_eq!(cons.role, Some(ServiceRole::Consumer));
  assert_eq!(cons.depends_on, vec!["prod".to_string()]);
}

#[tokio::test]
async fn supervisor_service_absent_from_compose_is_config_error() {
  let dir = tempfile::tempdir().unwrap();
  let compose_path = dir.path().join("docker-compose.yml");
  let supervisor_path = dir.path().join("ros-supervisor.yml");
  tokio::fs::write(
    &compose_path,
    "services:\n  core:\n    build:\n      context: .\n",
  )
  .await
  .unwrap();
  tokio::fs::write(
    &supervisor_path,
    "services:\n  ghost:\n    type: producer\n    repos: []\n",
  )
  .await
  .unwrap();

  let revision = FakeRevision::new();
  let result = load(
    LoadInputs {
      compose_path: &compose_path,
      supervisor_path: &supervisor_path,
      working_dir: dir.path(),
      project_name: "demo".to_string(),
    },
    &revision,
  )
  .await;

  assert!(result.is_err());
}

#[tokio::test]
async fn repo_url_without_github_host_is_config_error() {
  let dir = tempfile::tempdir().unwrap();
  let compose_path = dir.path().join("docker-compose.yml");
  let supervisor_path = dir.path().join("ros-supervisor.yml");
  tokio::fs::write(
    &compose_path,
    "services:\n  core:\n    build:\n      context: .\n  prod:\n    build:\n      context: .\n",
  )
  .await
  .unwrap();
  tokio::fs::write(
    &supervisor_path,
    "services:\n  prod:\n    type: producer\n    repos:\n      - url: https://example.com/acme/widgets\n        branch: main\n",
  )
  .await
  .unwrap();

  let revision = FakeRevision::new();
  let result = load(
    LoadInputs {
      compose_path: &compose_path,
      supervisor_path: &supervisor_path,
      working_dir: dir.path(),
      project_name: "demo".to_string(),
    },
    &revision,
  )
  .await;

  assert!(result.is_err());
}

#[tokio::test]
async fn missing_compose_file_is_config_error() {
  let dir = tempfile::tempdir().unwrap();
  let missing = dir.path().join("nope.yml");
  let supervisor_path = dir.path().join("ros-supervisor.yml");
  tokio::fs::write(&supervisor_path, "services: {}\n").await.unwrap();

  let revision = FakeRevision::new();
  let result = load(
    LoadInputs {
      compose_path: &missing,
      supervisor_path: &supervisor_path,
      working_dir: dir.path(),
      project_name: "demo".to_string(),
    },
    &revision,
  )
  .await;

  assert!(result.is_err());
}

#[tokio::test]
async fn use_git_context_clones_before_resolving_paths() {
  let dir = tempfile::tempdir().unwrap();
  let compose_path = dir.path().join("docker-compose.yml");
  let supervisor_path = dir.path().join("ros-supervisor.yml");
  tokio::fs::write(
    &compose_path,
    "services:\n  core:\n    build:\n      context: .\n",
  )
  .await
  .unwrap();
  tokio::fs::write(
    &supervisor_path,
    "context:\n  use_git_context: true\n  url: https://github.com/acme/stack\n  branch: main\nservices: {}\n",
  )
  .await
  .unwrap();

  let revision = FakeRevision::new();
  load(
    LoadInputs {
      compose_path: &compose_path,
      supervisor_path: &supervisor_path,
      working_dir: dir.path(),
      project_name: "demo".to_string(),
    },
    &revision,
  )
  .await
  .expect("project with empty services should still load");

  let clones = revision.clones.lock().unwrap();
  assert_eq!(clones.len(), 1);
  assert_eq!(clones[0], Path::new(dir.path()));
}
