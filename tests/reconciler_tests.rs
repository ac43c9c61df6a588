mod common;

use common::{write_fixture_project, FakeRevision, FakeRuntime};
use ros_supervisor::config_loader::{load, LoadInputs};
use ros_supervisor::reconciler::Reconciler;
use ros_supervisor::store::Store;

async fn load_fixture_project(
  dir: &std::path::Path,
  revision: &FakeRevision,
) -> ros_supervisor::model::Project {
  let (compose_path, supervisor_path) = write_fixture_project(dir).await;
  load(
    LoadInputs {
      compose_path: &compose_path,
      supervisor_path: &supervisor_path,
      working_dir: dir,
      project_name: "demo".to_string(),
    },
    revision,
  )
  .await
  .expect("fixture project should load")
}

#[tokio::test]
async fn cold_start_builds_creates_and_starts_every_service_in_order() {
  let dir = tempfile::tempdir().unwrap();
  let db_dir = tempfile::tempdir().unwrap();
  let revision = FakeRevision::new();
  let runtime = FakeRuntime::new();
  let store = Store::open(db_dir.path().to_str().unwrap()).unwrap();

  let mut project = load_fixture_project(dir.path(), &revision).await;
  assert!(!store.has_prior_run(&project.name).unwrap());

  let reconciler = Reconciler::new(&runtime, &revision, &store);
  reconciler.first_run(&mut project).await.unwrap();

  let core = project.core.as_ref().unwrap();
  assert!(core.image.id.is_some());
  assert!(core.container.id.is_some());

  for name in ["prod", "cons"] {
    let service = project.find_service(name).unwrap();
    assert!(service.image.id.is_some(), "{name} should have an image id");
    assert!(
      service.container.id.is_some(),
      "{name} should have a container id"
    );
    assert!(
      store.get_service(name, 0).unwrap().is_some(),
      "{name} should be persisted at version 0"
    );
  }

  // core, then prod before cons (orderer puts producers ahead of consumers).
  let containers = runtime.containers.lock().unwrap();
  let names: Vec<&str> =
    containers.iter().map(|c| c.name.as_str()).collect();
  let core_idx = names.iter().position(|n| *n == "demo_core").unwrap();
  let prod_idx = names.iter().position(|n| *n == "demo_prod").unwrap();
  let cons_idx = names.iter().position(|n| *n == "demo_cons").unwrap();
  assert!(core_idx < prod_idx);
  assert!(prod_idx < cons_idx);

  // restart: always means every container is left running.
  assert!(containers.iter().all(|c| c.running));

  assert!(store.has_prior_run(&project.name).unwrap());
}

#[tokio::test]
async fn observe_and_attach_rehydrates_without_mutating_runtime() {
  let dir = tempfile::tempdir().unwrap();
  let db_dir = tempfile::tempdir().unwrap();
  let revision = FakeRevision::new();
  let runtime = FakeRuntime::new();
  let store = Store::open(db_dir.path().to_str().unwrap()).unwrap();

  let mut project = load_fixture_project(dir.path(), &revision).await;
  {
    let reconciler = Reconciler::new(&runtime, &revision, &store);
    reconciler.first_run(&mut project).await.unwrap();
  }

  let containers_before = runtime.containers.lock().unwrap().len();
  let images_before = runtime.images.lock().unwrap().len();

  // A fresh in-memory Project, as if the process restarted.
  let mut warm_project = load_fixture_project(dir.path(), &revision).await;
  let reconciler = Reconciler::new(&runtime, &revision, &store);
  reconciler.observe_and_attach(&mut warm_project).await.unwrap();

  assert_eq!(runtime.containers.lock().unwrap().len(), containers_before);
  assert_eq!(runtime.images.lock().unwrap().len(), images_before);

  let prod = warm_project.find_service("prod").unwrap();
  assert!(prod.container.id.is_some());
  assert!(prod.image.id.is_some());
  assert_eq!(prod.repos.len(), 1);
  assert_eq!(prod.repos[0].current_commit, "aaa");
}

#[tokio::test]
async fn update_service_only_touches_the_service_whose_upstream_advanced() {
  let dir = tempfile::tempdir().unwrap();
  let db_dir = tempfile::tempdir().unwrap();
  let revision = FakeRevision::new();
  let runtime = FakeRuntime::new();
  let store = Store::open(db_dir.path().to_str().unwrap()).unwrap();

  let mut project = load_fixture_project(dir.path(), &revision).await;
  let reconciler = Reconciler::new(&runtime, &revision, &store);
  reconciler.first_run(&mut project).await.unwrap();

  let cons_record_before = store.get_service("cons", 0).unwrap().unwrap();
  let cons_container_id_before =
    project.find_service("cons").unwrap().container.id.clone();

  revision.set_latest("acme", "prod-repo", "main", "ccc");

  reconciler.update_service(&mut project, "prod").await.unwrap();

  let prod = project.find_service("prod").unwrap();
  assert_eq!(prod.repos[0].upstream_commit, "ccc");
  assert_eq!(prod.repos[0].current_commit, "ccc");
  assert!(!prod.repos[0].is_update_ready());

  // prod now has a new version persisted...
  assert!(store.get_service("prod", 1).unwrap().is_some());

  // ...but cons is untouched: same container id, same single version.
  let cons = project.find_service("cons").unwrap();
  assert_eq!(cons.container.id, cons_container_id_before);
  let cons_record_after = store.get_service("cons", 0).unwrap().unwrap();
  assert_eq!(cons_record_before.container_id, cons_record_after.container_id);
  assert!(store.get_service("cons", 1).unwrap().is_none());
}
