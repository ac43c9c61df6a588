//! The single place that issues runtime-mutating operations. Three entry
//! points drive the Supervisor loop's Reconcile state, plus the
//! per-service rolling update invoked when a repo's upstream moves.

use crate::config_loader::serialize_services;
use crate::error::Result;
use crate::model::{Command, Project, Service};
use crate::orderer::startup_order;
use crate::revision::RevisionApi;
use crate::runtime::{
  ensure_network, ensure_no_container_named, BuildOptions, ContainerSpec,
  NetworkSpec, RuntimeApi,
};
use crate::store::Store;

pub struct Reconciler<'a> {
  runtime: &'a dyn RuntimeApi,
  revision: &'a dyn RevisionApi,
  store: &'a Store,
}

impl<'a> Reconciler<'a> {
  pub fn new(
    runtime: &'a dyn RuntimeApi,
    revision: &'a dyn RevisionApi,
    store: &'a Store,
  ) -> Self {
    Self { runtime, revision, store }
  }

  fn default_network_name(&self, project: &Project) -> String {
    format!("{}_default", project.name)
  }

  async fn ensure_project_networks(&self, project: &Project) -> Result<()> {
    for network in &project.networks {
      ensure_network(self.runtime, &NetworkSpec::from(network)).await?;
    }
    // The default bridge network every container without an explicit
    // `networks:` entry attaches to.
    ensure_network(
      self.runtime,
      &NetworkSpec {
        name: self.default_network_name(project),
        driver: None,
        ipam: Vec::new(),
        check_duplicate: true,
        internal: false,
        attachable: true,
        enable_ipv6: false,
        labels: Default::default(),
      },
    )
    .await?;
    Ok(())
  }

  async fn build_image_for(&self, service: &Service) -> Result<String> {
    let options = BuildOptions {
      tags: vec![service.image.reference()],
      dockerfile: if service.build.dockerfile.is_empty() {
        "Dockerfile".to_string()
      } else {
        service.build.dockerfile.clone()
      },
      build_args: service.build.args.clone(),
      remove: true,
      suppress_output: false,
    };
    let context_dir = std::path::Path::new(&service.build.context);
    self.runtime.build_image(context_dir, options).await
  }

  async fn create_container_for(
    &self,
    project: &Project,
    service: &Service,
  ) -> Result<String> {
    ensure_no_container_named(self.runtime, &service.container.name).await?;
    let network_name = self.default_network_name(project);
    let spec = ContainerSpec::from_service(service, &network_name);
    self.runtime.create_container(&spec).await
  }

  async fn start_if_autostart(&self, service: &Service, id: &str) -> Result<()> {
    if service.restart.should_autostart() {
      self.runtime.start_container(id).await?;
    }
    Ok(())
  }

  async fn persist(&self, project: &Project, name: &str) -> Result<()> {
    let Some(service) = project.find_service(name) else {
      return Ok(());
    };
    let version = self
      .store
      .latest_service(name)?
      .map(|r| r.version + 1)
      .unwrap_or(0);
    let processed_yaml = serialize_services(std::slice::from_ref(service))?;
    let record = crate::model::ServiceRecord {
      name: name.to_string(),
      version,
      project_id: project.name.clone(),
      image_id: service.image.id.clone(),
      container_id: service.container.id.clone(),
      network_id: None,
      volume_id: None,
      raw_docker_yaml: String::new(),
      raw_supervisor_yaml: String::new(),
      processed_yaml,
    };
    self.store.add_service(&record)
  }

  /// Builds, creates, and starts one service (or core), attaching the
  /// resulting identifiers to the in-memory `Service`.
  async fn stand_up(&self, project: &mut Project, name: &str) -> Result<()> {
    let context = project
      .find_service(name)
      .map(|s| s.build.context.clone())
      .unwrap_or_default();
    if context.is_empty() {
      tracing::warn!("service {name} has no build context; skipping build");
    }
    let service = project
      .find_service(name)
      .expect("name comes from project's own service list")
      .clone();
    let image_id = self.build_image_for(&service).await?;
    let container_id = self.create_container_for(project, &service).await?;
    self.start_if_autostart(&service, &container_id).await?;

    if let Some(s) = project.find_service_mut(name) {
      s.image.id = Some(image_id);
      s.container.id = Some(container_id);
    }
    self.persist(project, name).await
  }

  async fn tear_down(&self, project: &Project, name: &str) -> Result<()> {
    if let Some(service) = project.find_service(name) {
      ensure_no_container_named(self.runtime, &service.container.name)
        .await?;
    }
    Ok(())
  }

  /// Precondition: the Store records no prior run for this project.
  pub async fn first_run(&self, project: &mut Project) -> Result<()> {
    self.ensure_project_networks(project).await?;

    if let Some(core_name) = project.core.as_ref().map(|c| c.name.clone()) {
      self.stand_up(project, &core_name).await?;
    }
    for name in startup_order(project) {
      self.stand_up(project, &name).await?;
    }
    self.store.record_project(&project.name)?;
    Ok(())
  }

  /// Precondition: a prior run exists and `cmd` requests an update.
  pub async fn reconcile_with_command(
    &self,
    project: &mut Project,
    cmd: &mut Command,
  ) -> Result<()> {
    let mut shutdown = startup_order(project);
    shutdown.reverse();
    for name in &shutdown {
      self.tear_down(project, name).await?;
    }
    if cmd.update_core {
      if let Some(core_name) = project.core.as_ref().map(|c| c.name.clone()) {
        self.tear_down(project, &core_name).await?;
      }
    }

    if cmd.update_core {
      self.ensure_project_networks(project).await?;
      if let Some(core_name) = project.core.as_ref().map(|c| c.name.clone()) {
        self.stand_up(project, &core_name).await?;
      }
      for name in startup_order(project) {
        self.stand_up(project, &name).await?;
      }
    } else if cmd.update_services {
      self.ensure_project_networks(project).await?;
      for name in startup_order(project) {
        self.stand_up(project, &name).await?;
      }
    }

    cmd.reset();
    Ok(())
  }

  /// Precondition: a prior run exists and no command is pending. Attaches
  /// observed runtime state to the in-memory project without mutating
  /// the runtime.
  pub async fn observe_and_attach(&self, project: &mut Project) -> Result<()> {
    let containers = self.runtime.list_containers().await?;
    let images = self.runtime.list_images().await?;

    let names: Vec<String> = project
      .services
      .iter()
      .chain(project.core.iter())
      .map(|s| s.name.clone())
      .collect();

    for name in &names {
      let Some(service) = project.find_service_mut(name) else { continue };

      if let Some(container) =
        containers.iter().find(|c| c.name == service.container.name)
      {
        service.container.id = Some(container.id.clone());
      }
      if let Some(image) = images.iter().find(|i| {
        i.repo_tags.iter().any(|t| *t == service.image.reference())
      }) {
        service.image.id = Some(image.id.clone());
      }

      if let Some(record) = self.store.latest_service(name)? {
        if !record.processed_yaml.is_empty() {
          if let Ok(rehydrated) = serde_yaml_ng::from_str::<Vec<Service>>(
            &record.processed_yaml,
          ) {
            if let Some(saved) = rehydrated.into_iter().find(|s| &s.name == name) {
              service.repos = saved.repos;
              service.role = saved.role;
            }
          }
        }
      }
    }

    for name in &names {
      let Some(service) = project.find_service(name) else { continue };
      if !service.restart.should_autostart() {
        continue;
      }
      let running = service
        .container
        .id
        .as_ref()
        .and_then(|id| containers.iter().find(|c| &c.id == id))
        .map(|c| c.running)
        .unwrap_or(false);
      if !running {
        if let Some(id) = service.container.id.clone() {
          self.runtime.start_container(&id).await?;
        }
      }
    }
    Ok(())
  }

  /// Rebuilds and restarts a single service because one of its repos
  /// advanced upstream.
  pub async fn update_service(
    &self,
    project: &mut Project,
    name: &str,
  ) -> Result<()> {
    self.tear_down(project, name).await?;
    self.stand_up(project, name).await?;

    let Some(service) = project.find_service_mut(name) else {
      return Ok(());
    };
    for repo in &mut service.repos {
      repo.upstream_commit = self
        .revision
        .latest_commit(&repo.owner, &repo.name, &repo.branch)
        .await?;
      repo.current_commit = repo.upstream_commit.clone();
    }
    self.persist(project, name).await
  }
}
