//! Runtime Client: thin typed wrapper over the container runtime's HTTP
//! API, built on `bollard` for container/image/network inspection and
//! mutation.

mod build;
mod containers;
mod images;
mod networks;
mod types;

pub use types::{
  BuildOptions, ContainerInfo, ContainerSpec, ImageInfo, NetworkInfo,
  NetworkSpec,
};

use async_trait::async_trait;
use bollard::query_parameters::{
  CreateContainerOptions, InspectNetworkOptions, ListContainersOptions,
  ListImagesOptions, ListNetworksOptions, RemoveContainerOptions,
  StartContainerOptions, StopContainerOptions,
};
use bollard::Docker;

use crate::error::{Result, SupervisorError};

fn runtime_err(err: bollard::errors::Error) -> SupervisorError {
  SupervisorError::Runtime(anyhow::anyhow!(err))
}

#[async_trait]
pub trait RuntimeApi: Send + Sync {
  async fn list_containers(&self) -> Result<Vec<ContainerInfo>>;
  async fn create_container(&self, spec: &ContainerSpec) -> Result<String>;
  async fn start_container(&self, id: &str) -> Result<()>;
  async fn stop_container(&self, id: &str) -> Result<()>;
  async fn remove_container(&self, id: &str) -> Result<()>;

  async fn list_images(&self) -> Result<Vec<ImageInfo>>;
  async fn build_image(
    &self,
    context_dir: &std::path::Path,
    options: BuildOptions,
  ) -> Result<String>;

  async fn inspect_network(&self, name: &str) -> Result<Option<NetworkInfo>>;
  async fn create_network(&self, spec: &NetworkSpec) -> Result<String>;
  async fn remove_network(&self, id: &str) -> Result<()>;
  async fn list_networks(&self) -> Result<Vec<NetworkInfo>>;
}

pub struct RuntimeClient {
  docker: Docker,
}

impl RuntimeClient {
  pub fn connect() -> anyhow::Result<Self> {
    Ok(Self {
      docker: Docker::connect_with_local_defaults()?,
    })
  }

  pub(crate) fn docker(&self) -> &Docker {
    &self.docker
  }
}

#[async_trait]
impl RuntimeApi for RuntimeClient {
  async fn list_containers(&self) -> Result<Vec<ContainerInfo>> {
    let summaries = self
      .docker
      .list_containers(Some(ListContainersOptions {
        all: true,
        ..Default::default()
      }))
      .await
      .map_err(runtime_err)?;
    Ok(summaries.into_iter().map(containers::to_container_info).collect())
  }

  async fn create_container(&self, spec: &ContainerSpec) -> Result<String> {
    let body = containers::to_create_body(spec);
    let response = self
      .docker
      .create_container(
        Some(CreateContainerOptions {
          name: spec.name.clone(),
          ..Default::default()
        }),
        body,
      )
      .await
      .map_err(runtime_err)?;
    Ok(response.id)
  }

  async fn start_container(&self, id: &str) -> Result<()> {
    self
      .docker
      .start_container(id, None::<StartContainerOptions>)
      .await
      .map_err(runtime_err)?;
    Ok(())
  }

  async fn stop_container(&self, id: &str) -> Result<()> {
    self
      .docker
      .stop_container(id, None::<StopContainerOptions>)
      .await
      .map_err(runtime_err)?;
    Ok(())
  }

  async fn remove_container(&self, id: &str) -> Result<()> {
    self
      .docker
      .remove_container(
        id,
        Some(RemoveContainerOptions {
          force: true,
          ..Default::default()
        }),
      )
      .await
      .map_err(runtime_err)?;
    Ok(())
  }

  async fn list_images(&self) -> Result<Vec<ImageInfo>> {
    let summaries = self
      .docker
      .list_images(Some(ListImagesOptions {
        all: false,
        ..Default::default()
      }))
      .await
      .map_err(runtime_err)?;
    Ok(summaries.into_iter().map(images::to_image_info).collect())
  }

  async fn build_image(
    &self,
    context_dir: &std::path::Path,
    options: BuildOptions,
  ) -> Result<String> {
    build::build(&self.docker, context_dir, options).await
  }

  async fn inspect_network(&self, name: &str) -> Result<Option<NetworkInfo>> {
    match self
      .docker
      .inspect_network(name, None::<InspectNetworkOptions>)
      .await
    {
      Ok(network) => Ok(Some(networks::to_network_info(network))),
      Err(bollard::errors::Error::DockerResponseServerError {
        status_code: 404,
        ..
      }) => Ok(None),
      Err(err) => Err(runtime_err(err)),
    }
  }

  async fn create_network(&self, spec: &NetworkSpec) -> Result<String> {
    let request = networks::to_create_request(spec);
    let response =
      self.docker.create_network(request).await.map_err(runtime_err)?;
    Ok(response.id.unwrap_or_default())
  }

  async fn remove_network(&self, id: &str) -> Result<()> {
    self.docker.remove_network(id).await.map_err(runtime_err)?;
    Ok(())
  }

  async fn list_networks(&self) -> Result<Vec<NetworkInfo>> {
    let networks = self
      .docker
      .list_networks(None::<ListNetworksOptions>)
      .await
      .map_err(runtime_err)?;
    Ok(networks.into_iter().map(networks::to_network_info).collect())
  }
}

/// `ensure_no_container_named`: removes any pre-existing container with
/// this name, tolerating "doesn't exist".
pub async fn ensure_no_container_named(
  runtime: &dyn RuntimeApi,
  name: &str,
) -> Result<()> {
  let containers = runtime.list_containers().await?;
  if let Some(existing) = containers.iter().find(|c| c.name == name) {
    runtime.stop_container(&existing.id).await.ok();
    runtime.remove_container(&existing.id).await?;
  }
  Ok(())
}

/// `ensure_network`: creates the network if it doesn't already exist.
pub async fn ensure_network(
  runtime: &dyn RuntimeApi,
  spec: &NetworkSpec,
) -> Result<String> {
  if let Some(existing) = runtime.inspect_network(&spec.name).await? {
    return Ok(existing.id);
  }
  runtime.create_network(spec).await
}
