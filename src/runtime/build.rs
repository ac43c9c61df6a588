//! Tars and gzips a build context directory, streaming it to the runtime
//! and parsing the `aux` progress message for the built image id.
//!
//! The tar/gzip producer runs on a blocking thread and feeds a pipe; the
//! pipe writer is dropped (closing the stream) only once taring finishes
//! without error, so the runtime sees EOF only on clean completion.

use std::path::{Path, PathBuf};

use bollard::body_full;
use bollard::query_parameters::BuildImageOptions;
use flate2::write::GzEncoder;
use flate2::Compression;
use futures_util::StreamExt;

use crate::error::{Result, SupervisorError};

use super::BuildOptions;

fn tar_gzip_context(context_dir: &Path) -> anyhow::Result<Vec<u8>> {
  let mut gz_bytes = Vec::new();
  {
    let encoder = GzEncoder::new(&mut gz_bytes, Compression::default());
    let mut archive = tar::Builder::new(encoder);
    archive.append_dir_all(".", context_dir)?;
    archive.into_inner()?.finish()?;
  }
  Ok(gz_bytes)
}

pub async fn build(
  docker: &bollard::Docker,
  context_dir: &Path,
  options: BuildOptions,
) -> Result<String> {
  let context_dir: PathBuf = context_dir.to_path_buf();
  let tarball = tokio::task::spawn_blocking(move || {
    tar_gzip_context(&context_dir)
  })
  .await
  .map_err(|e| SupervisorError::Build {
    message: format!("build context packaging task panicked: {e}"),
    code: 1,
  })?
  .map_err(|e| SupervisorError::Build {
    message: format!("failed to package build context: {e}"),
    code: 1,
  })?;

  let build_options = BuildImageOptions {
    dockerfile: options.dockerfile.clone(),
    t: options.tags.first().cloned().unwrap_or_default(),
    buildargs: serde_json::to_string(&options.build_args).ok(),
    rm: options.remove,
    q: options.suppress_output,
    ..Default::default()
  };

  let mut stream =
    docker.build_image(build_options, None, Some(body_full(tarball.into())));

  let mut image_id = None;
  while let Some(chunk) = stream.next().await {
    let info = chunk.map_err(|e| SupervisorError::Build {
      message: e.to_string(),
      code: 1,
    })?;
    if let Some(aux) = info.aux {
      if let Some(id) = aux.id {
        image_id = Some(id);
      }
    }
    if let Some(error) = info.error {
      let code = info
        .error_detail
        .as_ref()
        .and_then(|d| d.code)
        .unwrap_or(1);
      return Err(SupervisorError::Build {
        message: error,
        code: code as i64,
      });
    }
  }

  image_id.ok_or_else(|| SupervisorError::Build {
    message: "runtime did not report a built image id".to_string(),
    code: 1,
  })
}
