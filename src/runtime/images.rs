use bollard::secret::ImageSummary;

use super::ImageInfo;

pub fn to_image_info(summary: ImageSummary) -> ImageInfo {
  ImageInfo {
    id: summary.id,
    repo_tags: summary.repo_tags,
  }
}
