/// A single upstream source repository tracked for a service.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Repo {
  pub name: String,
  pub owner: String,
  pub url: String,
  pub branch: String,
  pub directory: String,
  pub current_commit: String,
  pub upstream_commit: String,
}

impl Repo {
  /// Derives `owner`/`name` from a GitHub URL's path components after
  /// `github.com`. Returns `None` if the URL has no `github.com` segment.
  pub fn from_url(url: &str, branch: &str) -> Option<Self> {
    let segments: Vec<&str> = url
      .trim_end_matches('/')
      .trim_end_matches(".git")
      .split('/')
      .collect();
    let idx = segments.iter().position(|s| *s == "github.com")?;
    let owner = segments.get(idx + 1)?.to_string();
    let name = segments.get(idx + 2)?.to_string();
    Some(Self {
      name,
      owner,
      url: url.to_string(),
      branch: branch.to_string(),
      directory: String::new(),
      current_commit: String::new(),
      upstream_commit: String::new(),
    })
  }

  pub fn is_update_ready(&self) -> bool {
    !self.current_commit.is_empty()
      && !self.upstream_commit.is_empty()
      && self.current_commit != self.upstream_commit
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_owner_and_name() {
    let repo =
      Repo::from_url("https://github.com/acme/widgets.git", "main")
        .unwrap();
    assert_eq!(repo.owner, "acme");
    assert_eq!(repo.name, "widgets");
    assert_eq!(repo.branch, "main");
  }

  #[test]
  fn missing_github_host_is_none() {
    assert!(Repo::from_url("https://example.com/acme/widgets", "main")
      .is_none());
  }

  #[test]
  fn update_ready_requires_both_commits() {
    let mut repo = Repo::from_url(
      "https://github.com/acme/widgets",
      "main",
    )
    .unwrap();
    assert!(!repo.is_update_ready());
    repo.current_commit = "aaa".into();
    assert!(!repo.is_update_ready());
    repo.upstream_commit = "bbb".into();
    assert!(repo.is_update_ready());
    repo.upstream_commit = "aaa".into();
    assert!(!repo.is_update_ready());
  }
}
