use thiserror::Error;

/// Error taxonomy for the supervisor. Kinds, not implementation detail:
/// the Supervisor loop matches on these to decide whether to skip, retry,
/// or abort.
#[derive(Debug, Error)]
pub enum SupervisorError {
  #[error("config error: {0}")]
  Config(String),

  #[error("network error: {0}")]
  Network(#[source] anyhow::Error),

  #[error("auth error: {0}")]
  Auth(String),

  #[error("build error (code {code}): {message}")]
  Build { message: String, code: i64 },

  #[error("runtime error: {0}")]
  Runtime(#[source] anyhow::Error),

  #[error("state error: {0}")]
  State(#[source] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, SupervisorError>;

impl SupervisorError {
  pub fn config(msg: impl Into<String>) -> Self {
    Self::Config(msg.into())
  }

  pub fn auth(msg: impl Into<String>) -> Self {
    Self::Auth(msg.into())
  }

  /// Whether the loop should keep going after logging this error.
  /// Only a Config error during first-run bootstrap is fatal; that
  /// decision is made by the caller, not this flag.
  pub fn is_recoverable(&self) -> bool {
    !matches!(self, SupervisorError::Config(_))
  }
}
