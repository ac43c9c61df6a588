//! Liveness probe for a host. Raw ICMP sockets require elevated
//! privileges the supervisor process may not have, so this uses a TCP
//! connect to the host's HTTPS port as an equivalent "is this host up"
//! check, within a 2s timeout and 3 attempts.

use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::timeout;

const PROBE_TIMEOUT: Duration = Duration::from_secs(2);
const MAX_ATTEMPTS: u32 = 3;

pub async fn reachable(host: &str) -> bool {
  for attempt in 1..=MAX_ATTEMPTS {
    let addr = format!("{host}:443");
    match timeout(PROBE_TIMEOUT, TcpStream::connect(&addr)).await {
      Ok(Ok(_)) => return true,
      _ => {
        tracing::debug!(
          "reachability probe attempt {attempt}/{MAX_ATTEMPTS} to {host} failed"
        );
      }
    }
  }
  false
}
