//! Computes startup/shutdown order from role and dependency count.
//!
//! Exact topological sort is unnecessary here: the stack is shallow
//! (at most two levels in practice) and role partitions the interesting
//! ordering. Within a role bucket, ascending `depends_on` count is a
//! sufficient proxy for "depended-upon services start first", and a
//! stable sort preserves input order as the tiebreak.

use crate::model::{Project, ServiceRole};

/// Startup order: producers, then distributors, then consumers; within a
/// bucket, ascending `depends_on` count, ties broken by insertion order.
pub fn startup_order(project: &Project) -> Vec<String> {
  let mut order = Vec::new();
  for role in
    [ServiceRole::Producer, ServiceRole::Distributor, ServiceRole::Consumer]
  {
    let mut bucket: Vec<&str> = project
      .services
      .iter()
      .filter(|s| s.role == Some(role))
      .map(|s| s.name.as_str())
      .collect();
    bucket.sort_by_key(|name| {
      project
        .find_service(name)
        .map(|s| s.depends_on.len())
        .unwrap_or(0)
    });
    order.extend(bucket.into_iter().map(str::to_string));
  }
  // Services with no recognized role keep their declared order, appended
  // last, so a misconfigured role never silently drops a service.
  for service in &project.services {
    if service.role.is_none() && !order.contains(&service.name) {
      order.push(service.name.clone());
    }
  }
  order
}

/// Shutdown order is the reverse of startup order.
pub fn shutdown_order(project: &Project) -> Vec<String> {
  let mut order = startup_order(project);
  order.reverse();
  order
}
