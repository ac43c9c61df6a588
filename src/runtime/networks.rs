use bollard::models::{Ipam, IpamConfig, Network as BollardNetwork};

use super::{NetworkInfo, NetworkSpec};

pub fn to_network_info(network: BollardNetwork) -> NetworkInfo {
  NetworkInfo {
    id: network.id.unwrap_or_default(),
    name: network.name.unwrap_or_default(),
  }
}

pub fn to_create_request(
  spec: &NetworkSpec,
) -> bollard::models::NetworkCreateRequest {
  let config = spec
    .ipam
    .iter()
    .map(|entry| IpamConfig {
      subnet: entry.subnet.clone(),
      gateway: entry.gateway.clone(),
      ..Default::default()
    })
    .collect();

  bollard::models::NetworkCreateRequest {
    name: spec.name.clone(),
    driver: spec.driver.clone(),
    check_duplicate: Some(spec.check_duplicate),
    internal: Some(spec.internal),
    attachable: Some(spec.attachable),
    enable_ipv6: Some(spec.enable_ipv6),
    labels: Some(spec.labels.clone()),
    ipam: Some(Ipam { config: Some(config), ..Default::default() }),
    ..Default::default()
  }
}
