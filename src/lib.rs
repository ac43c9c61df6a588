#[macro_use]
extern crate tracing;

pub mod config;
pub mod config_loader;
pub mod control;
pub mod error;
pub mod hosts;
pub mod model;
pub mod orderer;
pub mod reconciler;
pub mod revision;
pub mod runtime;
pub mod store;
pub mod supervisor;
