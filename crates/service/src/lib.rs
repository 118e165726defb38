//! Declarative service model: descriptors, the service registry, and the
//! resolved dependency graph a worker serves from.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod descriptor;
mod error;
mod graph;
mod handle;
mod registry;

pub use descriptor::{
    EndpointSpec, HookSpec, LeaseConfig, ServiceDescriptor, ServiceDescriptorBuilder,
};
pub use error::{Error, Result};
pub use graph::{GraphLoader, ServiceGraph, ServiceNode};
pub use handle::{HookError, ServiceContext, ServiceFactory, ServiceHandle, ServiceRole};
pub use registry::{ServiceDefinition, ServiceRegistry};
