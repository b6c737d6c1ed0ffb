//! Custom scheduling policy for a Kubernetes cluster:
//! - a webhook scheduler extender that filters and scores candidate nodes by
//!   a GPU capability label (`extender`, served by `transport`), backed by a
//!   watch-driven node cache (`node_cache`);
//! - a sticky-affinity scheduling extension that pins pods to the node set
//!   annotated on their owning controller (`sticky`).

pub mod error;
pub mod extender;
pub mod framework;
pub mod node_cache;
pub mod owner;
pub mod protocol;
pub mod sticky;
pub mod transport;
mod util;

pub use error::{
    Error,
    Result,
};
