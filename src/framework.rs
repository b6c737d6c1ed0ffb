//! Minimal mirror of the host scheduler framework's cycle-scoped plumbing:
//! the key/value store that carries data between extension points of one
//! scheduling cycle, and the status a filter extension reports back.
//!
//! The store is untyped by the framework's contract; callers are expected to
//! wrap reads with a typed accessor at the boundary so the downcast failure
//! mode surfaces in exactly one place.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

/// Outcome of a filter extension point for a single candidate node.
#[derive(Clone, Debug, PartialEq)]
pub enum Status {
    Success,
    Unschedulable {
        node_name: String,
        pinned: Vec<String>,
    },
}

impl Status {
    pub fn is_success(&self) -> bool {
        return matches!(self, Status::Success);
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Success => write!(f, "success"),
            Status::Unschedulable { node_name, pinned } => {
                write!(f, "{node_name} node not in sticky nodes list {pinned:?}")
            },
        }
    }
}

/// Per-pod, per-scheduling-cycle key/value store. Created empty when the
/// cycle starts and destroyed with it; never shared across pods or cycles.
/// Exactly one execution context owns a cycle at a time, so no locking.
#[derive(Default)]
pub struct CycleState {
    data: HashMap<&'static str, Box<dyn Any + Send + Sync>>,
}

impl CycleState {
    pub fn new() -> CycleState {
        return CycleState::default();
    }

    pub fn write<T: Any + Send + Sync>(&mut self, key: &'static str, value: T) {
        self.data.insert(key, Box::new(value));
    }

    /// Returns None when the key is absent or holds a value of another type.
    pub fn read<T: Any>(&self, key: &'static str) -> Option<&T> {
        return self.data.get(key).and_then(|v| v.downcast_ref());
    }
}
