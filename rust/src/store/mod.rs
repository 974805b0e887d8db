//! Resolved configuration values, flat or nested by a path separator.

pub mod node;
pub mod variables;

pub use node::VariableNode;
pub use variables::{Layout, VariableStore, DEFAULT_SEPARATOR};
