//! # Adapters Layer

mod memory_node;

pub use memory_node::InMemoryLockNode;
