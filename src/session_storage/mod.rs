//! Session storage backends.
//!
//! The store is the collaborator boundary for session state: anything
//! implementing `tower_sessions::SessionStore` can stand in for the shipped
//! in-memory store in a distributed deployment.

pub mod memory;

pub use memory::MemoryStore;
