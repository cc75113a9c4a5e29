//! Clients for external collaborators.

pub mod backend;

pub use backend::{BackendClient, BackendError};
