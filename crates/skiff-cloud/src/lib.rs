//! Namespace management API client for skiff

pub mod error;
pub mod namespace;

pub use error::{CloudError, Result};
pub use namespace::{CloudClient, validate_namespace_name};
