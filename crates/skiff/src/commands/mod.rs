pub mod build;
pub mod login;
pub mod namespace;
