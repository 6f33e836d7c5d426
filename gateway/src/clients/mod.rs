//! Clients for external services.

pub mod sso;
