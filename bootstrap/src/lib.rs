//! warden-bootstrap - shared service startup skeleton

mod retry;
mod runtime;

pub use retry::*;
pub use runtime::*;
