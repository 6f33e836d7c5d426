//! warden-gateway - authentication and rate limiting front for gRPC services
//!
//! The gateway sits between the transport and the business handlers. Each
//! inbound call runs through an interceptor chain that checks per-credential
//! rate limits, validates the bearer token against the SSO service and binds
//! the verified identity into the request for downstream use.

pub mod app;
pub mod clients;
pub mod interceptor;
