//! Palisade - an access-controlled reverse proxy gateway.
//!
//! Palisade sits in front of a private network-controller HTTP API and relays
//! only a whitelisted subset of operations to it. Every inbound request is
//! authenticated and authorized before anything touches the upstream:
//!
//! 1. The client address (transport peer, or a trusted proxy header) must be
//!    in the configured source-IP allowlist.
//! 2. The caller must present the shared secret via `X-API-KEY` or
//!    `Authorization: Bearer`.
//! 3. The method + path pair must match the route allowlist exactly; misses
//!    are rejected with 404 and recorded in an append-only audit log.
//!
//! Approved requests are forwarded with sanitized headers (hop-by-hop and
//! credential headers dropped, the upstream credential injected) and the
//! upstream response is relayed verbatim apart from transport-framing
//! headers. There are no retries, no caching and redirects are never
//! followed.
//!
//! # Architecture
//! The crate separates **ports** (traits) from **adapters** (implementations)
//! while keeping the authorization and relay logic inside `core`. The
//! [`config`] module resolves the configuration file once at startup into an
//! immutable value shared by every request handler.
//!
//! # Error Handling
//! All fallible APIs return `eyre::Result<T>` or a domain specific error
//! type. Every failure class a caller can trigger maps to a fixed HTTP status
//! with a JSON `detail` body; upstream connect failures and timeouts surface
//! as 502 and are never masked as client errors.
pub mod adapters;
pub mod config;
pub mod core;
pub mod ports;
pub mod tracing_setup;

// Re-export the specific types needed by the binary crate
pub use crate::{
    adapters::{GatewayHandler, ReqwestUpstreamClient, router},
    core::{AccessDecision, AccessGate, FileAuditSink, Forwarder},
    ports::upstream::UpstreamClient,
};
