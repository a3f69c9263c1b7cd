pub mod access;
pub mod audit;
pub mod forward;
pub mod headers;
pub mod routes;

pub use access::{AccessDecision, AccessGate};
pub use audit::{AuditRecord, AuditSink, FileAuditSink, UnknownPathLogger};
pub use forward::Forwarder;
pub use headers::HeaderSanitizer;
pub use routes::{RouteRule, RouteTable};
