//! Provide shared, pure helpers for the aplog report emitters.
//!
//! This crate is intentionally small and dependency-free. It holds the deterministic pieces every
//! emitter needs to agree on:
//! - text sanitizing and XML escaping (control characters, CDATA terminators, attribute quoting), and
//! - splitting a runner's test identity into the `classname` / `name` pair written to the report.
//!
//! ## Notes
//!
//! - No IO, no global state, no knowledge of capture stacks or pipes.
//! - Escaping here is the single source of truth: the report serializer must not apply a second,
//!   different escaping pass on top of it.

pub mod identity;
pub mod text;

pub use identity::TestIdentity;
pub use text::{escape_attribute, escape_cdata, quote_attribute, sanitize_text};
