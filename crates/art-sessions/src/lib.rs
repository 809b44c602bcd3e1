//! Session-as-source-of-truth: the SessionStore interface, an in-memory
//! reference implementation, and the pure session operations (context
//! build, retry truncation/classification, fork) that sit on top of it.

pub mod context;
pub mod ops;
pub mod store;

pub use context::build_context;
pub use ops::{classify_resume, fork_at_sequence, truncate_from, ResumeKind};
pub use store::{store_error, InMemorySessionStore, SessionStore};
