//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the note CRUD and lifecycle contract used by UI/test callers.
//! - Isolate SQLite query details from callers.
//!
//! # Invariants
//! - Every operation names its target collection explicitly.
//! - Repository APIs return semantic errors (`NotFound`, `MovePartiallyFailed`)
//!   in addition to storage errors.

pub mod note_repo;
