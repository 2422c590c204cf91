//! Note domain model.
//!
//! # Responsibility
//! - Define the record shape shared by the active, trash and archive
//!   collections.
//! - Name the collections a note can live in.
//!
//! # Invariants
//! - A note lives in exactly one collection at a time.
//! - `created_at` is fixed at insertion; `updated_at >= created_at`.

pub mod note;
