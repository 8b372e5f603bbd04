//! Domain records shared by persistence and the AI flows.
//!
//! # Responsibility
//! - Define the note and label shapes the governance layer reads and writes.
//!
//! # Invariants
//! - Every record is identified by a stable UUID.
//! - Labels are owned by exactly one owner and unique per `(owner, name)`.

pub mod label;
pub mod note;
