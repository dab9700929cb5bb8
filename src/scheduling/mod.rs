//! Pure scheduling core: recurrence expansion, conflict evaluation and
//! edit-state classification.
//!
//! Nothing in this module performs I/O or reads the process clock; `now`
//! and `today` are always explicit inputs so every rule is deterministic
//! and directly testable.

pub mod conflict;
pub mod edit_state;
pub mod recurrence;

pub use conflict::{Conflict, ConflictReport, OccurrenceHit};
pub use edit_state::EditCase;
