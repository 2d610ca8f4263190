//! Order lifecycle
//!
//! - [`transitions`] - role-gated transition table (pure data)
//! - [`OrderStateMachine`] - applies transitions with compare-and-set

mod machine;
pub mod transitions;

pub use machine::{OrderStateMachine, can_view};
pub use transitions::{Edge, Gate, TRANSITIONS, check_transition};
