//! # qualitygate core
//!
//! Domain types, the state store trait and error definitions shared by every
//! qualitygate crate. Backends, the rule table and the gate handlers all
//! depend inward on this crate.
//!
//! ## Layout
//!
//! - [`session`]: session ids, deductions and the budget record
//! - [`store`]: the [`StateStore`] seam plus the typed [`SessionState`] view
//! - [`error`]: store failures

pub mod error;
pub mod session;
pub mod store;

pub use error::StoreError;
pub use session::{BudgetRecord, Deduction, SessionId, INITIAL_SCORE};
pub use store::{SessionState, StateKey, StateStore};
