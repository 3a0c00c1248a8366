#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

//! Security sandbox rule engine
//!
//! Evaluates filesystem paths and shell command lines against an
//! ordered rule table with block/allow/protect semantics and
//! privilege-level bypass. Evaluation is a pure function of the
//! loaded rules; the engine holds no mutable state.

mod engine;
mod pattern;

pub use engine::{Decision, RuleEngine, RuleRef};
pub use gatehouse_config::{RuleAction, RuleTarget};
pub use pattern::Pattern;
