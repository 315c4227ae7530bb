//! Reconciliation pipeline: compile desired state, diff against observed
//! state, place new instances, execute the change list.

pub mod compiler;
pub mod executor;
pub mod placement;
pub mod planner;
