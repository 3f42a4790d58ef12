pub mod actions;
pub mod errors;
pub mod gatekeeper;
pub mod legals;
pub mod phases;

pub use actions::*;
pub use errors::*;
pub use gatekeeper::*;
pub use legals::*;
pub use phases::{classify_step, PhaseStep};
