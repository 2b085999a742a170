//! Misc utilities.

mod checkpoint;
mod class_weight;
mod lr_scheduler;
mod optimizer;

pub use checkpoint::*;
pub use class_weight::*;
pub use lr_scheduler::*;
pub use optimizer::*;
