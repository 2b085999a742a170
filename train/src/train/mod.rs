mod phase;
mod worker;

pub use phase::*;
pub use worker::*;
