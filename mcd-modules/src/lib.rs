//! Reusable tch building blocks for the MCD multitask adaptation trainer.

mod common;
mod conv_bn_2d;
mod cross_entropy_2d;
mod decoder;
mod depth_loss;
mod discrepancy;
mod encoder;

pub use conv_bn_2d::*;
pub use cross_entropy_2d::*;
pub use decoder::*;
pub use depth_loss::*;
pub use discrepancy::*;
pub use encoder::*;
