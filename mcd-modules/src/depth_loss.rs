use crate::common::*;

/// Masked L1 depth regression loss. Pixels without ground-truth depth
/// (value <= 0) are excluded.
#[derive(Debug, Clone, Copy)]
pub struct DepthLoss;

impl DepthLoss {
    pub fn forward(&self, prediction: &Tensor, target: &Tensor) -> Tensor {
        debug_assert_eq!(
            prediction.size(),
            target.size(),
            "prediction and target shape must be equal"
        );

        let valid = target.gt(0.0).to_kind(Kind::Float);
        let diff = (prediction - target).abs() * &valid;
        diff.sum(Kind::Float) / valid.sum(Kind::Float).clamp_min(1.0)
    }
}
