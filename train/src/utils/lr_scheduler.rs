use super::optimizer::AnyOptimizer;

/// Poly learning-rate decay, applied once per optimizer per epoch. Returns
/// the rate that was set so the caller can carry it into the next epoch's
/// logging and checkpoints. Weight decay stays as configured at optimizer
/// construction.
pub fn adjust_learning_rate(
    optimizer: &mut AnyOptimizer,
    lr: f64,
    _weight_decay: f64,
    epoch: usize,
    max_epochs: usize,
) -> f64 {
    let progress = (epoch as f64 / max_epochs as f64).min(1.0);
    let new_lr = lr * (1.0 - progress).powf(0.9);
    optimizer.set_lr(new_lr);
    new_lr
}
