use crate::common::*;

/// Per-pixel weighted cross entropy for dense classification.
#[derive(Debug)]
pub struct CrossEntropyLoss2d {
    weight: Option<Tensor>,
    ignore_index: Option<i64>,
}

impl CrossEntropyLoss2d {
    /// Creates the loss. `weight` is a per-class `[n_class]` float tensor.
    pub fn new(weight: Option<Tensor>, ignore_index: Option<i64>) -> Self {
        Self {
            weight,
            ignore_index,
        }
    }

    pub fn to_device(&mut self, device: Device) {
        if let Some(weight) = &self.weight {
            self.weight = Some(weight.to_device(device));
        }
    }

    /// Computes the weighted-mean loss of `[n, c, h, w]` logits against an
    /// `[n, h, w]` int64 target.
    pub fn forward(&self, logits: &Tensor, target: &Tensor) -> Tensor {
        let (n, _c, h, w) = logits.size4().unwrap();
        debug_assert!(
            target.kind() == Kind::Int64 && target.size3().unwrap() == (n, h, w),
            "expect target a [{}, {}, {}] int64 tensor",
            n,
            h,
            w
        );

        let log_prob = logits.log_softmax(1, Kind::Float);

        // pixels at the ignore index keep a valid gather index but carry
        // zero weight
        let valid = match self.ignore_index {
            Some(index) => target.ne(index),
            None => target.ne(-1),
        };
        let safe_target = target.masked_fill(&valid.logical_not(), 0);

        let nll = -log_prob
            .gather(1, &safe_target.unsqueeze(1), false)
            .view([n, h, w]);

        let pixel_weight = match &self.weight {
            Some(weight) => {
                let flat = weight.index_select(0, &safe_target.view([-1]));
                flat.view([n, h, w]) * valid.to_kind(Kind::Float)
            }
            None => valid.to_kind(Kind::Float),
        };

        (nll * &pixel_weight).sum(Kind::Float) / pixel_weight.sum(Kind::Float).clamp_min(1e-8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cross_entropy_2d_converges() -> Result<()> {
        let device = Device::Cpu;
        let n_class = 4;

        let vs = nn::VarStore::new(device);
        let root = vs.root();
        let loss_fn = CrossEntropyLoss2d::new(None, None);

        let logits = root.randn("logits", &[1, n_class, 4, 4], 0.0, 1.0);
        let target =
            Tensor::randint(n_class, &[1, 4, 4], (Kind::Int64, device)).set_requires_grad(false);

        let mut optimizer = nn::Adam::default().build(&vs, 0.1)?;
        for _ in 0..500 {
            let loss = loss_fn.forward(&logits, &target);
            optimizer.backward_step(&loss);
        }

        let prediction = logits.max_dim(1, false).1;
        ensure!(
            bool::from(prediction.eq_tensor(&target).all()),
            "the loss does not converge"
        );
        Ok(())
    }

    #[test]
    fn ignored_pixels_carry_no_loss() -> Result<()> {
        let device = Device::Cpu;
        let loss_fn = CrossEntropyLoss2d::new(None, Some(2));

        let logits = Tensor::randn(&[1, 3, 2, 2], (Kind::Float, device));
        // every pixel labeled with the ignore index
        let target = Tensor::full(&[1, 2, 2], 2, (Kind::Int64, device));

        let loss = loss_fn.forward(&logits, &target);
        ensure!(f64::from(&loss).abs() < 1e-6, "ignored pixels leaked loss");
        Ok(())
    }

    #[test]
    fn zero_class_weight_masks_class() -> Result<()> {
        let device = Device::Cpu;
        let weight = Tensor::of_slice(&[1.0f32, 0.0]);
        let loss_fn = CrossEntropyLoss2d::new(Some(weight), None);

        let logits = Tensor::randn(&[1, 2, 2, 2], (Kind::Float, device));
        let target = Tensor::full(&[1, 2, 2], 1, (Kind::Int64, device));

        let loss = loss_fn.forward(&logits, &target);
        ensure!(
            f64::from(&loss).abs() < 1e-6,
            "zero-weighted class leaked loss"
        );
        Ok(())
    }
}
