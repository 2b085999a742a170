use crate::common::*;

/// The choice of distance between the two classifier distributions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscrepancyKind {
    /// Mean absolute difference of the softmax outputs.
    Diff,
    /// Symmetric KL divergence of the softmax outputs.
    SymKl,
}

/// Discrepancy between two classifier heads on the same features, the
/// adversarial signal of MCD training.
#[derive(Debug, Clone, Copy)]
pub struct DiscrepancyLoss {
    kind: DiscrepancyKind,
}

impl DiscrepancyLoss {
    pub fn new(kind: DiscrepancyKind) -> Self {
        Self { kind }
    }

    /// Computes the discrepancy of two `[n, c, h, w]` logit maps.
    pub fn forward(&self, logits1: &Tensor, logits2: &Tensor) -> Tensor {
        debug_assert_eq!(
            logits1.size(),
            logits2.size(),
            "classifier outputs must have equal shape"
        );

        let prob1 = logits1.softmax(1, Kind::Float);
        let prob2 = logits2.softmax(1, Kind::Float);

        match self.kind {
            DiscrepancyKind::Diff => (prob1 - prob2).abs().mean(Kind::Float),
            DiscrepancyKind::SymKl => {
                let (_n, c, _h, _w) = logits1.size4().unwrap();
                // pixel count = numel / c; KL sums over the class dimension
                // and averages over pixels
                let scale = c as f64 / prob1.numel() as f64;
                let log1 = (&prob1 + 1e-7).log();
                let log2 = (&prob2 + 1e-7).log();
                let kl12 = (&prob1 * (&log1 - &log2)).sum(Kind::Float) * scale;
                let kl21 = (&prob2 * (&log2 - &log1)).sum(Kind::Float) * scale;
                (kl12 + kl21) * 0.5
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_heads_have_zero_discrepancy() -> Result<()> {
        let logits = Tensor::randn(&[2, 5, 4, 4], (Kind::Float, Device::Cpu));

        for kind in [DiscrepancyKind::Diff, DiscrepancyKind::SymKl] {
            let loss = DiscrepancyLoss::new(kind).forward(&logits, &logits);
            ensure!(
                f64::from(&loss).abs() < 1e-6,
                "identical outputs must have zero discrepancy ({:?})",
                kind
            );
        }
        Ok(())
    }

    #[test]
    fn disagreeing_heads_have_positive_discrepancy() -> Result<()> {
        let logits1 = Tensor::of_slice(&[10.0f32, 0.0, 0.0, 10.0]).view([1, 2, 1, 2]);
        let logits2 = Tensor::of_slice(&[0.0f32, 10.0, 10.0, 0.0]).view([1, 2, 1, 2]);

        for kind in [DiscrepancyKind::Diff, DiscrepancyKind::SymKl] {
            let loss = DiscrepancyLoss::new(kind).forward(&logits1, &logits2);
            ensure!(
                f64::from(&loss) > 0.1,
                "disagreeing outputs must have positive discrepancy ({:?})",
                kind
            );
        }
        Ok(())
    }
}
