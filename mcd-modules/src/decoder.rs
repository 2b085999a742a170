use crate::common::*;
use crate::{
    conv_bn_2d::{ConvBn2D, ConvBn2DInit},
    cross_entropy_2d::CrossEntropyLoss2d,
    depth_loss::DepthLoss,
    discrepancy::DiscrepancyLoss,
};

/// Multitask decoder initializer.
#[derive(Debug)]
pub struct MultitaskDecoderInit {
    pub in_c: usize,
    pub n_class: usize,
    /// Number of ground-truth depth channels (input channels beyond RGB).
    pub depth_ch: usize,
    pub semseg_criterion: CrossEntropyLoss2d,
    pub discrepancy_criterion: DiscrepancyLoss,
}

impl MultitaskDecoderInit {
    pub fn build<'p, P>(self, path: P) -> MultitaskDecoder
    where
        P: Borrow<nn::Path<'p>>,
    {
        let path = path.borrow();
        let Self {
            in_c,
            n_class,
            depth_ch,
            semseg_criterion,
            discrepancy_criterion,
        } = self;

        let trunk = ConvBn2DInit::new(in_c, 64, 3).build(path / "trunk");
        let classifier1 = nn::conv2d(
            path / "classifier1",
            64,
            n_class as i64,
            1,
            Default::default(),
        );
        let classifier2 = nn::conv2d(
            path / "classifier2",
            64,
            n_class as i64,
            1,
            Default::default(),
        );
        let depth_head = nn::conv2d(path / "depth", 64, depth_ch as i64, 1, Default::default());

        // learned per-task log variances for uncertainty weighting
        let log_var_semseg = path.zeros("log_var_semseg", &[1]);
        let log_var_depth = path.zeros("log_var_depth", &[1]);

        MultitaskDecoder {
            trunk,
            classifier1,
            classifier2,
            depth_head,
            log_var_semseg,
            log_var_depth,
            semseg_criterion,
            depth_criterion: DepthLoss,
            discrepancy_criterion,
        }
    }
}

/// Task-specific heads over shared encoder features: two segmentation
/// classifiers, a depth regressor, and the discrepancy scoring used as the
/// adversarial signal.
#[derive(Debug)]
pub struct MultitaskDecoder {
    trunk: ConvBn2D,
    classifier1: nn::Conv2D,
    classifier2: nn::Conv2D,
    depth_head: nn::Conv2D,
    log_var_semseg: Tensor,
    log_var_depth: Tensor,
    semseg_criterion: CrossEntropyLoss2d,
    depth_criterion: DepthLoss,
    discrepancy_criterion: DiscrepancyLoss,
}

impl MultitaskDecoder {
    /// Both classifier logit maps at feature resolution.
    pub fn semseg_forward(&self, features: &Tensor, train: bool) -> (Tensor, Tensor) {
        let trunk = self.trunk.forward_t(features, train);
        (trunk.apply(&self.classifier1), trunk.apply(&self.classifier2))
    }

    /// Uncertainty-weighted source losses, returned separately as
    /// (semseg, depth).
    pub fn get_loss(
        &self,
        features: &Tensor,
        label: &Tensor,
        depth: &Tensor,
        train: bool,
    ) -> (Tensor, Tensor) {
        let (_n, _c, h, w) = depth.size4().unwrap();
        let trunk = self.trunk.forward_t(features, train);

        let logits1 = trunk
            .apply(&self.classifier1)
            .upsample_bilinear2d(&[h, w], false, None, None);
        let logits2 = trunk
            .apply(&self.classifier2)
            .upsample_bilinear2d(&[h, w], false, None, None);
        let semseg_loss = self.semseg_criterion.forward(&logits1, label)
            + self.semseg_criterion.forward(&logits2, label);
        let semseg_loss = self.weight_semseg(&semseg_loss);

        let depth_pred = trunk
            .apply(&self.depth_head)
            .upsample_bilinear2d(&[h, w], false, None, None);
        let depth_loss = self.depth_criterion.forward(&depth_pred, depth);
        let depth_loss = self.weight_depth(&depth_loss);

        (semseg_loss, depth_loss)
    }

    /// Uncertainty-weighted depth loss only, used on the target domain
    /// where no segmentation labels exist.
    pub fn get_depth_loss(&self, features: &Tensor, depth: &Tensor, train: bool) -> Tensor {
        let (_n, _c, h, w) = depth.size4().unwrap();
        let trunk = self.trunk.forward_t(features, train);
        let depth_pred = trunk
            .apply(&self.depth_head)
            .upsample_bilinear2d(&[h, w], false, None, None);
        let depth_loss = self.depth_criterion.forward(&depth_pred, depth);
        self.weight_depth(&depth_loss)
    }

    /// Disagreement of the two classifiers on the given features.
    pub fn get_cls_discrepancy(&self, features: &Tensor, train: bool) -> Tensor {
        let (logits1, logits2) = self.semseg_forward(features, train);
        self.discrepancy_criterion.forward(&logits1, &logits2)
    }

    /// Per-task standard deviations `exp(0.5 * log_var)` as
    /// (semseg, depth).
    pub fn get_task_weights(&self) -> (f64, f64) {
        tch::no_grad(|| {
            let std_semseg = f64::from(&(&self.log_var_semseg * 0.5).exp());
            let std_depth = f64::from(&(&self.log_var_depth * 0.5).exp());
            (std_semseg, std_depth)
        })
    }

    fn weight_semseg(&self, loss: &Tensor) -> Tensor {
        ((-&self.log_var_semseg).exp() * loss + &self.log_var_semseg * 0.5).squeeze()
    }

    fn weight_depth(&self, loss: &Tensor) -> Tensor {
        ((-&self.log_var_depth).exp() * loss + &self.log_var_depth * 0.5).squeeze()
    }
}
