//! The three optimization phases, one call set per batch.
//!
//! Phase 1 trains encoder and decoder on the task losses. Phase 2 trains
//! the decoder to keep task accuracy while maximizing the classifier
//! discrepancy on the target domain. Phase 3 trains the encoder, `num_k`
//! times, to minimize that discrepancy again.

use crate::{common::*, data::Batch, utils::AnyOptimizer};

/// Channel-split views of one batch: RGB and depth planes per domain.
#[derive(Debug)]
pub struct BatchViews {
    pub src_rgb: Tensor,
    pub src_depth: Tensor,
    pub src_label: Tensor,
    pub tgt_rgb: Tensor,
    pub tgt_depth: Tensor,
}

impl BatchViews {
    pub fn new(batch: &Batch) -> Self {
        let channels = batch.src_images.size()[1];
        Self {
            src_rgb: batch.src_images.narrow(1, 0, 3),
            src_depth: batch.src_images.narrow(1, 3, channels - 3),
            src_label: batch.src_labels.shallow_clone(),
            tgt_rgb: batch.tgt_images.narrow(1, 0, 3),
            tgt_depth: batch.tgt_images.narrow(1, 3, channels - 3),
        }
    }
}

/// Scalars produced by the joint supervised phase.
#[derive(Debug, Clone, Copy)]
pub struct JointLosses {
    pub c_loss: f64,
    pub src_semseg_loss: f64,
    pub src_depth_loss: f64,
    pub tgt_depth_loss: f64,
}

/// Scalars produced by the decoder adversarial phase.
#[derive(Debug, Clone, Copy)]
pub struct DecoderAdversarialLosses {
    pub src_semseg_loss: f64,
    pub src_depth_loss: f64,
    pub tgt_depth_loss: f64,
    pub discrepancy: f64,
}

/// Phase 1: update encoder and decoder on source task losses plus the
/// target depth loss.
pub fn joint_update(
    encoder: &Encoder,
    decoder: &MultitaskDecoder,
    opt_enc: &mut AnyOptimizer,
    opt_dec: &mut AnyOptimizer,
    views: &BatchViews,
) -> JointLosses {
    opt_enc.zero_grad();
    opt_dec.zero_grad();

    let src_features = encoder.forward_t(&views.src_rgb, true);
    let tgt_features = encoder.forward_t(&views.tgt_rgb, true);

    let (src_semseg_loss, src_depth_loss) =
        decoder.get_loss(&src_features, &views.src_label, &views.src_depth, true);
    let tgt_depth_loss = decoder.get_depth_loss(&tgt_features, &views.tgt_depth, true);

    let loss = &src_semseg_loss + &src_depth_loss + &tgt_depth_loss;
    loss.backward();
    opt_enc.step();
    opt_dec.step();

    JointLosses {
        c_loss: f64::from(&loss),
        src_semseg_loss: f64::from(&src_semseg_loss),
        src_depth_loss: f64::from(&src_depth_loss),
        tgt_depth_loss: f64::from(&tgt_depth_loss),
    }
}

/// Phase 2: update the decoder only; gradients reach the encoder but its
/// optimizer step is intentionally skipped.
pub fn decoder_adversarial_update(
    encoder: &Encoder,
    decoder: &MultitaskDecoder,
    opt_enc: &mut AnyOptimizer,
    opt_dec: &mut AnyOptimizer,
    views: &BatchViews,
) -> DecoderAdversarialLosses {
    opt_enc.zero_grad();
    opt_dec.zero_grad();

    let src_features = encoder.forward_t(&views.src_rgb, true);
    let (src_semseg_loss, src_depth_loss) =
        decoder.get_loss(&src_features, &views.src_label, &views.src_depth, true);

    let tgt_features = encoder.forward_t(&views.tgt_rgb, true);
    let tgt_depth_loss = decoder.get_depth_loss(&tgt_features, &views.tgt_depth, true);

    let tgt_discrepancy = decoder.get_cls_discrepancy(&tgt_features, true);
    let loss = &src_semseg_loss + &src_depth_loss + &tgt_depth_loss - &tgt_discrepancy;
    loss.backward();
    opt_dec.step();

    DecoderAdversarialLosses {
        src_semseg_loss: f64::from(&src_semseg_loss),
        src_depth_loss: f64::from(&src_depth_loss),
        tgt_depth_loss: f64::from(&tgt_depth_loss),
        discrepancy: f64::from(&tgt_discrepancy),
    }
}

/// Phase 3: `num_k` encoder-only steps on the scaled target discrepancy.
/// Returns the loss of the last inner step.
pub fn encoder_adversarial_update(
    encoder: &Encoder,
    decoder: &MultitaskDecoder,
    opt_enc: &mut AnyOptimizer,
    views: &BatchViews,
    num_k: usize,
    scale: f64,
) -> f64 {
    let mut last_loss = 0.0;
    for _ in 0..num_k {
        opt_enc.zero_grad();
        let tgt_features = encoder.forward_t(&views.tgt_rgb, true);
        let tgt_discrepancy = decoder.get_cls_discrepancy(&tgt_features, true);
        let loss = tgt_discrepancy * scale;
        loss.backward();
        opt_enc.step();
        last_loss = f64::from(&loss);
    }
    last_loss
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use crate::{config::testing::example_config, data::testing::SyntheticDataset, model};

    pub struct Fixture {
        pub vs_enc: nn::VarStore,
        pub vs_dec: nn::VarStore,
        pub encoder: Encoder,
        pub decoder: MultitaskDecoder,
        pub opt_enc: AnyOptimizer,
        pub opt_dec: AnyOptimizer,
    }

    pub fn fixture() -> Result<Fixture> {
        let config = example_config();
        let weight = crate::utils::class_weight_from_file(
            config.dataset.n_class,
            None,
            config.training.add_bg_loss,
        )?;

        let vs_enc = nn::VarStore::new(Device::Cpu);
        let vs_dec = nn::VarStore::new(Device::Cpu);
        let (encoder, decoder) =
            model::build_models(&vs_enc.root(), &vs_dec.root(), &config, weight);
        let opt_enc = AnyOptimizer::build(&vs_enc, &config.training)?;
        let opt_dec = AnyOptimizer::build(&vs_dec, &config.training)?;

        Ok(Fixture {
            vs_enc,
            vs_dec,
            encoder,
            decoder,
            opt_enc,
            opt_dec,
        })
    }

    pub fn views() -> Result<BatchViews> {
        let dataset = SyntheticDataset {
            len: 2,
            input_ch: 4,
            n_class: 10,
            image_shape: (16, 16),
        };
        let mut loader = crate::data::PairedLoader::new(
            Arc::new(SyntheticDataset { len: 2, ..dataset }),
            Arc::new(dataset),
            2,
        );
        let batch = loader
            .epoch(0)
            .next()
            .ok_or_else(|| format_err!("empty loader"))??;
        Ok(BatchViews::new(&batch))
    }

    pub fn snapshot(vs: &nn::VarStore) -> Vec<Tensor> {
        tch::no_grad(|| {
            vs.trainable_variables()
                .iter()
                .map(|var| var.detach().copy())
                .collect()
        })
    }

    pub fn parameters_equal(before: &[Tensor], vs: &nn::VarStore) -> bool {
        let after = snapshot(vs);
        before
            .iter()
            .zip(&after)
            .all(|(a, b)| a.allclose(b, 1e-12, 1e-12, false))
    }
}
