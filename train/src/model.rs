//! The model/optimizer factory.

use crate::{common::*, config::Config};

/// Builds the encoder and the multitask decoder on their own var stores.
pub fn build_models<'e, 'd>(
    root_enc: &nn::Path<'e>,
    root_dec: &nn::Path<'d>,
    config: &Config,
    class_weight: Tensor,
) -> (Encoder, MultitaskDecoder) {
    let crate::config::DatasetConfig {
        input_ch, n_class, ..
    } = config.dataset;

    let encoder = EncoderInit {
        net: config.model.net,
        input_ch,
    }
    .build(root_enc);

    let decoder = MultitaskDecoderInit {
        in_c: Encoder::OUT_CHANNELS,
        n_class,
        depth_ch: input_ch - 3,
        semseg_criterion: CrossEntropyLoss2d::new(Some(class_weight), None),
        discrepancy_criterion: DiscrepancyLoss::new(config.training.d_loss),
    }
    .build(root_dec);

    (encoder, decoder)
}
