use crate::common::*;

/// One labeled source-domain sample.
#[derive(Debug, TensorLike)]
pub struct SourceRecord {
    /// RGB plus depth channels, `[input_ch, h, w]` float.
    pub image: Tensor,
    /// Dense class indices, `[h, w]` int64.
    pub label: Tensor,
}

/// One unlabeled target-domain sample.
#[derive(Debug, TensorLike)]
pub struct TargetRecord {
    pub image: Tensor,
}

/// The paired minibatch consumed by the training loop.
#[derive(Debug, TensorLike)]
pub struct Batch {
    pub epoch: usize,
    pub step: usize,
    /// `[n, input_ch, h, w]`
    pub src_images: Tensor,
    /// `[n, h, w]`
    pub src_labels: Tensor,
    /// `[n, input_ch, h, w]`
    pub tgt_images: Tensor,
}
