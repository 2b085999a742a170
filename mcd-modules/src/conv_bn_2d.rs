use crate::common::*;

/// Conv-BatchNorm-ReLU block initializer.
#[derive(Debug, Clone)]
pub struct ConvBn2DInit {
    pub in_c: usize,
    pub out_c: usize,
    pub k: usize,
    pub s: usize,
    pub p: usize,
    pub d: usize,
    pub bias: bool,
    pub batch_norm: bool,
}

impl ConvBn2DInit {
    pub fn new(in_c: usize, out_c: usize, k: usize) -> Self {
        Self {
            in_c,
            out_c,
            k,
            s: 1,
            p: k / 2,
            d: 1,
            bias: false,
            batch_norm: true,
        }
    }

    pub fn stride(self, s: usize) -> Self {
        Self { s, ..self }
    }

    /// Sets the dilation and grows the padding to keep the spatial size.
    pub fn dilation(self, d: usize) -> Self {
        let p = self.k / 2 * d;
        Self { d, p, ..self }
    }

    pub fn build<'p, P>(self, path: P) -> ConvBn2D
    where
        P: Borrow<nn::Path<'p>>,
    {
        let path = path.borrow();
        let Self {
            in_c,
            out_c,
            k,
            s,
            p,
            d,
            bias,
            batch_norm,
        } = self;

        let conv = nn::conv2d(
            path / "conv",
            in_c as i64,
            out_c as i64,
            k as i64,
            nn::ConvConfig {
                stride: s as i64,
                padding: p as i64,
                dilation: d as i64,
                bias,
                ..Default::default()
            },
        );
        let bn = batch_norm.then(|| nn::batch_norm2d(path / "bn", out_c as i64, Default::default()));

        ConvBn2D { conv, bn }
    }
}

/// Conv-BatchNorm-ReLU block.
#[derive(Debug)]
pub struct ConvBn2D {
    conv: nn::Conv2D,
    bn: Option<nn::BatchNorm>,
}

impl nn::ModuleT for ConvBn2D {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Tensor {
        let Self { ref conv, ref bn } = *self;

        let xs = xs.apply(conv);
        let xs = match bn {
            Some(bn) => xs.apply_t(bn, train),
            None => xs,
        };
        xs.relu()
    }
}
