use crate::common::*;
use crate::conv_bn_2d::{ConvBn2D, ConvBn2DInit};

/// The feature extractor variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkKind {
    /// Dilated residual style stack, output stride 2.
    Drn,
    /// Plain strided stack, output stride 4.
    Fcn,
}

impl Display for NetworkKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Drn => "drn",
            Self::Fcn => "fcn",
        };
        write!(f, "{}", name)
    }
}

/// Encoder initializer.
#[derive(Debug, Clone)]
pub struct EncoderInit {
    pub net: NetworkKind,
    pub input_ch: usize,
}

impl EncoderInit {
    pub fn build<'p, P>(self, path: P) -> Encoder
    where
        P: Borrow<nn::Path<'p>>,
    {
        let path = path.borrow();
        let Self { net, input_ch } = self;

        let stem = ConvBn2DInit::new(input_ch, 32, 3).build(path / "stem");
        let stages = match net {
            NetworkKind::Drn => vec![
                ConvBn2DInit::new(32, 64, 3).stride(2).build(path / "stage1"),
                ConvBn2DInit::new(64, 128, 3)
                    .dilation(2)
                    .build(path / "stage2"),
                ConvBn2DInit::new(128, 128, 3)
                    .dilation(4)
                    .build(path / "stage3"),
            ],
            NetworkKind::Fcn => vec![
                ConvBn2DInit::new(32, 64, 3).stride(2).build(path / "stage1"),
                ConvBn2DInit::new(64, 128, 3).stride(2).build(path / "stage2"),
                ConvBn2DInit::new(128, 128, 3).build(path / "stage3"),
            ],
        };

        Encoder { stem, stages }
    }
}

/// The shared feature extractor of both domains.
#[derive(Debug)]
pub struct Encoder {
    stem: ConvBn2D,
    stages: Vec<ConvBn2D>,
}

impl Encoder {
    pub const OUT_CHANNELS: usize = 128;

    pub fn forward_t(&self, input: &Tensor, train: bool) -> Tensor {
        self.stages
            .iter()
            .fold(self.stem.forward_t(input, train), |xs, stage| {
                stage.forward_t(&xs, train)
            })
    }
}
