//! Training program configuration format.

use crate::common::*;

pub use dataset::*;
pub use model::*;
pub use training::*;

/// The main training configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub model: ModelConfig,
    pub dataset: DatasetConfig,
    pub logging: LoggingConfig,
    pub training: TrainingConfig,
}

impl Config {
    pub fn open<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let text = std::fs::read_to_string(path)?;
        let config = json5::from_str(&text)?;
        Ok(config)
    }

    /// Eager validation, run before any model or dataset construction.
    pub fn validate(&self) -> Result<()> {
        let DatasetConfig {
            ref source,
            ref target,
            input_ch,
            n_class,
            ..
        } = self.dataset;

        ensure!(
            source.kind != target.kind,
            "source dataset '{}' and target dataset '{}' form an invalid adaptation pair",
            source.kind,
            target.kind
        );
        ensure!(
            input_ch > 3,
            "multitask training needs depth channels, got input_ch = {}",
            input_ch
        );
        ensure!(n_class > 0, "n_class must be positive");
        Ok(())
    }

    /// Replaces this configuration with the one stored in a checkpoint,
    /// keeping only the requested total epoch count.
    pub fn merge_resumed(&self, stored: Config) -> Config {
        let mut merged = stored;
        merged.training.epochs = self.training.epochs;
        merged
    }

    /// The run-identifying directory name.
    pub fn mode_name(&self) -> String {
        let DatasetConfig {
            ref source,
            ref target,
            input_ch,
            ..
        } = self.dataset;
        format!(
            "{}-{}2{}-{}_{}ch_MCDmultitask",
            source.kind, source.split, target.kind, target.split, input_ch
        )
    }

    /// The checkpoint/event file name stem.
    pub fn model_name(&self) -> String {
        let ModelConfig {
            ref method,
            ref savename,
            net,
        } = self.model;
        format!("{}-{}-{}", method, savename, net)
    }
}

mod model {
    use super::*;

    /// The model configuration.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ModelConfig {
        /// The encoder variant.
        pub net: NetworkKind,
        /// Free-form run label, part of the checkpoint file names.
        pub savename: String,
        /// The adaptation method label, part of the checkpoint file names.
        pub method: String,
    }
}

mod dataset {
    use super::*;

    /// Dataset options.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct DatasetConfig {
        pub source: DomainConfig,
        pub target: DomainConfig,
        /// Total image channels; channels beyond RGB carry depth.
        pub input_ch: usize,
        pub n_class: usize,
        /// Training image (height, width).
        pub image_shape: (usize, usize),
    }

    /// One domain of the adaptation pair.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct DomainConfig {
        pub kind: DatasetKind,
        pub split: String,
        pub dataset_dir: PathBuf,
    }

    /// The supported datasets.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum DatasetKind {
        Suncg,
        Nyu,
    }

    impl Display for DatasetKind {
        fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
            let name = match self {
                Self::Suncg => "suncg",
                Self::Nyu => "nyu",
            };
            write!(f, "{}", name)
        }
    }
}

/// Data logging options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub base_outdir: PathBuf,
}

mod training {
    use super::*;

    /// The training options.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct TrainingConfig {
        pub batch_size: NonZeroUsize,
        pub epochs: usize,
        /// The base learning rate.
        pub lr: R64,
        pub momentum: R64,
        pub weight_decay: R64,
        pub opt: OptimizerKind,
        /// Inner encoder-adversarial steps per batch.
        pub num_k: NonZeroUsize,
        /// Scale factor on the discrepancy loss in the encoder phase.
        pub num_multiply_d_loss: R64,
        /// Hard per-epoch iteration cap.
        pub max_iter: usize,
        /// Enables the per-epoch poly learning-rate decay.
        pub adjust_lr: bool,
        /// The discrepancy criterion between the classifier heads.
        pub d_loss: DiscrepancyKind,
        /// Optional per-class loss weight csv (class_id, weight).
        pub loss_weights_file: Option<PathBuf>,
        /// If unset, the background class (last index) gets zero loss weight.
        pub add_bg_loss: bool,
        #[serde(with = "tch_serde::serde_device")]
        pub device: Device,
    }

    /// The optimizer variants.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum OptimizerKind {
        Sgd,
        Adam,
    }
}
