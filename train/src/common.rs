//! Common imports from external crates.

pub use anyhow::{bail, ensure, format_err, Context, Error, Result};
pub use futures::future::FutureExt;
pub use mcd_modules::{
    CrossEntropyLoss2d, DepthLoss, DiscrepancyKind, DiscrepancyLoss, Encoder, EncoderInit,
    MultitaskDecoder, MultitaskDecoderInit, NetworkKind,
};
pub use noisy_float::prelude::*;
pub use rand::{prelude::*, rngs::StdRng, seq::SliceRandom};
pub use serde::{Deserialize, Deserializer, Serialize, Serializer};
pub use std::{
    fmt::{self, Debug, Display, Formatter},
    fs,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    sync::Arc,
};
pub use structopt::StructOpt;
pub use tch::{
    nn::{self, OptimizerConfig as _},
    vision, Device, Kind, Tensor,
};
pub use tch_tensor_like::TensorLike;
pub use tfrecord::{EventWriter, EventWriterInit};
pub use tokio::sync::broadcast;
pub use tracing::{error, info, warn};

pub type Fallible<T> = Result<T, Error>;
