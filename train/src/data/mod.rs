mod dataset;
mod file_list;
mod loader;
mod record;
#[cfg(test)]
pub mod testing;

pub use dataset::*;
pub use file_list::*;
pub use loader::*;
pub use record::*;

use crate::{common::*, config::Config};

/// Opens the source/target dataset pair and wraps it in a paired loader.
pub fn load_paired_loader(config: &Config) -> Result<PairedLoader> {
    let crate::config::DatasetConfig {
        ref source,
        ref target,
        input_ch,
        image_shape,
        ..
    } = config.dataset;

    let source = FileListDataset::open(source, input_ch, image_shape, true)
        .with_context(|| format!("failed to open source dataset '{}'", source.kind))?;
    let target = FileListDataset::open(target, input_ch, image_shape, false)
        .with_context(|| format!("failed to open target dataset '{}'", target.kind))?;

    Ok(PairedLoader::new(
        Arc::new(source),
        Arc::new(target),
        config.training.batch_size.get(),
    ))
}
