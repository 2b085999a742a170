//! In-memory random datasets for loader and loop tests.

use super::*;
use crate::common::*;

#[derive(Debug)]
pub struct SyntheticDataset {
    pub len: usize,
    pub input_ch: usize,
    pub n_class: usize,
    pub image_shape: (usize, usize),
}

impl GenericDataset for SyntheticDataset {
    fn num_records(&self) -> usize {
        self.len
    }
}

impl SourceDataset for SyntheticDataset {
    fn nth(&self, _index: usize) -> Result<SourceRecord> {
        let (h, w) = self.image_shape;
        Ok(SourceRecord {
            image: Tensor::rand(
                &[self.input_ch as i64, h as i64, w as i64],
                tch::kind::FLOAT_CPU,
            ),
            label: Tensor::randint(
                self.n_class as i64,
                &[h as i64, w as i64],
                tch::kind::INT64_CPU,
            ),
        })
    }
}

impl TargetDataset for SyntheticDataset {
    fn nth(&self, _index: usize) -> Result<TargetRecord> {
        let (h, w) = self.image_shape;
        Ok(TargetRecord {
            image: Tensor::rand(
                &[self.input_ch as i64, h as i64, w as i64],
                tch::kind::FLOAT_CPU,
            ),
        })
    }
}

pub fn synthetic_loader(src_len: usize, tgt_len: usize, batch_size: usize) -> PairedLoader {
    let shape = (8, 8);
    PairedLoader::new(
        Arc::new(SyntheticDataset {
            len: src_len,
            input_ch: 4,
            n_class: 5,
            image_shape: shape,
        }),
        Arc::new(SyntheticDataset {
            len: tgt_len,
            input_ch: 4,
            n_class: 5,
            image_shape: shape,
        }),
        batch_size,
    )
}
