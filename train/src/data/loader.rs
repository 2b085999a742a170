use super::*;
use crate::common::*;

/// Pairs a labeled source dataset with an unlabeled target dataset and
/// produces shuffled `(source, target)` minibatches. The epoch length is
/// the longer of the two datasets; the shorter one wraps around.
#[derive(Debug)]
pub struct PairedLoader {
    source: Arc<dyn SourceDataset>,
    target: Arc<dyn TargetDataset>,
    batch_size: usize,
    rng: StdRng,
}

impl PairedLoader {
    pub fn new(
        source: Arc<dyn SourceDataset>,
        target: Arc<dyn TargetDataset>,
        batch_size: usize,
    ) -> Self {
        Self {
            source,
            target,
            batch_size,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn num_records(&self) -> usize {
        self.source.num_records().max(self.target.num_records())
    }

    /// Reshuffles both domains and returns the batch iterator for one
    /// epoch. The final batch may be smaller than `batch_size`.
    pub fn epoch(&mut self, epoch: usize) -> EpochBatches<'_> {
        let mut src_perm: Vec<_> = (0..self.source.num_records()).collect();
        let mut tgt_perm: Vec<_> = (0..self.target.num_records()).collect();
        src_perm.shuffle(&mut self.rng);
        tgt_perm.shuffle(&mut self.rng);

        EpochBatches {
            loader: self,
            src_perm,
            tgt_perm,
            epoch,
            cursor: 0,
        }
    }
}

/// Batch iterator over one epoch of a [PairedLoader].
#[derive(Debug)]
pub struct EpochBatches<'a> {
    loader: &'a PairedLoader,
    src_perm: Vec<usize>,
    tgt_perm: Vec<usize>,
    epoch: usize,
    cursor: usize,
}

impl EpochBatches<'_> {
    fn load_batch(&self, start: usize, end: usize) -> Result<Batch> {
        let loader = self.loader;

        let (src_images, src_labels) = (start..end)
            .map(|index| {
                let record = loader
                    .source
                    .nth(self.src_perm[index % self.src_perm.len()])?;
                Ok((record.image, record.label))
            })
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .unzip::<_, _, Vec<_>, Vec<_>>();

        let tgt_images = (start..end)
            .map(|index| {
                let record = loader
                    .target
                    .nth(self.tgt_perm[index % self.tgt_perm.len()])?;
                Ok(record.image)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Batch {
            epoch: self.epoch,
            step: start / loader.batch_size,
            src_images: Tensor::stack(&src_images, 0),
            src_labels: Tensor::stack(&src_labels, 0),
            tgt_images: Tensor::stack(&tgt_images, 0),
        })
    }
}

impl Iterator for EpochBatches<'_> {
    type Item = Result<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        let num_records = self.loader.num_records();
        if self.cursor >= num_records {
            return None;
        }

        let start = self.cursor;
        let end = (start + self.loader.batch_size).min(num_records);
        self.cursor = end;

        Some(self.load_batch(start, end))
    }
}
