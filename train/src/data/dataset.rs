use super::*;
use crate::common::*;

/// The generic dataset trait.
pub trait GenericDataset
where
    Self: Debug + Sync + Send,
{
    /// Get number of records in the dataset.
    fn num_records(&self) -> usize;
}

/// A dataset producing labeled source-domain samples.
pub trait SourceDataset
where
    Self: GenericDataset,
{
    /// Get the nth record in the dataset.
    fn nth(&self, index: usize) -> Result<SourceRecord>;
}

/// A dataset producing unlabeled target-domain samples.
pub trait TargetDataset
where
    Self: GenericDataset,
{
    /// Get the nth record in the dataset.
    fn nth(&self, index: usize) -> Result<TargetRecord>;
}
