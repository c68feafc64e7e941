use crate::models::CommitRecord;

/// Splits commits into contiguous fixed-size batches, preserving order.
pub struct CommitBatcher {
    batch_size: usize,
}

impl CommitBatcher {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
        }
    }

    pub fn create_batches<'a>(&self, commits: &'a [CommitRecord]) -> Vec<&'a [CommitRecord]> {
        commits.chunks(self.batch_size).collect()
    }

    pub fn batch_count(&self, total: usize) -> usize {
        total.div_ceil(self.batch_size)
    }
}

impl Default for CommitBatcher {
    fn default() -> Self {
        Self::new(10)
    }
}
