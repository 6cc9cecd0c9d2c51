//! Name Index Data - Pure DOP
//!
//! NO METHODS. Just data.
//! All transformations happen in name_index_operations.rs

/// Target number of names per bucket when sizing from the expected entry count
pub const NAME_INDEX_BUCKET_LOAD: u32 = 16;
/// Lower bound on bucket count
pub const NAME_INDEX_MIN_BUCKETS: u32 = 16;
/// Slots added to a bucket each time it fills up
pub const NAME_INDEX_BUCKET_GROWTH: usize = 32;

/// One hash bucket: parallel name / entry-index arrays
#[derive(Debug, Clone, Default)]
pub struct NameBucket {
    pub names: Vec<u32>,
    pub entries: Vec<u32>,
}

/// Open hashing table from a 32-bit name to an entry index
#[derive(Debug, Clone)]
pub struct NameIndexData {
    pub buckets: Vec<NameBucket>,
    /// Total names stored across all buckets
    pub count: usize,
}
