//! Name Index Operations - Pure DOP Functions
//!
//! Each bucket grows on its own, so there is never a global rehash. Heavy
//! collisions on the hash/modulo can unbalance buckets; sprite atlases hold
//! hundreds to low thousands of names, where a linear bucket scan is cheap.

use super::name_index_data::{
    NameBucket, NameIndexData, NAME_INDEX_BUCKET_GROWTH, NAME_INDEX_BUCKET_LOAD,
    NAME_INDEX_MIN_BUCKETS,
};
use crate::error::{AtlasError, AtlasResult};

/// 32-bit integer avalanche mix (xor-shift-multiply). Not cryptographic.
pub fn hash_name(name: u32) -> u32 {
    let mut x = name;
    x ^= x >> 16;
    x = x.wrapping_mul(0x7feb_352d);
    x ^= x >> 15;
    x = x.wrapping_mul(0x846c_a68b);
    x ^= x >> 16;
    x
}

/// FNV-1a hash of a string, for applications that register names as text
pub fn name_hash(name: &str) -> u32 {
    let mut hash: u32 = 0x811c_9dc5;
    for byte in name.bytes() {
        hash ^= byte as u32;
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash
}

/// Bucket count for an expected number of names
pub fn bucket_count_for(expected_entries: u32) -> usize {
    let wanted = (expected_entries / NAME_INDEX_BUCKET_LOAD).max(NAME_INDEX_MIN_BUCKETS);
    wanted.next_power_of_two() as usize
}

/// Create an empty index sized for `expected_entries` names
pub fn create_name_index(expected_entries: u32) -> AtlasResult<NameIndexData> {
    let bucket_count = bucket_count_for(expected_entries);
    let mut buckets = Vec::new();
    buckets
        .try_reserve_exact(bucket_count)
        .map_err(|_| AtlasError::AllocationFailed {
            what: "name index buckets".to_string(),
            requested: bucket_count,
        })?;
    buckets.resize_with(bucket_count, NameBucket::default);

    Ok(NameIndexData { buckets, count: 0 })
}

fn bucket_of(data: &NameIndexData, name: u32) -> usize {
    hash_name(name) as usize % data.buckets.len()
}

/// Append `name -> entry_index` to the tail of its bucket
pub fn insert_name(data: &mut NameIndexData, name: u32, entry_index: u32) -> AtlasResult<()> {
    let bucket_index = bucket_of(data, name);
    let bucket = &mut data.buckets[bucket_index];

    // Both arrays must have room before either is pushed
    let names_full = bucket.names.len() == bucket.names.capacity();
    let entries_full = bucket.entries.len() == bucket.entries.capacity();
    let grown = (!names_full || bucket.names.try_reserve_exact(NAME_INDEX_BUCKET_GROWTH).is_ok())
        && (!entries_full
            || bucket
                .entries
                .try_reserve_exact(NAME_INDEX_BUCKET_GROWTH)
                .is_ok());
    if !grown {
        return Err(AtlasError::AllocationFailed {
            what: format!("name index bucket {}", bucket_index),
            requested: bucket.names.len() + NAME_INDEX_BUCKET_GROWTH,
        });
    }

    bucket.names.push(name);
    bucket.entries.push(entry_index);
    data.count += 1;
    Ok(())
}

/// Entry index registered under `name`, earliest registration first
pub fn lookup_name(data: &NameIndexData, name: u32) -> Option<u32> {
    let bucket = &data.buckets[bucket_of(data, name)];
    bucket
        .names
        .iter()
        .position(|&candidate| candidate == name)
        .map(|slot| bucket.entries[slot])
}

/// Largest bucket size, useful to spot a badly distributed name set
pub fn longest_bucket(data: &NameIndexData) -> usize {
    data.buckets
        .iter()
        .map(|bucket| bucket.names.len())
        .max()
        .unwrap_or(0)
}
