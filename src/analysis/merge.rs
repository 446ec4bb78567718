//! Append-and-deduplicate merging of export tables.

use std::collections::HashMap;
use std::hash::Hash;

/// Merge `new_rows` into `existing`, keeping the last row for every key.
///
/// Rows are concatenated existing-first, then every row whose key shows up
/// again later is removed. New rows therefore replace existing rows with
/// the same key, and existing rows whose key is not in `new_rows` stay
/// where they were. With no existing table the new rows are returned
/// unchanged; callers hand in key-unique rows.
pub fn merge_append<T, K, F>(existing: Option<Vec<T>>, new_rows: Vec<T>, key: F) -> Vec<T>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let Some(mut combined) = existing else {
        return new_rows;
    };
    combined.extend(new_rows);

    let mut last_seen: HashMap<K, usize> = HashMap::with_capacity(combined.len());
    for (index, row) in combined.iter().enumerate() {
        last_seen.insert(key(row), index);
    }

    combined
        .into_iter()
        .enumerate()
        .filter(|(index, row)| last_seen.get(&key(row)) == Some(index))
        .map(|(_, row)| row)
        .collect()
}
