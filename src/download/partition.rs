//! Work distribution across a fixed worker budget.
//!
//! Assignment is deterministic: asset `id` always lands in bucket
//! `id % bucket_count`, and every page of a batch gets the same share of the
//! total budget.

use crate::resolver::AssetDescriptor;

/// Splits `assets` into exactly `max(1, threads)` ordered buckets.
///
/// Buckets keep the relative order of their assets. Some buckets may be
/// empty when there are fewer assets than threads.
///
/// # Example
///
/// ```
/// use telegrab_core::partition_assets;
/// use telegrab_core::resolver::AssetDescriptor;
///
/// let assets: Vec<_> = (0..5).map(|id| AssetDescriptor::new(id, "a.jpg", "https://h/a.jpg")).collect();
/// let buckets = partition_assets(assets, 2);
/// let ids: Vec<Vec<usize>> = buckets.iter().map(|b| b.iter().map(|a| a.id).collect()).collect();
/// assert_eq!(ids, vec![vec![0, 2, 4], vec![1, 3]]);
/// ```
#[must_use]
pub fn partition_assets(assets: Vec<AssetDescriptor>, threads: usize) -> Vec<Vec<AssetDescriptor>> {
    let bucket_count = threads.max(1);
    let mut buckets: Vec<Vec<AssetDescriptor>> = vec![Vec::new(); bucket_count];
    for asset in assets {
        buckets[asset.id % bucket_count].push(asset);
    }
    buckets
}

/// Worker budget for each page: `max(1, total / pages)`, floor division.
///
/// `pages == 0` is treated as one page.
#[must_use]
pub fn per_page_budget(total_threads: usize, pages: usize) -> usize {
    (total_threads / pages.max(1)).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assets(ids: impl IntoIterator<Item = usize>) -> Vec<AssetDescriptor> {
        ids.into_iter()
            .map(|id| AssetDescriptor::new(id, format!("{id}.jpg"), format!("https://h/{id}.jpg")))
            .collect()
    }

    #[test]
    fn test_every_asset_in_exactly_one_bucket() {
        for count in 0..20 {
            for threads in 0..8 {
                let buckets = partition_assets(assets(0..count), threads);
                assert_eq!(buckets.len(), threads.max(1));
                let total: usize = buckets.iter().map(Vec::len).sum();
                assert_eq!(total, count);
                for (index, bucket) in buckets.iter().enumerate() {
                    assert!(bucket.iter().all(|a| a.id % buckets.len() == index));
                }
            }
        }
    }

    #[test]
    fn test_bucket_order_follows_input_order() {
        let buckets = partition_assets(assets([0, 3, 6, 1, 9]), 3);
        let first: Vec<usize> = buckets[0].iter().map(|a| a.id).collect();
        assert_eq!(first, vec![0, 3, 6, 9]);
        assert_eq!(buckets[1].len(), 1);
        assert!(buckets[2].is_empty());
    }

    #[test]
    fn test_zero_threads_means_one_bucket() {
        let buckets = partition_assets(assets(0..4), 0);
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].len(), 4);
    }

    #[test]
    fn test_per_page_budget() {
        assert_eq!(per_page_budget(32, 5), 6);
        assert_eq!(per_page_budget(10, 2), 5);
        assert_eq!(per_page_budget(3, 8), 1);
        assert_eq!(per_page_budget(0, 1), 1);
        assert_eq!(per_page_budget(7, 0), 7);
    }
}
