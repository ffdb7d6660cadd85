//! Deterministic group partitioning.

/// Split `entities` into exactly `group_count` contiguous groups of
/// `ceil(total / group_count)` entities. Trailing groups may be short or empty.
pub fn partition<T: Clone>(entities: &[T], group_count: usize) -> Vec<Vec<T>> {
    let groups = group_count.max(1);
    let total = entities.len();
    let chunk = total.div_ceil(groups);

    (0..groups)
        .map(|i| {
            let start = (i * chunk).min(total);
            let end = ((i + 1) * chunk).min(total);
            entities[start..end].to_vec()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_five_into_three() {
        let groups = partition(&["a", "b", "c", "d", "e"], 3);
        assert_eq!(groups, vec![vec!["a", "b"], vec!["c", "d"], vec!["e"]]);
    }

    #[test]
    fn test_partition_is_stable_and_complete() {
        let ids: Vec<String> = (0..17).map(|i| format!("Profile {i:02}")).collect();
        let first = partition(&ids, 4);
        let second = partition(&ids, 4);
        assert_eq!(first, second);

        let flattened: Vec<String> = first.iter().flatten().cloned().collect();
        assert_eq!(flattened, ids);

        let sizes: Vec<usize> = first.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![5, 5, 5, 2]);
    }

    #[test]
    fn test_fewer_entities_than_groups() {
        let groups = partition(&[1, 2], 3);
        assert_eq!(groups, vec![vec![1], vec![2], vec![]]);
    }

    #[test]
    fn test_empty_and_zero_groups() {
        let empty: Vec<Vec<u8>> = partition(&[], 3);
        assert_eq!(empty.len(), 3);
        assert!(empty.iter().all(Vec::is_empty));

        let single = partition(&[1, 2, 3], 0);
        assert_eq!(single, vec![vec![1, 2, 3]]);
    }
}
