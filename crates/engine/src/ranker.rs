//! Ranking of candidate dependencies.

use jadep_core::Label;

/// Orders candidate dependencies so the one a user is most likely to pick
/// comes first.
pub trait DepsRanker: Send + Sync {
    /// Ranks `labels` in place, best candidate first.
    fn rank(&self, labels: &mut Vec<Label>);
}

/// Ranks labels by their lexicographic order.
pub struct SortingRanker;

impl DepsRanker for SortingRanker {
    fn rank(&self, labels: &mut Vec<Label>) {
        labels.sort();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sorting_ranker_is_bytewise_sort() {
        let mut labels: Vec<Label> = ["//z:z", "//a:b", "//a:a"]
            .iter()
            .map(|s| Label::parse_absolute(s).unwrap())
            .collect();
        SortingRanker.rank(&mut labels);
        let strs: Vec<&str> = labels.iter().map(|l| l.as_str()).collect();
        assert_eq!(strs, vec!["//a:a", "//a:b", "//z:z"]);
    }
}
