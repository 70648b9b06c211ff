use std::collections::HashMap;

use super::types::{QueryGroup, RerankPair};

/// Partitions pairs by byte-identical query.
///
/// Groups appear in order of their query's first occurrence and member indices
/// ascend. Nothing is deduplicated: a repeated passage keeps one index per
/// occurrence, and the groups together cover `0..pairs.len()` exactly once.
pub fn group_by_query(pairs: &[RerankPair]) -> Vec<QueryGroup> {
    let mut groups: Vec<QueryGroup> = Vec::new();
    let mut slot_by_query: HashMap<&str, usize> = HashMap::new();

    for (index, pair) in pairs.iter().enumerate() {
        match slot_by_query.get(pair.query.as_str()) {
            Some(&slot) => groups[slot].member_indices.push(index),
            None => {
                slot_by_query.insert(pair.query.as_str(), groups.len());
                groups.push(QueryGroup {
                    query: pair.query.clone(),
                    member_indices: vec![index],
                });
            }
        }
    }

    groups
}

/// Collects the passages of `group` in member order.
pub fn passages_at(pairs: &[RerankPair], group: &QueryGroup) -> Vec<String> {
    group
        .member_indices
        .iter()
        .map(|&i| pairs[i].passage.clone())
        .collect()
}
