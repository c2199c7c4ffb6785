//! Keyed left and outer joins that keep the left side's row order.

use std::collections::HashMap;
use std::hash::Hash;

/// Positions of right-side rows grouped by key, in right-side order.
fn index_by_key<R, K>(right: &[R], right_key: impl Fn(&R) -> Option<K>) -> HashMap<K, Vec<usize>>
where
    K: Eq + Hash,
{
    let mut index: HashMap<K, Vec<usize>> = HashMap::new();
    for (ri, row) in right.iter().enumerate() {
        if let Some(key) = right_key(row) {
            index.entry(key).or_default().push(ri);
        }
    }
    index
}

/// Left join by key. Every left row appears at least once, in left order,
/// followed by each right row sharing its key (right order). A left row
/// without a key, or without a match, pairs with `None`.
pub fn left_join<L, R, K>(
    left: &[L],
    right: &[R],
    left_key: impl Fn(&L) -> Option<K>,
    right_key: impl Fn(&R) -> Option<K>,
) -> Vec<(usize, Option<usize>)>
where
    K: Eq + Hash,
{
    let index = index_by_key(right, right_key);
    let mut out = Vec::with_capacity(left.len());

    for (li, row) in left.iter().enumerate() {
        match left_key(row).and_then(|k| index.get(&k)) {
            Some(matches) => out.extend(matches.iter().map(|&ri| (li, Some(ri)))),
            None => out.push((li, None)),
        }
    }

    out
}

/// Full outer join by key. Same order as [`left_join`], then every right
/// row that matched nothing, in right order.
pub fn outer_join<L, R, K>(
    left: &[L],
    right: &[R],
    left_key: impl Fn(&L) -> Option<K>,
    right_key: impl Fn(&R) -> Option<K>,
) -> Vec<(Option<usize>, Option<usize>)>
where
    K: Eq + Hash,
{
    let pairs = left_join(left, right, left_key, right_key);

    let mut right_used = vec![false; right.len()];
    let mut out: Vec<(Option<usize>, Option<usize>)> = pairs
        .into_iter()
        .map(|(li, ri)| {
            if let Some(ri) = ri {
                right_used[ri] = true;
            }
            (Some(li), ri)
        })
        .collect();

    out.extend(
        right_used
            .iter()
            .enumerate()
            .filter(|(_, used)| !**used)
            .map(|(ri, _)| (None, Some(ri))),
    );

    out
}
