//! Stored order arrays versus live rows.
//!
//! Boards, lists and users persist the display order of their children as an
//! array of ids. The array is never trusted to be complete or current: rows may
//! have been deleted, archived or created elsewhere since it was last written.
//! `reconcile` merges the two so every live row appears exactly once.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// Order `items` by `order_ids`, then append the rest in their original order.
///
/// Ids in `order_ids` with no live item are skipped and repeated ids count
/// once. The result is always a permutation of `items`.
pub fn reconcile<T, K, F>(order_ids: &[K], items: Vec<T>, key: F) -> Vec<T>
where
    K: Eq + Hash + Copy,
    F: Fn(&T) -> K,
{
    let mut slots: Vec<Option<T>> = items.into_iter().map(Some).collect();
    let mut index: HashMap<K, Vec<usize>> = HashMap::new();
    for (i, slot) in slots.iter().enumerate() {
        if let Some(item) = slot {
            index.entry(key(item)).or_default().push(i);
        }
    }

    let mut ordered = Vec::with_capacity(slots.len());
    let mut seen = HashSet::new();
    for id in order_ids {
        if !seen.insert(*id) {
            continue;
        }
        if let Some(positions) = index.get(id) {
            for &i in positions {
                if let Some(item) = slots[i].take() {
                    ordered.push(item);
                }
            }
        }
    }

    ordered.extend(slots.into_iter().flatten());
    ordered
}

/// Stable partition moving completed items after the others
pub fn completed_last<T, F>(items: Vec<T>, is_completed: F) -> Vec<T>
where
    F: Fn(&T) -> bool,
{
    let (done, open): (Vec<T>, Vec<T>) = items.into_iter().partition(|item| is_completed(item));
    open.into_iter().chain(done).collect()
}

/// Drop repeated ids, keeping first occurrences
pub fn dedup<K: Eq + Hash + Copy>(ids: &[K]) -> Vec<K> {
    let mut seen = HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

/// Remove `id` from `order`
pub fn remove_id<K: Eq + Copy>(order: &mut Vec<K>, id: K) {
    order.retain(|existing| *existing != id);
}

/// Insert `id` at `index` (clamped to the end), removing any earlier occurrence
pub fn insert_id<K: Eq + Copy>(order: &mut Vec<K>, id: K, index: Option<usize>) {
    remove_id(order, id);
    let at = index.unwrap_or(order.len()).min(order.len());
    order.insert(at, id);
}

/// Insert `id` right after `anchor`, or at the end when `anchor` is absent
pub fn insert_after<K: Eq + Copy>(order: &mut Vec<K>, id: K, anchor: K) {
    remove_id(order, id);
    let at = order
        .iter()
        .position(|existing| *existing == anchor)
        .map(|i| i + 1)
        .unwrap_or(order.len());
    order.insert(at, id);
}
