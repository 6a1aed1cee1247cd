use std::cmp::Ordering;

/// Stable top-down merge sort.
///
/// Unlike `slice::sort_by`, this never panics when `compare` is not a total
/// order: every merge step only asks whether the right element is strictly
/// less than the left one, so ties and inconsistent answers keep the left
/// (earlier) element first.
pub fn merge_sort_by<T, F>(items: &[T], compare: &mut F) -> Vec<T>
where
    T: Clone,
    F: FnMut(&T, &T) -> Ordering,
{
    if items.len() <= 1 {
        return items.to_vec();
    }

    let mid = items.len() / 2;
    let left = merge_sort_by(&items[..mid], compare);
    let right = merge_sort_by(&items[mid..], compare);

    let mut merged = Vec::with_capacity(items.len());
    let mut i = 0;
    let mut j = 0;

    while i < left.len() && j < right.len() {
        if compare(&right[j], &left[i]) == Ordering::Less {
            merged.push(right[j].clone());
            j += 1;
        } else {
            merged.push(left[i].clone());
            i += 1;
        }
    }

    merged.extend_from_slice(&left[i..]);
    merged.extend_from_slice(&right[j..]);
    merged
}
