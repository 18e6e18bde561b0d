//! Fractional ranking.

use std::cmp::Ordering;

/// 1-based ranks with ties sharing the average of the positions they occupy
/// (`[10, 20, 20, 30] -> [1, 2.5, 2.5, 4]`).
///
/// NaN values compare as equal to their neighbours; callers filter them first.
pub fn average_ranks(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| values[a].partial_cmp(&values[b]).unwrap_or(Ordering::Equal));

    let mut ranks = vec![0.0; n];
    let mut i = 0usize;
    while i < n {
        let mut j = i + 1;
        while j < n && values[order[j]] == values[order[i]] {
            j += 1;
        }
        // Positions i..j (0-based) share rank mean(i+1..=j).
        let avg = (i + j + 1) as f64 / 2.0;
        for &idx in &order[i..j] {
            ranks[idx] = avg;
        }
        i = j;
    }

    ranks
}
