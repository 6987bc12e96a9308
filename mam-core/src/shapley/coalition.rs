//! Coalition enumeration and the classical Shapley value
//!
//! Coalitions of `n` players are bitmasks over `0..2^n`; bit `i` set means
//! player `i` is in the coalition. Enumeration is exponential in `n`, which
//! is why journeys are truncated to a configured number of distinct channels.

/// Every subset of `players`, the empty one first, members in player order
pub fn coalitions<T: Clone>(players: &[T]) -> Vec<Vec<T>> {
    (0..1u32 << players.len())
        .map(|mask| members(players, mask))
        .collect()
}

/// Players selected by `mask`
pub fn members<T: Clone>(players: &[T], mask: u32) -> Vec<T> {
    players
        .iter()
        .enumerate()
        .filter(|(i, _)| mask & (1u32 << *i) != 0)
        .map(|(_, p)| p.clone())
        .collect()
}

fn factorial(n: usize) -> f64 {
    (1..=n).map(|k| k as f64).product()
}

/// Shapley value of each of `n` players under the characteristic function `v`
///
/// `v` receives a coalition bitmask; the empty coalition is pinned to 0.
pub fn shapley_values<F>(n: usize, v: F) -> Vec<f64>
where
    F: Fn(u32) -> f64,
{
    let worth: Vec<f64> = (0..1u32 << n)
        .map(|mask| if mask == 0 { 0.0 } else { v(mask) })
        .collect();

    let n_factorial = factorial(n);
    // weight[s] = s! (n - s - 1)! / n! for a coalition of size s without the player
    let weight: Vec<f64> = (0..n)
        .map(|s| factorial(s) * factorial(n - s - 1) / n_factorial)
        .collect();

    (0..n)
        .map(|player| {
            let bit = 1u32 << player;
            (0..1u32 << n)
                .filter(|mask| mask & bit == 0)
                .map(|mask| {
                    let size = mask.count_ones() as usize;
                    weight[size] * (worth[(mask | bit) as usize] - worth[mask as usize])
                })
                .sum()
        })
        .collect()
}
