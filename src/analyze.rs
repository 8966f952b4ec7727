//! Response-time and worker statistics over aggregated samples.
//!
//! Pure functions: inputs are borrowed and never reordered.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseAnalysis {
    pub mean: Option<f64>,
    pub median: Option<f64>,
    /// Every value that reaches the highest frequency, ascending.
    pub mode: Option<Vec<u64>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerHits {
    pub id: String,
    pub count: u64,
}

/// Mean, median and mode of `samples`.
///
/// The mean divides by `hits` rather than by the sample count; callers keep
/// the two equal. All three are None for an empty sample list, and the mean is
/// also None when `hits` is zero.
pub fn response_time_stats(samples: &[u64], hits: u64) -> ResponseAnalysis {
    let mut sorted = samples.to_vec();
    sorted.sort_unstable();

    ResponseAnalysis {
        mean: mean(&sorted, hits),
        median: median(&sorted),
        mode: mode(&sorted),
    }
}

fn mean(samples: &[u64], hits: u64) -> Option<f64> {
    if samples.is_empty() || hits == 0 {
        return None;
    }
    let total: u128 = samples.iter().map(|&s| s as u128).sum();
    Some(total as f64 / hits as f64)
}

/// Expects `sorted` in ascending order.
fn median(sorted: &[u64]) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        Some(sorted[mid] as f64)
    } else {
        Some((sorted[mid - 1] as f64 + sorted[mid] as f64) / 2.0)
    }
}

/// Expects `sorted` in ascending order, so equal values form runs.
fn mode(sorted: &[u64]) -> Option<Vec<u64>> {
    let &first = sorted.first()?;

    let mut modes = Vec::new();
    let mut best = 0usize;
    let mut run_value = first;
    let mut run_len = 0usize;

    for &v in sorted {
        if v == run_value {
            run_len += 1;
        } else {
            run_value = v;
            run_len = 1;
        }

        if run_len > best {
            best = run_len;
            modes.clear();
            modes.push(v);
        } else if run_len == best && modes.last() != Some(&v) {
            modes.push(v);
        }
    }

    Some(modes)
}

/// Worker with the most hits.
///
/// Single scan in the order `counts` yields; an entry replaces the current
/// best only when its count is strictly greater, so the first worker to reach
/// the maximum wins.
pub fn argmax_count<'a, I>(counts: I) -> Option<WorkerHits>
where
    I: IntoIterator<Item = (&'a str, u64)>,
{
    let mut best: Option<(&str, u64)> = None;

    for (id, count) in counts {
        match best {
            Some((_, c)) if count <= c => {}
            _ => best = Some((id, count)),
        }
    }

    best.map(|(id, count)| WorkerHits {
        id: id.to_string(),
        count,
    })
}
