//! Clustering buildings within a sub-polygon.
//!
//! Groups the buildings of a sub-polygon into `n / T + 1` clusters by
//! k-means over their centroids. Initial centers come from k-means++
//! driven by a caller-seeded `StdRng`, so runs are reproducible; ties in
//! the assignment step resolve to the lowest center index for the same
//! reason.

use geo::Point;
use rand::rngs::StdRng;
use rand::Rng;

const MAX_ITERATIONS: usize = 100;

/// Number of clusters for a sub-polygon with `n` buildings and target
/// cluster size `target`.
#[must_use]
pub fn cluster_count(n: usize, target: usize) -> usize {
    if n == 0 {
        return 0;
    }
    (n / target.max(1) + 1).min(n)
}

/// Assigns each point a cluster index in `[0, k)`.
///
/// Deterministic for a given rng state and point order.
#[must_use]
pub fn kmeans(points: &[Point<f64>], k: usize, rng: &mut StdRng) -> Vec<u32> {
    if points.is_empty() || k == 0 {
        return Vec::new();
    }
    if k >= points.len() {
        return (0..points.len() as u32).collect();
    }

    let mut centers = plus_plus_centers(points, k, rng);
    let mut assignments = vec![0u32; points.len()];

    for _ in 0..MAX_ITERATIONS {
        let mut changed = false;
        for (i, point) in points.iter().enumerate() {
            let mut best = 0usize;
            let mut best_dist = f64::INFINITY;
            for (j, center) in centers.iter().enumerate() {
                let dist = distance_sq(*point, *center);
                if dist < best_dist {
                    best_dist = dist;
                    best = j;
                }
            }
            if assignments[i] != best as u32 {
                assignments[i] = best as u32;
                changed = true;
            }
        }
        if !changed {
            break;
        }

        let mut sums = vec![(0.0f64, 0.0f64); k];
        let mut counts = vec![0usize; k];
        for (i, point) in points.iter().enumerate() {
            let j = assignments[i] as usize;
            sums[j].0 += point.x();
            sums[j].1 += point.y();
            counts[j] += 1;
        }
        for j in 0..k {
            // An emptied cluster keeps its previous center.
            if counts[j] > 0 {
                centers[j] = Point::new(sums[j].0 / counts[j] as f64, sums[j].1 / counts[j] as f64);
            }
        }
    }

    assignments
}

/// k-means++ seeding: each further center is drawn with probability
/// proportional to its squared distance from the nearest chosen center.
fn plus_plus_centers(points: &[Point<f64>], k: usize, rng: &mut StdRng) -> Vec<Point<f64>> {
    let mut centers = Vec::with_capacity(k);
    centers.push(points[rng.gen_range(0..points.len())]);

    while centers.len() < k {
        let weights: Vec<f64> = points
            .iter()
            .map(|point| {
                centers
                    .iter()
                    .map(|center| distance_sq(*point, *center))
                    .fold(f64::INFINITY, f64::min)
            })
            .collect();
        let total: f64 = weights.iter().sum();

        if total <= 0.0 {
            // All remaining points coincide with a center.
            centers.push(points[rng.gen_range(0..points.len())]);
            continue;
        }

        let mut threshold = rng.gen_range(0.0..total);
        let mut chosen = points.len() - 1;
        for (i, weight) in weights.iter().enumerate() {
            if threshold < *weight {
                chosen = i;
                break;
            }
            threshold -= weight;
        }
        centers.push(points[chosen]);
    }

    centers
}

fn distance_sq(a: Point<f64>, b: Point<f64>) -> f64 {
    let dx = a.x() - b.x();
    let dy = a.y() - b.y();
    dx * dx + dy * dy
}
