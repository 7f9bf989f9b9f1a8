//! Hierarchical Clustering Module
//! Agglomerative clustering used to order individuals inside an admixture group.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Linkage criterion between clusters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Linkage {
    Single,
    Complete,
    /// UPGMA
    #[default]
    Average,
    /// WPGMA
    Weighted,
}

/// Distance metric between observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    #[default]
    Euclidean,
    Cityblock,
}

impl Metric {
    pub fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        match self {
            Metric::Euclidean => a
                .iter()
                .zip(b)
                .map(|(x, y)| (x - y).powi(2))
                .sum::<f64>()
                .sqrt(),
            Metric::Cityblock => a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum(),
        }
    }
}

/// One merge step: cluster ids (smaller first), distance, resulting size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Merge {
    pub left: usize,
    pub right: usize,
    pub distance: f64,
    pub size: usize,
}

/// Build the merge list for `rows`.
///
/// Leaves are ids `0..n`, the cluster created by merge `i` gets id `n + i`.
pub fn linkage(rows: &[Vec<f64>], method: Linkage, metric: Metric) -> Vec<Merge> {
    let n = rows.len();
    if n < 2 {
        return Vec::new();
    }

    // Dense matrix indexed by active slot; slot i starts as leaf i.
    let mut dist: Vec<Vec<f64>> = (0..n)
        .into_par_iter()
        .map(|i| (0..n).map(|j| metric.distance(&rows[i], &rows[j])).collect())
        .collect();

    let mut slot_id: Vec<usize> = (0..n).collect();
    let mut slot_size: Vec<usize> = vec![1; n];
    let mut active: Vec<bool> = vec![true; n];
    let mut merges = Vec::with_capacity(n - 1);

    // Pairs order by distance, ties by the cluster ids they join.
    let key = |slot_id: &[usize], i: usize, j: usize| {
        (slot_id[i].min(slot_id[j]), slot_id[i].max(slot_id[j]))
    };
    let closer = |slot_id: &[usize], dist: &[Vec<f64>], (i, j): (usize, usize), (bi, bj): (usize, usize)| {
        let (d, bd) = (dist[i][j], dist[bi][bj]);
        d < bd || (d == bd && key(slot_id, i, j) < key(slot_id, bi, bj))
    };
    let nearest = |slot_id: &[usize], dist: &[Vec<f64>], active: &[bool], i: usize| {
        let mut best: Option<usize> = None;
        for j in (i + 1)..n {
            if active[j] && best.map_or(true, |b| closer(slot_id, dist, (i, j), (i, b))) {
                best = Some(j);
            }
        }
        best
    };

    // Nearest active slot after i, per row; keeps each step at O(n).
    let mut nn: Vec<Option<usize>> = (0..n).map(|i| nearest(&slot_id, &dist, &active, i)).collect();

    for step in 0..n - 1 {
        let mut best: Option<(usize, usize)> = None;
        for i in 0..n {
            let Some(j) = nn[i].filter(|_| active[i]) else {
                continue;
            };
            if best.map_or(true, |b| closer(&slot_id, &dist, (i, j), b)) {
                best = Some((i, j));
            }
        }

        let Some((a, b)) = best else {
            break;
        };
        let d = dist[a][b];

        let (size_a, size_b) = (slot_size[a], slot_size[b]);
        for k in 0..n {
            if !active[k] || k == a || k == b {
                continue;
            }
            let (da, db) = (dist[a][k], dist[b][k]);
            let updated = match method {
                Linkage::Single => da.min(db),
                Linkage::Complete => da.max(db),
                Linkage::Average => {
                    (size_a as f64 * da + size_b as f64 * db) / (size_a + size_b) as f64
                }
                Linkage::Weighted => (da + db) / 2.0,
            };
            dist[a][k] = updated;
            dist[k][a] = updated;
        }

        merges.push(Merge {
            left: slot_id[a].min(slot_id[b]),
            right: slot_id[a].max(slot_id[b]),
            distance: d,
            size: size_a + size_b,
        });

        // Slot `a` now holds the merged cluster.
        slot_id[a] = n + step;
        slot_size[a] = size_a + size_b;
        active[b] = false;

        for k in 0..n {
            if !active[k] {
                continue;
            }
            if k == a || nn[k] == Some(a) || nn[k] == Some(b) {
                nn[k] = nearest(&slot_id, &dist, &active, k);
            } else if k < a && nn[k].map_or(true, |j| closer(&slot_id, &dist, (k, a), (k, j))) {
                nn[k] = Some(a);
            }
        }
    }

    merges
}

/// Leaf order of the dendrogram built from `merges` over `n` leaves.
pub fn dendrogram_leaves(merges: &[Merge], n: usize) -> Vec<usize> {
    if n == 0 {
        return Vec::new();
    }
    if merges.is_empty() {
        return (0..n).collect();
    }

    let mut leaves = Vec::with_capacity(n);
    let mut stack = vec![n + merges.len() - 1];
    while let Some(id) = stack.pop() {
        if id < n {
            leaves.push(id);
        } else {
            let merge = &merges[id - n];
            // Right pushed first so the left subtree is visited first.
            stack.push(merge.right);
            stack.push(merge.left);
        }
    }
    leaves
}

/// Reorder `rows` by hierarchical clustering and return the row order.
pub fn hierarchical_order(rows: &[Vec<f64>], method: Linkage, metric: Metric) -> Vec<usize> {
    let merges = linkage(rows, method, metric);
    dendrogram_leaves(&merges, rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics() {
        assert_eq!(Metric::Euclidean.distance(&[0.0, 0.0], &[3.0, 4.0]), 5.0);
        assert_eq!(Metric::Cityblock.distance(&[0.0, 0.0], &[3.0, 4.0]), 7.0);
    }

    #[test]
    fn test_trivial_inputs() {
        assert!(hierarchical_order(&[], Linkage::Average, Metric::Euclidean).is_empty());
        assert_eq!(
            hierarchical_order(&[vec![0.3, 0.7]], Linkage::Average, Metric::Euclidean),
            vec![0]
        );
    }

    #[test]
    fn test_linkage_merges_closest_first() {
        let rows = vec![vec![0.0], vec![10.0], vec![1.0]];
        let merges = linkage(&rows, Linkage::Average, Metric::Euclidean);
        assert_eq!(merges.len(), 2);
        assert_eq!((merges[0].left, merges[0].right), (0, 2));
        assert_eq!(merges[0].distance, 1.0);
        // Average of d(0,1)=10 and d(2,1)=9
        assert_eq!((merges[1].left, merges[1].right), (1, 3));
        assert_eq!(merges[1].distance, 9.5);
        assert_eq!(merges[1].size, 3);
    }

    #[test]
    fn test_single_and_complete_linkage() {
        let rows = vec![vec![0.0], vec![10.0], vec![1.0]];
        let single = linkage(&rows, Linkage::Single, Metric::Euclidean);
        assert_eq!(single[1].distance, 9.0);
        let complete = linkage(&rows, Linkage::Complete, Metric::Euclidean);
        assert_eq!(complete[1].distance, 10.0);
    }

    #[test]
    fn test_weighted_linkage_ignores_cluster_size() {
        let rows = vec![vec![0.0], vec![1.0], vec![3.0], vec![10.0]];

        // {0,1} at 1, then {2,{0,1}} at (3 + 2) / 2, then 3 joins last.
        let weighted = linkage(&rows, Linkage::Weighted, Metric::Euclidean);
        assert_eq!((weighted[1].left, weighted[1].right), (2, 4));
        assert_eq!(weighted[1].distance, 2.5);
        assert_eq!((weighted[2].left, weighted[2].right, weighted[2].size), (3, 5, 4));
        assert_eq!(weighted[2].distance, 8.25);

        // UPGMA weights the two-member side twice: (2 * 9.5 + 7) / 3
        let average = linkage(&rows, Linkage::Average, Metric::Euclidean);
        assert!((average[2].distance - 26.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_cityblock_changes_order() {
        // (0,1) is a diagonal pair, (2,3) lies along an axis.
        let rows = vec![vec![0.0, 0.0], vec![1.0, 1.0], vec![10.0, 0.0], vec![11.5, 0.0]];

        let euclidean = linkage(&rows, Linkage::Average, Metric::Euclidean);
        assert_eq!((euclidean[0].left, euclidean[0].right), (0, 1));
        let cityblock = linkage(&rows, Linkage::Average, Metric::Cityblock);
        assert_eq!((cityblock[0].left, cityblock[0].right), (2, 3));
        assert_eq!(cityblock[0].distance, 1.5);
        assert_eq!(cityblock[1].distance, 2.0);

        assert_eq!(
            hierarchical_order(&rows, Linkage::Average, Metric::Euclidean),
            vec![0, 1, 2, 3]
        );
        assert_eq!(
            hierarchical_order(&rows, Linkage::Average, Metric::Cityblock),
            vec![2, 3, 0, 1]
        );
    }

    /// Exhaustive pair search over the merged distance matrix.
    fn linkage_by_full_scan(rows: &[Vec<f64>], method: Linkage, metric: Metric) -> Vec<Merge> {
        let n = rows.len();
        let mut dist: Vec<Vec<f64>> = rows
            .iter()
            .map(|a| rows.iter().map(|b| metric.distance(a, b)).collect())
            .collect();
        let mut ids: Vec<usize> = (0..n).collect();
        let mut sizes = vec![1usize; n];
        let mut active = vec![true; n];
        let mut merges = Vec::new();

        for step in 0..n - 1 {
            let mut best: Option<(f64, (usize, usize), usize, usize)> = None;
            for i in 0..n {
                for j in (i + 1)..n {
                    if !active[i] || !active[j] {
                        continue;
                    }
                    let cand = (dist[i][j], (ids[i].min(ids[j]), ids[i].max(ids[j])), i, j);
                    if best.map_or(true, |b| (cand.0, cand.1) < (b.0, b.1)) {
                        best = Some(cand);
                    }
                }
            }
            let (d, (left, right), a, b) = best.unwrap();
            for k in (0..n).filter(|&k| active[k] && k != a && k != b) {
                let (da, db) = (dist[a][k], dist[b][k]);
                let (sa, sb) = (sizes[a] as f64, sizes[b] as f64);
                let updated = match method {
                    Linkage::Single => da.min(db),
                    Linkage::Complete => da.max(db),
                    Linkage::Average => (sa * da + sb * db) / (sa + sb),
                    Linkage::Weighted => (da + db) / 2.0,
                };
                dist[a][k] = updated;
                dist[k][a] = updated;
            }
            merges.push(Merge { left, right, distance: d, size: sizes[a] + sizes[b] });
            ids[a] = n + step;
            sizes[a] += sizes[b];
            active[b] = false;
        }
        merges
    }

    #[test]
    fn test_matches_full_scan() {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        let mut rng = StdRng::seed_from_u64(7);
        // Coarse grid values so that ties occur.
        let rows: Vec<Vec<f64>> = (0..60)
            .map(|_| (0..3).map(|_| rng.gen_range(0..5) as f64 / 4.0).collect())
            .collect();

        for method in [Linkage::Single, Linkage::Complete, Linkage::Average, Linkage::Weighted] {
            for metric in [Metric::Euclidean, Metric::Cityblock] {
                assert_eq!(
                    linkage(&rows, method, metric),
                    linkage_by_full_scan(&rows, method, metric),
                    "{method:?} / {metric:?}"
                );
            }
        }
    }

    #[test]
    fn test_order_groups_similar_rows() {
        let rows = vec![
            vec![0.9, 0.1],
            vec![0.1, 0.9],
            vec![0.85, 0.15],
            vec![0.15, 0.85],
        ];
        let order = hierarchical_order(&rows, Linkage::Average, Metric::Euclidean);
        assert_eq!(order.len(), 4);

        let pos = |i: usize| order.iter().position(|&x| x == i).unwrap();
        assert_eq!((pos(0) as i32 - pos(2) as i32).abs(), 1);
        assert_eq!((pos(1) as i32 - pos(3) as i32).abs(), 1);
    }

    #[test]
    fn test_leaf_order_is_left_first() {
        let rows = vec![vec![0.0], vec![10.0], vec![1.0]];
        let order = hierarchical_order(&rows, Linkage::Average, Metric::Euclidean);
        assert_eq!(order, vec![1, 0, 2]);
    }
}
