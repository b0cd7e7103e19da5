//! Agglomerative clustering with Ward linkage
//!
//! Merge trees follow the usual linkage-matrix convention: leaves are `0..n`,
//! the cluster created by merge `i` gets id `n + i`, and merges are listed in
//! non-decreasing distance.

use ndarray::ArrayView2;

/// A single merge step in the tree
#[derive(Debug, Clone, PartialEq)]
pub struct Merge {
    /// Smaller of the two merged cluster ids
    pub left: usize,
    /// Larger of the two merged cluster ids
    pub right: usize,
    pub distance: f64,
    /// Number of leaves under the new cluster
    pub size: usize,
}

/// Full merge tree over `n_leaves` observations
#[derive(Debug, Clone)]
pub struct Linkage {
    pub n_leaves: usize,
    pub merges: Vec<Merge>,
}

/// A drawn link of the dendrogram: an upside-down U joining two children
#[derive(Debug, Clone, PartialEq)]
pub struct DendrogramLink {
    /// Horizontal positions of the left and right child
    pub x: (f64, f64),
    /// Heights of the left child, the merge, and the right child
    pub y: (f64, f64, f64),
}

/// Positions needed to draw a dendrogram
#[derive(Debug, Clone)]
pub struct DendrogramLayout {
    /// Leaves in drawing order
    pub leaves: Vec<usize>,
    /// Horizontal position of `leaves[i]`
    pub leaf_positions: Vec<f64>,
    pub links: Vec<DendrogramLink>,
    pub max_distance: f64,
}

/// Spacing between neighbouring leaves in dendrogram coordinates
pub const LEAF_SPACING: f64 = 10.0;

fn sq_euclidean(a: ndarray::ArrayView1<f64>, b: ndarray::ArrayView1<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}

/// Ward linkage over the rows of `data`, using Euclidean distance
///
/// Uses the nearest-neighbour chain algorithm on a dense distance matrix.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::many_single_char_names)]
pub fn ward(data: ArrayView2<f64>) -> Linkage {
    let n = data.nrows();
    if n < 2 {
        return Linkage {
            n_leaves: n,
            merges: Vec::new(),
        };
    }

    let mut dist = vec![0.0; n * n];
    for i in 0..n {
        for j in (i + 1)..n {
            let d = sq_euclidean(data.row(i), data.row(j)).sqrt();
            dist[i * n + j] = d;
            dist[j * n + i] = d;
        }
    }

    // size[i] == 0 marks a slot whose cluster has been merged away
    let mut size = vec![1usize; n];
    let mut raw: Vec<(usize, usize, f64)> = Vec::with_capacity(n - 1);
    let mut chain: Vec<usize> = Vec::with_capacity(n);

    for _ in 0..(n - 1) {
        if chain.is_empty() {
            if let Some(first) = (0..n).find(|&i| size[i] > 0) {
                chain.push(first);
            }
        }

        let (x, y, current) = loop {
            let x = chain[chain.len() - 1];
            let (mut y, mut current) = if chain.len() > 1 {
                let prev = chain[chain.len() - 2];
                (prev, dist[x * n + prev])
            } else {
                (usize::MAX, f64::INFINITY)
            };

            for i in 0..n {
                if size[i] == 0 || i == x {
                    continue;
                }
                let d = dist[x * n + i];
                if d < current {
                    current = d;
                    y = i;
                }
            }

            if chain.len() > 1 && y == chain[chain.len() - 2] {
                break (x, y, current);
            }
            chain.push(y);
        };

        chain.pop();
        chain.pop();

        let (x, y) = if x < y { (x, y) } else { (y, x) };
        raw.push((x, y, current));

        // Lance-Williams update for Ward, merged cluster lives in slot y
        let (nx, ny) = (size[x] as f64, size[y] as f64);
        for i in 0..n {
            if size[i] == 0 || i == x || i == y {
                continue;
            }
            let ni = size[i] as f64;
            let dxi = dist[x * n + i];
            let dyi = dist[y * n + i];
            let d = (((ni + nx) * dxi * dxi + (ni + ny) * dyi * dyi - ni * current * current)
                / (nx + ny + ni))
                .max(0.0)
                .sqrt();
            dist[y * n + i] = d;
            dist[i * n + y] = d;
        }
        size[y] += size[x];
        size[x] = 0;
    }

    Linkage {
        n_leaves: n,
        merges: relabel(n, raw),
    }
}

/// Sort raw slot merges by distance and give merged clusters ids `n..2n-1`
fn relabel(n: usize, mut raw: Vec<(usize, usize, f64)>) -> Vec<Merge> {
    raw.sort_by(|a, b| a.2.partial_cmp(&b.2).unwrap_or(std::cmp::Ordering::Equal));

    let mut parent: Vec<usize> = (0..2 * n - 1).collect();
    let mut sizes = vec![1usize; 2 * n - 1];

    fn find(parent: &mut [usize], mut x: usize) -> usize {
        let mut root = x;
        while parent[root] != root {
            root = parent[root];
        }
        while parent[x] != root {
            let next = parent[x];
            parent[x] = root;
            x = next;
        }
        root
    }

    raw.into_iter()
        .enumerate()
        .map(|(i, (x, y, distance))| {
            let rx = find(&mut parent, x);
            let ry = find(&mut parent, y);
            let id = n + i;
            parent[rx] = id;
            parent[ry] = id;
            sizes[id] = sizes[rx] + sizes[ry];
            Merge {
                left: rx.min(ry),
                right: rx.max(ry),
                distance,
                size: sizes[id],
            }
        })
        .collect()
}

impl Linkage {
    /// Leaves in left-to-right order of the flattened tree
    #[must_use]
    pub fn leaves(&self) -> Vec<usize> {
        let n = self.n_leaves;
        if self.merges.is_empty() {
            return (0..n).collect();
        }

        let mut order = Vec::with_capacity(n);
        let mut stack = vec![2 * n - 2];
        while let Some(node) = stack.pop() {
            if node < n {
                order.push(node);
            } else {
                let merge = &self.merges[node - n];
                stack.push(merge.right);
                stack.push(merge.left);
            }
        }
        order
    }

    /// Coordinates for drawing the tree with leaves spaced `LEAF_SPACING` apart
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn dendrogram_layout(&self) -> DendrogramLayout {
        let n = self.n_leaves;
        let leaves = self.leaves();
        let leaf_positions: Vec<f64> = (0..leaves.len())
            .map(|i| LEAF_SPACING / 2.0 + LEAF_SPACING * i as f64)
            .collect();

        // (x, height) of every node id
        let mut nodes = vec![(0.0, 0.0); n + self.merges.len()];
        for (&leaf, &x) in leaves.iter().zip(&leaf_positions) {
            nodes[leaf] = (x, 0.0);
        }

        let mut links = Vec::with_capacity(self.merges.len());
        for (i, merge) in self.merges.iter().enumerate() {
            let (xl, yl) = nodes[merge.left];
            let (xr, yr) = nodes[merge.right];
            let (x_left, y_left, x_right, y_right) = if xl <= xr {
                (xl, yl, xr, yr)
            } else {
                (xr, yr, xl, yl)
            };
            links.push(DendrogramLink {
                x: (x_left, x_right),
                y: (y_left, merge.distance, y_right),
            });
            nodes[n + i] = ((xl + xr) / 2.0, merge.distance);
        }

        let max_distance = self
            .merges
            .iter()
            .map(|m| m.distance)
            .fold(0.0, f64::max);

        DendrogramLayout {
            leaves,
            leaf_positions,
            links,
            max_distance,
        }
    }
}
