//! Regression trees fitted to gradient statistics.
//!
//! Trees grow leaf-wise: at every step the leaf whose best split has the
//! largest gain is split, until `num_leaves` is reached, no split improves
//! the objective, or depth and sample limits forbid further splits.
//! Split search works on per-bin gradient histograms; the larger child's
//! histogram is derived from its parent minus the smaller sibling.

use crate::model::binning::BinnedMatrix;
use crate::model::gbdt::BoostingParams;
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

const MIN_SUM_HESSIAN: f64 = 1e-3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    /// Rows with `x[feature] <= threshold` go left, everything else (NaN
    /// included) goes right.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    pub fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct BinStat {
    grad: f64,
    hess: f64,
    count: usize,
}

type Histogram = Vec<Vec<BinStat>>;

#[derive(Debug, Clone, Copy)]
struct SplitInfo {
    feature: usize,
    bin: usize,
    gain: f64,
}

struct Leaf {
    node: usize,
    rows: Vec<usize>,
    depth: usize,
    grad: f64,
    hess: f64,
    hist: Histogram,
    best: Option<SplitInfo>,
}

/// Output of one tree fit.
pub struct FittedTree {
    pub tree: Tree,
    /// Leaf value reached by every training row.
    pub row_values: Vec<f64>,
    /// Total split gain contributed per feature.
    pub gains: Vec<f64>,
}

pub struct TreeBuilder<'a> {
    bins: &'a BinnedMatrix,
    grad: &'a [f64],
    hess: &'a [f64],
    params: &'a BoostingParams,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(
        bins: &'a BinnedMatrix,
        grad: &'a [f64],
        hess: &'a [f64],
        params: &'a BoostingParams,
    ) -> Self {
        Self {
            bins,
            grad,
            hess,
            params,
        }
    }

    pub fn build(&self) -> FittedTree {
        let n_rows = self.grad.len();
        let rows: Vec<usize> = (0..n_rows).collect();
        let (g, h) = self.sums(&rows);
        let hist = self.histogram(&rows);

        let mut nodes = vec![Node::Leaf {
            value: self.leaf_value(g, h),
        }];
        let mut gains = vec![0.0; self.bins.n_features()];
        let mut open = vec![self.leaf(0, rows, 0, g, h, hist)];
        let mut n_leaves = 1;

        while n_leaves < self.params.num_leaves {
            let pick = open
                .iter()
                .enumerate()
                .filter_map(|(i, leaf)| leaf.best.map(|b| (i, b.gain)))
                .max_by(|a, b| a.1.total_cmp(&b.1));
            let Some((idx, _)) = pick else { break };
            let parent = open.swap_remove(idx);
            let Some(split) = parent.best else { break };

            let column = self.bins.column(split.feature);
            let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = parent
                .rows
                .iter()
                .partition(|&&r| column[r] as usize <= split.bin);

            let (lg, lh) = self.sums(&left_rows);
            let (rg, rh) = (parent.grad - lg, parent.hess - lh);

            let (left_hist, right_hist) = if left_rows.len() <= right_rows.len() {
                let small = self.histogram(&left_rows);
                let large = subtract(&parent.hist, &small);
                (small, large)
            } else {
                let small = self.histogram(&right_rows);
                let large = subtract(&parent.hist, &small);
                (large, small)
            };

            let left = nodes.len();
            let right = left + 1;
            nodes.push(Node::Leaf {
                value: self.leaf_value(lg, lh),
            });
            nodes.push(Node::Leaf {
                value: self.leaf_value(rg, rh),
            });
            nodes[parent.node] = Node::Split {
                feature: split.feature,
                threshold: self.bins.mapper(split.feature).upper_bound(split.bin),
                left,
                right,
            };
            gains[split.feature] += split.gain;
            n_leaves += 1;

            let depth = parent.depth + 1;
            open.push(self.leaf(left, left_rows, depth, lg, lh, left_hist));
            open.push(self.leaf(right, right_rows, depth, rg, rh, right_hist));
        }

        let mut row_values = vec![0.0; n_rows];
        for leaf in &open {
            if let Node::Leaf { value } = nodes[leaf.node] {
                for &r in &leaf.rows {
                    row_values[r] = value;
                }
            }
        }

        FittedTree {
            tree: Tree { nodes },
            row_values,
            gains,
        }
    }

    fn leaf(
        &self,
        node: usize,
        rows: Vec<usize>,
        depth: usize,
        grad: f64,
        hess: f64,
        hist: Histogram,
    ) -> Leaf {
        let best = if self.can_split(rows.len(), depth) {
            self.best_split(&hist, grad, hess)
        } else {
            None
        };
        Leaf {
            node,
            rows,
            depth,
            grad,
            hess,
            hist,
            best,
        }
    }

    fn can_split(&self, n_rows: usize, depth: usize) -> bool {
        let depth_ok = self.params.max_depth <= 0 || (depth as i64) < self.params.max_depth;
        depth_ok && n_rows >= 2 * self.params.min_child_samples.max(1)
    }

    fn sums(&self, rows: &[usize]) -> (f64, f64) {
        rows.iter()
            .fold((0.0, 0.0), |(g, h), &r| (g + self.grad[r], h + self.hess[r]))
    }

    fn histogram(&self, rows: &[usize]) -> Histogram {
        (0..self.bins.n_features())
            .map(|f| {
                let column = self.bins.column(f);
                let mut stats = vec![BinStat::default(); self.bins.mapper(f).n_bins()];
                for &r in rows {
                    let s = &mut stats[column[r] as usize];
                    s.grad += self.grad[r];
                    s.hess += self.hess[r];
                    s.count += 1;
                }
                stats
            })
            .collect()
    }

    fn best_split(&self, hist: &Histogram, grad: f64, hess: f64) -> Option<SplitInfo> {
        let lambda = self.params.lambda_l2;
        let min_child = self.params.min_child_samples.max(1);
        let parent_score = grad * grad / (hess + lambda);
        let total: usize = hist.first().map(|h| h.iter().map(|s| s.count).sum()).unwrap_or(0);

        let mut best: Option<SplitInfo> = None;
        for (feature, stats) in hist.iter().enumerate() {
            let (mut lg, mut lh, mut ln) = (0.0, 0.0, 0usize);
            for (bin, s) in stats.iter().enumerate().take(stats.len().saturating_sub(1)) {
                lg += s.grad;
                lh += s.hess;
                ln += s.count;
                let rn = total - ln;
                if ln < min_child || s.count == 0 {
                    continue;
                }
                if rn < min_child {
                    break;
                }
                let (rg, rh) = (grad - lg, hess - lh);
                if lh < MIN_SUM_HESSIAN || rh < MIN_SUM_HESSIAN {
                    continue;
                }
                let gain = lg * lg / (lh + lambda) + rg * rg / (rh + lambda) - parent_score;
                if gain > self.params.min_split_gain
                    && best.map_or(true, |b| gain > b.gain)
                {
                    best = Some(SplitInfo { feature, bin, gain });
                }
            }
        }
        best
    }

    fn leaf_value(&self, grad: f64, hess: f64) -> f64 {
        -grad / (hess + self.params.lambda_l2) * self.params.learning_rate
    }
}

fn subtract(parent: &Histogram, child: &Histogram) -> Histogram {
    parent
        .iter()
        .zip(child.iter())
        .map(|(p, c)| {
            p.iter()
                .zip(c.iter())
                .map(|(a, b)| BinStat {
                    grad: a.grad - b.grad,
                    hess: a.hess - b.hess,
                    count: a.count - b.count,
                })
                .collect()
        })
        .collect()
}
