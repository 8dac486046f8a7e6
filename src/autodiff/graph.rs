//! Reverse-mode differentiation over a fixed expression graph.
//!
//! Nodes are appended in construction order, so node ids are already a
//! topological order: the forward pass walks them upward, the backward pass
//! walks them downward. Shapes are checked once while building.

use crate::error::{Result, VerseError};
use crate::tensor::{ParamId, ParameterSet, Scalar};

/// Handle to a node of a [`Graph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeId(usize);

#[derive(Debug, Clone, Copy)]
enum Op {
    Param(ParamId),
    Mul(NodeId, NodeId),
    Add(NodeId, NodeId),
    Hadamard(NodeId, NodeId),
    Transpose(NodeId),
    Softmax(NodeId),
    Quadratic(NodeId, NodeId),
    Avg(NodeId),
}

#[derive(Debug, Clone)]
struct Node {
    op: Op,
    dims: [usize; 2],
}

/// A cost expression over the tensors of one [`ParameterSet`].
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<Node>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dims(&self, id: NodeId) -> [usize; 2] {
        self.nodes[id.0].dims
    }

    fn push(&mut self, op: Op, dims: [usize; 2]) -> NodeId {
        self.nodes.push(Node { op, dims });
        NodeId(self.nodes.len() - 1)
    }

    pub fn param<S: Scalar>(&mut self, set: &ParameterSet<S>, id: ParamId) -> NodeId {
        let dims = set.get(id).dims;
        self.push(Op::Param(id), dims)
    }

    /// Affine product: every vector of `a` dotted with every vector of `b`.
    /// `[n, r] × [n, c] → [r, c]`.
    pub fn mul(&mut self, a: NodeId, b: NodeId) -> Result<NodeId> {
        let (da, db) = (self.dims(a), self.dims(b));
        if da[0] != db[0] {
            return Err(VerseError::shape(
                "mul",
                format!("inner lengths differ: {:?} vs {:?}", da, db),
            ));
        }
        Ok(self.push(Op::Mul(a, b), [da[1], db[1]]))
    }

    /// Sum, broadcasting `b` across the vectors of `a` when `b` is a vector.
    pub fn add(&mut self, a: NodeId, b: NodeId) -> Result<NodeId> {
        let (da, db) = (self.dims(a), self.dims(b));
        if da[0] != db[0] || (db[1] != 1 && db[1] != da[1]) {
            return Err(VerseError::shape(
                "add",
                format!("cannot broadcast {:?} onto {:?}", db, da),
            ));
        }
        Ok(self.push(Op::Add(a, b), da))
    }

    pub fn hadamard(&mut self, a: NodeId, b: NodeId) -> Result<NodeId> {
        let (da, db) = (self.dims(a), self.dims(b));
        if da != db {
            return Err(VerseError::shape(
                "hadamard",
                format!("{:?} vs {:?}", da, db),
            ));
        }
        Ok(self.push(Op::Hadamard(a, b), da))
    }

    pub fn transpose(&mut self, a: NodeId) -> NodeId {
        let d = self.dims(a);
        self.push(Op::Transpose(a), [d[1], d[0]])
    }

    /// Softmax over each vector independently.
    pub fn softmax(&mut self, a: NodeId) -> NodeId {
        let d = self.dims(a);
        self.push(Op::Softmax(a), d)
    }

    /// `0.5·Σ(a−b)²` per vector, giving `[1, count]`.
    pub fn quadratic(&mut self, a: NodeId, b: NodeId) -> Result<NodeId> {
        let (da, db) = (self.dims(a), self.dims(b));
        if da != db {
            return Err(VerseError::shape(
                "quadratic",
                format!("{:?} vs {:?}", da, db),
            ));
        }
        Ok(self.push(Op::Quadratic(a, b), [1, da[1]]))
    }

    /// Mean of every entry, giving `[1, 1]`.
    pub fn avg(&mut self, a: NodeId) -> NodeId {
        self.push(Op::Avg(a), [1, 1])
    }

    /// Autoencoder cost `quadratic(x, softmax(w·x + b))`, optionally
    /// averaged over the columns of `x`.
    pub fn autoencoder<S: Scalar>(
        &mut self,
        set: &ParameterSet<S>,
        weight: ParamId,
        bias: ParamId,
        state: ParamId,
        average: bool,
    ) -> Result<NodeId> {
        if set.get(state).dims[0] == 0 {
            return Err(VerseError::shape("autoencoder", "state vectors are empty"));
        }
        let w = self.param(set, weight);
        let b = self.param(set, bias);
        let x = self.param(set, state);
        let affine = self.mul(w, x)?;
        let affine = self.add(affine, b)?;
        let l1 = self.softmax(affine);
        let cost = self.quadratic(x, l1)?;
        Ok(if average { self.avg(cost) } else { cost })
    }

    fn forward<S: Scalar>(&self, output: NodeId, set: &ParameterSet<S>) -> Vec<Vec<S>> {
        let mut values: Vec<Vec<S>> = Vec::with_capacity(output.0 + 1);
        for node in &self.nodes[..=output.0] {
            let out = match node.op {
                Op::Param(id) => set.get(id).values.clone(),
                Op::Mul(a, b) => {
                    let (da, db) = (self.dims(a), self.dims(b));
                    mul_forward(&values[a.0], &values[b.0], da, db)
                }
                Op::Add(a, b) => {
                    let n = self.dims(a)[0];
                    let bias_count = self.dims(b)[1];
                    let (av, bv) = (&values[a.0], &values[b.0]);
                    av.iter()
                        .enumerate()
                        .map(|(idx, &x)| x + bv[broadcast_index(idx, n, bias_count)])
                        .collect()
                }
                Op::Hadamard(a, b) => values[a.0]
                    .iter()
                    .zip(&values[b.0])
                    .map(|(&x, &y)| x * y)
                    .collect(),
                Op::Transpose(a) => transpose(&values[a.0], self.dims(a)),
                Op::Softmax(a) => softmax_forward(&values[a.0], self.dims(a)[0]),
                Op::Quadratic(a, b) => {
                    let n = self.dims(a)[0];
                    let half = S::from_f64(0.5);
                    values[a.0]
                        .chunks(n)
                        .zip(values[b.0].chunks(n))
                        .map(|(av, bv)| {
                            let mut sum = S::zero();
                            for (&x, &y) in av.iter().zip(bv) {
                                let p = x - y;
                                sum += p * p;
                            }
                            half * sum
                        })
                        .collect()
                }
                Op::Avg(a) => {
                    let av = &values[a.0];
                    let mut sum = S::zero();
                    for &x in av {
                        sum += x;
                    }
                    vec![sum / S::from_f64(av.len() as f64)]
                }
            };
            values.push(out);
        }
        values
    }

    /// Forward value of `output` without touching gradients.
    pub fn evaluate<S: Scalar>(&self, output: NodeId, set: &ParameterSet<S>) -> S {
        let values = self.forward(output, set);
        values[output.0].first().copied().unwrap_or_else(S::zero)
    }

    /// Forward pass, then backward pass seeded with ones at `output`.
    /// Parameter gradients are accumulated into `set`; the first entry of
    /// the output is returned.
    pub fn gradient<S: Scalar>(&self, output: NodeId, set: &mut ParameterSet<S>) -> S {
        let values = self.forward(output, set);
        let mut grads: Vec<Vec<S>> = values.iter().map(|v| vec![S::zero(); v.len()]).collect();
        grads[output.0].fill(S::one());

        for idx in (0..=output.0).rev() {
            let g = std::mem::take(&mut grads[idx]);
            match self.nodes[idx].op {
                Op::Param(id) => {
                    for (acc, &d) in set.get_mut(id).grads.iter_mut().zip(&g) {
                        *acc += d;
                    }
                }
                Op::Mul(a, b) => {
                    let (da, db) = (self.dims(a), self.dims(b));
                    let (n, rows) = (da[0], da[1]);
                    let mut ga = std::mem::take(&mut grads[a.0]);
                    let mut gb = if a == b {
                        vec![S::zero(); ga.len()]
                    } else {
                        std::mem::take(&mut grads[b.0])
                    };
                    let (av, bv) = (&values[a.0], &values[b.0]);
                    for j in 0..db[1] {
                        for i in 0..rows {
                            let d = g[j * rows + i];
                            for k in 0..n {
                                ga[i * n + k] += d * bv[j * n + k];
                                gb[j * n + k] += d * av[i * n + k];
                            }
                        }
                    }
                    restore(&mut grads, a, ga, b, gb);
                }
                Op::Add(a, b) => {
                    let n = self.dims(a)[0];
                    let bias_count = self.dims(b)[1];
                    for (k, &d) in g.iter().enumerate() {
                        grads[a.0][k] += d;
                        grads[b.0][broadcast_index(k, n, bias_count)] += d;
                    }
                }
                Op::Hadamard(a, b) => {
                    for (k, &d) in g.iter().enumerate() {
                        grads[a.0][k] += d * values[b.0][k];
                        grads[b.0][k] += d * values[a.0][k];
                    }
                }
                Op::Transpose(a) => {
                    // Transposing the gradient back uses the output's dims.
                    let back = transpose(&g, self.nodes[idx].dims);
                    for (acc, d) in grads[a.0].iter_mut().zip(back) {
                        *acc += d;
                    }
                }
                Op::Softmax(a) => {
                    let n = self.dims(a)[0];
                    let s = &values[idx];
                    for (col, (sv, gv)) in s.chunks(n).zip(g.chunks(n)).enumerate() {
                        let mut dot = S::zero();
                        for (&sl, &gl) in sv.iter().zip(gv) {
                            dot += sl * gl;
                        }
                        for k in 0..n {
                            grads[a.0][col * n + k] += sv[k] * (gv[k] - dot);
                        }
                    }
                }
                Op::Quadratic(a, b) => {
                    let n = self.dims(a)[0];
                    for (k, (&x, &y)) in values[a.0].iter().zip(&values[b.0]).enumerate() {
                        let d = g[k / n];
                        grads[a.0][k] += (x - y) * d;
                        grads[b.0][k] += (y - x) * d;
                    }
                }
                Op::Avg(a) => {
                    let len = values[a.0].len();
                    let d = g[0] / S::from_f64(len as f64);
                    for acc in grads[a.0].iter_mut() {
                        *acc += d;
                    }
                }
            }
        }

        values[output.0].first().copied().unwrap_or_else(S::zero)
    }
}

fn broadcast_index(idx: usize, n: usize, count: usize) -> usize {
    if count == 1 { idx % n } else { idx }
}

/// Put two taken gradient buffers back. When `a` and `b` are the same node
/// the second buffer holds only this op's contribution and is summed in.
fn restore<S: Scalar>(grads: &mut [Vec<S>], a: NodeId, mut ga: Vec<S>, b: NodeId, gb: Vec<S>) {
    if a == b {
        for (acc, d) in ga.iter_mut().zip(gb) {
            *acc += d;
        }
        grads[a.0] = ga;
    } else {
        grads[a.0] = ga;
        grads[b.0] = gb;
    }
}

fn mul_forward<S: Scalar>(a: &[S], b: &[S], da: [usize; 2], db: [usize; 2]) -> Vec<S> {
    let (n, rows) = (da[0], da[1]);
    let mut out = Vec::with_capacity(rows * db[1]);
    for bv in b.chunks(n) {
        for av in a.chunks(n) {
            let mut sum = S::zero();
            for (&x, &y) in av.iter().zip(bv) {
                sum += x * y;
            }
            out.push(sum);
        }
    }
    out
}

/// `[r, c] → [c, r]`: `out[i*c + j] = a[j*r + i]`.
fn transpose<S: Scalar>(a: &[S], dims: [usize; 2]) -> Vec<S> {
    let (r, c) = (dims[0], dims[1]);
    let mut out = vec![S::zero(); a.len()];
    for j in 0..c {
        for i in 0..r {
            out[i * c + j] = a[j * r + i];
        }
    }
    out
}

fn softmax_forward<S: Scalar>(a: &[S], n: usize) -> Vec<S> {
    let mut out = Vec::with_capacity(a.len());
    for v in a.chunks(n) {
        let shift = v.iter().map(|x| x.re()).fold(f64::NEG_INFINITY, f64::max);
        let shift = S::from_f64(shift);
        let exps: Vec<S> = v.iter().map(|&x| (x - shift).exp()).collect();
        let mut sum = S::zero();
        for &e in &exps {
            sum += e;
        }
        out.extend(exps.into_iter().map(|e| e / sum));
    }
    out
}
