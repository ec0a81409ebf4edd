//! Proof that several parallel stacks were all permuted by the *same*
//! hidden permutation.
//!
//! Built the same way as [`ShuffleProof`](super::shuffle::ShuffleProof): the
//! permutation is routed through the fixed odd-even transposition network,
//! but now every gate's swap-or-pass decision is shared across all `k`
//! streams. Each gate still costs a single 2-branch [`OrDlogEqProof`]: the
//! `k` streams' equality checks at that gate are folded into one target pair
//! via transcript-derived per-stream weights, the same folding trick
//! [`RotationProof`](super::rotation::RotationProof) uses across positions.

use pbmx_curve::{Point, Scalar};
use rand::{CryptoRng, Rng};

use crate::error::{Error, Result};
use crate::keys::SharedKey;
use crate::mask::Mask;
use crate::proofs::dlog_eq::DlogEqProof;
use crate::proofs::or_dlogeq::OrDlogEqProof;
use crate::transcript::Transcript;

const GATE_LABEL: &[u8] = b"pbmx.entanglement.gate";
const SINGLE_LABEL: &[u8] = b"pbmx.entanglement.single";
const WEIGHT_LABEL: &[u8] = b"pbmx.entanglement.weights";

struct Layer {
    pairs: Vec<(usize, usize)>,
    single: Option<usize>,
}

fn layers(n: usize) -> Vec<Layer> {
    (0..n)
        .map(|round| {
            let offset = round % 2;
            let mut covered = vec![false; n];
            let mut pairs = Vec::new();
            let mut i = offset;
            while i + 1 < n {
                pairs.push((i, i + 1));
                covered[i] = true;
                covered[i + 1] = true;
                i += 2;
            }
            let single = (0..n).find(|&idx| !covered[idx]);
            Layer { pairs, single }
        })
        .collect()
}

/// Per-stream `(no_swap, swap)` weight pair for one gate, derived from a
/// transcript over every stream's four involved masks.
fn gate_weights(label: &'static [u8], streams_in: &[Vec<Mask>], p: usize, q: usize, streams_out: &[Vec<Mask>]) -> Vec<(Scalar, Scalar)> {
    let mut transcript = Transcript::new(label);
    transcript.append_u64(streams_in.len() as u64);
    for (s_in, s_out) in streams_in.iter().zip(streams_out) {
        transcript
            .append_point(&s_in[p].c1())
            .append_point(&s_in[p].c2())
            .append_point(&s_in[q].c1())
            .append_point(&s_in[q].c2())
            .append_point(&s_out[p].c1())
            .append_point(&s_out[p].c2())
            .append_point(&s_out[q].c1())
            .append_point(&s_out[q].c2());
    }
    (0..streams_in.len())
        .map(|s| {
            (
                transcript.challenge_scalar_indexed((2 * s) as u64),
                transcript.challenge_scalar_indexed((2 * s + 1) as u64),
            )
        })
        .collect()
}

fn combine_gate_multi(
    streams_in: &[Vec<Mask>],
    streams_out: &[Vec<Mask>],
    p: usize,
    q: usize,
    weights: &[(Scalar, Scalar)],
    swapped: bool,
) -> (Point, Point) {
    let mut d1 = Point::identity();
    let mut d2 = Point::identity();
    for (s, &(w_no, w_yes)) in weights.iter().enumerate() {
        let in_a = &streams_in[s][p];
        let in_b = &streams_in[s][q];
        let out_a = &streams_out[s][p];
        let out_b = &streams_out[s][q];
        let (src_a, src_b) = if swapped { (in_b, in_a) } else { (in_a, in_b) };
        d1 = d1 + (out_a.c1() - src_a.c1()) * w_no + (out_b.c1() - src_b.c1()) * w_yes;
        d2 = d2 + (out_a.c2() - src_a.c2()) * w_no + (out_b.c2() - src_b.c2()) * w_yes;
    }
    (d1, d2)
}

fn single_weights(label: &'static [u8], streams_in: &[Vec<Mask>], u: usize, streams_out: &[Vec<Mask>]) -> Vec<Scalar> {
    let mut transcript = Transcript::new(label);
    transcript.append_u64(streams_in.len() as u64);
    for (s_in, s_out) in streams_in.iter().zip(streams_out) {
        transcript
            .append_point(&s_in[u].c1())
            .append_point(&s_in[u].c2())
            .append_point(&s_out[u].c1())
            .append_point(&s_out[u].c2());
    }
    (0..streams_in.len()).map(|s| transcript.challenge_scalar_indexed(s as u64)).collect()
}

fn combine_single_multi(streams_in: &[Vec<Mask>], streams_out: &[Vec<Mask>], u: usize, weights: &[Scalar]) -> (Point, Point) {
    let mut d1 = Point::identity();
    let mut d2 = Point::identity();
    for (s, &w) in weights.iter().enumerate() {
        d1 = d1 + (streams_out[s][u].c1() - streams_in[s][u].c1()) * w;
        d2 = d2 + (streams_out[s][u].c2() - streams_in[s][u].c2()) * w;
    }
    (d1, d2)
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub(crate) enum GateProof {
    Pair(OrDlogEqProof),
    Single(DlogEqProof),
}

/// Proof that `k` "before" stacks were all permuted by the same hidden
/// permutation into `k` "after" stacks.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct EntanglementProof {
    pub(crate) gates: Vec<GateProof>,
    pub(crate) intermediate: Vec<Vec<Vec<Mask>>>,
}

fn check_shape(streams: &[Vec<Mask>], n: usize) -> Result<()> {
    if streams.is_empty() {
        return Err(Error::ShapeMismatch { expected: 1, got: 0 });
    }
    for s in streams {
        if s.len() != n {
            return Err(Error::ShapeMismatch { expected: n, got: s.len() });
        }
    }
    Ok(())
}

impl EntanglementProof {
    /// Proves every stream in `streams` is permuted by the same `dest` (the
    /// same convention as [`ShuffleProof::prove`](super::shuffle::ShuffleProof::prove)),
    /// returning the proof and the resulting streams.
    ///
    /// # Errors
    /// Returns [`Error::ShapeMismatch`] if `streams` is empty, any stream's
    /// length disagrees with `dest.len()`, or `dest` is not a permutation.
    pub fn prove<R: Rng + CryptoRng>(h: &SharedKey, streams: &[Vec<Mask>], dest: &[usize], rng: &mut R) -> Result<(Self, Vec<Vec<Mask>>)> {
        let n = dest.len();
        check_shape(streams, n)?;
        if n == 0 {
            return Err(Error::ShapeMismatch { expected: 1, got: 0 });
        }
        let mut seen = vec![false; n];
        for &d in dest {
            if d >= n || seen[d] {
                return Err(Error::ShapeMismatch { expected: n, got: dest.len() });
            }
            seen[d] = true;
        }

        let k = streams.len();
        let mut cur = streams.to_vec();
        let mut keys = dest.to_vec();
        let mut gates = Vec::new();
        let mut intermediate = Vec::new();
        let rounds = layers(n);
        let last_round = rounds.len().saturating_sub(1);

        for (round_idx, layer) in rounds.iter().enumerate() {
            let mut next = cur.clone();

            for &(p, q) in &layer.pairs {
                let swap = keys[p] > keys[q];
                let (src_p, src_q) = if swap { (q, p) } else { (p, q) };
                let mut r_p = Vec::with_capacity(k);
                let mut r_q = Vec::with_capacity(k);
                for s in 0..k {
                    let rp = Scalar::random(rng);
                    let rq = Scalar::random(rng);
                    next[s][p] = remask_with(&cur[s][src_p], h, rp);
                    next[s][q] = remask_with(&cur[s][src_q], h, rq);
                    r_p.push(rp);
                    r_q.push(rq);
                }
                if swap {
                    keys.swap(p, q);
                }

                let weights = gate_weights(GATE_LABEL, &cur, p, q, &next);
                let no_swap_target = combine_gate_multi(&cur, &next, p, q, &weights, false);
                let swap_target = combine_gate_multi(&cur, &next, p, q, &weights, true);
                let targets = [no_swap_target, swap_target];
                let r_combined = (0..k).fold(Scalar::zero(), |acc, s| acc + weights[s].0 * r_p[s] + weights[s].1 * r_q[s]);
                let branch = usize::from(swap);
                let proof = OrDlogEqProof::prove(GATE_LABEL, Point::generator(), h.point(), &targets, branch, r_combined, rng);
                gates.push(GateProof::Pair(proof));
            }

            if let Some(u) = layer.single {
                let mut r = Vec::with_capacity(k);
                for s in 0..k {
                    let rs = Scalar::random(rng);
                    next[s][u] = remask_with(&cur[s][u], h, rs);
                    r.push(rs);
                }
                let weights = single_weights(SINGLE_LABEL, &cur, u, &next);
                let r_combined = (0..k).fold(Scalar::zero(), |acc, s| acc + weights[s] * r[s]);
                let (a, b) = combine_single_multi(&cur, &next, u, &weights);
                let proof = DlogEqProof::prove(SINGLE_LABEL, Point::generator(), h.point(), a, b, r_combined, rng);
                gates.push(GateProof::Single(proof));
            }

            if round_idx != last_round {
                intermediate.push(next.clone());
            }
            cur = next;
        }

        Ok((Self { gates, intermediate }, cur))
    }

    /// Verifies the proof for the given `(before, after)` stream pairs.
    pub fn verify(&self, h: &SharedKey, before: &[Vec<Mask>], after: &[Vec<Mask>]) -> Result<()> {
        if before.is_empty() || after.len() != before.len() {
            return Err(Error::ShapeMismatch { expected: before.len(), got: after.len() });
        }
        let n = before[0].len();
        check_shape(before, n)?;
        check_shape(after, n)?;
        let k = before.len();

        let rounds = layers(n);
        if self.intermediate.len() + 1 != rounds.len() {
            return Err(Error::ShapeMismatch { expected: rounds.len() - 1, got: self.intermediate.len() });
        }

        let mut gate_iter = self.gates.iter();
        let last_round = rounds.len().saturating_sub(1);

        for (round_idx, layer) in rounds.iter().enumerate() {
            let state_in: &[Vec<Mask>] = if round_idx == 0 { before } else { &self.intermediate[round_idx - 1] };
            let state_out: &[Vec<Mask>] = if round_idx == last_round { after } else { &self.intermediate[round_idx] };
            if state_in.len() != k || state_out.len() != k {
                return Err(Error::ShapeMismatch { expected: k, got: state_in.len() });
            }

            for &(p, q) in &layer.pairs {
                let proof = gate_iter.next().ok_or(Error::ProofInvalid)?;
                let GateProof::Pair(or_proof) = proof else {
                    return Err(Error::ProofInvalid);
                };
                let weights = gate_weights(GATE_LABEL, state_in, p, q, state_out);
                let no_swap_target = combine_gate_multi(state_in, state_out, p, q, &weights, false);
                let swap_target = combine_gate_multi(state_in, state_out, p, q, &weights, true);
                or_proof.verify(GATE_LABEL, Point::generator(), h.point(), &[no_swap_target, swap_target])?;
            }

            if let Some(u) = layer.single {
                let proof = gate_iter.next().ok_or(Error::ProofInvalid)?;
                let GateProof::Single(dlog_proof) = proof else {
                    return Err(Error::ProofInvalid);
                };
                let weights = single_weights(SINGLE_LABEL, state_in, u, state_out);
                let (a, b) = combine_single_multi(state_in, state_out, u, &weights);
                dlog_proof
                    .verify(SINGLE_LABEL, Point::generator(), h.point(), a, b)
                    .map_err(|_| Error::ProofInvalid)?;
            }
        }

        if gate_iter.next().is_some() {
            return Err(Error::ProofInvalid);
        }
        Ok(())
    }
}

fn remask_with(m: &Mask, h: &SharedKey, r: Scalar) -> Mask {
    Mask::from_parts(m.c1() + Point::generator() * r, m.c2() + h.point() * r, m.remaining())
}
