//! Domain-separated Fiat-Shamir transcripts.
//!
//! Every proof in this crate derives its challenge(s) the same way: append
//! every public input to a labeled BLAKE3 hasher, then squeeze a wide XOF
//! output and reduce it modulo the group order, generalized to an arbitrary
//! append sequence rather than a fixed input shape.

use pbmx_curve::{Point, Scalar};

/// A single-use, append-only Fiat-Shamir transcript.
pub struct Transcript(blake3::Hasher);

impl Transcript {
    /// Starts a new transcript under a fixed domain-separation label.
    pub fn new(label: &'static [u8]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(label);
        Self(hasher)
    }

    /// Appends a point's canonical encoding.
    pub fn append_point(&mut self, point: &Point) -> &mut Self {
        self.0.update(&point.to_bytes());
        self
    }

    /// Appends every point in `points`, in order.
    pub fn append_points(&mut self, points: &[Point]) -> &mut Self {
        for p in points {
            self.append_point(p);
        }
        self
    }

    /// Appends a scalar's canonical encoding.
    pub fn append_scalar(&mut self, scalar: &Scalar) -> &mut Self {
        self.0.update(&scalar.to_bytes());
        self
    }

    /// Appends a length-prefixed byte string.
    pub fn append_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.0.update(&(bytes.len() as u64).to_le_bytes());
        self.0.update(bytes);
        self
    }

    /// Appends a little-endian `u64`.
    pub fn append_u64(&mut self, value: u64) -> &mut Self {
        self.0.update(&value.to_le_bytes());
        self
    }

    /// Squeezes the transcript into a single challenge scalar.
    ///
    /// Consumes `self` (by value) so a transcript can only ever produce one
    /// challenge; building a second one from the same state would reuse the
    /// randomness and break soundness.
    pub fn challenge_scalar(self) -> Scalar {
        let mut xof = self.0.finalize_xof();
        // 64 bytes of output keep modulo bias against the ~254-bit field
        // statistically negligible.
        let mut wide = [0u8; 64];
        xof.fill(&mut wide);
        Scalar::from_wide_bytes(&wide)
    }

    /// Forks the transcript to derive an indexed challenge without consuming
    /// the parent, used when a proof needs many related-but-distinct
    /// challenges (e.g. one weight per stack position).
    pub fn challenge_scalar_indexed(&self, index: u64) -> Scalar {
        let mut hasher = self.0.clone();
        hasher.update(b"index");
        hasher.update(&index.to_le_bytes());
        let mut xof = hasher.finalize_xof();
        let mut wide = [0u8; 64];
        xof.fill(&mut wide);
        Scalar::from_wide_bytes(&wide)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_inputs_give_same_challenge() {
        let g = Point::generator();
        let mut t1 = Transcript::new(b"test");
        t1.append_point(&g);
        let mut t2 = Transcript::new(b"test");
        t2.append_point(&g);
        assert_eq!(t1.challenge_scalar(), t2.challenge_scalar());
    }

    #[test]
    fn different_labels_diverge() {
        let g = Point::generator();
        let mut t1 = Transcript::new(b"a");
        t1.append_point(&g);
        let mut t2 = Transcript::new(b"b");
        t2.append_point(&g);
        assert_ne!(t1.challenge_scalar(), t2.challenge_scalar());
    }

    #[test]
    fn indexed_challenges_differ_by_index() {
        let t = Transcript::new(b"idx");
        assert_ne!(t.challenge_scalar_indexed(0), t.challenge_scalar_indexed(1));
    }
}
