//! Shared, verifiably-fair randomness derived from per-party entropy masks.
//!
//! The expression grammar (`spec = expr ; expr = term (('+'|'-') term)* ;
//! term = dice | constant`) is small enough that a hand-rolled recursive-
//! descent parser is the right tool, rather than pulling in a parser
//! combinator crate at this scale.

use std::collections::BTreeSet;

use pbmx_crypto::proofs::DlogEqProof;
use pbmx_crypto::{Fingerprint, Mask, PublicKey, Share};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;

use crate::error::{Error, Result};

/// One term of a parsed random spec: either a fixed constant or `n d m`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Term {
    Constant(i64),
    Dice { count: u32, sides: u32 },
}

/// A parsed, signed sum of [`Term`]s.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct RngSpec {
    terms: Vec<(bool, Term)>,
}

struct Parser<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { bytes: input.as_bytes(), pos: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let b = self.peek();
        if b.is_some() {
            self.pos += 1;
        }
        b
    }

    fn parse_nonzero(&mut self) -> Result<u32> {
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.advance();
        }
        let digits = std::str::from_utf8(&self.bytes[start..self.pos]).unwrap();
        if digits.is_empty() || digits.starts_with('0') {
            return Err(Error::SpecParse(format!("expected a nonzero integer at offset {start}")));
        }
        digits.parse().map_err(|_| Error::SpecParse(format!("integer out of range at offset {start}")))
    }

    fn parse_constant(&mut self) -> Result<i64> {
        let start = self.pos;
        if self.peek() == Some(b'0') {
            self.advance();
            return Ok(0);
        }
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.advance();
        }
        let digits = std::str::from_utf8(&self.bytes[start..self.pos]).unwrap();
        if digits.is_empty() {
            return Err(Error::SpecParse(format!("expected a constant at offset {start}")));
        }
        digits.parse().map_err(|_| Error::SpecParse(format!("integer out of range at offset {start}")))
    }

    fn parse_term(&mut self) -> Result<Term> {
        let start = self.pos;
        if let Ok(count) = self.parse_nonzero() {
            if self.peek() == Some(b'd') {
                self.advance();
                let sides = self.parse_nonzero()?;
                return Ok(Term::Dice { count, sides });
            }
            return Ok(Term::Constant(i64::from(count)));
        }
        self.pos = start;
        let value = self.parse_constant()?;
        Ok(Term::Constant(value))
    }

    fn parse_expr(&mut self) -> Result<Vec<(bool, Term)>> {
        let mut terms = vec![(true, self.parse_term()?)];
        loop {
            match self.peek() {
                Some(b'+') => {
                    self.advance();
                    terms.push((true, self.parse_term()?));
                }
                Some(b'-') => {
                    self.advance();
                    terms.push((false, self.parse_term()?));
                }
                _ => break,
            }
        }
        Ok(terms)
    }
}

impl RngSpec {
    /// Parses a spec string per spec's grammar.
    pub fn parse(input: &str) -> Result<Self> {
        if input.is_empty() {
            return Err(Error::SpecParse("empty spec".to_string()));
        }
        let mut parser = Parser::new(input);
        let terms = parser.parse_expr()?;
        if parser.pos != parser.bytes.len() {
            return Err(Error::SpecParse(format!("unexpected trailing input at offset {}", parser.pos)));
        }
        Ok(Self { terms })
    }

    /// The inclusive `[low, high]` range this spec can evaluate to.
    pub fn range(&self) -> (i64, i64) {
        self.terms.iter().fold((0, 0), |(lo, hi), (positive, term)| {
            let (term_lo, term_hi) = match term {
                Term::Constant(c) => (*c, *c),
                Term::Dice { count, sides } => (i64::from(*count), i64::from(*count) * i64::from(*sides)),
            };
            if *positive {
                (lo + term_lo, hi + term_hi)
            } else {
                (lo - term_hi, hi - term_lo)
            }
        })
    }

    /// Evaluates the spec by rejection-sampling each dice term from `rng`.
    pub fn evaluate(&self, rng: &mut impl RngCore) -> i64 {
        self.terms
            .iter()
            .map(|(positive, term)| {
                let value = match term {
                    Term::Constant(c) => *c,
                    Term::Dice { count, sides } => (0..*count).map(|_| 1 + roll(rng, *sides) as i64).sum(),
                };
                if *positive {
                    value
                } else {
                    -value
                }
            })
            .sum()
    }
}

/// Rolls one `1..=sides` die via rejection sampling: redraws any `u32` that
/// would make the modulo reduction biased, rather than reducing directly.
fn roll(rng: &mut impl RngCore, sides: u32) -> u32 {
    let limit = sides * (u32::MAX / sides);
    loop {
        let draw = rng.next_u32();
        if draw < limit {
            return 1 + draw % sides;
        }
    }
}

/// Derived state for one named [`RngSpec`]: accumulated entropy and reveal
/// shares from every currently-published party.
#[derive(Clone, Debug)]
pub struct RngState {
    spec: RngSpec,
    entropy: Option<Mask>,
    contributed: BTreeSet<Fingerprint>,
    revealed: BTreeSet<Fingerprint>,
}

impl RngState {
    /// Starts tracking a freshly-declared named Rng.
    pub fn new(spec: RngSpec) -> Self {
        Self {
            spec,
            entropy: None,
            contributed: BTreeSet::new(),
            revealed: BTreeSet::new(),
        }
    }

    /// The parsed spec.
    pub fn spec(&self) -> &RngSpec {
        &self.spec
    }

    /// The accumulated entropy mask, once at least one party has contributed.
    pub fn entropy(&self) -> Option<Mask> {
        self.entropy
    }

    /// Folds in one party's entropy contribution.
    pub fn add_entropy(&mut self, party: Fingerprint, contribution: Mask) {
        self.entropy = Some(match self.entropy {
            Some(existing) => existing + contribution,
            None => contribution,
        });
        self.contributed.insert(party);
    }

    /// Whether every party in `roster` has contributed entropy.
    pub fn generated(&self, roster: &BTreeSet<Fingerprint>) -> bool {
        !roster.is_empty() && roster.is_subset(&self.contributed)
    }

    /// Verifies and applies one party's reveal share, decrementing the
    /// accumulated mask.
    pub fn add_reveal(&mut self, party: Fingerprint, pk: &PublicKey, share: &Share, proof: &DlogEqProof) -> Result<()> {
        let mask = self.entropy.ok_or_else(|| Error::ChainIntegrity("reveal before any entropy was contributed".to_string()))?;
        mask.verify_share(pk, share, proof)?;
        self.entropy = Some(mask.unmask_share(share));
        self.revealed.insert(party);
        Ok(())
    }

    /// Whether every party in `roster` has published a reveal share.
    pub fn revealed(&self, roster: &BTreeSet<Fingerprint>) -> bool {
        !roster.is_empty() && roster.is_subset(&self.revealed)
    }

    /// Once fully revealed, unmasks the accumulated entropy and evaluates the
    /// spec by seeding a ChaCha20 stream from its canonical encoding.
    pub fn value(&self) -> Result<i64> {
        let mask = self.entropy.ok_or_else(|| Error::ChainIntegrity("rng has no entropy yet".to_string()))?;
        let token = mask.unmask_open(pbmx_crypto::DEFAULT_RECOVERY_BOUND).map_err(|_| Error::ExhaustedRecovery(mask.remaining()))?;
        let mut seed = [0u8; 32];
        seed[..8].copy_from_slice(&token.value().to_le_bytes());
        let mut csprng = ChaCha20Rng::from_seed(seed);
        Ok(self.spec.evaluate(&mut csprng))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_constant() {
        let spec = RngSpec::parse("5").unwrap();
        assert_eq!(spec.range(), (5, 5));
    }

    #[test]
    fn parses_dice_term() {
        let spec = RngSpec::parse("1d6").unwrap();
        assert_eq!(spec.range(), (1, 6));
    }

    #[test]
    fn parses_mixed_expression() {
        let spec = RngSpec::parse("2d6+3").unwrap();
        assert_eq!(spec.range(), (5, 15));
    }

    #[test]
    fn parses_subtraction() {
        let spec = RngSpec::parse("2d6-1").unwrap();
        assert_eq!(spec.range(), (1, 11));
    }

    #[test]
    fn rejects_malformed_spec() {
        assert!(RngSpec::parse("1d").is_err());
        assert!(RngSpec::parse("").is_err());
        assert!(RngSpec::parse("01d6").is_err());
    }

    #[test]
    fn evaluation_stays_in_range() {
        let spec = RngSpec::parse("3d6+2").unwrap();
        let (lo, hi) = spec.range();
        let mut rng = rand::thread_rng();
        for _ in 0..50 {
            let v = spec.evaluate(&mut rng);
            assert!(v >= lo && v <= hi);
        }
    }

    /// A scripted `RngCore` that yields a fixed sequence of `u32`s, to drive
    /// `roll` past its rejection boundary deterministically.
    struct Scripted(std::vec::IntoIter<u32>);

    impl RngCore for Scripted {
        fn next_u32(&mut self) -> u32 {
            self.0.next().expect("script exhausted")
        }
        fn next_u64(&mut self) -> u64 {
            unimplemented!()
        }
        fn fill_bytes(&mut self, _dest: &mut [u8]) {
            unimplemented!()
        }
        fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> std::result::Result<(), rand::Error> {
            unimplemented!()
        }
    }

    #[test]
    fn roll_rejects_draws_in_the_biased_tail() {
        // sides = 3: limit = 3 * (u32::MAX / 3), the draw at u32::MAX itself
        // falls in the rejected tail and must be redrawn rather than reduced.
        let mut rng = Scripted(vec![u32::MAX, 0].into_iter());
        assert_eq!(roll(&mut rng, 3), 1);
    }

    #[test]
    fn roll_stays_in_range_for_non_power_of_two_sides() {
        let mut rng = rand::thread_rng();
        for sides in [3u32, 5, 6, 7, 10] {
            for _ in 0..200 {
                let v = roll(&mut rng, sides);
                assert!((1..=sides).contains(&v));
            }
        }
    }
}
