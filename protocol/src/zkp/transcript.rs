//! Fiat-Shamir transcript over SHA-512.
//!
//! Every message is absorbed as `len(label) || label || len(data) || data`,
//! so no two distinct sequences of appends hash the same. Challenges are
//! squeezed as 64 bytes and reduced wide, then fed back into the state so
//! later challenges depend on earlier ones.

use curve25519_dalek::{ristretto::RistrettoPoint, scalar::Scalar};
use sha2::{Digest, Sha512};

#[derive(Clone)]
pub struct Transcript {
    hasher: Sha512,
}

impl Transcript {
    /// Start a transcript under a per-proof domain separator.
    pub fn new(domain: &'static [u8]) -> Self {
        let mut transcript = Self {
            hasher: Sha512::new(),
        };
        transcript.append_message(b"dom-sep", domain);
        transcript
    }

    pub fn append_message(&mut self, label: &'static [u8], data: &[u8]) {
        self.hasher.update((label.len() as u64).to_le_bytes());
        self.hasher.update(label);
        self.hasher.update((data.len() as u64).to_le_bytes());
        self.hasher.update(data);
    }

    pub fn append_point(&mut self, label: &'static [u8], point: &RistrettoPoint) {
        self.append_message(label, point.compress().as_bytes());
    }

    pub fn append_u64(&mut self, label: &'static [u8], value: u64) {
        self.append_message(label, &value.to_le_bytes());
    }

    pub fn challenge_scalar(&mut self, label: &'static [u8]) -> Scalar {
        self.append_message(b"challenge", label);
        let digest = self.hasher.clone().finalize();
        let mut wide = [0u8; 64];
        wide.copy_from_slice(&digest);
        self.append_message(b"challenge-output", &wide);
        Scalar::from_bytes_mod_order_wide(&wide)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use curve25519_dalek::constants::RISTRETTO_BASEPOINT_POINT as G;

    #[test]
    fn same_inputs_same_challenge() {
        let mut a = Transcript::new(b"test");
        let mut b = Transcript::new(b"test");
        a.append_point(b"P", &G);
        b.append_point(b"P", &G);
        assert_eq!(a.challenge_scalar(b"c"), b.challenge_scalar(b"c"));
    }

    #[test]
    fn domain_separates() {
        let mut a = Transcript::new(b"one");
        let mut b = Transcript::new(b"two");
        assert_ne!(a.challenge_scalar(b"c"), b.challenge_scalar(b"c"));
    }

    #[test]
    fn successive_challenges_differ() {
        let mut t = Transcript::new(b"test");
        let c1 = t.challenge_scalar(b"c");
        let c2 = t.challenge_scalar(b"c");
        assert_ne!(c1, c2);
    }

    #[test]
    fn length_prefix_prevents_ambiguity() {
        let mut a = Transcript::new(b"test");
        a.append_message(b"m", b"ab");
        a.append_message(b"m", b"c");
        let mut b = Transcript::new(b"test");
        b.append_message(b"m", b"a");
        b.append_message(b"m", b"bc");
        assert_ne!(a.challenge_scalar(b"c"), b.challenge_scalar(b"c"));
    }
}
