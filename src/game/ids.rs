//! Short shareable chain identifiers.
//!
//! Ids are drawn uniformly from uppercase letters and digits. They are meant
//! for passing around in links, not for global uniqueness: two visitors can
//! mint the same id, and nothing detects it.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Mints chain ids and picks surprise prompts from one random source.
#[derive(Debug, Clone)]
pub struct IdMinter {
    rng: StdRng,
    length: usize,
}

impl IdMinter {
    pub fn from_entropy(length: usize) -> Self {
        Self {
            rng: StdRng::from_entropy(),
            length,
        }
    }

    /// Deterministic minter for tests and replays.
    pub fn seeded(seed: u64, length: usize) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            length,
        }
    }

    pub fn mint(&mut self) -> String {
        (0..self.length)
            .map(|_| char::from(ALPHABET[self.rng.gen_range(0..ALPHABET.len())]))
            .collect()
    }

    /// Mint an id guaranteed to differ from `current`.
    pub fn mint_other_than(&mut self, current: &str) -> String {
        loop {
            let id = self.mint();
            if id != current {
                return id;
            }
        }
    }

    /// Pick one item uniformly.
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        items.choose(&mut self.rng)
    }
}

/// Whether `id` looks like something we could have minted. Used to ignore
/// junk in the link parameter.
pub fn is_well_formed(id: &str) -> bool {
    !id.is_empty() && id.len() <= 32 && id.bytes().all(|b| b.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn minted_ids_use_the_alphabet() {
        let mut m = IdMinter::seeded(7, 6);
        for _ in 0..100 {
            let id = m.mint();
            assert_eq!(id.len(), 6);
            assert!(id.bytes().all(|b| ALPHABET.contains(&b)));
            assert!(is_well_formed(&id));
        }
    }

    #[test]
    fn same_seed_same_ids() {
        let mut a = IdMinter::seeded(42, 8);
        let mut b = IdMinter::seeded(42, 8);
        assert_eq!(a.mint(), b.mint());
    }

    #[test]
    fn ids_rarely_collide() {
        // Collisions are accepted; over 36^6 ids a thousand draws
        // should still be almost always distinct.
        let mut m = IdMinter::seeded(1, 6);
        let ids: HashSet<_> = (0..1000).map(|_| m.mint()).collect();
        assert!(ids.len() >= 995);
    }

    #[test]
    fn mint_other_than_never_repeats_current() {
        // With length 4 over a seeded source, force many draws.
        let mut m = IdMinter::seeded(3, 4);
        let current = m.mint();
        for _ in 0..500 {
            assert_ne!(m.mint_other_than(&current), current);
        }
    }

    #[test]
    fn well_formed_rejects_junk() {
        assert!(is_well_formed("ABC123"));
        assert!(!is_well_formed(""));
        assert!(!is_well_formed("AB C"));
        assert!(!is_well_formed("<script>"));
    }
}
