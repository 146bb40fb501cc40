//! The set of private keys a transaction will be signed with.

use std::collections::HashSet;

use crate::crypto::keys::{PrivateKey, PublicKey};

/// Deduplicated by public key; keeps insertion order so that signatures
/// come out in the order keys were added.
#[derive(Debug, Default, Clone)]
pub struct SigningKeySet {
    keys: Vec<PrivateKey>,
    index: HashSet<PublicKey>,
}

impl SigningKeySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the key was already present.
    pub fn insert(&mut self, key: PrivateKey) -> bool {
        if !self.index.insert(key.public_key()) {
            return false;
        }
        self.keys.push(key);
        true
    }

    pub fn contains(&self, public_key: &PublicKey) -> bool {
        self.index.contains(public_key)
    }

    pub fn keys(&self) -> &[PrivateKey] {
        &self.keys
    }

    pub fn public_keys(&self) -> impl Iterator<Item = PublicKey> + '_ {
        self.keys.iter().map(PrivateKey::public_key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn clear(&mut self) {
        self.keys.clear();
        self.index.clear();
    }
}

impl Extend<PrivateKey> for SigningKeySet {
    fn extend<I: IntoIterator<Item = PrivateKey>>(&mut self, iter: I) {
        for key in iter {
            self.insert(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicates_are_dropped_in_order() {
        let a = PrivateKey::generate();
        let b = PrivateKey::generate();
        let mut set = SigningKeySet::new();

        assert!(set.insert(a.clone()));
        assert!(set.insert(b.clone()));
        assert!(!set.insert(a.clone()));
        set.extend([b.clone(), a.clone()]);

        assert_eq!(set.len(), 2);
        assert_eq!(
            set.public_keys().collect::<Vec<_>>(),
            vec![a.public_key(), b.public_key()]
        );
        assert!(set.contains(&b.public_key()));

        set.clear();
        assert!(set.is_empty());
        assert!(!set.contains(&a.public_key()));
    }
}
