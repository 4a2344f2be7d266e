use serde::{Deserialize, Deserializer, Serialize};

/// Ordered sequence that never holds more than `CAP` items.
///
/// Insertion appends and then evicts from the front, so the newest `CAP`
/// entries survive. Deserializing an oversized list keeps its tail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Bounded<T, const CAP: usize>(Vec<T>);

impl<T, const CAP: usize> Bounded<T, CAP> {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, item: T) {
        self.0.push(item);
        self.trim();
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.0.iter()
    }

    pub fn last(&self) -> Option<&T> {
        self.0.last()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.0
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    fn trim(&mut self) {
        if self.0.len() > CAP {
            let excess = self.0.len() - CAP;
            self.0.drain(..excess);
        }
    }
}

impl<T: PartialEq, const CAP: usize> Bounded<T, CAP> {
    /// Set-style insert: returns false and leaves the sequence untouched when
    /// the item is already present.
    pub fn insert_unique(&mut self, item: T) -> bool {
        if self.0.contains(&item) {
            return false;
        }
        self.push(item);
        true
    }
}

impl<T, const CAP: usize> Default for Bounded<T, CAP> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'de, T: Deserialize<'de>, const CAP: usize> Deserialize<'de> for Bounded<T, CAP> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut bounded = Self(Vec::<T>::deserialize(deserializer)?);
        bounded.trim();
        Ok(bounded)
    }
}

impl<'a, T, const CAP: usize> IntoIterator for &'a Bounded<T, CAP> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
