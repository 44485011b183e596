//! Growable bit set backed by a Vec<u64>.
//!
//! Used to record which component ids an entity currently holds.

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BitSet {
    words: Vec<u64>,
}

impl BitSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the bit at `index`, growing as needed.
    pub fn insert(&mut self, index: usize) {
        let (word_idx, bit_idx) = (index / 64, index % 64);
        if word_idx >= self.words.len() {
            self.words.resize(word_idx + 1, 0);
        }
        self.words[word_idx] |= 1 << bit_idx;
    }

    /// Clear the bit at `index`.
    pub fn remove(&mut self, index: usize) {
        let (word_idx, bit_idx) = (index / 64, index % 64);
        if let Some(word) = self.words.get_mut(word_idx) {
            *word &= !(1 << bit_idx);
        }
    }

    pub fn contains(&self, index: usize) -> bool {
        let (word_idx, bit_idx) = (index / 64, index % 64);
        self.words
            .get(word_idx)
            .is_some_and(|word| word & (1 << bit_idx) != 0)
    }

    /// Indices of set bits, ascending
    pub fn ones(&self) -> OnesIter<'_> {
        OnesIter {
            bitset: self,
            word_idx: 0,
            current_word: self.words.first().copied().unwrap_or(0),
        }
    }
}

pub struct OnesIter<'a> {
    bitset: &'a BitSet,
    word_idx: usize,
    current_word: u64,
}

impl Iterator for OnesIter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current_word != 0 {
                let trailing = self.current_word.trailing_zeros();
                self.current_word &= self.current_word - 1;
                return Some(self.word_idx * 64 + trailing as usize);
            }

            self.word_idx += 1;
            self.current_word = *self.bitset.words.get(self.word_idx)?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_remove_contains() {
        let mut set = BitSet::new();
        assert_eq!(set.ones().count(), 0);
        set.insert(3);
        set.insert(130);
        assert!(set.contains(3));
        assert!(set.contains(130));
        assert!(!set.contains(64));
        assert_eq!(set.ones().count(), 2);

        set.remove(3);
        set.remove(999);
        assert!(!set.contains(3));
        assert_eq!(set.ones().collect::<Vec<_>>(), vec![130]);
    }

    #[test]
    fn test_ones_across_words() {
        let mut set = BitSet::new();
        for i in [0, 63, 64, 200] {
            set.insert(i);
        }
        assert_eq!(set.ones().collect::<Vec<_>>(), vec![0, 63, 64, 200]);
    }
}
