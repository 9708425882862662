const WORD_BITS: usize = u64::BITS as usize;

/// Stores a set of integers in `0..len`.
#[derive(Hash, PartialEq, Eq, Clone)]
pub struct Bitset {
    len: usize,
    inner: Vec<u64>,
}

impl Bitset {
    pub fn new() -> Bitset {
        Bitset {
            len: 0,
            inner: Vec::new(),
        }
    }

    /// Create a set with room for integers `0..len`, none of them set
    pub fn with_len(len: usize) -> Bitset {
        Bitset {
            len,
            inner: vec![0; words_for(len)],
        }
    }

    /// Number of integers this set can hold
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether no integer is set
    pub fn is_empty(&self) -> bool {
        self.inner.iter().all(|word| *word == 0)
    }

    /// Number of integers set
    pub fn count(&self) -> usize {
        self.inner.iter().map(|word| word.count_ones() as usize).sum()
    }

    pub fn insert(&mut self, n: usize) {
        assert!(
            n < self.len,
            "insert: index {} out of bitset bounds {}",
            n,
            self.len
        );
        let (num, shifted) = locate(n);
        self.inner[num] |= shifted;
    }

    pub fn remove(&mut self, n: usize) {
        assert!(
            n < self.len,
            "remove: index {} out of bitset bounds {}",
            n,
            self.len
        );
        let (num, shifted) = locate(n);
        self.inner[num] &= !shifted;
    }

    pub fn contains(&self, n: usize) -> bool {
        if n >= self.len {
            return false;
        }

        let (num, shifted) = locate(n);
        self.inner[num] & shifted != 0
    }

    pub fn clear(&mut self) {
        self.inner.iter_mut().for_each(|word| *word = 0);
    }

    /// Grow or shrink the set to hold `0..len`. Integers that fall outside
    /// the new bounds are dropped, new ones are not set.
    pub fn resize(&mut self, len: usize) {
        self.inner.resize(words_for(len), 0);
        self.len = len;

        // Clear the tail bits of the last word so growing again does not
        // resurrect them
        let tail = len % WORD_BITS;
        if tail != 0 {
            if let Some(last) = self.inner.last_mut() {
                *last &= (1u64 << tail) - 1;
            }
        }
    }

    pub fn iter(&self) -> Iter<'_> {
        Iter { set: self, n: 0 }
    }
}

#[inline(always)]
fn locate(n: usize) -> (usize, u64) {
    (n / WORD_BITS, 1 << (n % WORD_BITS))
}

#[inline(always)]
fn words_for(len: usize) -> usize {
    (len + WORD_BITS - 1) / WORD_BITS
}

impl Default for Bitset {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Bitset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[")?;
        let mut first = true;
        for i in self.iter() {
            if first {
                write!(f, "{i}")?;
            } else {
                write!(f, ", {i}")?;
            }

            first = false;
        }
        f.write_str("]")
    }
}

#[derive(Debug)]
pub struct Iter<'a> {
    set: &'a Bitset,
    n: usize,
}

impl<'a> Iterator for Iter<'a> {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        while self.n < self.set.len {
            let n = self.n;
            let (num, _) = locate(n);

            // Skip whole empty words
            if n % WORD_BITS == 0 && self.set.inner[num] == 0 {
                self.n += WORD_BITS;
                continue;
            }

            self.n += 1;

            if self.set.contains(n) {
                return Some(n);
            }
        }

        None
    }
}
