/// Direction to scan in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// Boyer-Moore-Horspool searcher that treats the searched bytes as a ring.
/// Searching continues past the end (or start when searching backwards) and
/// wraps around to the beginning (or end).
#[derive(Debug, Clone)]
pub struct Searcher {
    pattern: Vec<u8>,
    dir: Direction,
    bad_char: [usize; 256],
}

impl Searcher {
    pub fn new(pattern: &[u8], dir: Direction) -> Searcher {
        assert!(!pattern.is_empty(), "Searcher: empty pattern");

        Searcher {
            bad_char: Self::build_bad_char_table(pattern, dir),
            pattern: pattern.into(),
            dir,
        }
    }

    /// Shift to apply on a mismatch, indexed by the byte at the window's
    /// trailing edge in scan direction.
    fn build_bad_char_table(pattern: &[u8], dir: Direction) -> [usize; 256] {
        let mut table = [pattern.len(); 256];
        let last = pattern.len() - 1;

        for i in 0..last {
            match dir {
                Direction::Forward => table[pattern[i] as usize] = last - i,
                Direction::Backward => table[pattern[last - i] as usize] = last - i,
            }
        }

        table
    }

    /// Find the first match starting the scan at `start`, wrapping around
    /// once. Returns the offset of the match start.
    pub fn find(&self, bytes: &[u8], start: usize) -> Option<usize> {
        let n = bytes.len();
        if self.pattern.len() > n {
            return None;
        }

        assert!(start < n, "find: start {} over length {}", start, n);

        match self.dir {
            Direction::Forward => self
                .find_forward(bytes, start, n)
                .or_else(|| self.find_forward(bytes, 0, start)),
            Direction::Backward => self
                .find_backward(bytes, start, None)
                .or_else(|| self.find_backward(bytes, n - 1, Some(start))),
        }
    }

    /// Scan windows anchored at `start..end`
    fn find_forward(&self, bytes: &[u8], start: usize, end: usize) -> Option<usize> {
        let m = self.pattern.len();
        let n = bytes.len();
        let mut i = start;

        while i < end {
            if i + m > n {
                // Windows further right cannot fit either
                return None;
            }

            let window = &bytes[i..i + m];
            if window.iter().rev().eq(self.pattern.iter().rev()) {
                return Some(i);
            }

            i += self.bad_char[window[m - 1] as usize];
        }

        None
    }

    /// Scan windows anchored from `start` down to but excluding `end`, or
    /// down to zero if `end` is none
    fn find_backward(&self, bytes: &[u8], start: usize, end: Option<usize>) -> Option<usize> {
        let m = self.pattern.len();
        let n = bytes.len();
        let mut i = start;

        loop {
            if end.map_or(false, |end| i <= end) {
                return None;
            }

            if i + m <= n {
                let window = &bytes[i..i + m];
                if window == &self.pattern[..] {
                    return Some(i);
                }

                let skip = self.bad_char[window[0] as usize];
                i = i.checked_sub(skip)?;
            } else {
                // Not enough space for pattern
                i = i.checked_sub(1)?;
            }
        }
    }
}
