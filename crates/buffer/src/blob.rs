pub(crate) mod history;
pub(crate) mod load;
pub(crate) mod save;
pub(crate) mod storage;

use std::{
    cmp::min,
    path::{Path, PathBuf},
};

use crate::search::{Direction, Searcher};

use self::history::{Diff, History, Op, Step};
use self::storage::Storage;

/// How pasted bytes are placed into the blob
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasteMode {
    /// Overwrite existing bytes, never grows the blob
    Replace,
    /// Insert bytes, shifting the rest of the blob
    Insert,
}

/// Editable sequence of bytes.
///
/// Content lives either on the heap or in a private memory mapping of a
/// file. Heap backed blobs support all edits, mapped blobs only support
/// replacing bytes in place because the length of the mapping is fixed. For
/// mapped blobs the modified pages are tracked so that saving back to the
/// file only writes those pages.
///
/// Every edit can optionally be recorded to history, which is used for undo
/// and redo. Undoing and redoing applies the recorded diffs through the same
/// edit functions without recording them again.
#[derive(Debug)]
pub struct Blob {
    storage: Storage,
    path: Option<PathBuf>,
    history: History,
    /// Number of recorded edits since the last save, undoing decrements
    saved_dist: isize,
    clipboard: Vec<u8>,
}

impl Blob {
    /// Create a new empty, unnamed blob
    #[inline]
    pub fn new() -> Blob {
        Self::from_storage(Storage::new(), None)
    }

    #[inline]
    pub fn from_bytes<B: Into<Vec<u8>>>(bytes: B) -> Blob {
        Self::from_storage(Storage::from(bytes.into()), None)
    }

    #[inline]
    fn from_storage(storage: Storage, path: Option<PathBuf>) -> Blob {
        Blob {
            storage,
            path,
            history: History::new(),
            saved_dist: 0,
            clipboard: Vec::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether length changing edits are possible. False for memory mapped
    /// blobs.
    #[inline]
    pub fn can_move(&self) -> bool {
        self.storage.can_move()
    }

    #[inline]
    pub fn is_mapped(&self) -> bool {
        !self.storage.can_move()
    }

    #[inline]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn set_path<P: AsRef<Path>>(&mut self, path: P) {
        self.path = Some(path.as_ref().to_owned())
    }

    /// Overwrite bytes at `pos` with `data`, the length does not change.
    pub fn replace(&mut self, pos: usize, data: &[u8], record: bool) {
        assert!(
            pos + data.len() <= self.len(),
            "replace: Attempting to index {} over buffer len {}",
            pos + data.len(),
            self.len()
        );

        if record {
            self.record(Op::Replace, pos, data.len());
        }

        self.storage.overwrite(pos, data);
    }

    /// Insert `data` at `pos`. Only possible if the blob can move.
    pub fn insert(&mut self, pos: usize, data: &[u8], record: bool) {
        assert!(self.can_move(), "insert: blob is memory mapped");
        assert!(
            pos <= self.len(),
            "insert: Attempting to index {} over buffer len {}",
            pos,
            self.len()
        );
        assert!(!data.is_empty(), "insert: no data");

        if record {
            self.record(Op::Insert, pos, data.len());
        }

        self.storage.insert(pos, data);
    }

    /// Delete `len` bytes at `pos`. Only possible if the blob can move.
    pub fn delete(&mut self, pos: usize, len: usize, record: bool) {
        assert!(self.can_move(), "delete: blob is memory mapped");
        assert!(
            pos + len <= self.len(),
            "delete: Attempting to index {} over buffer len {}",
            pos + len,
            self.len()
        );
        assert!(len != 0, "delete: zero length");

        if record {
            self.record(Op::Delete, pos, len);
        }

        self.storage.remove(pos..pos + len);
    }

    fn record(&mut self, op: Op, pos: usize, len: usize) {
        self.history
            .record(op, pos, len, self.storage.as_slice());
        self.saved_dist += 1;
    }

    /// Undo the latest recorded edit. Returns the position of the edit or
    /// none if there is nothing to undo.
    pub fn undo(&mut self) -> Option<usize> {
        let pos = self.history_step(Step::Undo)?;
        self.saved_dist -= 1;
        Some(pos)
    }

    /// Redo the latest undone edit. Returns the position of the edit or none
    /// if there is nothing to redo.
    pub fn redo(&mut self) -> Option<usize> {
        let pos = self.history_step(Step::Redo)?;
        self.saved_dist += 1;
        Some(pos)
    }

    /// Move a diff from one history stack to the other. The diff that
    /// reverses this step is recorded from the current content before the
    /// diff is applied.
    fn history_step(&mut self, step: Step) -> Option<usize> {
        let (from, to) = self.history.stacks(step);
        let diff = from.pop()?;
        let pos = diff.pos();
        to.push(Diff::reversing(
            diff.op(),
            pos,
            diff.len(),
            self.storage.as_slice(),
        ));

        log::trace!("{step:?}: {:?} at {pos}, len {}", diff.op(), diff.len());
        self.apply(diff);
        Some(pos)
    }

    fn apply(&mut self, diff: Diff) {
        match diff {
            Diff::Replace { pos, data } => self.replace(pos, &data, false),
            Diff::Insert { pos, data } => self.insert(pos, &data, false),
            Diff::Delete { pos, len } => self.delete(pos, len, false),
        }
    }

    #[inline]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    #[inline]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    #[inline]
    pub fn undo_len(&self) -> usize {
        self.history.undo_len()
    }

    #[inline]
    pub fn redo_len(&self) -> usize {
        self.history.redo_len()
    }

    /// Copy `len` bytes at `pos` to the clipboard, replacing the previous
    /// content. Yanking past the end leaves the clipboard empty.
    pub fn yank(&mut self, pos: usize, len: usize) {
        self.clipboard.clear();

        if pos < self.len() {
            let end = min(pos.saturating_add(len), self.len());
            self.clipboard
                .extend_from_slice(&self.storage.as_slice()[pos..end]);
        }
    }

    /// Paste the clipboard at `pos`. Returns the number of bytes written,
    /// nothing is recorded if that is zero.
    pub fn paste(&mut self, pos: usize, mode: PasteMode) -> usize {
        if self.clipboard.is_empty() {
            return 0;
        }

        if mode == PasteMode::Replace && pos >= self.len() {
            return 0;
        }

        let clipboard = std::mem::take(&mut self.clipboard);
        let written = match mode {
            PasteMode::Replace => {
                let n = min(clipboard.len(), self.len().saturating_sub(pos));
                self.replace(pos, &clipboard[..n], true);
                n
            }
            PasteMode::Insert => {
                self.insert(pos, &clipboard, true);
                clipboard.len()
            }
        };
        self.clipboard = clipboard;

        written
    }

    #[inline]
    pub fn clipboard(&self) -> &[u8] {
        &self.clipboard
    }

    /// Search for `needle` starting from `start` wrapping around the ends.
    /// Returns the position of the match.
    pub fn search(&self, needle: &[u8], start: usize, dir: Direction) -> Option<usize> {
        if needle.is_empty() || needle.len() > self.len() {
            return None;
        }

        let searcher = Searcher::new(needle, dir);
        searcher.find(self.storage.as_slice(), start)
    }

    /// Whether the content matches the last save
    #[inline]
    pub fn is_saved(&self) -> bool {
        self.saved_dist == 0
    }

    #[inline]
    pub fn unsaved_delta(&self) -> isize {
        self.saved_dist
    }

    /// Number of modified pages for mapped blobs
    pub fn dirty_page_count(&self) -> Option<usize> {
        self.storage.dirty_pages().map(|dirty| dirty.count())
    }

    /// Longest contiguous run of bytes starting at `pos`
    #[inline]
    pub fn lookup(&self, pos: usize) -> &[u8] {
        assert!(
            pos < self.len(),
            "lookup: Attempting to index {} over buffer len {}",
            pos,
            self.len()
        );
        &self.storage.as_slice()[pos..]
    }

    #[inline]
    pub fn at(&self, pos: usize) -> u8 {
        self.lookup(pos)[0]
    }

    /// Copy bytes at `pos` to fill `buf`
    pub fn read(&self, pos: usize, buf: &mut [u8]) {
        let mut i = 0;
        while i < buf.len() {
            let run = self.lookup(pos + i);
            let n = min(buf.len() - i, run.len());
            buf[i..i + n].copy_from_slice(&run[..n]);
            i += n;
        }
    }
}

impl Default for Blob {
    fn default() -> Self {
        Blob::new()
    }
}

impl From<&Blob> for Vec<u8> {
    fn from(blob: &Blob) -> Self {
        blob.storage.as_slice().to_vec()
    }
}
