use std::{fs, ops::Range};

use hexed_utils::bitset::Bitset;

/// Granularity of dirty tracking for mapped storage
pub const PAGE_SIZE: usize = 0x1000;

/// Number of pages needed to cover `len` bytes
#[inline]
pub(crate) fn page_count(len: usize) -> usize {
    (len + PAGE_SIZE - 1) / PAGE_SIZE
}

/// Identifies the file a mapping was created from, so saves can tell whether
/// they write back onto the same file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FileId {
    dev: u64,
    ino: u64,
}

impl FileId {
    #[cfg(unix)]
    pub fn of(metadata: &fs::Metadata) -> Option<FileId> {
        use std::os::unix::fs::MetadataExt;
        Some(FileId {
            dev: metadata.dev(),
            ino: metadata.ino(),
        })
    }

    #[cfg(not(unix))]
    pub fn of(_metadata: &fs::Metadata) -> Option<FileId> {
        None
    }
}

#[derive(Debug)]
pub(crate) enum Storage {
    /// Bytes owned in memory, can grow and shrink
    Heap { bytes: Vec<u8> },
    /// Private copy-on-write view of a file. Length is fixed, modified pages
    /// are tracked so saving back writes only those.
    Mapped {
        map: memmap::MmapMut,
        dirty: Bitset,
        origin: Option<FileId>,
    },
}

impl Storage {
    #[inline]
    pub fn new() -> Storage {
        Storage::Heap { bytes: Vec::new() }
    }

    pub fn mapped(map: memmap::MmapMut, origin: Option<FileId>) -> Storage {
        let dirty = Bitset::with_len(page_count(map.len()));
        Storage::Mapped { map, dirty, origin }
    }

    #[inline(always)]
    pub fn as_slice(&self) -> &[u8] {
        use Storage::*;
        match self {
            Heap { bytes } => &bytes[..],
            Mapped { map, .. } => &map[..],
        }
    }

    #[inline(always)]
    fn as_mut_slice(&mut self) -> &mut [u8] {
        use Storage::*;
        match self {
            Heap { bytes } => &mut bytes[..],
            Mapped { map, .. } => &mut map[..],
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    /// Whether length changing edits are possible
    #[inline]
    pub fn can_move(&self) -> bool {
        matches!(self, Storage::Heap { .. })
    }

    #[inline]
    pub fn dirty_pages(&self) -> Option<&Bitset> {
        match self {
            Storage::Heap { .. } => None,
            Storage::Mapped { dirty, .. } => Some(dirty),
        }
    }

    #[inline]
    pub fn origin(&self) -> Option<FileId> {
        match self {
            Storage::Heap { .. } => None,
            Storage::Mapped { origin, .. } => *origin,
        }
    }

    pub fn clear_dirty(&mut self) {
        if let Storage::Mapped { dirty, .. } = self {
            dirty.clear();
        }
    }

    /// Overwrite bytes at `pos`, marking every touched page dirty first
    pub fn overwrite(&mut self, pos: usize, data: &[u8]) {
        if data.is_empty() {
            return;
        }

        let end = pos + data.len();
        if let Storage::Mapped { dirty, .. } = self {
            for page in pos / PAGE_SIZE..page_count(end) {
                dirty.insert(page);
            }
        }

        self.as_mut_slice()[pos..end].copy_from_slice(data);
    }

    pub fn insert(&mut self, pos: usize, data: &[u8]) {
        match self {
            Storage::Heap { bytes } => {
                bytes.reserve_exact(data.len());
                bytes.splice(pos..pos, data.iter().copied());
            }
            Storage::Mapped { .. } => panic!("insert: storage is memory mapped"),
        }
    }

    pub fn remove(&mut self, range: Range<usize>) {
        match self {
            Storage::Heap { bytes } => {
                bytes.drain(range);
            }
            Storage::Mapped { .. } => panic!("remove: storage is memory mapped"),
        }
    }
}

impl From<Vec<u8>> for Storage {
    fn from(bytes: Vec<u8>) -> Self {
        Storage::Heap { bytes }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn anon(len: usize) -> Storage {
        let map = memmap::MmapMut::map_anon(len).unwrap();
        Storage::mapped(map, None)
    }

    #[test]
    fn heap_insert_remove() {
        let mut storage = Storage::from(b"abcdef".to_vec());
        storage.insert(3, b"XY");
        assert_eq!(b"abcXYdef", storage.as_slice());

        storage.remove(1..4);
        assert_eq!(b"aYdef", storage.as_slice());
        assert!(storage.dirty_pages().is_none());
    }

    #[test]
    fn dirty_pages_cover_partial_overlap() {
        let mut storage = anon(PAGE_SIZE * 3 + 10);
        assert_eq!(4, storage.dirty_pages().unwrap().len());

        // Straddles the boundary between page 0 and 1
        storage.overwrite(PAGE_SIZE - 1, b"ab");
        let dirty: Vec<usize> = storage.dirty_pages().unwrap().iter().collect();
        assert_eq!(vec![0, 1], dirty);

        storage.overwrite(PAGE_SIZE * 3 + 9, b"z");
        let dirty: Vec<usize> = storage.dirty_pages().unwrap().iter().collect();
        assert_eq!(vec![0, 1, 3], dirty);

        storage.clear_dirty();
        assert!(storage.dirty_pages().unwrap().is_empty());
    }

    #[test]
    fn page_aligned_write_marks_single_page() {
        let mut storage = anon(PAGE_SIZE * 2);
        storage.overwrite(PAGE_SIZE, &[1; PAGE_SIZE]);
        let dirty: Vec<usize> = storage.dirty_pages().unwrap().iter().collect();
        assert_eq!(vec![1], dirty);
        assert_eq!(1, storage.as_slice()[PAGE_SIZE]);
    }

    #[test]
    #[should_panic]
    fn mapped_cannot_insert() {
        let mut storage = anon(16);
        storage.insert(0, b"a");
    }
}
