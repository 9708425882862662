use std::{
    cmp::min,
    fs::{File, OpenOptions},
    io::{self, Seek, SeekFrom, Write},
    ops::Range,
    path::Path,
};

use crate::SaveError;

use super::{
    storage::{FileId, PAGE_SIZE},
    Blob,
};

#[derive(Debug, PartialEq, Eq)]
enum WriteOp {
    /// Truncate or extend the file
    Size(usize),
    /// Write the blob bytes in range to the same offset in the file
    Overwrite(Range<usize>),
}

impl Blob {
    /// Save the blob to `path`, or the path it was loaded from if none.
    ///
    /// Mapped blobs saved back onto the file they were mapped from only write
    /// the pages that were modified, everything else is left untouched on
    /// disk.
    pub fn save(&mut self, path: Option<&Path>) -> Result<(), SaveError> {
        let target = match path.or(self.path.as_deref()) {
            Some(target) => target.to_path_buf(),
            None => return Err(SaveError::NoFilename),
        };

        log::info!("Saving to {:?}", target);
        let mut file = open(&target).map_err(SaveError::from_open)?;
        let metadata = file.metadata()?;
        let in_place = matches!(
            (self.storage.origin(), FileId::of(&metadata)),
            (Some(origin), Some(target)) if origin == target
        );
        let ops = self.write_ops(in_place, metadata.is_file());
        log::debug!("Save in place: {}, operations: {}", in_place, ops.len());

        do_write(&mut file, self.storage.as_slice(), ops)?;

        if in_place {
            self.storage.clear_dirty();
        }

        self.saved_dist = 0;
        if let Some(path) = path {
            self.path = Some(path.into());
        }

        Ok(())
    }

    fn write_ops(&self, in_place: bool, is_regular: bool) -> Vec<WriteOp> {
        let len = self.len();
        let mut ops = vec![];

        if is_regular {
            ops.push(WriteOp::Size(len));
        }

        let dirty = match self.storage.dirty_pages() {
            Some(dirty) if in_place => dirty,
            _ => {
                if len != 0 {
                    ops.push(WriteOp::Overwrite(0..len));
                }
                return ops;
            }
        };

        // Write dirty pages, joining consecutive ones
        let mut run: Option<Range<usize>> = None;
        for page in dirty.iter() {
            let start = page * PAGE_SIZE;
            let end = min(start + PAGE_SIZE, len);

            match run.as_mut() {
                Some(range) if range.end == start => range.end = end,
                _ => {
                    if let Some(range) = run.take() {
                        ops.push(WriteOp::Overwrite(range));
                    }
                    run = Some(start..end);
                }
            }
        }

        if let Some(range) = run {
            ops.push(WriteOp::Overwrite(range));
        }

        ops
    }
}

#[cfg(unix)]
fn open(path: &Path) -> io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;
    OpenOptions::new()
        .write(true)
        .create(true)
        .mode(0o644)
        .open(path)
}

#[cfg(not(unix))]
fn open(path: &Path) -> io::Result<File> {
    OpenOptions::new().write(true).create(true).open(path)
}

fn do_write(file: &mut File, bytes: &[u8], ops: Vec<WriteOp>) -> io::Result<()> {
    for op in ops {
        match op {
            WriteOp::Size(size) => file.set_len(size as u64)?,
            WriteOp::Overwrite(range) => {
                file.seek(SeekFrom::Start(range.start as u64))?;
                file.write_all(&bytes[range])?;
            }
        }
    }

    file.flush()
}

#[cfg(test)]
mod test {
    use std::io::Write;

    use super::*;
    use crate::LoadOptions;

    fn mapped(content: &[u8]) -> (tempfile::NamedTempFile, Blob) {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content).unwrap();
        file.flush().unwrap();

        let opts = LoadOptions {
            large_file_threshold: 1,
        };
        let blob = Blob::load_with(file.path(), &opts).unwrap();
        (file, blob)
    }

    #[test]
    fn heap_writes_everything() {
        let blob = Blob::from_bytes(&b"abc"[..]);
        let ops = blob.write_ops(false, true);
        assert_eq!(vec![WriteOp::Size(3), WriteOp::Overwrite(0..3)], ops);

        let ops = blob.write_ops(false, false);
        assert_eq!(vec![WriteOp::Overwrite(0..3)], ops);
    }

    #[test]
    fn empty_writes_nothing() {
        let blob = Blob::new();
        let ops = blob.write_ops(false, true);
        assert_eq!(vec![WriteOp::Size(0)], ops);
    }

    #[test]
    fn mapped_in_place_writes_dirty_pages() {
        let len = PAGE_SIZE * 5 + 100;
        let (_file, mut blob) = mapped(&vec![0u8; len]);
        blob.replace(PAGE_SIZE + 3, b"a", true);
        blob.replace(PAGE_SIZE * 2, b"b", true);
        blob.replace(len - 1, b"c", true);

        let ops = blob.write_ops(true, true);
        assert_eq!(
            vec![
                WriteOp::Size(len),
                WriteOp::Overwrite(PAGE_SIZE..PAGE_SIZE * 3),
                WriteOp::Overwrite(PAGE_SIZE * 5..len),
            ],
            ops
        );
    }

    #[test]
    fn mapped_clean_writes_nothing_in_place() {
        let (_file, blob) = mapped(&[1u8; 100]);
        let ops = blob.write_ops(true, true);
        assert_eq!(vec![WriteOp::Size(100)], ops);
    }

    #[test]
    fn mapped_elsewhere_writes_everything() {
        let (_file, mut blob) = mapped(&[1u8; 100]);
        blob.replace(0, b"a", true);
        let ops = blob.write_ops(false, true);
        assert_eq!(vec![WriteOp::Size(100), WriteOp::Overwrite(0..100)], ops);
    }
}
