use std::{
    fs::{self, File},
    io::{self, Read, Seek, SeekFrom},
    path::Path,
};

use crate::LoadError;

use super::{
    storage::{FileId, Storage},
    Blob,
};

/// Files at least this large are memory mapped instead of read to memory
pub const DEFAULT_LARGE_FILE_THRESHOLD: u64 = 256 * (1 << 20);

/// Stream input is read in increments of this
pub(crate) const STREAM_CHUNK: usize = 0x1000;

#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub large_file_threshold: u64,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions {
            large_file_threshold: DEFAULT_LARGE_FILE_THRESHOLD,
        }
    }
}

impl Blob {
    /// Load a file using default options
    #[inline]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Blob, LoadError> {
        Self::load_with(path, &LoadOptions::default())
    }

    /// Load a file.
    ///
    /// A nonexistent file results in an empty blob associated with the path
    /// so it is created on save. Regular files smaller than the large file
    /// threshold are read to memory, larger ones and block and character
    /// devices are mapped copy-on-write.
    pub fn load_with<P: AsRef<Path>>(path: P, opts: &LoadOptions) -> Result<Blob, LoadError> {
        let path = path.as_ref();
        let metadata = match fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!("New file {:?}", path);
                return Ok(Self::from_storage(Storage::new(), Some(path.into())));
            }
            Err(e) => return Err(e.into()),
        };

        let ftype = metadata.file_type();
        let (mut file, len, map) = if ftype.is_file() {
            let len = metadata.len();
            (File::open(path)?, len, len != 0 && opts.large_file_threshold <= len)
        } else if is_device(&ftype) {
            let mut file = File::open(path)?;
            let len = file.seek(SeekFrom::End(0))?;
            if len == 0 {
                return Err(LoadError::EmptyDevice(path.into()));
            }
            (file, len, true)
        } else {
            // Opening a fifo or socket could block until the other end shows up
            return Err(LoadError::UnsupportedFileType(path.into()));
        };

        let len = usize::try_from(len).map_err(|_| LoadError::TooLarge(len))?;

        let storage = if map {
            log::debug!("Mapping {:?}, {} bytes", path, len);
            let map = unsafe { memmap::MmapOptions::new().len(len).map_copy(&file)? };
            Storage::mapped(map, FileId::of(&metadata))
        } else {
            log::debug!("Reading {:?} to memory, {} bytes", path, len);
            let mut bytes = Vec::with_capacity(len);
            file.read_to_end(&mut bytes)?;
            Storage::from(bytes)
        };

        Ok(Self::from_storage(storage, Some(path.into())))
    }

    /// Read a stream of unknown length to memory
    pub fn load_stream<R: Read>(mut reader: R) -> Result<Blob, LoadError> {
        let mut bytes = Vec::new();
        let mut n = 0;

        loop {
            if bytes.len() - n < STREAM_CHUNK {
                bytes.resize(bytes.len() + STREAM_CHUNK, 0);
            }

            match reader.read(&mut bytes[n..]) {
                Ok(0) => break,
                Ok(read) => n += read,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }

        bytes.truncate(n);
        bytes.shrink_to_fit();
        log::debug!("Read {} bytes from stream", n);

        Ok(Self::from_storage(Storage::from(bytes), None))
    }
}

#[cfg(unix)]
fn is_device(ftype: &fs::FileType) -> bool {
    use std::os::unix::fs::FileTypeExt;
    ftype.is_block_device() || ftype.is_char_device()
}

#[cfg(not(unix))]
fn is_device(_ftype: &fs::FileType) -> bool {
    false
}

#[cfg(test)]
mod test {
    use std::io::Write;

    use super::*;

    /// Reader that hands out a few bytes at a time
    struct Trickle<'a> {
        data: &'a [u8],
    }

    impl<'a> Read for Trickle<'a> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = buf.len().min(self.data.len()).min(7);
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    #[test]
    fn stream() {
        let data: Vec<u8> = (0..10_000u32).map(|i| i as u8).collect();
        let blob = Blob::load_stream(Trickle { data: &data }).unwrap();

        assert_eq!(data.len(), blob.len());
        assert_eq!(data, Vec::from(&blob));
        assert!(blob.can_move());
        assert!(blob.path().is_none());
        assert!(blob.dirty_page_count().is_none());
    }

    #[test]
    fn empty_stream() {
        let blob = Blob::load_stream(io::empty()).unwrap();
        assert!(blob.is_empty());
    }

    #[test]
    fn nonexistent_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("new.bin");
        let blob = Blob::load(&path).unwrap();

        assert!(blob.is_empty());
        assert!(blob.can_move());
        assert_eq!(Some(path.as_path()), blob.path());
    }

    #[test]
    fn small_file_to_heap() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"small file").unwrap();

        let blob = Blob::load(file.path()).unwrap();
        assert!(blob.can_move());
        assert_eq!(b"small file".to_vec(), Vec::from(&blob));
    }

    #[test]
    fn large_file_is_mapped() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[7u8; 5000]).unwrap();

        let opts = LoadOptions {
            large_file_threshold: 4096,
        };
        let blob = Blob::load_with(file.path(), &opts).unwrap();
        assert!(blob.is_mapped());
        assert_eq!(5000, blob.len());
        assert_eq!(Some(0), blob.dirty_page_count());
        assert_eq!(7, blob.at(4999));
    }

    #[test]
    fn empty_file_is_never_mapped() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let opts = LoadOptions {
            large_file_threshold: 0,
        };
        let blob = Blob::load_with(file.path(), &opts).unwrap();
        assert!(blob.can_move());
        assert!(blob.is_empty());
    }

    #[test]
    fn directory_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let result = Blob::load(dir.path());
        assert!(matches!(result, Err(LoadError::UnsupportedFileType(_))));
    }

    #[cfg(unix)]
    #[test]
    fn fifo_is_unsupported() {
        use std::{ffi::CString, os::unix::ffi::OsStrExt};

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipe");
        let cpath = CString::new(path.as_os_str().as_bytes()).unwrap();
        assert_eq!(0, unsafe { libc::mkfifo(cpath.as_ptr(), 0o600) });

        // Returns without waiting for a writer
        let result = Blob::load(&path);
        assert!(matches!(result, Err(LoadError::UnsupportedFileType(_))));
    }

    #[cfg(unix)]
    #[test]
    fn empty_device() {
        let result = Blob::load("/dev/null");
        assert!(matches!(result, Err(LoadError::EmptyDevice(_))));
    }
}
