use std::{
    cmp::{max, min},
    fmt, io,
    path::Path,
    process,
};

use hexed_buffer::{Blob, Direction, LoadError, PasteMode, SaveError};
use thiserror::Error;

use crate::config::Config;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum EditError {
    #[error("can't delete: file is memory-mapped.")]
    DeleteMapped,

    #[error("can't insert: file is memory-mapped.")]
    InsertMapped,
}

/// Report an unrecoverable error once and terminate the process
pub fn fatal<E: fmt::Display>(err: E) -> ! {
    log::error!("Fatal: {err}");
    log::logger().flush();
    eprintln!("hexed: {err}");
    process::exit(1)
}

/// Owns the blob being edited and the state shared by the commands the
/// interface runs on it.
#[derive(Debug)]
pub struct Session {
    blob: Blob,
    /// Last searched needle
    needle: Option<Vec<u8>>,
}

impl Session {
    /// Open a file, or an empty unnamed blob if no path is given. Failing to
    /// load is fatal.
    pub fn open(path: Option<&Path>, config: &Config) -> Session {
        Self::try_open(path, config).unwrap_or_else(|e| fatal(e))
    }

    pub fn try_open(path: Option<&Path>, config: &Config) -> Result<Session, LoadError> {
        let blob = match path {
            Some(path) => Blob::load_with(path, &config.buffer.load_options())?,
            None => Blob::new(),
        };

        log::info!(
            "Opened {:?}, {} bytes, mapped: {}",
            blob.path(),
            blob.len(),
            blob.is_mapped()
        );
        Ok(Self::with_blob(blob))
    }

    /// Read content from a stream, for example piped input. Failing to read
    /// is fatal.
    pub fn from_stream<R: io::Read>(reader: R) -> Session {
        let blob = Blob::load_stream(reader).unwrap_or_else(|e| fatal(e));
        Self::with_blob(blob)
    }

    pub fn with_blob(blob: Blob) -> Session {
        Session {
            blob,
            needle: None,
        }
    }

    pub fn blob(&self) -> &Blob {
        &self.blob
    }

    pub fn blob_mut(&mut self) -> &mut Blob {
        &mut self.blob
    }

    /// Save the blob. Errors the user can act on are returned, anything else
    /// is fatal.
    pub fn save(&mut self, path: Option<&Path>) -> Result<(), SaveError> {
        match self.blob.save(path) {
            Ok(()) => {
                log::info!("Saved {:?}", self.blob.path());
                Ok(())
            }
            Err(e) if e.is_recoverable() => {
                log::warn!("{e}");
                Err(e)
            }
            Err(e) => fatal(e),
        }
    }

    /// Whether the session can be closed without losing changes
    pub fn can_quit(&self, force: bool) -> bool {
        force || self.blob.is_saved()
    }

    /// Set the needle used by `search_next`. An empty needle clears it.
    pub fn set_search(&mut self, needle: &[u8]) {
        self.needle = if needle.is_empty() {
            None
        } else {
            Some(needle.to_vec())
        };
    }

    pub fn search_needle(&self) -> Option<&[u8]> {
        self.needle.as_deref()
    }

    /// Find the next match of the search needle moving from `cursor` in
    /// `dir`. The match at the cursor itself is skipped.
    pub fn search_next(&self, cursor: usize, dir: Direction) -> Option<usize> {
        let needle = self.needle.as_deref()?;
        let len = self.blob.len();
        if len == 0 {
            return None;
        }

        let start = match dir {
            Direction::Forward => (min(cursor, len - 1) + 1) % len,
            Direction::Backward => (min(cursor, len) + len - 1) % len,
        };

        let found = self.blob.search(needle, start, dir);
        log::debug!("Search {dir:?} from {start}: {found:?}");
        found
    }

    /// Write a byte at the cursor. Inserts if `insert` is set or the cursor
    /// is at the end of the blob, otherwise overwrites.
    pub fn put_byte(&mut self, cursor: usize, byte: u8, insert: bool) -> Result<(), EditError> {
        if insert || cursor >= self.blob.len() {
            if !self.blob.can_move() {
                return Err(EditError::InsertMapped);
            }
            self.blob.insert(cursor, &[byte], true);
        } else {
            self.blob.replace(cursor, &[byte], true);
        }

        Ok(())
    }

    /// Add `delta` to the byte at the cursor, wrapping around. Returns false
    /// if there is no byte at the cursor.
    pub fn increment(&mut self, cursor: usize, delta: u8) -> bool {
        if cursor >= self.blob.len() {
            return false;
        }

        let byte = self.blob.at(cursor).wrapping_add(delta);
        self.blob.replace(cursor, &[byte], true);
        true
    }

    /// Yank the inclusive range between `a` and `b`
    pub fn yank_selection(&mut self, a: usize, b: usize) {
        let start = min(a, b);
        self.blob.yank(start, max(a, b) - start + 1);
    }

    /// Yank and delete the inclusive range between `a` and `b`. Returns the
    /// new cursor position or none if nothing was deleted.
    pub fn delete_selection(&mut self, a: usize, b: usize) -> Result<Option<usize>, EditError> {
        if !self.blob.can_move() {
            return Err(EditError::DeleteMapped);
        }

        let len = self.blob.len();
        let start = min(a, b);
        if start >= len {
            return Ok(None);
        }

        let end = min(max(a, b), len - 1);
        self.yank_selection(start, end);
        self.blob.delete(start, end - start + 1, true);
        Ok(Some(start))
    }

    /// Paste the clipboard at the cursor, returns the number of bytes
    /// written
    pub fn paste(&mut self, cursor: usize, insert: bool) -> Result<usize, EditError> {
        let mode = if insert {
            if !self.blob.can_move() {
                return Err(EditError::InsertMapped);
            }
            PasteMode::Insert
        } else {
            PasteMode::Replace
        };

        Ok(self.blob.paste(cursor, mode))
    }

    pub fn undo(&mut self) -> Option<usize> {
        let pos = self.blob.undo();
        log::debug!("Undo: {pos:?}, unsaved: {}", self.blob.unsaved_delta());
        pos
    }

    pub fn redo(&mut self) -> Option<usize> {
        let pos = self.blob.redo();
        log::debug!("Redo: {pos:?}, unsaved: {}", self.blob.unsaved_delta());
        pos
    }
}

#[cfg(test)]
mod test {
    use std::{fs, io::Write};

    use super::*;
    use crate::config::BufferOptions;

    fn session(content: &[u8]) -> Session {
        Session::with_blob(Blob::from_bytes(content))
    }

    fn content(session: &Session) -> Vec<u8> {
        session.blob().into()
    }

    #[test]
    fn search_next_skips_cursor() {
        let mut session = session(b"ABCDEFGCD");
        assert_eq!(None, session.search_next(0, Direction::Forward));

        session.set_search(b"CD");
        assert_eq!(Some(2), session.search_next(0, Direction::Forward));
        assert_eq!(Some(7), session.search_next(2, Direction::Forward));
        assert_eq!(Some(2), session.search_next(7, Direction::Forward));
        // Cursor past the end behaves like the last byte
        assert_eq!(Some(2), session.search_next(9, Direction::Forward));

        assert_eq!(Some(2), session.search_next(7, Direction::Backward));
        assert_eq!(Some(7), session.search_next(2, Direction::Backward));
        assert_eq!(Some(7), session.search_next(9, Direction::Backward));

        session.set_search(b"");
        assert!(session.search_needle().is_none());
    }

    #[test]
    fn search_empty_blob() {
        let mut session = session(b"");
        session.set_search(b"A");
        assert_eq!(None, session.search_next(0, Direction::Forward));
        assert_eq!(None, session.search_next(0, Direction::Backward));
    }

    #[test]
    fn put_and_increment() {
        let mut session = session(b"ab");
        session.put_byte(0, b'x', false).unwrap();
        session.put_byte(2, b'c', false).unwrap();
        session.put_byte(1, b'-', true).unwrap();
        assert_eq!(b"x-bc".to_vec(), content(&session));

        assert!(session.increment(3, 1));
        assert!(session.increment(0, 0xff));
        assert!(!session.increment(4, 1));
        assert_eq!(b"w-bd".to_vec(), content(&session));
        assert_eq!(5, session.blob().unsaved_delta());
    }

    #[test]
    fn delete_and_paste_selection() {
        let mut session = session(b"0123456789");
        assert_eq!(Ok(Some(2)), session.delete_selection(5, 2));
        assert_eq!(b"016789".to_vec(), content(&session));
        assert_eq!(b"2345", session.blob().clipboard());

        assert_eq!(Ok(4), session.paste(0, true));
        assert_eq!(b"2345016789".to_vec(), content(&session));

        // Selection clamped to the end
        assert_eq!(Ok(Some(8)), session.delete_selection(8, 20));
        assert_eq!(b"23450167".to_vec(), content(&session));
        assert_eq!(Ok(None), session.delete_selection(8, 9));

        assert_eq!(Some(8), session.undo());
        assert_eq!(Some(0), session.undo());
        assert_eq!(Some(2), session.undo());
        assert_eq!(b"0123456789".to_vec(), content(&session));
        assert!(session.can_quit(false));
        assert_eq!(Some(2), session.redo());
        assert!(!session.can_quit(false));
        assert!(session.can_quit(true));
    }

    #[test]
    fn mapped_session_refuses_length_changes() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0u8; 64]).unwrap();
        file.flush().unwrap();

        let config = Config {
            buffer: BufferOptions {
                large_file_threshold: 1,
            },
        };
        let mut session = Session::try_open(Some(file.path()), &config).unwrap();
        assert!(session.blob().is_mapped());

        assert_eq!(Err(EditError::DeleteMapped), session.delete_selection(0, 3));
        assert_eq!(Err(EditError::InsertMapped), session.put_byte(0, 1, true));
        session.yank_selection(0, 3);
        assert_eq!(Err(EditError::InsertMapped), session.paste(0, true));
        assert_eq!(Ok(4), session.paste(60, false));
        assert_eq!(Err(EditError::InsertMapped), session.put_byte(64, 1, false));

        session.put_byte(10, 0xab, false).unwrap();
        session.save(None).unwrap();
        assert_eq!(0xab, fs::read(file.path()).unwrap()[10]);
    }

    #[test]
    fn save_reports_recoverable() {
        let mut session = session(b"data");
        let err = session.save(None).unwrap_err();
        assert_eq!("can't save: no filename.", err.to_string());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bin");
        session.save(Some(path.as_path())).unwrap();
        assert_eq!(b"data".to_vec(), fs::read(&path).unwrap());
        assert_eq!(Some(path.as_path()), session.blob().path());
    }

    #[test]
    fn open_without_path() {
        let session = Session::try_open(None, &Config::default()).unwrap();
        assert!(session.blob().is_empty());
        assert!(session.blob().path().is_none());

        let session = Session::from_stream(&b"piped"[..]);
        assert_eq!(b"piped".to_vec(), content(&session));
    }
}
