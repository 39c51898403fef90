//! Cursor-tracked response sequence for one pattern.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Ordered response files for one pattern plus a shared read cursor.
///
/// The cursor is advanced with a single atomic update so concurrent callers
/// never receive the same slot.
pub struct ResponseList {
    files: Vec<PathBuf>,
    cursor: AtomicUsize,
}

impl ResponseList {
    pub fn new(files: Vec<PathBuf>) -> Self {
        Self {
            files,
            cursor: AtomicUsize::new(0),
        }
    }

    pub(crate) fn push(&mut self, file: PathBuf) {
        self.files.push(file);
    }

    /// Hand out the next response file.
    ///
    /// Returns `None` once the sequence is exhausted, unless `allow_repeat`
    /// is set, in which case the cursor wraps back to the first file. An empty
    /// list is always exhausted.
    pub fn next(&self, allow_repeat: bool) -> Option<&Path> {
        let len = self.files.len();
        if len == 0 {
            return None;
        }

        let previous = self
            .cursor
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |cursor| {
                if cursor < len {
                    Some(cursor + 1)
                } else if allow_repeat {
                    Some(1)
                } else {
                    None
                }
            })
            .ok()?;

        let index = if previous < len { previous } else { 0 };
        self.files.get(index).map(PathBuf::as_path)
    }

    /// Number of files handed out since the last wrap
    pub fn request_count(&self) -> usize {
        self.cursor.load(Ordering::Acquire)
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl fmt::Debug for ResponseList {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ResponseList")
            .field("files", &self.files)
            .field("cursor", &self.request_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    fn list(names: &[&str]) -> ResponseList {
        ResponseList::new(names.iter().map(PathBuf::from).collect())
    }

    #[test]
    fn test_sequence_then_exhausted() {
        let responses = list(&["001", "002", "003"]);

        assert_eq!(responses.next(false), Some(Path::new("001")));
        assert_eq!(responses.next(false), Some(Path::new("002")));
        assert_eq!(responses.next(false), Some(Path::new("003")));
        assert_eq!(responses.next(false), None);
        assert_eq!(responses.next(false), None);
        assert_eq!(responses.request_count(), 3);
    }

    #[test]
    fn test_repeat_wraps_to_first() {
        let responses = list(&["001", "002"]);

        assert_eq!(responses.next(true), Some(Path::new("001")));
        assert_eq!(responses.next(true), Some(Path::new("002")));
        assert_eq!(responses.next(true), Some(Path::new("001"))); // Wrap around
        assert_eq!(responses.next(true), Some(Path::new("002")));
        assert_eq!(responses.request_count(), 2);
    }

    #[test]
    fn test_exhausted_list_recovers_when_repeat_enabled() {
        let responses = list(&["001"]);

        assert_eq!(responses.next(false), Some(Path::new("001")));
        assert_eq!(responses.next(false), None);
        assert_eq!(responses.next(true), Some(Path::new("001")));
    }

    #[test]
    fn test_empty_list_never_yields() {
        let responses = list(&[]);

        assert!(responses.is_empty());
        assert_eq!(responses.next(false), None);
        assert_eq!(responses.next(true), None);
    }

    #[test]
    fn test_concurrent_callers_never_share_a_slot() {
        let names: Vec<String> = (0..400).map(|i| format!("{i:04}")).collect();
        let responses = ResponseList::new(names.iter().map(PathBuf::from).collect());
        let issued = Mutex::new(Vec::new());

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    let mut local = Vec::new();
                    while let Some(file) = responses.next(false) {
                        local.push(file.to_path_buf());
                    }
                    issued.lock().unwrap().extend(local);
                });
            }
        });

        let issued = issued.into_inner().unwrap();
        assert_eq!(issued.len(), 400);
        let unique: HashSet<_> = issued.iter().collect();
        assert_eq!(unique.len(), 400);
    }
}
