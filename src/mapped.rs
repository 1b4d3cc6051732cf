use std::fs::File;
use std::io;
use std::ops;
use std::path::Path;

use memmap::Mmap;

/// A read-only view of a file's bytes.
pub struct MappedFile {
    map: Option<Mmap>,      // None for empty files, which cannot be mapped
}

impl MappedFile {
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<MappedFile> {
        let file = File::open(path)?;
        let size = file.metadata()?.len();
        let map = if size == 0 {
            None
        } else {
            // the input is not expected to change underneath a run
            Some(unsafe { Mmap::map(&file)? })
        };
        Ok(MappedFile { map })
    }

    pub fn len(&self) -> usize { self[..].len() }
    pub fn is_empty(&self) -> bool { self.len() == 0 }
}

impl ops::Index<ops::RangeFull> for MappedFile {
    type Output = [u8];
    #[inline]
    fn index(&self, _index: ops::RangeFull) -> &[u8] {
        match self.map {
            Some(ref map) => &map[..],
            None => &[],
        }
    }
}

#[test]
fn maps_empty_and_nonempty_files() {
    use std::io::Write;
    let dir = ::tempdir::TempDir::new("mapped").unwrap();

    let empty = dir.path().join("empty");
    File::create(&empty).unwrap();
    assert!(MappedFile::open(&empty).unwrap().is_empty());

    let full = dir.path().join("full");
    File::create(&full).unwrap().write_all(&[1, 2, 3]).unwrap();
    assert_eq!(&MappedFile::open(&full).unwrap()[..], &[1, 2, 3]);
}
