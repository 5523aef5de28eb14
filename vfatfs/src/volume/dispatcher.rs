// SPDX-License-Identifier: MIT

use std::{
    fs::File,
    io::{self, Read, Seek, SeekFrom},
    sync::Arc,
};

use log::{trace, warn};

use crate::volume::{Lookup, VirtualFileWindow, Volume};

/// The one backing file a dispatcher keeps open.
#[derive(Debug, Default)]
struct OpenFile {
    /// Window the slot belongs to.
    index: Option<usize>,
    /// `None` when opening the file failed; its bytes then read as zeros.
    file: Option<File>,
}

impl OpenFile {
    /// Makes `index` the active window, releasing the previous handle.
    fn activate(&mut self, index: usize, window: &VirtualFileWindow) -> Option<&mut File> {
        if self.index != Some(index) {
            self.file = None;
            self.index = Some(index);
            self.file = match File::open(&window.path) {
                Ok(file) => Some(file),
                Err(e) => {
                    warn!(
                        "Backing file {} unavailable ({e}); serving zeros",
                        window.path.display()
                    );
                    None
                }
            };
        }
        self.file.as_mut()
    }
}

/// Answers range reads against a [`Volume`].
///
/// Each dispatcher holds at most one open backing file, so every connection
/// gets its own dispatcher over a shared volume.
#[derive(Debug)]
pub struct Dispatcher {
    volume: Arc<Volume>,
    open: OpenFile,
}

impl Dispatcher {
    pub fn new(volume: Arc<Volume>) -> Self {
        Self {
            volume,
            open: OpenFile::default(),
        }
    }

    pub fn volume(&self) -> &Arc<Volume> {
        &self.volume
    }

    /// Reads up to `length` bytes at `position`. The result is shorter than
    /// `length` when the range extends past the end of the image.
    pub fn read_range(&mut self, position: u64, length: usize) -> Vec<u8> {
        let mut buf = vec![0u8; length];
        let n = self.read_into(position, &mut buf);
        buf.truncate(n);
        buf
    }

    /// Fills `buf` from `position` and returns the number of bytes produced,
    /// which is only less than `buf.len()` at the end of the image.
    pub fn read_into(&mut self, position: u64, buf: &mut [u8]) -> usize {
        let image_size = self.volume.image_size();
        if position >= image_size {
            return 0;
        }
        let n = (buf.len() as u64).min(image_size - position) as usize;
        let buf = &mut buf[..n];
        trace!("Read {n} bytes at {position:#x}");

        let metadata = self.volume.metadata();
        let mut done = 0usize;

        if position < metadata.len() as u64 {
            let start = position as usize;
            let take = (metadata.len() - start).min(n);
            buf[..take].copy_from_slice(&metadata[start..start + take]);
            done = take;
        }

        while done < n {
            let pos = position + done as u64;
            let rest = n - done;

            let index = match self.open.index {
                Some(i) if self.volume.index().get(i).is_some_and(|w| w.contains(pos)) => i,
                _ => match self.volume.index().find_file(pos) {
                    Lookup::Hit(i) => i,
                    Lookup::Gap { next } => {
                        let begin = self.volume.files()[next].begin;
                        let gap = ((begin - pos) as usize).min(rest);
                        buf[done..done + gap].fill(0);
                        done += gap;
                        continue;
                    }
                    Lookup::Miss => {
                        buf[done..].fill(0);
                        break;
                    }
                },
            };

            let take = ((self.volume.files()[index].end - pos) as usize).min(rest);
            self.read_window(index, pos, &mut buf[done..done + take]);
            done += take;
        }

        n
    }

    /// Fills `out` with window bytes starting at image address `pos`.
    fn read_window(&mut self, index: usize, pos: u64, out: &mut [u8]) {
        let volume = Arc::clone(&self.volume);
        let window = &volume.files()[index];
        let rel = pos - window.begin;
        let real = window.size.saturating_sub(rel).min(out.len() as u64) as usize;

        let filled = match self.open.activate(index, window) {
            Some(file) if real > 0 => match read_at(file, rel, &mut out[..real]) {
                Ok(got) => {
                    if got < real {
                        warn!(
                            "{} is shorter than at build time; zero-filling",
                            window.path.display()
                        );
                    }
                    got
                }
                Err(e) => {
                    warn!("Read of {} failed: {e}", window.path.display());
                    0
                }
            },
            _ => 0,
        };
        out[filled..].fill(0);
    }
}

/// Seeks to `offset` and reads until `buf` is full or the file ends.
fn read_at(file: &mut File, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
    file.seek(SeekFrom::Start(offset))?;
    let mut filled = 0;
    while filled < buf.len() {
        match file.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::BuildOptions;
    use std::fs;

    fn build(dir: &std::path::Path) -> Arc<Volume> {
        Arc::new(Volume::build(dir, &BuildOptions::default()).unwrap())
    }

    #[test]
    fn test_file_bytes_then_slack() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), b"hello").unwrap();
        let volume = build(dir.path());
        let mut d = Dispatcher::new(Arc::clone(&volume));

        let begin = volume.files()[0].begin;
        assert_eq!(d.read_range(begin, 5), b"hello");

        let cluster = volume.geometry().bytes_per_cluster as usize;
        let full = d.read_range(begin, cluster);
        assert_eq!(full.len(), cluster);
        assert_eq!(&full[..5], b"hello");
        assert!(full[5..].iter().all(|&b| b == 0));

        assert_eq!(d.read_range(begin + 1, 3), b"ell");
    }

    #[test]
    fn test_read_spanning_metadata_and_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.bin"), vec![0xAA; 100]).unwrap();
        fs::write(dir.path().join("b.bin"), vec![0xBB; 20_000]).unwrap();
        let volume = build(dir.path());
        let mut d = Dispatcher::new(Arc::clone(&volume));

        let meta_len = volume.metadata().len() as u64;
        let files = volume.files();
        assert_eq!(files[0].begin, meta_len);

        let span = d.read_range(meta_len - 16, 16 + 16_384 + 16_384);
        assert_eq!(&span[..16], &volume.metadata()[meta_len as usize - 16..]);
        assert!(span[16..116].iter().all(|&b| b == 0xAA));
        assert!(span[116..16 + 16_384].iter().all(|&b| b == 0));
        assert!(span[16 + 16_384..].iter().all(|&b| b == 0xBB));

        // Back into the first window after the second became active.
        assert_eq!(d.read_range(files[0].begin + 99, 2), vec![0xAA, 0x00]);
    }

    #[test]
    fn test_free_space_and_end_of_image() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), b"x").unwrap();
        let volume = build(dir.path());
        let mut d = Dispatcher::new(Arc::clone(&volume));

        let after = volume.files()[0].end;
        assert_eq!(d.read_range(after, 4096), vec![0u8; 4096]);

        let size = volume.image_size();
        assert_eq!(d.read_range(size - 10, 100).len(), 10);
        assert!(d.read_range(size, 100).is_empty());
        assert!(d.read_range(u64::MAX, 1).is_empty());
    }

    #[test]
    fn test_missing_backing_file_reads_zeros() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("gone.txt"), b"soon deleted").unwrap();
        fs::write(dir.path().join("kept.txt"), b"still here").unwrap();
        let volume = build(dir.path());
        fs::remove_file(dir.path().join("gone.txt")).unwrap();

        let mut d = Dispatcher::new(Arc::clone(&volume));
        let gone = volume.files().iter().position(|w| w.path.ends_with("gone.txt")).unwrap();
        let kept = volume.files().iter().position(|w| w.path.ends_with("kept.txt")).unwrap();

        assert_eq!(d.read_range(volume.files()[gone].begin, 12), vec![0u8; 12]);
        assert_eq!(d.read_range(volume.files()[kept].begin, 10), b"still here");
        assert_eq!(d.read_range(volume.files()[gone].begin, 4), vec![0u8; 4]);
    }

    #[test]
    fn test_truncated_backing_file_zero_fills_tail() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shrink.txt");
        fs::write(&path, b"0123456789").unwrap();
        let volume = build(dir.path());
        fs::write(&path, b"0123").unwrap();

        let mut d = Dispatcher::new(Arc::clone(&volume));
        assert_eq!(d.read_range(volume.files()[0].begin, 10), b"0123\0\0\0\0\0\0");
    }
}
