// SPDX-License-Identifier: MIT

use std::path::PathBuf;

/// Address range `[begin, end)` of the virtual image whose bytes come from a
/// real file. `end - begin` is the file size rounded up to whole clusters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualFileWindow {
    pub path: PathBuf,
    pub begin: u64,
    pub end: u64,
    pub first_cluster: u32,
    pub size: u64,
}

impl VirtualFileWindow {
    #[inline]
    pub fn contains(&self, pos: u64) -> bool {
        pos >= self.begin && pos < self.end
    }

    #[inline]
    pub fn len(&self) -> u64 {
        self.end - self.begin
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.end == self.begin
    }
}

/// Outcome of [`FileIndex::find_file`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// The position lies inside this window.
    Hit(usize),
    /// The position lies before window `next` and after any earlier one.
    Gap { next: usize },
    /// The position lies past the last window (or there are none).
    Miss,
}

/// Below this many candidates the search finishes linearly.
const LINEAR_SCAN_THRESHOLD: usize = 5;

/// Address-sorted, non-overlapping file windows.
#[derive(Debug, Clone, Default)]
pub struct FileIndex {
    windows: Vec<VirtualFileWindow>,
}

impl FileIndex {
    /// `windows` must be sorted by address and must not overlap.
    pub fn new(windows: Vec<VirtualFileWindow>) -> Self {
        debug_assert!(windows.windows(2).all(|w| w[0].end <= w[1].begin));
        Self { windows }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&VirtualFileWindow> {
        self.windows.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, VirtualFileWindow> {
        self.windows.iter()
    }

    pub fn as_slice(&self) -> &[VirtualFileWindow] {
        &self.windows
    }

    /// Locates the window covering `pos`.
    ///
    /// Positions before the first window's end and at/after the last
    /// window's start are answered without searching; sequential readers hit
    /// those most of the time.
    pub fn find_file(&self, pos: u64) -> Lookup {
        let (Some(first), Some(last)) = (self.windows.first(), self.windows.last()) else {
            return Lookup::Miss;
        };
        if pos < first.end {
            return Self::classify(first, 0, pos);
        }
        let last_idx = self.windows.len() - 1;
        if pos >= last.begin {
            return if pos < last.end {
                Lookup::Hit(last_idx)
            } else {
                Lookup::Miss
            };
        }

        // windows[lo].end <= pos < windows[hi].end
        let (mut lo, mut hi) = (0, last_idx);
        while hi - lo >= LINEAR_SCAN_THRESHOLD {
            let mid = lo + (hi - lo) / 2;
            if self.windows[mid].end > pos {
                hi = mid;
            } else {
                lo = mid;
            }
        }
        let idx = (lo + 1..=hi)
            .find(|&i| self.windows[i].end > pos)
            .unwrap_or(hi);
        Self::classify(&self.windows[idx], idx, pos)
    }

    #[inline]
    fn classify(window: &VirtualFileWindow, idx: usize, pos: u64) -> Lookup {
        if pos >= window.begin {
            Lookup::Hit(idx)
        } else {
            Lookup::Gap { next: idx }
        }
    }
}
