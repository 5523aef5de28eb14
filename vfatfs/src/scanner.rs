// SPDX-License-Identifier: MIT

//! Directory scanner.
//!
//! Walks a source tree depth-first and records, for every directory, an
//! ordered table of its children. Directory indices follow the walk: the root
//! is `0` and a sub-directory is numbered (and descended into) as soon as it
//! is met.

use std::{
    collections::BTreeMap,
    ffi::OsString,
    fs, io,
    path::{Path, PathBuf},
    time::SystemTime,
};

use log::{debug, info, warn};

use crate::{
    error::{VfatError, VfatResult},
    fat32::constant::FAT_MAX_FILE_SIZE,
};

/// Kind of a source-tree entry, as far as the volume is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
    /// A symbolic link resolving to a directory. Never descended into.
    DirLink,
    /// Sockets, devices, FIFOs, dangling links.
    Other,
}

/// One entry as reported by a [`TreeSource`].
#[derive(Debug, Clone)]
pub struct SourceEntry {
    pub name: OsString,
    pub path: PathBuf,
    pub kind: EntryKind,
    pub size: u64,
    pub modified: Option<SystemTime>,
}

/// Enumerates a directory tree.
pub trait TreeSource {
    /// Describes the entry at `path` itself.
    fn stat(&mut self, path: &Path) -> io::Result<SourceEntry>;

    /// Lists the immediate children of the directory at `path`, in any order.
    fn list(&mut self, path: &Path) -> io::Result<Vec<SourceEntry>>;
}

/// [`TreeSource`] over the local filesystem.
#[derive(Debug, Clone, Default)]
pub struct StdTreeSource;

impl StdTreeSource {
    pub fn new() -> Self {
        Self
    }

    fn describe(path: PathBuf, name: OsString) -> io::Result<SourceEntry> {
        let link = fs::symlink_metadata(&path)?;
        let is_link = link.file_type().is_symlink();
        // Links are followed for files; a dangling link is `Other`.
        let meta = match fs::metadata(&path) {
            Ok(meta) => meta,
            Err(_) if is_link => link,
            Err(e) => return Err(e),
        };

        let kind = if meta.is_dir() {
            if is_link {
                EntryKind::DirLink
            } else {
                EntryKind::Dir
            }
        } else if meta.is_file() {
            EntryKind::File
        } else {
            EntryKind::Other
        };

        Ok(SourceEntry {
            name,
            size: if kind == EntryKind::File { meta.len() } else { 0 },
            modified: meta.modified().ok(),
            kind,
            path,
        })
    }
}

impl TreeSource for StdTreeSource {
    fn stat(&mut self, path: &Path) -> io::Result<SourceEntry> {
        let name = path.file_name().map(OsString::from).unwrap_or_default();
        Self::describe(path.to_path_buf(), name)
    }

    fn list(&mut self, path: &Path) -> io::Result<Vec<SourceEntry>> {
        let mut out = Vec::new();
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            match Self::describe(entry.path(), entry.file_name()) {
                Ok(e) => out.push(e),
                Err(e) => warn!("Skipping unreadable entry {}: {e}", entry.path().display()),
            }
        }
        Ok(out)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChildKind {
    /// A regular file and the real path its bytes are read from.
    File(PathBuf),
    /// A sub-directory, by index into [`ScanTree::dirs`].
    Dir(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanChild {
    pub kind: ChildKind,
    pub size: u64,
    pub modified: Option<SystemTime>,
}

impl ScanChild {
    #[inline]
    pub fn is_dir(&self) -> bool {
        matches!(self.kind, ChildKind::Dir(_))
    }
}

#[derive(Debug, Clone)]
pub struct ScannedDir {
    pub path: PathBuf,
    /// `None` for the root.
    pub parent: Option<usize>,
    pub modified: Option<SystemTime>,
    /// Children ordered by name.
    pub children: BTreeMap<String, ScanChild>,
}

/// Result of a scan: every directory in walk order plus running totals.
#[derive(Debug, Clone)]
pub struct ScanTree {
    pub dirs: Vec<ScannedDir>,
    pub total_file_bytes: u64,
    pub total_files: usize,
}

impl ScanTree {
    #[inline]
    pub fn root(&self) -> &ScannedDir {
        &self.dirs[0]
    }
}

/// Scans the local directory at `root`.
pub fn scan(root: &Path) -> VfatResult<ScanTree> {
    scan_with(&mut StdTreeSource::new(), root)
}

/// Scans `root` through `source`.
///
/// Only a missing or non-directory root is an error; entries that cannot be
/// represented on the volume are logged and skipped.
pub fn scan_with<S: TreeSource + ?Sized>(source: &mut S, root: &Path) -> VfatResult<ScanTree> {
    let meta = source.stat(root).map_err(|e| VfatError::io(root, e))?;
    if meta.kind != EntryKind::Dir && meta.kind != EntryKind::DirLink {
        return Err(VfatError::NotADirectory(root.to_path_buf()));
    }

    let mut scanner = Scanner {
        source,
        tree: ScanTree {
            dirs: vec![ScannedDir {
                path: root.to_path_buf(),
                parent: None,
                modified: meta.modified,
                children: BTreeMap::new(),
            }],
            total_file_bytes: 0,
            total_files: 0,
        },
    };

    let entries = scanner
        .source
        .list(root)
        .map_err(|e| VfatError::io(root, e))?;
    scanner.fill(0, entries);

    let tree = scanner.tree;
    info!(
        "Scanned {}: {} directories, {} files, {} bytes",
        root.display(),
        tree.dirs.len(),
        tree.total_files,
        tree.total_file_bytes
    );
    Ok(tree)
}

struct Scanner<'s, S: TreeSource + ?Sized> {
    source: &'s mut S,
    tree: ScanTree,
}

impl<S: TreeSource + ?Sized> Scanner<'_, S> {
    fn visit(&mut self, idx: usize) {
        let path = self.tree.dirs[idx].path.clone();
        match self.source.list(&path) {
            Ok(entries) => self.fill(idx, entries),
            Err(e) => warn!("Cannot list {}: {e}; keeping it empty", path.display()),
        }
    }

    fn fill(&mut self, idx: usize, entries: Vec<SourceEntry>) {
        let mut named: Vec<(String, SourceEntry)> = entries
            .into_iter()
            .map(|e| (display_name(&e), e))
            .collect();
        named.sort_by(|a, b| a.0.cmp(&b.0));

        for (name, entry) in named {
            if self.tree.dirs[idx].children.contains_key(&name) {
                warn!(
                    "Skipping {}: name collides with another entry as {name:?}",
                    entry.path.display()
                );
                continue;
            }

            match entry.kind {
                EntryKind::File => {
                    if entry.size == 0 {
                        debug!("Skipping empty file {}", entry.path.display());
                        continue;
                    }
                    if entry.size > FAT_MAX_FILE_SIZE {
                        warn!(
                            "Skipping {}: {} bytes exceeds the FAT32 file size limit",
                            entry.path.display(),
                            entry.size
                        );
                        continue;
                    }
                    self.tree.total_files += 1;
                    self.tree.total_file_bytes += entry.size;
                    self.tree.dirs[idx].children.insert(
                        name,
                        ScanChild {
                            kind: ChildKind::File(entry.path),
                            size: entry.size,
                            modified: entry.modified,
                        },
                    );
                }
                EntryKind::Dir => {
                    let child = self.tree.dirs.len();
                    self.tree.dirs.push(ScannedDir {
                        path: entry.path,
                        parent: Some(idx),
                        modified: entry.modified,
                        children: BTreeMap::new(),
                    });
                    self.tree.dirs[idx].children.insert(
                        name,
                        ScanChild {
                            kind: ChildKind::Dir(child),
                            size: 0,
                            modified: entry.modified,
                        },
                    );
                    self.visit(child);
                }
                EntryKind::DirLink => {
                    warn!("Skipping directory link {}", entry.path.display());
                }
                EntryKind::Other => {
                    debug!("Skipping special file {}", entry.path.display());
                }
            }
        }
    }
}

fn display_name(entry: &SourceEntry) -> String {
    match entry.name.to_str() {
        Some(name) => name.to_owned(),
        None => {
            let lossy = entry.name.to_string_lossy().into_owned();
            warn!(
                "{} is not valid UTF-8, presenting it as {lossy:?}",
                entry.path.display()
            );
            lossy
        }
    }
}
