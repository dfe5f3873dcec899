//! Concurrent recursive directory walk that streams file paths.
//!
//! Each directory is visited by its own task. A visit holds a listing permit
//! only while it reads the directory's entries, then releases it before
//! sending files downstream or handing child directories back to the
//! coordinator. The coordinator owns every visit in a `JoinSet`; the path
//! channel closes when the set drains, whatever the tree shape.
//!
//! One directory can be excluded from the walk: the run's own output
//! directory, so a tree that contains it is not fed back its earlier
//! outputs.

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinHandle, JoinSet};

use crate::config::WalkConfig;

/// Counters gathered during a walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WalkStats {
    /// Directories listed successfully
    pub directories: u64,
    /// Files sent downstream
    pub files: u64,
    /// Directories that could not be listed
    pub errors: u64,
    /// Most listings observed holding a permit at the same time
    pub peak_listings: usize,
}

#[derive(Default)]
struct WalkCounters {
    directories: AtomicU64,
    files: AtomicU64,
    errors: AtomicU64,
    listing: AtomicUsize,
    peak_listings: AtomicUsize,
}

impl WalkCounters {
    fn snapshot(&self) -> WalkStats {
        WalkStats {
            directories: self.directories.load(Ordering::Relaxed),
            files: self.files.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            peak_listings: self.peak_listings.load(Ordering::Relaxed),
        }
    }
}

/// Tracks how many listings currently hold a permit.
struct ListingGuard<'a>(&'a WalkCounters);

impl<'a> ListingGuard<'a> {
    fn enter(counters: &'a WalkCounters) -> Self {
        let now = counters.listing.fetch_add(1, Ordering::SeqCst) + 1;
        counters.peak_listings.fetch_max(now, Ordering::SeqCst);
        Self(counters)
    }
}

impl Drop for ListingGuard<'_> {
    fn drop(&mut self) {
        self.0.listing.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Shared state for every visit of one walk.
struct Visit {
    permits: Arc<Semaphore>,
    counters: WalkCounters,
    paths: mpsc::Sender<PathBuf>,
    excluded: Option<PathBuf>,
}

impl Visit {
    /// Whether `dir` is the excluded directory. Only directories with the
    /// same final component are canonicalized.
    async fn is_excluded(&self, dir: &Path) -> bool {
        let Some(excluded) = &self.excluded else {
            return false;
        };
        if dir.file_name() != excluded.file_name() {
            return false;
        }
        matches!(tokio::fs::canonicalize(dir).await, Ok(real) if &real == excluded)
    }
}

/// Recursive, bounded-concurrency directory walker.
pub struct DirectoryWalker {
    max_listings: usize,
    excluded: Option<PathBuf>,
}

impl DirectoryWalker {
    pub fn new(config: &WalkConfig) -> Self {
        Self {
            max_listings: config.max_concurrent_listings.max(1),
            excluded: None,
        }
    }

    /// Skip the subtree at `dir`, given in canonical form.
    pub fn with_excluded(mut self, dir: PathBuf) -> Self {
        self.excluded = Some(dir);
        self
    }

    /// Run the walk on its own task.
    pub fn spawn(self, root: PathBuf, paths: mpsc::Sender<PathBuf>) -> JoinHandle<WalkStats> {
        tokio::spawn(async move { self.walk(&root, paths).await })
    }

    /// Walk `root`, sending every non-directory entry to `paths`.
    ///
    /// A plain-file root is sent on its own. Unreadable directories are
    /// logged and counted; their subtrees yield nothing. `paths` is dropped
    /// when this returns, which closes the stream.
    pub async fn walk(self, root: &Path, paths: mpsc::Sender<PathBuf>) -> WalkStats {
        let visit = Arc::new(Visit {
            permits: Arc::new(Semaphore::new(self.max_listings)),
            counters: WalkCounters::default(),
            paths,
            excluded: self.excluded,
        });

        match tokio::fs::metadata(root).await {
            Ok(meta) if !meta.is_dir() => {
                if visit.paths.send(root.to_path_buf()).await.is_ok() {
                    visit.counters.files.fetch_add(1, Ordering::Relaxed);
                }
                return visit.counters.snapshot();
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("Cannot read {:?}: {}", root, e);
                visit.counters.errors.fetch_add(1, Ordering::Relaxed);
                return visit.counters.snapshot();
            }
        }

        let mut visits = JoinSet::new();
        visits.spawn(visit_dir(Arc::clone(&visit), root.to_path_buf()));

        while let Some(joined) = visits.join_next().await {
            match joined {
                Ok(children) => {
                    for child in children {
                        visits.spawn(visit_dir(Arc::clone(&visit), child));
                    }
                }
                Err(e) => {
                    tracing::error!("Directory visit task failed: {}", e);
                    visit.counters.errors.fetch_add(1, Ordering::Relaxed);
                }
            }
        }

        let stats = visit.counters.snapshot();
        tracing::debug!(
            "Walk finished: {} directories, {} files, {} errors, peak {} listings",
            stats.directories,
            stats.files,
            stats.errors,
            stats.peak_listings
        );
        stats
    }
}

/// Visit one directory and return its subdirectories.
async fn visit_dir(visit: Arc<Visit>, dir: PathBuf) -> Vec<PathBuf> {
    if visit.paths.is_closed() {
        return Vec::new();
    }

    let entries = match list_dir(&visit, &dir).await {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("Cannot list {:?}: {}", dir, e);
            visit.counters.errors.fetch_add(1, Ordering::Relaxed);
            return Vec::new();
        }
    };
    visit.counters.directories.fetch_add(1, Ordering::Relaxed);

    let mut children = Vec::new();
    for (path, is_dir) in entries {
        if is_dir {
            if visit.is_excluded(&path).await {
                tracing::debug!("Skipping output directory {:?}", path);
                continue;
            }
            children.push(path);
        } else {
            if visit.paths.send(path).await.is_err() {
                // Downstream is gone; nothing left to feed.
                return Vec::new();
            }
            visit.counters.files.fetch_add(1, Ordering::Relaxed);
        }
    }
    children
}

/// Read a directory's entries while holding one listing permit.
async fn list_dir(visit: &Visit, dir: &Path) -> std::io::Result<Vec<(PathBuf, bool)>> {
    let _permit = visit
        .permits
        .acquire()
        .await
        .map_err(std::io::Error::other)?;
    let _listing = ListingGuard::enter(&visit.counters);

    let mut read_dir = tokio::fs::read_dir(dir).await?;
    let mut entries = Vec::new();
    while let Some(entry) = read_dir.next_entry().await? {
        match entry.file_type().await {
            Ok(kind) => entries.push((entry.path(), kind.is_dir())),
            Err(e) => {
                tracing::warn!("Cannot stat {:?}: {}", entry.path(), e);
            }
        }
    }
    Ok(entries)
}
