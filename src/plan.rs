// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Rename plan construction
//!
//! A pass walks the tree once to list files, then computes a destination for
//! every image in a stable order, so collision numbering is the same on every
//! run over the same files.

use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::cache::ResolverCache;
use crate::collision::resolve_collision;
use crate::config::Settings;
use crate::lookup::TitleLookup;
use crate::normalize::is_image;
use crate::resolver::RemoteNameResolver;
use crate::{PicnameError, Result};

/// Progress reported before a pass is completely finished
const PROGRESS_CAP: f64 = 0.99;

/// One planned rename
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanEntry {
    pub original: PathBuf,
    pub destination: PathBuf,
}

/// Ordered original → destination mapping with distinct destinations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenamePlan {
    entries: Vec<PlanEntry>,
}

impl RenamePlan {
    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlanEntry> {
        self.entries.iter()
    }

    /// Destination planned for `original`, if any
    pub fn destination_of(&self, original: &Path) -> Option<&Path> {
        self.entries
            .iter()
            .find(|e| e.original == original)
            .map(|e| e.destination.as_path())
    }

    /// `(old, new)` paths relative to `root`, sorted by directory and then
    /// case-insensitively by name, for showing to a user
    pub fn display_rows(&self, root: &Path) -> Vec<(String, String)> {
        let relative = |p: &Path| {
            p.strip_prefix(root)
                .unwrap_or(p)
                .to_string_lossy()
                .into_owned()
        };

        let mut rows: Vec<_> = self.entries.iter().collect();
        rows.sort_by_key(|e| {
            let dir = e.original.parent().map(Path::to_path_buf).unwrap_or_default();
            let name = e.original
                .file_name()
                .map(|n| n.to_string_lossy().to_lowercase())
                .unwrap_or_default();
            (dir, name)
        });

        rows.into_iter()
            .map(|e| (relative(&e.original), relative(&e.destination)))
            .collect()
    }

    fn push(&mut self, original: PathBuf, destination: PathBuf) {
        self.entries.push(PlanEntry { original, destination });
    }
}

impl<'a> IntoIterator for &'a RenamePlan {
    type Item = &'a PlanEntry;
    type IntoIter = std::slice::Iter<'a, PlanEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Request to stop a running pass.
///
/// Clones share the same flag. A pass clears it when it starts and again when
/// it stops because of it, so a request only ever ends the pass it was made for.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag {
    requested: Arc<AtomicBool>,
}

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Read and reset the flag
    pub fn take(&self) -> bool {
        self.requested.swap(false, Ordering::SeqCst)
    }
}

/// How a pass ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    Completed(RenamePlan),
    /// Stopped on request; nothing of the partial plan survives
    Cancelled,
}

impl BuildOutcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// The plan, or an empty plan after a cancellation
    pub fn into_plan(self) -> RenamePlan {
        match self {
            Self::Completed(plan) => plan,
            Self::Cancelled => RenamePlan::default(),
        }
    }
}

/// Fraction of files processed, held just below 1.0 until the pass is over
fn progress_fraction(processed: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (processed as f64 / total as f64).min(PROGRESS_CAP)
}

/// All files below `root`: each directory's files by name, then its subdirectories by name
fn list_files(root: &Path) -> Result<Vec<PathBuf>> {
    let walker = WalkDir::new(root)
        .sort_by(|a, b| {
            a.file_type()
                .is_dir()
                .cmp(&b.file_type().is_dir())
                .then_with(|| a.file_name().cmp(b.file_name()))
        });

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Builds rename plans. Owns the title cache for the duration of a pass.
pub struct PlanBuilder<L> {
    resolver: RemoteNameResolver<L>,
    cache: ResolverCache,
}

impl<L: TitleLookup> PlanBuilder<L> {
    pub fn new(resolver: RemoteNameResolver<L>, cache: ResolverCache) -> Self {
        Self { resolver, cache }
    }

    pub fn cache(&self) -> &ResolverCache {
        &self.cache
    }

    /// Build a plan for every image below `root`.
    ///
    /// `report_progress` is called after each file with a value in `[0, 1)`
    /// and once with `1.0` when the pass completes. The cache is written back
    /// whether the pass completes, is cancelled or fails.
    pub async fn build<P>(
        &mut self,
        root: &Path,
        settings: &Settings,
        cancel: &CancellationFlag,
        mut report_progress: P,
    ) -> Result<BuildOutcome>
    where
        P: FnMut(f64) + Send,
    {
        if !root.is_dir() {
            return Err(PicnameError::Config(format!(
                "{:?} does not exist or is not a directory",
                root
            )));
        }

        // A request left over from an earlier pass is not meant for this one
        if cancel.take() {
            debug!("Dropping stale cancellation request");
        }

        let files = list_files(root)?;
        info!("Scanning {} files under {:?}", files.len(), root);

        let result = self.run_pass(&files, settings, cancel, &mut report_progress).await;

        if let Err(e) = self.cache.flush() {
            warn!("Failed to save title cache: {}", e);
            if result.is_ok() {
                return Err(e);
            }
        }

        match &result {
            Ok(BuildOutcome::Completed(plan)) => {
                report_progress(1.0);
                info!("Planned {} renames under {:?}", plan.len(), root);
            }
            Ok(BuildOutcome::Cancelled) => info!("Scan of {:?} cancelled", root),
            Err(e) => warn!("Scan of {:?} failed: {}", root, e),
        }

        result
    }

    async fn run_pass<P>(
        &mut self,
        files: &[PathBuf],
        settings: &Settings,
        cancel: &CancellationFlag,
        report_progress: &mut P,
    ) -> Result<BuildOutcome>
    where
        P: FnMut(f64) + Send,
    {
        let mut plan = RenamePlan::default();
        // Destinations taken in this pass, including files keeping their name
        let mut taken: HashSet<PathBuf> = HashSet::new();

        for (index, path) in files.iter().enumerate() {
            if cancel.take() {
                return Ok(BuildOutcome::Cancelled);
            }

            self.plan_file(path, settings, &mut plan, &mut taken).await?;
            report_progress(progress_fraction(index + 1, files.len()));
        }

        Ok(BuildOutcome::Completed(plan))
    }

    async fn plan_file(
        &mut self,
        path: &Path,
        settings: &Settings,
        plan: &mut RenamePlan,
        taken: &mut HashSet<PathBuf>,
    ) -> Result<()> {
        let Some(filename) = path.file_name().and_then(|n| n.to_str()) else {
            warn!("Skipping file with a non UTF-8 name: {:?}", path);
            return Ok(());
        };
        if !is_image(filename) {
            return Ok(());
        }

        let new_name = match self.resolver.candidate_name(filename, settings, &mut self.cache).await {
            Ok(name) => name,
            Err(e) if e.is_skip() => {
                debug!("Skipping {:?}: {}", path, e);
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let candidate = path.with_file_name(&new_name);
        let destination = resolve_collision(&candidate, taken);
        taken.insert(destination.clone());

        if destination == path {
            debug!("Unchanged: {:?}", path);
        } else {
            debug!("Plan: {:?} -> {:?}", path, destination);
            plan.push(path.to_path_buf(), destination);
        }

        Ok(())
    }
}

/// A pass running on its own task
pub struct BuildHandle<L> {
    pub progress: watch::Receiver<f64>,
    task: JoinHandle<(PlanBuilder<L>, Result<BuildOutcome>)>,
}

impl<L> BuildHandle<L> {
    /// Wait for the pass; the builder comes back for the next one
    pub async fn join(self) -> Result<(PlanBuilder<L>, Result<BuildOutcome>)> {
        Ok(self.task.await?)
    }
}

impl<L: TitleLookup + 'static> PlanBuilder<L> {
    /// Run [`PlanBuilder::build`] on a separate task.
    ///
    /// Progress is published on a watch channel and `cancel` stops the pass;
    /// the builder is handed back by [`BuildHandle::join`].
    pub fn spawn(mut self, root: PathBuf, settings: Settings, cancel: CancellationFlag) -> BuildHandle<L> {
        let (progress_tx, progress_rx) = watch::channel(0.0);

        let task = tokio::spawn(async move {
            let result = self
                .build(&root, &settings, &cancel, move |fraction| {
                    let _ = progress_tx.send(fraction);
                })
                .await;
            (self, result)
        });

        BuildHandle {
            progress: progress_rx,
            task,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Delimiter, LookupConfig};
    use crate::lookup::fixture::FixtureLookup;
    use std::fs::File;
    use tempfile::TempDir;

    fn touch(dir: &Path, names: &[&str]) {
        for name in names {
            let path = dir.join(name);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            File::create(path).unwrap();
        }
    }

    fn builder(cache: ResolverCache) -> PlanBuilder<FixtureLookup> {
        let resolver = RemoteNameResolver::new(FixtureLookup::new(), &LookupConfig::default()).unwrap();
        PlanBuilder::new(resolver, cache)
    }

    fn settings(delimiter: Delimiter, capitalize_words: bool, remote: bool) -> Settings {
        Settings {
            delimiter,
            capitalize_words,
            resolve_remote_names: remote,
            last_path: String::new(),
        }
    }

    fn names(plan: &RenamePlan, root: &Path) -> Vec<(String, String)> {
        plan.iter()
            .map(|e| {
                (
                    e.original.strip_prefix(root).unwrap().to_string_lossy().into_owned(),
                    e.destination.strip_prefix(root).unwrap().to_string_lossy().into_owned(),
                )
            })
            .collect()
    }

    const FILES: &[&str] = &[
        "_104!.JPG",
        "31;42;87.jpg",
        "31   .PNG",
        "dash-separated.TIFF",
        "too.many.dots.png.jpg",
        "32165342_a7d7351d30_o.jpg",
        "6795654383_a7d7351d30_z.jpg",
        "6888049103_0e43f63926_o.jpg",
        "679563_a30_z.exe",
        "init.ini",
    ];

    #[tokio::test]
    async fn test_plan_with_remote_titles() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), FILES);
        let mut builder = builder(ResolverCache::in_memory());

        let outcome = builder
            .build(dir.path(), &settings(Delimiter::Space, false, true), &CancellationFlag::new(), |_| {})
            .await
            .unwrap();
        let plan = outcome.into_plan();

        let mut got = names(&plan, dir.path());
        got.sort();
        let mut expected: Vec<(String, String)> = [
            ("_104!.JPG", "104!.jpg"),
            ("31   .PNG", "31.png"),
            ("dash-separated.TIFF", "dash separated.tiff"),
            ("too.many.dots.png.jpg", "too many dots png.jpg"),
            ("32165342_a7d7351d30_o.jpg", "32165342 a7d7351d30 o.jpg"),
            ("6795654383_a7d7351d30_z.jpg", "And loves the noblest frailty of the mind John Dryden.jpg"),
            ("6888049103_0e43f63926_o.jpg", "DughiTile Oakwd KARL.jpg"),
        ]
        .iter()
        .map(|(a, b)| (a.to_string(), b.to_string()))
        .collect();
        expected.sort();
        assert_eq!(got, expected);
        assert_eq!(builder.cache().len(), 2);
    }

    #[tokio::test]
    async fn test_underscore_capitalized_plan() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), FILES);
        let mut builder = builder(ResolverCache::in_memory());

        let plan = builder
            .build(dir.path(), &settings(Delimiter::Underscore, true, true), &CancellationFlag::new(), |_| {})
            .await
            .unwrap()
            .into_plan();

        let p = |n: &str| dir.path().join(n);
        assert_eq!(plan.destination_of(&p("dash-separated.TIFF")), Some(p("Dash_Separated.tiff").as_path()));
        assert_eq!(
            plan.destination_of(&p("6888049103_0e43f63926_o.jpg")),
            Some(p("Dughitile_Oakwd_Karl.jpg").as_path())
        );
        assert_eq!(
            plan.destination_of(&p("32165342_a7d7351d30_o.jpg")),
            Some(p("32165342_A7D7351D30_O.jpg").as_path())
        );
        assert_eq!(plan.destination_of(&p("31;42;87.jpg")), None);
    }

    #[tokio::test]
    async fn test_collisions_are_numbered_in_walk_order() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), &["a-b.jpg", "a.b.jpg", "a_b.jpg", "sub/a_b.jpg"]);
        let mut builder = builder(ResolverCache::in_memory());

        let plan = builder
            .build(dir.path(), &settings(Delimiter::Space, false, false), &CancellationFlag::new(), |_| {})
            .await
            .unwrap()
            .into_plan();

        assert_eq!(
            names(&plan, dir.path()),
            vec![
                ("a-b.jpg".to_string(), "a b.jpg".to_string()),
                ("a.b.jpg".to_string(), "a b (1).jpg".to_string()),
                ("a_b.jpg".to_string(), "a b (2).jpg".to_string()),
                ("sub/a_b.jpg".to_string(), "sub/a b.jpg".to_string()),
            ]
        );

        let destinations: HashSet<_> = plan.iter().map(|e| e.destination.clone()).collect();
        assert_eq!(destinations.len(), plan.len());
    }

    #[tokio::test]
    async fn test_unchanged_names_still_reserve_their_path() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), &["a b.jpg", "a_b.jpg"]);
        let mut builder = builder(ResolverCache::in_memory());

        let plan = builder
            .build(dir.path(), &settings(Delimiter::Space, false, false), &CancellationFlag::new(), |_| {})
            .await
            .unwrap()
            .into_plan();

        assert_eq!(
            names(&plan, dir.path()),
            vec![("a_b.jpg".to_string(), "a b (1).jpg".to_string())]
        );
    }

    #[tokio::test]
    async fn test_progress_is_monotonic_and_completes() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), &["one.jpg", "two.png", "notes.txt"]);
        let mut builder = builder(ResolverCache::in_memory());
        let mut seen = Vec::new();

        builder
            .build(dir.path(), &Settings::default(), &CancellationFlag::new(), |f| seen.push(f))
            .await
            .unwrap();

        assert_eq!(seen.len(), 4);
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert!(seen[..3].iter().all(|f| *f < 1.0));
        assert_eq!(*seen.last().unwrap(), 1.0);
    }

    #[tokio::test]
    async fn test_cancellation_discards_plan_and_flushes_cache() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), &["6795654383_a7d7351d30_z.jpg", "b_c.jpg", "d_e.jpg"]);
        let cache_path = dir.path().join("state").join("titles.json");
        let mut builder = builder(ResolverCache::load(cache_path.clone()).unwrap());

        let cancel = CancellationFlag::new();
        let trigger = cancel.clone();
        let outcome = builder
            .build(dir.path(), &settings(Delimiter::Space, false, true), &cancel, move |_| trigger.request())
            .await
            .unwrap();

        assert!(outcome.is_cancelled());
        assert!(outcome.into_plan().is_empty());
        assert!(!cancel.is_requested(), "flag is consumed by the builder");

        let saved = ResolverCache::load(cache_path).unwrap();
        assert_eq!(
            saved.get("6795654383"),
            Some("And loves the noblest frailty of the mind John Dryden.jpg")
        );
    }

    #[tokio::test]
    async fn test_stale_request_does_not_cancel_next_pass() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), &["x_y.jpg"]);
        let mut builder = builder(ResolverCache::in_memory());
        let cancel = CancellationFlag::new();

        // Requested while the only file is processed: too late to stop this pass
        let trigger = cancel.clone();
        let first = builder
            .build(dir.path(), &Settings::default(), &cancel, move |_| trigger.request())
            .await
            .unwrap();
        assert_eq!(first.into_plan().len(), 1);

        let second = builder
            .build(dir.path(), &Settings::default(), &cancel, |_| {})
            .await
            .unwrap();
        assert!(!second.is_cancelled());
        assert_eq!(second.into_plan().len(), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_utf8_names_are_skipped() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = TempDir::new().unwrap();
        touch(dir.path(), &["a_b.jpg"]);
        let odd = dir.path().join(OsStr::from_bytes(b"caf\xe9_x.jpg"));
        File::create(&odd).unwrap();
        let mut builder = builder(ResolverCache::in_memory());

        let plan = builder
            .build(dir.path(), &Settings::default(), &CancellationFlag::new(), |_| {})
            .await
            .unwrap()
            .into_plan();

        assert_eq!(plan.len(), 1);
        assert_eq!(plan.destination_of(&odd), None);
        assert!(odd.exists());
    }

    #[tokio::test]
    async fn test_resolution_failure_propagates_after_flushing() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), &["1110001111_abcdef12_b.jpg", "2220002222_abcdef12_b.jpg"]);
        let cache_path = dir.path().join("titles.json");
        let mut builder = builder(ResolverCache::load(cache_path.clone()).unwrap());

        let err = builder
            .build(dir.path(), &settings(Delimiter::Space, false, true), &CancellationFlag::new(), |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, PicnameError::RemoteResolutionFailed { .. }));

        let saved = ResolverCache::load(cache_path).unwrap();
        assert_eq!(saved.get("1110001111"), Some("Late title.jpg"));
    }

    #[tokio::test]
    async fn test_missing_root_is_an_error() {
        let dir = TempDir::new().unwrap();
        let mut builder = builder(ResolverCache::in_memory());
        let err = builder
            .build(&dir.path().join("nope"), &Settings::default(), &CancellationFlag::new(), |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, PicnameError::Config(_)));
    }

    #[tokio::test]
    async fn test_spawned_build_returns_builder_and_plan() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), &["x_y.jpg"]);
        let handle = builder(ResolverCache::in_memory()).spawn(
            dir.path().to_path_buf(),
            Settings::default(),
            CancellationFlag::new(),
        );
        let progress = handle.progress.clone();

        let (builder, result) = handle.join().await.unwrap();
        let plan = result.unwrap().into_plan();
        assert_eq!(plan.len(), 1);
        assert_eq!(*progress.borrow(), 1.0);
        assert!(builder.cache().is_empty());
    }

    #[test]
    fn test_display_rows_sorted_case_insensitively() {
        let root = Path::new("/pics");
        let mut plan = RenamePlan::default();
        plan.push(root.join("b_c.jpg"), root.join("b c.jpg"));
        plan.push(root.join("A_b.jpg"), root.join("A b.jpg"));
        let rows = plan.display_rows(root);
        assert_eq!(
            rows,
            vec![
                ("A_b.jpg".to_string(), "A b.jpg".to_string()),
                ("b_c.jpg".to_string(), "b c.jpg".to_string()),
            ]
        );
    }

    #[test]
    fn test_progress_fraction_is_capped() {
        assert_eq!(progress_fraction(0, 0), 0.0);
        assert_eq!(progress_fraction(1, 2), 0.5);
        assert_eq!(progress_fraction(3, 3), PROGRESS_CAP);
    }

    #[test]
    fn test_cancellation_flag_shared_between_clones() {
        let flag = CancellationFlag::new();
        let clone = flag.clone();
        clone.request();
        assert!(flag.take());
        assert!(!clone.is_requested());
    }
}
