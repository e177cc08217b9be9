//! Concurrent fetcher: downloads every item of a manifest into the output tree.
//!
//! A bounded pool of OS threads pulls work from a shared queue. Items that
//! resolve to the same file form one unit and run in manifest order, so the
//! later entry cleanly overwrites the earlier one. Each worker owns its items
//! end-to-end: create the destination directory, read the
//! whole remote body into memory, write it out, report the path. Results flow
//! back over a channel and are applied to the items by the calling thread.

mod error;
mod progress;
mod transport;

pub use error::FetchError;
pub use progress::ProgressStats;
pub use transport::{CurlFetcher, Fetch};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::{Mutex, PoisonError};
use std::thread;

use crate::manifest::DownloadItem;
use progress::ProgressCounter;

/// How a per-item failure affects the rest of the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop handing out items and return the first error.
    #[default]
    Abort,
    /// Keep going; failures are collected in the [`FetchReport`].
    Continue,
}

/// Knobs for one fetch batch.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Worker threads; `None` uses the detected hardware concurrency.
    pub workers: Option<usize>,
    pub failure_policy: FailurePolicy,
    /// Receives a snapshot after each finished item.
    pub progress: Option<Sender<ProgressStats>>,
}

/// An item that could not be fetched under [`FailurePolicy::Continue`].
#[derive(Debug)]
pub struct ItemFailure {
    pub key: String,
    pub error: FetchError,
}

/// Outcome of a batch that did not abort.
#[derive(Debug, Default)]
pub struct FetchReport {
    /// Items written to disk.
    pub fetched: usize,
    pub failures: Vec<ItemFailure>,
}

/// Number of available execution units, at least 1.
pub fn default_workers() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Fetches every item into `output_dir / dir / name` and records the path on the item.
///
/// With [`FailurePolicy::Abort`] the first failure stops workers from taking
/// new items (in-flight ones finish) and is returned as the error. Files
/// written before that stay on disk. An empty slice performs no network calls.
pub fn fetch_all<F: Fetch>(
    items: &mut [DownloadItem],
    fetcher: &F,
    output_dir: &Path,
    opts: &FetchOptions,
) -> Result<FetchReport> {
    let total = items.len();
    if total == 0 {
        return Ok(FetchReport::default());
    }
    let groups = group_by_target(items, output_dir);
    let workers = opts
        .workers
        .unwrap_or_else(default_workers)
        .clamp(1, groups.len());
    let policy = opts.failure_policy;
    tracing::info!(total, targets = groups.len(), workers, ?policy, output_dir = %output_dir.display(), "fetch batch starting");

    let sources: Vec<(&str, &str)> = items
        .iter()
        .map(|item| (item.url.as_str(), item.key.as_str()))
        .collect();
    let queue: Mutex<VecDeque<TargetGroup>> = Mutex::new(groups.into_iter().collect());
    let stop = AtomicBool::new(false);
    let counter = ProgressCounter::new(total, opts.progress.clone());
    let (tx, rx) = mpsc::channel::<(usize, Result<PathBuf, FetchError>)>();

    let results: Vec<(usize, Result<PathBuf, FetchError>)> = thread::scope(|s| {
        for _ in 0..workers {
            let tx = tx.clone();
            let (queue, stop, counter, sources) = (&queue, &stop, &counter, &sources);
            s.spawn(move || loop {
                let next = queue
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .pop_front();
                let Some(group) = next else {
                    break;
                };
                // Items sharing a target run in manifest order on this worker.
                for index in group.indices {
                    if stop.load(Ordering::Acquire) {
                        return;
                    }
                    let (url, key) = sources[index];
                    let res = fetch_one(fetcher, url, &group.target);
                    if res.is_err() && policy == FailurePolicy::Abort {
                        stop.store(true, Ordering::Release);
                    }
                    counter.finish(key);
                    if tx.send((index, res)).is_err() {
                        return;
                    }
                }
            });
        }
        drop(tx);
        rx.iter().collect()
    });

    let mut report = FetchReport::default();
    let mut first_error: Option<(String, FetchError)> = None;
    for (index, res) in results {
        let item = &mut items[index];
        match res {
            Ok(path) => {
                item.path = Some(path);
                report.fetched += 1;
            }
            Err(error) => match policy {
                FailurePolicy::Abort => {
                    if first_error.is_none() {
                        first_error = Some((item.key.clone(), error));
                    }
                }
                FailurePolicy::Continue => {
                    tracing::warn!(key = %item.key, url = %item.url, "fetch failed: {}", error);
                    report.failures.push(ItemFailure {
                        key: item.key.clone(),
                        error,
                    });
                }
            },
        }
    }

    if let Some((key, error)) = first_error {
        tracing::warn!(key = %key, fetched = report.fetched, "fetch batch aborted: {}", error);
        return Err(anyhow::Error::new(error).context(format!("downloading {key}")));
    }
    tracing::info!(
        fetched = report.fetched,
        failed = report.failures.len(),
        "fetch batch finished"
    );
    Ok(report)
}

/// Item indices that resolve to the same file on disk.
#[derive(Debug)]
struct TargetGroup {
    target: PathBuf,
    indices: Vec<usize>,
}

/// Groups items by destination path, in first-seen order.
fn group_by_target(items: &[DownloadItem], output_dir: &Path) -> Vec<TargetGroup> {
    let mut groups: Vec<TargetGroup> = Vec::new();
    let mut by_target: HashMap<PathBuf, usize> = HashMap::new();
    for (index, item) in items.iter().enumerate() {
        let target = item.target_path(output_dir);
        match by_target.get(&target) {
            Some(&g) => {
                tracing::warn!(key = %item.key, target = %target.display(), "target shared with an earlier item, later entry wins");
                groups[g].indices.push(index);
            }
            None => {
                by_target.insert(target.clone(), groups.len());
                groups.push(TargetGroup {
                    target,
                    indices: vec![index],
                });
            }
        }
    }
    groups
}

/// One unit of work: mkdir, GET the full body, write it out.
fn fetch_one<F: Fetch>(fetcher: &F, url: &str, target: &Path) -> Result<PathBuf, FetchError> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|source| FetchError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let body = fetcher.fetch(url)?;
    fs::write(target, &body).map_err(|source| FetchError::Io {
        path: target.to_path_buf(),
        source,
    })?;
    tracing::debug!(url, path = %target.display(), bytes = body.len(), "item written");
    Ok(target.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::Collapse;
    use std::sync::atomic::AtomicUsize;

    /// Serves canned bodies by URL and counts calls.
    struct FakeFetcher {
        bodies: HashMap<String, Vec<u8>>,
        calls: AtomicUsize,
    }

    impl FakeFetcher {
        fn new(entries: &[(&str, &[u8])]) -> Self {
            Self {
                bodies: entries
                    .iter()
                    .map(|(u, b)| (u.to_string(), b.to_vec()))
                    .collect(),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Fetch for FakeFetcher {
        fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.bodies
                .get(url)
                .cloned()
                .ok_or(FetchError::Http { status: 404 })
        }
    }

    fn item(url: &str, directive: &str) -> DownloadItem {
        DownloadItem::from_directive(url, directive, Collapse::default()).unwrap()
    }

    const A: &str = "https://host/dapprd/ID1v1/data/a.csv";
    const B: &str = "https://host/dapprd/ID1v1/metadata/b.txt";
    const MISSING: &str = "https://host/dapprd/ID1v1/data/missing.csv";

    #[test]
    fn writes_items_and_records_paths() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = FakeFetcher::new(&[(A, &b"a,b\n1,2\n"[..]), (B, &b"readme"[..])]);
        let mut items = vec![item(A, "dir="), item(B, "dir=docs/nested")];
        let report = fetch_all(&mut items, &fetcher, dir.path(), &FetchOptions::default()).unwrap();

        assert_eq!(report.fetched, 2);
        assert!(report.failures.is_empty());
        assert_eq!(fetcher.calls(), 2);
        let a_path = dir.path().join("a.csv");
        let b_path = dir.path().join("docs").join("nested").join("b.txt");
        assert_eq!(items[0].path.as_deref(), Some(a_path.as_path()));
        assert_eq!(items[1].path.as_deref(), Some(b_path.as_path()));
        assert_eq!(fs::read(&a_path).unwrap(), b"a,b\n1,2\n");
        assert_eq!(fs::read(&b_path).unwrap(), b"readme");
    }

    #[test]
    fn empty_batch_makes_no_calls() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = FakeFetcher::new(&[]);
        let mut items: Vec<DownloadItem> = Vec::new();
        let report = fetch_all(&mut items, &fetcher, dir.path(), &FetchOptions::default()).unwrap();
        assert_eq!(report.fetched, 0);
        assert_eq!(fetcher.calls(), 0);
    }

    #[test]
    fn overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.csv"), b"stale content that is longer").unwrap();
        let fetcher = FakeFetcher::new(&[(A, &b"fresh"[..])]);
        let mut items = vec![item(A, "")];
        fetch_all(&mut items, &fetcher, dir.path(), &FetchOptions::default()).unwrap();
        assert_eq!(fs::read(dir.path().join("a.csv")).unwrap(), b"fresh");
    }

    #[test]
    fn abort_policy_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = FakeFetcher::new(&[(A, &b"a"[..])]);
        let mut items = vec![item(MISSING, "")];
        let err = fetch_all(&mut items, &fetcher, dir.path(), &FetchOptions::default()).unwrap_err();
        assert!(format!("{err:#}").contains("missing.csv"));
        assert!(format!("{err:#}").contains("HTTP 404"));
        assert!(items[0].path.is_none());
    }

    #[test]
    fn abort_policy_single_worker_stops_handing_out_items() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = FakeFetcher::new(&[(A, &b"a"[..]), (B, &b"b"[..])]);
        let mut items = vec![item(MISSING, ""), item(A, ""), item(B, "")];
        let opts = FetchOptions {
            workers: Some(1),
            ..FetchOptions::default()
        };
        assert!(fetch_all(&mut items, &fetcher, dir.path(), &opts).is_err());
        assert_eq!(fetcher.calls(), 1);
        assert!(!dir.path().join("a.csv").exists());
    }

    #[test]
    fn continue_policy_isolates_failures() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = FakeFetcher::new(&[(A, &b"a"[..]), (B, &b"b"[..])]);
        let mut items = vec![item(A, ""), item(MISSING, ""), item(B, "")];
        let opts = FetchOptions {
            workers: Some(2),
            failure_policy: FailurePolicy::Continue,
            progress: None,
        };
        let report = fetch_all(&mut items, &fetcher, dir.path(), &opts).unwrap();
        assert_eq!(report.fetched, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].key, "missing.csv");
        assert!(matches!(report.failures[0].error, FetchError::Http { status: 404 }));
        assert!(items[0].path.is_some());
        assert!(items[1].path.is_none());
        assert!(items[2].path.is_some());
        assert_eq!(fetcher.calls(), 3);
    }

    #[test]
    fn progress_reports_every_item() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = FakeFetcher::new(&[(A, &b"a"[..]), (B, &b"b"[..])]);
        let mut items = vec![item(A, ""), item(B, "")];
        let (tx, rx) = mpsc::channel();
        let opts = FetchOptions {
            workers: Some(4),
            progress: Some(tx),
            ..FetchOptions::default()
        };
        fetch_all(&mut items, &fetcher, dir.path(), &opts).unwrap();
        drop(opts);
        let snapshots: Vec<ProgressStats> = rx.iter().collect();
        assert_eq!(snapshots.len(), 2);
        assert!(snapshots.iter().all(|s| s.total == 2));
        let mut done: Vec<usize> = snapshots.iter().map(|s| s.done).collect();
        done.sort_unstable();
        assert_eq!(done, vec![1, 2]);
    }

    #[test]
    fn file_in_place_of_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("docs"), b"not a directory").unwrap();
        let fetcher = FakeFetcher::new(&[(B, &b"b"[..])]);
        let mut items = vec![item(B, "dir=docs")];
        let opts = FetchOptions {
            failure_policy: FailurePolicy::Continue,
            ..FetchOptions::default()
        };
        let report = fetch_all(&mut items, &fetcher, dir.path(), &opts).unwrap();
        assert!(matches!(report.failures[0].error, FetchError::Io { .. }));
        assert_eq!(fetcher.calls(), 0);
    }

    #[test]
    fn shared_target_written_in_manifest_order() {
        const DATA_A: &str = "https://host/dapprd/ID1v1/data/a.csv";
        const META_A: &str = "https://host/dapprd/ID1v1/metadata/a.csv";
        let large = vec![b'L'; 1024 * 1024];
        let small = vec![b's'; 16];
        for _ in 0..50 {
            let dir = tempfile::tempdir().unwrap();
            let fetcher = FakeFetcher::new(&[(DATA_A, large.as_slice()), (META_A, small.as_slice())]);
            let mut items = vec![item(DATA_A, "dir="), item(META_A, "dir=")];
            assert_ne!(items[0].key, items[1].key);
            let opts = FetchOptions {
                workers: Some(2),
                ..FetchOptions::default()
            };
            let report = fetch_all(&mut items, &fetcher, dir.path(), &opts).unwrap();
            assert_eq!(report.fetched, 2);
            assert_eq!(fs::read(dir.path().join("a.csv")).unwrap(), small);
        }
    }

    #[test]
    fn group_by_target_keeps_first_seen_order() {
        let items = vec![
            item("https://host/dapprd/ID1v1/data/a.csv", ""),
            item("https://host/dapprd/ID1v1/data/b.csv", ""),
            item("https://host/dapprd/ID1v1/metadata/a.csv", ""),
        ];
        let groups = group_by_target(&items, Path::new("/out"));
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].target, Path::new("/out").join("a.csv"));
        assert_eq!(groups[0].indices, vec![0, 2]);
        assert_eq!(groups[1].indices, vec![1]);
    }

    #[test]
    fn default_workers_is_positive() {
        assert!(default_workers() >= 1);
    }
}
