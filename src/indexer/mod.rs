pub mod cache;
pub mod worker;

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use serde::Serialize;

use crate::crypto::{decode_content, VaultCipher};
use crate::graph::WikiGraph;
use crate::search::SearchResult;
use crate::tasks::{extract_tasks, TaskRecord};
use crate::vault::enumerate_documents;
use worker::{spawn_worker, WorkerHandle, WorkerReply, WorkerRequest};

/// How long a search call waits on the worker before degrading to an
/// empty result set.
const SEARCH_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndexState {
    Idle,
    Indexing,
    Ready,
}

/// Events published to subscribers.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum IndexEvent {
    IndexingStarted,
    GraphUpdated(WikiGraph),
    TasksUpdated(Vec<TaskRecord>),
    IndexingComplete {
        files: usize,
        /// Files whose decryption failed and whose raw bytes were indexed
        /// as plaintext; the UI can surface a warning for these.
        plaintext_fallbacks: Vec<String>,
    },
    IndexingError(String),
}

type Subscriber = Arc<dyn Fn(&IndexEvent) + Send + Sync>;

/// Task ledger with single-writer discipline.
///
/// Every mutation bumps a global counter and stamps the touched file's
/// revision. A full pass records the counter at dispatch time; when its
/// results arrive, any per-file slice revised after that point wins over
/// the pass output instead of being silently overwritten.
#[derive(Default)]
struct TaskLedger {
    slices: BTreeMap<String, Vec<TaskRecord>>,
    revisions: HashMap<String, u64>,
    counter: u64,
    initialized: bool,
}

impl TaskLedger {
    fn replace_slice(&mut self, file: String, tasks: Vec<TaskRecord>) {
        self.counter += 1;
        self.revisions.insert(file.clone(), self.counter);
        self.slices.insert(file, tasks);
        self.initialized = true;
    }

    fn absorb_full_pass(&mut self, tasks: Vec<TaskRecord>, pass_started_at: u64) {
        let mut incoming: BTreeMap<String, Vec<TaskRecord>> = BTreeMap::new();
        for task in tasks {
            incoming.entry(task.file.clone()).or_default().push(task);
        }
        for (file, revision) in &self.revisions {
            if *revision > pass_started_at {
                if let Some(slice) = self.slices.get(file) {
                    log::debug!(
                        "[Indexer] Keeping incremental task slice for {} over full-pass result",
                        file
                    );
                    incoming.insert(file.clone(), slice.clone());
                }
            }
        }
        self.slices = incoming;
        self.initialized = true;
    }

    fn all(&self) -> Vec<TaskRecord> {
        self.slices.values().flatten().cloned().collect()
    }
}

struct Snapshot {
    state: IndexState,
    graph: Option<WikiGraph>,
    ledger: TaskLedger,
    plaintext_fallbacks: Vec<String>,
    /// Bumped on every start/stop; a result pump only applies results
    /// belonging to its own epoch, so a terminated pass is discarded.
    epoch: u64,
}

struct Shared {
    snapshot: Mutex<Snapshot>,
    subscribers: Mutex<Vec<Subscriber>>,
}

fn publish(shared: &Shared, event: &IndexEvent) {
    // Snapshot the list first; callbacks run without the lock held, so a
    // subscriber may itself call subscribe() from inside its callback
    let subscribers: Vec<Subscriber> = match shared.subscribers.lock() {
        Ok(guard) => guard.clone(),
        Err(_) => return,
    };
    for subscriber in &subscribers {
        subscriber(event);
    }
}

struct ActiveWorker {
    handle: WorkerHandle,
}

/// Owns the indexing lifecycle for one vault: worker spawn/terminate,
/// decrypt-on-read, snapshot state, cache persistence, and the query
/// surface. All state is per-instance; multiple vault sessions can
/// coexist in one process.
pub struct VaultIndexer {
    vault_root: PathBuf,
    cipher: Option<Arc<dyn VaultCipher>>,
    shared: Arc<Shared>,
    worker: Option<ActiveWorker>,
}

impl VaultIndexer {
    pub fn new(vault_root: impl Into<PathBuf>) -> Self {
        VaultIndexer {
            vault_root: vault_root.into(),
            cipher: None,
            shared: Arc::new(Shared {
                snapshot: Mutex::new(Snapshot {
                    state: IndexState::Idle,
                    graph: None,
                    ledger: TaskLedger::default(),
                    plaintext_fallbacks: Vec::new(),
                    epoch: 0,
                }),
                subscribers: Mutex::new(Vec::new()),
            }),
            worker: None,
        }
    }

    /// Enable at-rest decryption for this vault.
    pub fn with_cipher(vault_root: impl Into<PathBuf>, cipher: Arc<dyn VaultCipher>) -> Self {
        let mut indexer = Self::new(vault_root);
        indexer.cipher = Some(cipher);
        indexer
    }

    pub fn subscribe(&self, subscriber: impl Fn(&IndexEvent) + Send + Sync + 'static) {
        if let Ok(mut subscribers) = self.shared.subscribers.lock() {
            subscribers.push(Arc::new(subscriber));
        }
    }

    pub fn state(&self) -> IndexState {
        self.shared
            .snapshot
            .lock()
            .map(|s| s.state)
            .unwrap_or(IndexState::Idle)
    }

    pub fn get_graph(&self) -> Option<WikiGraph> {
        self.shared.snapshot.lock().ok()?.graph.clone()
    }

    pub fn get_tasks(&self) -> Option<Vec<TaskRecord>> {
        let snapshot = self.shared.snapshot.lock().ok()?;
        if snapshot.ledger.initialized {
            Some(snapshot.ledger.all())
        } else {
            None
        }
    }

    /// Files that fell back to plaintext during the last completed pass.
    pub fn plaintext_fallbacks(&self) -> Vec<String> {
        self.shared
            .snapshot
            .lock()
            .map(|s| s.plaintext_fallbacks.clone())
            .unwrap_or_default()
    }

    /// Graph snapshot persisted by a previous session, if any.
    pub fn load_cached_graph(&self) -> Option<WikiGraph> {
        cache::load_graph(&self.vault_root)
    }

    /// Run a full indexing pass.
    ///
    /// Terminates any prior worker (at most one pass is live), enumerates
    /// and reads the vault, decrypting each file as needed — a file whose
    /// decryption fails is indexed from its raw bytes and flagged, and an
    /// unreadable file is skipped; neither aborts the pass. Returns once
    /// the batch is dispatched; completion arrives via events.
    pub fn start_indexing(&mut self) -> Result<(), String> {
        self.stop();

        let documents = enumerate_documents(&self.vault_root)?;
        let mut docs: BTreeMap<String, String> = BTreeMap::new();
        let mut fallbacks: Vec<String> = Vec::new();
        for document in &documents {
            let raw = match fs::read(&document.path) {
                Ok(raw) => raw,
                Err(e) => {
                    log::warn!(
                        "[Indexer] Skipping unreadable file {}: {}",
                        document.doc_id,
                        e
                    );
                    continue;
                }
            };
            let decoded = decode_content(&document.doc_id, raw, self.cipher.as_deref());
            if decoded.fell_back_to_plaintext {
                fallbacks.push(document.doc_id.clone());
            }
            docs.insert(document.doc_id.clone(), decoded.text);
        }
        let known_ids: Vec<String> = docs.keys().cloned().collect();
        log::info!(
            "[Indexer] Dispatching full pass: {} documents, {} plaintext fallbacks",
            docs.len(),
            fallbacks.len()
        );

        let (pass_started_at, pass_epoch) = {
            let mut snapshot = self.shared.snapshot.lock().map_err(|e| e.to_string())?;
            snapshot.state = IndexState::Indexing;
            snapshot.epoch += 1;
            (snapshot.ledger.counter, snapshot.epoch)
        };
        publish(&self.shared, &IndexEvent::IndexingStarted);

        let (handle, reply_rx) = spawn_worker();
        handle
            .request_tx
            .send(WorkerRequest::StartIndex { docs, known_ids })
            .map_err(|_| "Failed to dispatch batch to indexing worker".to_string())?;

        let shared = Arc::clone(&self.shared);
        let vault_root = self.vault_root.clone();
        thread::spawn(move || {
            run_result_pump(shared, vault_root, reply_rx, pass_started_at, pass_epoch, fallbacks);
        });

        self.worker = Some(ActiveWorker { handle });
        Ok(())
    }

    /// Re-extract tasks for a single changed file and replace its slice of
    /// the ledger. Runs on the caller's thread; the graph is not patched
    /// per-file. A read failure is logged and leaves the prior slice
    /// untouched.
    pub fn update_tasks_for_file(&self, doc_id: &str) -> Result<(), String> {
        let path = self.vault_root.join(doc_id);
        let raw = fs::read(&path).map_err(|e| {
            let message = format!("Failed to read {}: {}", doc_id, e);
            log::warn!("[Indexer] Task update skipped: {}", message);
            message
        })?;
        let decoded = decode_content(doc_id, raw, self.cipher.as_deref());
        let tasks = extract_tasks(doc_id, &decoded.text);

        let all = {
            let mut snapshot = self.shared.snapshot.lock().map_err(|e| e.to_string())?;
            snapshot.ledger.replace_slice(doc_id.to_string(), tasks);
            snapshot.ledger.all()
        };
        publish(&self.shared, &IndexEvent::TasksUpdated(all));
        Ok(())
    }

    /// Delegate a query to the worker's search index. Returns an empty
    /// result set when no worker is live, the index is not built yet, or
    /// the worker does not answer in time; never an error.
    pub fn search(&self, query: &str) -> Vec<SearchResult> {
        let worker = match &self.worker {
            Some(active) => active,
            None => return Vec::new(),
        };
        let (reply_tx, reply_rx) = mpsc::channel();
        let request = WorkerRequest::SearchQuery {
            query: query.to_string(),
            reply: reply_tx,
        };
        if worker.handle.request_tx.send(request).is_err() {
            return Vec::new();
        }
        reply_rx.recv_timeout(SEARCH_TIMEOUT).unwrap_or_default()
    }

    /// Terminate the worker. Idempotent; a no-op when nothing is running.
    /// An in-flight pass is discarded: its epoch is invalidated, so a
    /// late-arriving result is dropped by the pump.
    pub fn stop(&mut self) {
        let active = match self.worker.take() {
            Some(active) => active,
            None => return,
        };
        let _ = active.handle.request_tx.send(WorkerRequest::Shutdown);
        if let Ok(mut snapshot) = self.shared.snapshot.lock() {
            snapshot.epoch += 1;
            if snapshot.state == IndexState::Indexing {
                snapshot.state = IndexState::Idle;
            }
        }
        // The worker drains its queue and exits; no join, so stop() never
        // blocks behind a long pass whose result is already condemned.
    }
}

impl Drop for VaultIndexer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Receives worker replies for one pass, applies them to the shared
/// snapshot, notifies subscribers, and kicks off cache persistence.
fn run_result_pump(
    shared: Arc<Shared>,
    vault_root: PathBuf,
    reply_rx: Receiver<WorkerReply>,
    pass_started_at: u64,
    pass_epoch: u64,
    fallbacks: Vec<String>,
) {
    let mut settled = false;
    while let Ok(reply) = reply_rx.recv() {
        match reply {
            WorkerReply::GraphComplete { graph, tasks, files } => {
                let all_tasks = {
                    let mut snapshot = match shared.snapshot.lock() {
                        Ok(s) => s,
                        Err(_) => return,
                    };
                    if snapshot.epoch != pass_epoch {
                        log::debug!("[Indexer] Discarding result of a terminated pass");
                        return;
                    }
                    snapshot.ledger.absorb_full_pass(tasks, pass_started_at);
                    snapshot.graph = Some(graph.clone());
                    snapshot.plaintext_fallbacks = fallbacks.clone();
                    snapshot.state = IndexState::Ready;
                    snapshot.ledger.all()
                };

                publish(&shared, &IndexEvent::GraphUpdated(graph.clone()));
                publish(&shared, &IndexEvent::TasksUpdated(all_tasks));
                publish(
                    &shared,
                    &IndexEvent::IndexingComplete {
                        files,
                        plaintext_fallbacks: fallbacks.clone(),
                    },
                );
                settled = true;

                // Fire-and-forget: subscribers already hold the new snapshot,
                // and a write failure never rolls it back
                let root = vault_root.clone();
                thread::spawn(move || {
                    if let Err(e) = cache::save_graph(&root, &graph) {
                        log::error!("[Indexer] Failed to persist graph cache: {}", e);
                    }
                });
            }
            WorkerReply::Error { message } => {
                {
                    let mut snapshot = match shared.snapshot.lock() {
                        Ok(s) => s,
                        Err(_) => return,
                    };
                    if snapshot.epoch != pass_epoch {
                        return;
                    }
                    snapshot.state = IndexState::Idle;
                }
                log::error!("[Indexer] Worker reported failure: {}", message);
                publish(&shared, &IndexEvent::IndexingError(message));
                settled = true;
            }
        }
    }

    // Channel disconnected. If the pass never settled, the worker died
    // mid-flight: surface it and fall back to idle. No automatic retry.
    if !settled {
        let crashed = {
            let mut snapshot = match shared.snapshot.lock() {
                Ok(s) => s,
                Err(_) => return,
            };
            if snapshot.epoch == pass_epoch && snapshot.state == IndexState::Indexing {
                snapshot.state = IndexState::Idle;
                true
            } else {
                false
            }
        };
        if crashed {
            publish(
                &shared,
                &IndexEvent::IndexingError("Indexing worker exited unexpectedly".to_string()),
            );
        }
    }
}
