use std::collections::BTreeMap;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use rayon::prelude::*;

use crate::graph::{build_graph, WikiGraph};
use crate::search::{SearchIndex, SearchResult};
use crate::tasks::{extract_tasks, TaskRecord};

/// Inbound messages to the indexing worker.
pub enum WorkerRequest {
    /// One full batch of decrypted document bodies plus the id universe.
    StartIndex {
        docs: BTreeMap<String, String>,
        known_ids: Vec<String>,
    },
    SearchQuery {
        query: String,
        reply: Sender<Vec<SearchResult>>,
    },
    Shutdown,
}

/// Outbound messages from the worker to the orchestrator.
pub enum WorkerReply {
    GraphComplete {
        graph: WikiGraph,
        tasks: Vec<TaskRecord>,
        files: usize,
    },
    Error {
        message: String,
    },
}

pub struct WorkerHandle {
    pub request_tx: Sender<WorkerRequest>,
    pub join: JoinHandle<()>,
}

/// Spawn the indexing worker thread.
///
/// The worker owns no host state; it receives document bodies, produces
/// `{graph, tasks}` plus an in-RAM search index, and then keeps serving
/// search queries until shut down or its channel is dropped.
pub fn spawn_worker() -> (WorkerHandle, Receiver<WorkerReply>) {
    let (request_tx, request_rx) = mpsc::channel::<WorkerRequest>();
    let (reply_tx, reply_rx) = mpsc::channel::<WorkerReply>();

    let join = thread::spawn(move || {
        let mut search_index: Option<SearchIndex> = None;

        while let Ok(request) = request_rx.recv() {
            match request {
                WorkerRequest::StartIndex { docs, known_ids } => {
                    let files = docs.len();
                    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                        let graph = build_graph(&docs, Some(&known_ids));

                        let mut tasks: Vec<TaskRecord> = docs
                            .par_iter()
                            .flat_map(|(doc_id, body)| extract_tasks(doc_id, body))
                            .collect();
                        // par_iter gives no ordering guarantee across files
                        tasks.sort_by(|a, b| a.file.cmp(&b.file).then(a.line.cmp(&b.line)));

                        let index = match SearchIndex::build(&docs) {
                            Ok(index) => Some(index),
                            Err(e) => {
                                log::error!("[Worker] Failed to build search index: {}", e);
                                None
                            }
                        };
                        (graph, tasks, index)
                    }));

                    let reply = match outcome {
                        Ok((graph, tasks, index)) => {
                            search_index = index;
                            WorkerReply::GraphComplete { graph, tasks, files }
                        }
                        Err(_) => WorkerReply::Error {
                            message: "indexing worker panicked during full pass".to_string(),
                        },
                    };
                    if reply_tx.send(reply).is_err() {
                        break;
                    }
                }
                WorkerRequest::SearchQuery { query, reply } => {
                    let results = match search_index.as_ref() {
                        Some(index) => index.search(&query).unwrap_or_else(|e| {
                            log::warn!("[Worker] Search failed for {:?}: {}", query, e);
                            Vec::new()
                        }),
                        None => Vec::new(),
                    };
                    // Requester may have timed out and gone away
                    let _ = reply.send(results);
                }
                WorkerRequest::Shutdown => break,
            }
        }
        log::debug!("[Worker] Indexing worker exiting");
    });

    (WorkerHandle { request_tx, join }, reply_rx)
}
