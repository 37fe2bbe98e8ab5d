//! Background owner for a [`Ledger`].
//!
//! One tokio task holds the ledger and is the only writer. Appends are queued
//! over a channel and mined one at a time on the blocking pool, so only a
//! single candidate is ever in flight. After each commit the task publishes
//! an immutable copy of the chain; readers clone an `Arc` of that copy and
//! never observe a block changing under them.

use crate::block::to_payload;
use crate::error::{LedgerError, Result};
use crate::hash::{BlockHasher, Sha256Hasher};
use crate::pow::CancelToken;
use crate::validate::ChainValidator;
use crate::{Block, Ledger};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

const REQUEST_QUEUE: usize = 64;

enum Command {
    Append {
        payload: Value,
        cancel: CancelToken,
        reply: oneshot::Sender<Result<Block>>,
    },
    Shutdown,
}

pub struct LedgerService<H: BlockHasher = Sha256Hasher> {
    handle: LedgerHandle<H>,
    task: JoinHandle<Ledger<H>>,
}

impl<H: BlockHasher + 'static> LedgerService<H> {
    /// Move `ledger` into a background task. Must be called inside a tokio
    /// runtime.
    pub fn spawn(ledger: Ledger<H>) -> Self {
        let (requests, inbox) = mpsc::channel(REQUEST_QUEUE);
        let (publish, view) = watch::channel(Arc::new(ledger.snapshot()));
        let shutdown = CancelToken::new();

        let handle = LedgerHandle {
            requests,
            view,
            shutdown: shutdown.clone(),
            hasher: Arc::clone(ledger.hasher()),
            difficulty: ledger.difficulty(),
        };
        let task = tokio::spawn(run(ledger, inbox, publish, shutdown));
        Self { handle, task }
    }

    pub fn handle(&self) -> LedgerHandle<H> {
        self.handle.clone()
    }

    /// Cancel any in-flight search, stop accepting appends and hand the
    /// ledger back. Queued appends fail with [`LedgerError::ServiceClosed`].
    pub async fn shutdown(self) -> Result<Ledger<H>> {
        self.handle.shutdown.cancel();
        // The task may already be gone if every handle was dropped.
        let _ = self.handle.requests.send(Command::Shutdown).await;
        drop(self.handle);
        self.task
            .await
            .map_err(|e| LedgerError::MinerFailed(e.to_string()))
    }
}

async fn run<H: BlockHasher + 'static>(
    mut ledger: Ledger<H>,
    mut inbox: mpsc::Receiver<Command>,
    publish: watch::Sender<Arc<Vec<Block>>>,
    shutdown: CancelToken,
) -> Ledger<H> {
    while let Some(command) = inbox.recv().await {
        let (payload, cancel, reply) = match command {
            Command::Append {
                payload,
                cancel,
                reply,
            } => (payload, cancel, reply),
            Command::Shutdown => break,
        };
        if shutdown.is_cancelled() {
            let _ = reply.send(Err(LedgerError::ServiceClosed));
            continue;
        }
        // Shutdown must stop the search whatever token the caller supplied.
        let result = append_one(&mut ledger, payload, cancel.joined(&shutdown)).await;
        if result.is_ok() {
            publish.send_replace(Arc::new(ledger.snapshot()));
        }
        // The caller may have stopped waiting; the block stays committed.
        let _ = reply.send(result);
    }
    info!("ledger service stopped at height {}", ledger.len() - 1);
    ledger
}

async fn append_one<H: BlockHasher + 'static>(
    ledger: &mut Ledger<H>,
    payload: Value,
    cancel: CancelToken,
) -> Result<Block> {
    let candidate = ledger.prepare(&payload)?;
    let miner = ledger.miner();
    debug!("mining block {} off the runtime", candidate.index);
    let sealed = tokio::task::spawn_blocking(move || miner.seal(candidate, &cancel))
        .await
        .map_err(|e| LedgerError::MinerFailed(e.to_string()))??;
    ledger.commit(sealed)
}

/// Cheap, cloneable access to a running [`LedgerService`].
pub struct LedgerHandle<H: BlockHasher = Sha256Hasher> {
    requests: mpsc::Sender<Command>,
    view: watch::Receiver<Arc<Vec<Block>>>,
    shutdown: CancelToken,
    hasher: Arc<H>,
    difficulty: u32,
}

impl<H: BlockHasher> Clone for LedgerHandle<H> {
    fn clone(&self) -> Self {
        Self {
            requests: self.requests.clone(),
            view: self.view.clone(),
            shutdown: self.shutdown.clone(),
            hasher: Arc::clone(&self.hasher),
            difficulty: self.difficulty,
        }
    }
}

impl<H: BlockHasher> LedgerHandle<H> {
    /// A token for [`LedgerHandle::append_with_cancel`]. It also fires when
    /// the service shuts down.
    pub fn cancel_token(&self) -> CancelToken {
        self.shutdown.child()
    }

    pub async fn append<P: Serialize + ?Sized>(&self, payload: &P) -> Result<Block> {
        self.append_with_cancel(payload, self.cancel_token()).await
    }

    /// Queue an append. Cancelling `cancel` before the block is committed
    /// abandons it and the chain keeps its previous length. Shutting the
    /// service down cancels the search as well.
    pub async fn append_with_cancel<P: Serialize + ?Sized>(
        &self,
        payload: &P,
        cancel: CancelToken,
    ) -> Result<Block> {
        let payload = to_payload(payload)?;
        let (reply, response) = oneshot::channel();
        self.requests
            .send(Command::Append {
                payload,
                cancel,
                reply,
            })
            .await
            .map_err(|_| LedgerError::ServiceClosed)?;
        response.await.map_err(|_| LedgerError::ServiceClosed)?
    }

    /// The latest published chain. Later commits never modify it.
    pub fn view(&self) -> Arc<Vec<Block>> {
        Arc::clone(&*self.view.borrow())
    }

    pub fn snapshot(&self) -> Vec<Block> {
        (*self.view()).clone()
    }

    pub fn head(&self) -> Result<Block> {
        self.view().last().cloned().ok_or(LedgerError::EmptyChain)
    }

    pub fn len(&self) -> usize {
        self.view().len()
    }

    pub fn is_empty(&self) -> bool {
        self.view().is_empty()
    }

    pub fn find_by_hash(&self, hash: &str) -> Option<Block> {
        self.view().iter().find(|b| b.hash == hash).cloned()
    }

    pub fn verify_record(&self, hash: &str) -> bool {
        self.view().iter().any(|b| b.hash == hash)
    }

    pub fn is_valid(&self) -> bool {
        ChainValidator::new(&*self.hasher)
            .with_difficulty(self.difficulty)
            .is_valid(&self.view())
    }

    /// Wait until a commit after the last observed one is published.
    pub async fn changed(&mut self) -> Result<()> {
        self.view
            .changed()
            .await
            .map_err(|_| LedgerError::ServiceClosed)
    }
}
