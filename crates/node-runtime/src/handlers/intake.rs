//! # Intake Handler
//!
//! Bounded queue between the network layer and the chain manager.
//!
//! ## Flow
//!
//! 1. Peers' blocks and transactions enter through `IntakeHandle`
//! 2. The intake loop takes a worker permit per item
//! 3. The item runs on the blocking pool (`spawn_blocking`), so signature
//!    checks and transaction replay never stall the async runtime
//! 4. The outcome goes back to the submitter, if it asked for one
//!
//! A full queue refuses new items instead of buffering without bound.

use std::sync::Arc;

use sc_06_txpool::Admission;
use shared_types::{Block, Transaction};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::container::{BlockOutcome, ChainManager, NodeError};

/// An object delivered by the network layer.
#[derive(Debug, Clone)]
pub enum Inbound {
    Block(Block),
    Transaction(Transaction),
}

/// Per-object verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntakeOutcome {
    Block(Result<BlockOutcome, NodeError>),
    Transaction(Result<Admission, NodeError>),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntakeError {
    #[error("intake queue full")]
    QueueFull,

    #[error("intake loop stopped")]
    Closed,
}

struct IntakeRequest {
    item: Inbound,
    reply: Option<oneshot::Sender<IntakeOutcome>>,
}

/// Cloneable submit side of the intake queue.
#[derive(Clone)]
pub struct IntakeHandle {
    sender: mpsc::Sender<IntakeRequest>,
}

impl IntakeHandle {
    /// Queue `item` and wait for its outcome.
    pub async fn submit(&self, item: Inbound) -> Result<IntakeOutcome, IntakeError> {
        let (reply, outcome) = oneshot::channel();
        self.sender
            .send(IntakeRequest {
                item,
                reply: Some(reply),
            })
            .await
            .map_err(|_| IntakeError::Closed)?;
        outcome.await.map_err(|_| IntakeError::Closed)
    }

    /// Queue `item` without waiting; refuses when the queue is full.
    pub fn try_enqueue(&self, item: Inbound) -> Result<(), IntakeError> {
        self.sender
            .try_send(IntakeRequest { item, reply: None })
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => IntakeError::QueueFull,
                mpsc::error::TrySendError::Closed(_) => IntakeError::Closed,
            })
    }
}

/// Start the intake loop. It runs until every `IntakeHandle` is dropped,
/// then waits for in-flight items before returning.
pub fn spawn_intake(
    manager: Arc<ChainManager>,
    capacity: usize,
    workers: usize,
) -> (IntakeHandle, JoinHandle<()>) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    let task = tokio::spawn(run_intake(manager, receiver, workers.max(1)));
    (IntakeHandle { sender }, task)
}

async fn run_intake(
    manager: Arc<ChainManager>,
    mut receiver: mpsc::Receiver<IntakeRequest>,
    workers: usize,
) {
    info!("[intake] Started with {} workers", workers);
    let permits = Arc::new(Semaphore::new(workers));

    while let Some(request) = receiver.recv().await {
        let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
            break;
        };
        let manager = Arc::clone(&manager);
        tokio::spawn(async move {
            let IntakeRequest { item, reply } = request;
            let outcome = tokio::task::spawn_blocking(move || process(&manager, item)).await;
            drop(permit);
            match (outcome, reply) {
                (Ok(outcome), Some(reply)) => {
                    let _ = reply.send(outcome);
                }
                (Ok(_), None) => {}
                (Err(err), _) => warn!("[intake] Worker failed: {}", err),
            }
        });
    }

    // Wait for in-flight items.
    let _ = permits.acquire_many(workers as u32).await;
    info!("[intake] Stopped");
}

fn process(manager: &ChainManager, item: Inbound) -> IntakeOutcome {
    match item {
        Inbound::Block(block) => {
            let hash = block.hash();
            let outcome = manager.submit_block(block);
            if let Err(err) = &outcome {
                debug!(
                    "[intake] Block {} rejected ({}): {}",
                    shared_types::short_hex(&hash),
                    shared_types::Classify::class(err),
                    err
                );
            }
            IntakeOutcome::Block(outcome)
        }
        Inbound::Transaction(tx) => IntakeOutcome::Transaction(manager.submit_transaction(tx)),
    }
}
