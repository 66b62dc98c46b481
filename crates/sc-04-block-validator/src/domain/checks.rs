//! # Stage Checks
//!
//! One function per transition. Each is pure: inputs in, verdict out.

use sc_02_ledger::{check_standalone, RejectReason, StateDelta};
use sc_03_pos_rules::{kernel_hash, max_block_size, next_difficulty, EligibilityRule, ProtocolParams};
use shared_types::{content_root, Block, BlockIndexEntry, Difficulty, Hash, BLOCK_VERSION};

use crate::domain::context::BlockContext;
use crate::domain::errors::ValidationError;

/// `Received -> HeaderChecked`.
pub fn check_header(
    block: &Block,
    parent: &BlockIndexEntry,
    now: u64,
    params: &ProtocolParams,
) -> Result<(), ValidationError> {
    let header = &block.header;
    if block.is_genesis() {
        return Err(ValidationError::UnexpectedGenesis);
    }
    if header.version != BLOCK_VERSION {
        return Err(ValidationError::UnsupportedVersion(header.version));
    }
    if header.parent_hash != parent.hash {
        return Err(ValidationError::UnknownParent(header.parent_hash));
    }
    if header.timestamp <= parent.timestamp {
        return Err(ValidationError::TimestampNotAfterParent {
            timestamp: header.timestamp,
            parent: parent.timestamp,
        });
    }
    if header.timestamp > now.saturating_add(params.max_future_drift_secs) {
        return Err(ValidationError::TimestampInFuture {
            timestamp: header.timestamp,
            now,
            max_drift: params.max_future_drift_secs,
        });
    }
    if header.content_root != content_root(&block.transactions) {
        return Err(ValidationError::ContentRootMismatch);
    }
    if !header.verify_signature() {
        return Err(ValidationError::BadBlockSignature);
    }
    Ok(())
}

/// Difficulty the child of the context's parent must meet.
pub fn block_difficulty(ctx: &BlockContext, params: &ProtocolParams) -> Difficulty {
    next_difficulty(&ctx.difficulty_samples(params.difficulty_window), params)
}

/// `HeaderChecked -> EligibilityChecked`. Stake weight comes from the parent
/// state, never from the block itself.
pub fn check_eligibility(
    block: &Block,
    ctx: &BlockContext,
    difficulty: Difficulty,
    rule: &dyn EligibilityRule,
) -> Result<(), ValidationError> {
    let header = &block.header;
    let stake_weight = ctx.parent_view().stake_weight(&header.proposer, ctx.height());
    let kernel = kernel_hash(&header.parent_hash, &header.proposer, header.timestamp);
    if rule.is_eligible(
        stake_weight,
        header.timestamp,
        ctx.parent().timestamp,
        difficulty,
        &kernel,
    ) {
        Ok(())
    } else {
        Err(ValidationError::NotEligible {
            stake_weight,
            difficulty,
        })
    }
}

/// `EligibilityChecked -> TransactionsApplied`. All transactions apply in
/// order or the block is rejected; the parent view is never written.
pub fn apply_transactions(
    block: &Block,
    block_hash: Hash,
    ctx: &BlockContext,
    params: &ProtocolParams,
) -> Result<StateDelta, ValidationError> {
    let size = block.encoded_size() as u64;
    let max = max_block_size(&ctx.recent_sizes(params.block_size_window), params);
    if size > max {
        return Err(ValidationError::BlockTooLarge { size, max });
    }

    let mut pending = ctx.parent_view().begin(params);
    for (index, tx) in block.transactions.iter().enumerate() {
        let rejected = |reason: RejectReason| ValidationError::Transaction {
            index,
            tx_hash: tx.hash(),
            reason,
        };
        check_standalone(tx, params).map_err(rejected)?;
        if !ctx.is_anchor(&tx.body.reference, params.anchor_window as usize) {
            return Err(rejected(RejectReason::BadAnchor));
        }
        pending.apply_transaction(tx).into_result().map_err(rejected)?;
    }

    pending
        .finish(block_hash, &block.header.proposer)
        .map_err(|_| ValidationError::RewardOverflow)
}
