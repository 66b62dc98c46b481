//! # Block Validator Service
//!
//! Drives a block through the validation stages and remembers structural
//! rejections so the same bytes are never validated twice.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;
use sc_02_ledger::Ledger;
use sc_03_pos_rules::{EligibilityRule, KernelRule, ProtocolParams};
use shared_types::{short_hex, Block, BlockIndexEntry, BlockStatus, ChainReader, Classify, ErrorClass, Hash};
use tracing::{debug, trace};

use crate::domain::checks::{apply_transactions, block_difficulty, check_eligibility, check_header};
use crate::domain::context::{BlockContext, ValidatedBlock};
use crate::domain::errors::ValidationError;
use crate::domain::stage::ValidationStage;
use crate::ports::outbound::{SystemTimeSource, TimeSource};

/// Validator configuration.
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    /// Structural rejections remembered by witness hash.
    pub reject_cache_size: usize,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            reject_cache_size: 4096,
        }
    }
}

/// Block validation state machine.
///
/// Holds no chain or ledger state: callers capture a [`BlockContext`] and
/// validation runs against that snapshot.
pub struct BlockValidator {
    params: ProtocolParams,
    rule: Arc<dyn EligibilityRule>,
    clock: Arc<dyn TimeSource>,
    rejected: Mutex<LruCache<Hash, ValidationError>>,
}

impl BlockValidator {
    /// Validator with the kernel eligibility rule and the system clock.
    pub fn new(params: ProtocolParams, config: ValidatorConfig) -> Self {
        let capacity = NonZeroUsize::new(config.reject_cache_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            params,
            rule: Arc::new(KernelRule),
            clock: Arc::new(SystemTimeSource),
            rejected: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Replace the eligibility rule.
    pub fn with_rule(mut self, rule: Arc<dyn EligibilityRule>) -> Self {
        self.rule = rule;
        self
    }

    /// Replace the clock.
    pub fn with_clock(mut self, clock: Arc<dyn TimeSource>) -> Self {
        self.clock = clock;
        self
    }

    pub fn params(&self) -> &ProtocolParams {
        &self.params
    }

    /// Cached structural rejection for the exact bytes of `block`.
    pub fn cached_rejection(&self, block: &Block) -> Option<ValidationError> {
        self.rejected.lock().get(&block.witness_hash()).cloned()
    }

    /// Number of remembered rejections.
    pub fn rejected_count(&self) -> usize {
        self.rejected.lock().len()
    }

    /// Capture the context from `chain` and `ledger`, then validate.
    pub fn validate(
        &self,
        block: &Block,
        chain: &dyn ChainReader,
        ledger: &Ledger,
    ) -> Result<ValidatedBlock, ValidationError> {
        if let Some(err) = self.cached_rejection(block) {
            return Err(err);
        }
        if block.is_genesis() {
            return Err(self.reject(
                block,
                ValidationStage::Received,
                ValidationError::UnexpectedGenesis,
            ));
        }
        let ctx = BlockContext::gather(chain, ledger, &block.header.parent_hash, &self.params)?;
        self.validate_in_context(block, &ctx)
    }

    /// Validate against an already captured context.
    pub fn validate_in_context(
        &self,
        block: &Block,
        ctx: &BlockContext,
    ) -> Result<ValidatedBlock, ValidationError> {
        let hash = block.hash();
        if let Some(err) = self.cached_rejection(block) {
            return Err(err);
        }
        let mut stage = ValidationStage::Received;
        match self.run(block, hash, ctx, &mut stage) {
            Ok(validated) => {
                advance(&mut stage, ValidationStage::Accepted, &hash);
                debug!(
                    "[sc-04] Block {} accepted at height {} ({} txs, difficulty {})",
                    short_hex(&hash),
                    validated.height(),
                    block.transactions.len(),
                    validated.difficulty()
                );
                Ok(validated)
            }
            Err(err) => Err(self.reject(block, stage, err)),
        }
    }

    fn run(
        &self,
        block: &Block,
        hash: Hash,
        ctx: &BlockContext,
        stage: &mut ValidationStage,
    ) -> Result<ValidatedBlock, ValidationError> {
        check_header(block, ctx.parent(), self.clock.now(), &self.params)?;
        advance(stage, ValidationStage::HeaderChecked, &hash);

        let difficulty = block_difficulty(ctx, &self.params);
        check_eligibility(block, ctx, difficulty, self.rule.as_ref())?;
        advance(stage, ValidationStage::EligibilityChecked, &hash);

        let delta = apply_transactions(block, hash, ctx, &self.params)?;
        advance(stage, ValidationStage::TransactionsApplied, &hash);

        let parent = ctx.parent();
        let entry = BlockIndexEntry {
            hash,
            height: ctx.height(),
            cumulative_difficulty: parent
                .cumulative_difficulty
                .saturating_add(difficulty as u128),
            difficulty,
            parent_hash: parent.hash,
            timestamp: block.header.timestamp,
            size: block.encoded_size() as u64,
            proposer: block.header.proposer,
            status: BlockStatus::Disconnected,
        };
        Ok(ValidatedBlock {
            block: block.clone(),
            entry,
            delta,
        })
    }

    fn reject(&self, block: &Block, stage: ValidationStage, err: ValidationError) -> ValidationError {
        let class = err.class();
        debug!(
            "[sc-04] Block {} rejected after {} ({}): {}",
            short_hex(&block.hash()),
            stage,
            class,
            err
        );
        if class == ErrorClass::Permanent {
            self.rejected.lock().put(block.witness_hash(), err.clone());
        }
        err
    }
}

fn advance(stage: &mut ValidationStage, next: ValidationStage, hash: &Hash) {
    debug_assert!(stage.can_transition_to(next));
    trace!("[sc-04] Block {}: {} -> {}", short_hex(hash), stage, next);
    *stage = next;
}
