//! Transaction checks that do not need account state.

use sc_03_pos_rules::{check_fee, ProtocolParams};
use shared_types::{ChainReader, Hash, Transaction};

use crate::domain::errors::RejectReason;

/// Size limit and fee floor.
pub fn check_standalone(tx: &Transaction, params: &ProtocolParams) -> Result<(), RejectReason> {
    let size = tx.encoded_size() as u64;
    if size > params.max_tx_size as u64 {
        return Err(RejectReason::Oversized {
            size,
            max: params.max_tx_size as u64,
        });
    }
    if !check_fee(size, tx.fee(), params.min_fee_rate) {
        return Err(RejectReason::FeeBelowFloor {
            fee: tx.fee(),
            size,
        });
    }
    Ok(())
}

/// The transaction's reference hash must be `tip` or one of its recent
/// ancestors within `anchor_window` blocks.
pub fn check_anchor(
    chain: &dyn ChainReader,
    tip: &Hash,
    tx: &Transaction,
    params: &ProtocolParams,
) -> Result<(), RejectReason> {
    if chain.is_recent_ancestor(tip, &tx.body.reference, params.anchor_window as usize) {
        Ok(())
    } else {
        Err(RejectReason::BadAnchor)
    }
}
