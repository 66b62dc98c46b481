//! # Core Domain Entities
//!
//! ## Clusters
//!
//! - **Transactions**: `TxBody`, `TxPayload`, `Transaction`
//! - **Blocks**: `BlockHeader`, `Block`
//!
//! Identity hashes are computed by feeding fields into SHA-256 in declaration
//! order with fixed-width big-endian integers. Ids leave signatures out;
//! witness hashes (`Transaction::witness_hash`, `Block::witness_hash`) cover
//! the signatures too and name the exact bytes received.

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use shared_crypto::{verify_signature, Ed25519KeyPair, Sha256Hasher};

use crate::codec::encoded_len;

// =============================================================================
// PRIMITIVES
// =============================================================================

/// A 32-byte SHA-256 hash.
pub type Hash = [u8; 32];

/// A 64-byte Ed25519 signature.
pub type Signature = [u8; 64];

/// A 32-byte Ed25519 public key. Also the account key.
pub type PublicKey = [u8; 32];

/// Token amount. Arithmetic on amounts is always checked.
pub type Amount = u64;

/// Block height. Genesis is height 0.
pub type Height = u64;

/// Per-block difficulty.
pub type Difficulty = u64;

/// Running sum of difficulty along a chain.
pub type CumulativeDifficulty = u128;

/// The all-zero hash. Parent of genesis and content root of an empty block.
pub const ZERO_HASH: Hash = [0u8; 32];

/// Current block header version.
pub const BLOCK_VERSION: u16 = 1;

// =============================================================================
// TRANSACTIONS
// =============================================================================

/// Typed transaction payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxPayload {
    /// Move `amount` from sender to `to`.
    Transfer {
        /// Recipient account.
        to: PublicKey,
        /// Amount moved.
        amount: Amount,
    },
    /// Lock `amount` of balance as stake.
    Stake {
        /// Amount staked.
        amount: Amount,
    },
    /// Return `amount` of matured stake to balance.
    Unstake {
        /// Amount unstaked.
        amount: Amount,
    },
    /// Create a contract account holding `code`, funded with `endowment`.
    ContractCreate {
        /// Contract code, opaque to the core.
        code: Vec<u8>,
        /// Initial contract balance.
        endowment: Amount,
    },
    /// Call an existing contract, moving `amount` into it.
    ContractCall {
        /// Contract account.
        contract: PublicKey,
        /// Value transferred with the call.
        amount: Amount,
        /// Call data, opaque to the core.
        input: Vec<u8>,
    },
}

impl TxPayload {
    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            TxPayload::Transfer { .. } => "transfer",
            TxPayload::Stake { .. } => "stake",
            TxPayload::Unstake { .. } => "unstake",
            TxPayload::ContractCreate { .. } => "contract_create",
            TxPayload::ContractCall { .. } => "contract_call",
        }
    }

    /// Amount debited from the sender's spendable balance, excluding the fee.
    pub fn debit(&self) -> Amount {
        match self {
            TxPayload::Transfer { amount, .. }
            | TxPayload::Stake { amount }
            | TxPayload::ContractCall { amount, .. } => *amount,
            TxPayload::ContractCreate { endowment, .. } => *endowment,
            TxPayload::Unstake { .. } => 0,
        }
    }

    fn tag(&self) -> u8 {
        match self {
            TxPayload::Transfer { .. } => 0,
            TxPayload::Stake { .. } => 1,
            TxPayload::Unstake { .. } => 2,
            TxPayload::ContractCreate { .. } => 3,
            TxPayload::ContractCall { .. } => 4,
        }
    }

    fn feed(&self, hasher: &mut Sha256Hasher) {
        hasher.update(&[self.tag()]);
        match self {
            TxPayload::Transfer { to, amount } => {
                hasher.update(to).update(&amount.to_be_bytes());
            }
            TxPayload::Stake { amount } | TxPayload::Unstake { amount } => {
                hasher.update(&amount.to_be_bytes());
            }
            TxPayload::ContractCreate { code, endowment } => {
                hasher
                    .update(&(code.len() as u64).to_be_bytes())
                    .update(code)
                    .update(&endowment.to_be_bytes());
            }
            TxPayload::ContractCall {
                contract,
                amount,
                input,
            } => {
                hasher
                    .update(contract)
                    .update(&amount.to_be_bytes())
                    .update(&(input.len() as u64).to_be_bytes())
                    .update(input);
            }
        }
    }
}

/// The signed portion of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxBody {
    /// Sender account. Also the signing key.
    pub sender: PublicKey,
    /// Must equal the sender's current sequence + 1.
    pub sequence: u64,
    /// Hash of a recent block on the chain this transaction targets.
    pub reference: Hash,
    /// Fee paid to the block proposer.
    pub fee: Amount,
    /// What the transaction does.
    pub payload: TxPayload,
}

impl TxBody {
    /// Canonical hash of the body. This is the transaction id.
    pub fn hash(&self) -> Hash {
        let mut hasher = Sha256Hasher::new();
        hasher
            .update(b"sc-tx")
            .update(&self.sender)
            .update(&self.sequence.to_be_bytes())
            .update(&self.reference)
            .update(&self.fee.to_be_bytes());
        self.payload.feed(&mut hasher);
        hasher.finalize()
    }
}

/// A signed transaction. Immutable once constructed.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Signed content.
    pub body: TxBody,
    /// Ed25519 signature by `body.sender` over `body.hash()`.
    #[serde_as(as = "Bytes")]
    pub signature: Signature,
}

impl Transaction {
    /// Sign `body` with `keypair`.
    pub fn sign(body: TxBody, keypair: &Ed25519KeyPair) -> Self {
        let signature = keypair.sign(&body.hash()).to_bytes();
        Self { body, signature }
    }

    /// Transaction id.
    pub fn hash(&self) -> Hash {
        self.body.hash()
    }

    /// Sender account.
    pub fn sender(&self) -> &PublicKey {
        &self.body.sender
    }

    /// Sender sequence number.
    pub fn sequence(&self) -> u64 {
        self.body.sequence
    }

    /// Fee offered.
    pub fn fee(&self) -> Amount {
        self.body.fee
    }

    /// Id plus signature. Two copies differing only in signature differ here.
    pub fn witness_hash(&self) -> Hash {
        let mut hasher = Sha256Hasher::new();
        hasher
            .update(b"sc-tx-witness")
            .update(&self.hash())
            .update(&self.signature);
        hasher.finalize()
    }

    /// Whether the signature verifies against the sender key.
    pub fn verify_signature(&self) -> bool {
        verify_signature(&self.body.sender, &self.body.hash(), &self.signature).is_ok()
    }

    /// Canonical encoded size in bytes. Used for fee rate and block size.
    pub fn encoded_size(&self) -> usize {
        encoded_len(self)
    }
}

// =============================================================================
// BLOCKS
// =============================================================================

/// Block header.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Protocol version.
    pub version: u16,
    /// Hash of the parent block.
    pub parent_hash: Hash,
    /// Unix timestamp in seconds.
    pub timestamp: u64,
    /// Proposer key. Signs the header.
    pub proposer: PublicKey,
    /// Hash over the ordered transaction witness hashes.
    pub content_root: Hash,
    /// Proposer signature over `hash()`.
    #[serde_as(as = "Bytes")]
    pub signature: Signature,
}

impl BlockHeader {
    /// Canonical header hash, signature excluded. This is the block id.
    pub fn hash(&self) -> Hash {
        let mut hasher = Sha256Hasher::new();
        hasher
            .update(b"sc-block")
            .update(&self.version.to_be_bytes())
            .update(&self.parent_hash)
            .update(&self.timestamp.to_be_bytes())
            .update(&self.proposer)
            .update(&self.content_root);
        hasher.finalize()
    }

    /// Whether the proposer signature verifies.
    pub fn verify_signature(&self) -> bool {
        verify_signature(&self.proposer, &self.hash(), &self.signature).is_ok()
    }
}

/// A block: header plus ordered transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Header.
    pub header: BlockHeader,
    /// Transactions, applied in list order.
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Build and sign a block on top of `parent_hash`.
    pub fn propose(
        parent_hash: Hash,
        timestamp: u64,
        transactions: Vec<Transaction>,
        keypair: &Ed25519KeyPair,
    ) -> Self {
        let mut header = BlockHeader {
            version: BLOCK_VERSION,
            parent_hash,
            timestamp,
            proposer: *keypair.public_key().as_bytes(),
            content_root: content_root(&transactions),
            signature: [0u8; 64],
        };
        header.signature = keypair.sign(&header.hash()).to_bytes();
        Self {
            header,
            transactions,
        }
    }

    /// Unsigned genesis block.
    pub fn genesis(timestamp: u64) -> Self {
        Self {
            header: BlockHeader {
                version: BLOCK_VERSION,
                parent_hash: ZERO_HASH,
                timestamp,
                proposer: [0u8; 32],
                content_root: ZERO_HASH,
                signature: [0u8; 64],
            },
            transactions: Vec::new(),
        }
    }

    /// Block id.
    pub fn hash(&self) -> Hash {
        self.header.hash()
    }

    /// Block id, header signature and the root of the transactions actually
    /// carried, which covers their signatures. Names the exact block bytes.
    pub fn witness_hash(&self) -> Hash {
        let mut hasher = Sha256Hasher::new();
        hasher
            .update(b"sc-block-witness")
            .update(&self.hash())
            .update(&self.header.signature)
            .update(&content_root(&self.transactions));
        hasher.finalize()
    }

    /// Whether this is a genesis block (zero parent).
    pub fn is_genesis(&self) -> bool {
        self.header.parent_hash == ZERO_HASH
    }

    /// Canonical encoded size in bytes.
    pub fn encoded_size(&self) -> usize {
        encoded_len(self)
    }
}

/// Content root over an ordered transaction list.
pub fn content_root(transactions: &[Transaction]) -> Hash {
    if transactions.is_empty() {
        return ZERO_HASH;
    }
    let mut hasher = Sha256Hasher::new();
    for tx in transactions {
        hasher.update(&tx.witness_hash());
    }
    hasher.finalize()
}
