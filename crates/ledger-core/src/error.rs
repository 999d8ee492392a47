use thiserror::Error;

pub type Result<T> = std::result::Result<T, LedgerError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("node list must not be empty")]
    EmptyNodeList,

    #[error("invalid node address `{0}`")]
    InvalidAddress(String),

    #[error("difficulty {0} exceeds the digest length")]
    DifficultyTooHigh(usize),

    #[error("chain is empty")]
    EmptyChain,

    #[error("block {index}: previous_hash does not match the hash of its predecessor")]
    BrokenLink { index: u64 },

    #[error("block {index}: proof {proof} does not satisfy the work predicate")]
    InvalidProof { index: u64, proof: u64 },

    #[error("block at position {position} carries index {index}")]
    MisplacedBlock { position: u64, index: u64 },

    #[error("first block does not carry the genesis previous_hash")]
    NotGenesis,

    #[error("malformed chain: {0}")]
    Malformed(String),
}

/// Why a peer was skipped during conflict resolution.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("peer answered with status {0}")]
    Status(u16),

    #[error("malformed payload: {0}")]
    Malformed(String),

    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),
}
