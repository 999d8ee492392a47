pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;

/// Leading zero hex digits required by the proof-of-work predicate.
pub const POW_TARGET_DIFFICULTY: usize = 4;

pub const GENESIS_PROOF: u64 = 100;
pub const GENESIS_PREVIOUS_HASH: &str = "1";

/// Sender recorded on the transaction that pays the miner.
pub const REWARD_SENDER: &str = "0";
pub const MINING_REWARD: u64 = 1;

/// Bumped whenever a field is added to the hashed block representation.
pub const WIRE_FORMAT_VERSION: u32 = 1;

pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 8;
