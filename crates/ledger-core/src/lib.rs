use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

pub mod chain;
pub mod consensus;
pub mod constants;
pub mod error;
pub mod mine;
pub mod node;
pub mod nodes;
pub mod validate;

pub use error::{FetchError, LedgerError, Result};

pub type Hash = [u8; 32];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: String,
    pub recipient: String,
    pub amount: u64,
}

impl Transaction {
    pub fn new(sender: impl Into<String>, recipient: impl Into<String>, amount: u64) -> Self {
        Self {
            sender: sender.into(),
            recipient: recipient.into(),
            amount,
        }
    }

    /// The transaction paying `recipient` for a freshly mined block.
    pub fn reward(recipient: impl Into<String>) -> Self {
        Self::new(constants::REWARD_SENDER, recipient, constants::MINING_REWARD)
    }

    fn to_value(&self) -> Value {
        json!({
            "amount": self.amount,
            "recipient": self.recipient,
            "sender": self.sender,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub timestamp: u64,
    pub transactions: Vec<Transaction>,
    pub proof: u64,
    pub previous_hash: String,
}

impl Block {
    pub fn new(index: u64, transactions: Vec<Transaction>, proof: u64, previous_hash: String) -> Self {
        Self {
            index,
            timestamp: unix_now(),
            transactions,
            proof,
            previous_hash,
        }
    }

    /// Block 1: no transactions, fixed proof and `previous_hash` sentinel.
    pub fn genesis() -> Self {
        Self::new(
            1,
            Vec::new(),
            constants::GENESIS_PROOF,
            constants::GENESIS_PREVIOUS_HASH.to_string(),
        )
    }

    /// Bytes fed to SHA-256: compact JSON with keys sorted at every level.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let transactions: Vec<Value> = self.transactions.iter().map(Transaction::to_value).collect();
        canonical_bytes(&json!({
            "index": self.index,
            "previous_hash": self.previous_hash,
            "proof": self.proof,
            "timestamp": self.timestamp,
            "transactions": transactions,
        }))
    }

    /// Lowercase hex SHA-256 of [`Block::canonical_bytes`]; this is what
    /// `previous_hash` links to.
    pub fn hash(&self) -> String {
        hex::encode(sha256(&self.canonical_bytes()))
    }
}

/// Compact JSON encoding of `value` with object keys in lexicographic order,
/// independent of how the map was built.
pub fn canonical_bytes(value: &Value) -> Vec<u8> {
    sort_keys(value).to_string().into_bytes()
}

fn sort_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = Map::with_capacity(map.len());
            for key in keys {
                sorted.insert(key.clone(), sort_keys(&map[key]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}

pub fn sha256(bytes: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest[..]);
    out
}

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

pub mod pow {
    use super::{sha256, Hash};
    use crate::constants::{HASH_HEX_SIZE, POW_TARGET_DIFFICULTY};
    use crate::error::{LedgerError, Result};
    use serde::{Deserialize, Serialize};

    /// The work predicate: `sha256("{last_proof}{proof}")` must start with
    /// `difficulty` zero hex digits.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ProofOfWork {
        difficulty: usize,
    }

    impl Default for ProofOfWork {
        fn default() -> Self {
            Self {
                difficulty: POW_TARGET_DIFFICULTY,
            }
        }
    }

    impl ProofOfWork {
        pub fn new(difficulty: usize) -> Result<Self> {
            if difficulty > HASH_HEX_SIZE {
                return Err(LedgerError::DifficultyTooHigh(difficulty));
            }
            Ok(Self { difficulty })
        }

        pub fn difficulty(&self) -> usize {
            self.difficulty
        }

        pub fn valid_proof(&self, last_proof: u64, proof: u64) -> bool {
            let guess = format!("{last_proof}{proof}");
            count_leading_zero_digits(&sha256(guess.as_bytes())) >= self.difficulty
        }

        /// Smallest non-negative `proof` satisfying [`ProofOfWork::valid_proof`].
        /// Runs on the calling thread until found; see `mine::search` for the
        /// cancellable variant.
        pub fn proof_of_work(&self, last_proof: u64) -> u64 {
            let mut proof = 0u64;
            while !self.valid_proof(last_proof, proof) {
                proof += 1;
            }
            proof
        }
    }

    pub fn count_leading_zero_bits(hash: &Hash) -> u32 {
        let mut total = 0u32;
        for b in hash {
            if *b == 0 {
                total += 8;
            } else {
                total += b.leading_zeros();
                break;
            }
        }
        total
    }

    /// Number of leading `'0'` characters in the hex rendering of `hash`.
    pub fn count_leading_zero_digits(hash: &Hash) -> usize {
        (count_leading_zero_bits(hash) / 4) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_block() -> Block {
        Block {
            index: 2,
            timestamp: 1_600_000_200,
            transactions: vec![
                Transaction::new("Alice", "Bob", 10),
                Transaction::reward("node-a"),
            ],
            proof: 35_293,
            previous_hash: "1".to_string(),
        }
    }

    #[test]
    fn leading_zero_bits_examples() {
        let mut h = [0u8; 32];
        assert_eq!(pow::count_leading_zero_bits(&h), 256);
        h[0] = 0x0F; // 00001111
        assert_eq!(pow::count_leading_zero_bits(&h), 4);
        h = [0u8; 32];
        h[1] = 0x80; // 00000000 10000000
        assert_eq!(pow::count_leading_zero_bits(&h), 8);
        h[1] = 0x40; // 01000000
        assert_eq!(pow::count_leading_zero_bits(&h), 9);
    }

    #[test]
    fn leading_zero_digits_match_hex_rendering() {
        let mut h = [0xffu8; 32];
        h[0] = 0x00;
        h[1] = 0x0a;
        assert!(hex::encode(h).starts_with("000a"));
        assert_eq!(pow::count_leading_zero_digits(&h), 3);

        let guess = sha256(b"10035293");
        let rendered = hex::encode(guess);
        let zeros = rendered.chars().take_while(|c| *c == '0').count();
        assert_eq!(pow::count_leading_zero_digits(&guess), zeros);
    }

    #[test]
    fn canonical_bytes_are_sorted_and_compact() {
        let block = sample_block();
        let expected = concat!(
            r#"{"index":2,"previous_hash":"1","proof":35293,"timestamp":1600000200,"#,
            r#""transactions":[{"amount":10,"recipient":"Bob","sender":"Alice"},"#,
            r#"{"amount":1,"recipient":"node-a","sender":"0"}]}"#
        );
        assert_eq!(String::from_utf8(block.canonical_bytes()).unwrap(), expected);
    }

    #[test]
    fn block_hash_consistency() {
        let block = sample_block();
        let hash1 = block.hash();
        let hash2 = block.hash();
        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), constants::HASH_HEX_SIZE);
        assert_eq!(hash1, hex::encode(sha256(&block.canonical_bytes())));
    }

    #[test]
    fn field_order_does_not_change_hash() {
        let block = sample_block();
        let reordered = r#"{
            "transactions": [
                {"sender": "Alice", "amount": 10, "recipient": "Bob"},
                {"recipient": "node-a", "sender": "0", "amount": 1}
            ],
            "previous_hash": "1",
            "timestamp": 1600000200,
            "proof": 35293,
            "index": 2
        }"#;
        let value: Value = serde_json::from_str(reordered).unwrap();
        assert_eq!(canonical_bytes(&value), block.canonical_bytes());

        let parsed: Block = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, block);
        assert_eq!(parsed.hash(), block.hash());
    }

    #[test]
    fn block_hash_changes_with_each_field() {
        let block = sample_block();
        let base = block.hash();

        let mut b = block.clone();
        b.proof += 1;
        assert_ne!(b.hash(), base);

        let mut b = block.clone();
        b.previous_hash = "2".into();
        assert_ne!(b.hash(), base);

        let mut b = block.clone();
        b.transactions[0].amount = 11;
        assert_ne!(b.hash(), base);

        let mut b = block.clone();
        b.timestamp += 1;
        assert_ne!(b.hash(), base);

        let mut b = block;
        b.index = 3;
        assert_ne!(b.hash(), base);
    }

    #[test]
    fn transaction_serialization_example() {
        let tx = Transaction::new("Alice", "Bob", 10);
        let json = serde_json::to_string(&tx).unwrap();
        assert_eq!(json, r#"{"sender":"Alice","recipient":"Bob","amount":10}"#);
        let deserialized: Transaction = serde_json::from_str(&json).unwrap();
        assert_eq!(tx, deserialized);
    }

    #[test]
    fn reward_transaction_uses_sentinel_sender() {
        let tx = Transaction::reward("node-a");
        assert_eq!(tx.sender, constants::REWARD_SENDER);
        assert_eq!(tx.amount, constants::MINING_REWARD);
        assert_ne!(Transaction::new("Alice", "Bob", 1).sender, constants::REWARD_SENDER);
    }

    #[test]
    fn valid_proof_is_deterministic() {
        let pow = pow::ProofOfWork::default();
        for proof in [0u64, 1, 35_293, 99_999] {
            assert_eq!(pow.valid_proof(100, proof), pow.valid_proof(100, proof));
        }
    }

    #[test]
    fn proof_of_work_returns_smallest_valid_proof() {
        let pow = pow::ProofOfWork::new(3).unwrap();
        let proof = pow.proof_of_work(100);
        assert!(pow.valid_proof(100, proof));
        assert!((0..proof).all(|p| !pow.valid_proof(100, p)));
    }

    #[test]
    fn zero_difficulty_accepts_everything() {
        let pow = pow::ProofOfWork::new(0).unwrap();
        assert_eq!(pow.proof_of_work(7), 0);
        assert!(pow.valid_proof(7, 12345));
    }

    #[test]
    fn difficulty_above_digest_length_is_rejected() {
        assert_eq!(
            pow::ProofOfWork::new(65),
            Err(LedgerError::DifficultyTooHigh(65))
        );
        assert!(pow::ProofOfWork::new(64).is_ok());
    }
}
