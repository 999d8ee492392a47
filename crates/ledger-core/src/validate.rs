//! Whole-chain verification, used on every candidate fetched from a peer.

use crate::constants::GENESIS_PREVIOUS_HASH;
use crate::error::{LedgerError, Result};
use crate::pow::ProofOfWork;
use crate::Block;
use serde_json::Value;

/// Walk the chain from the second block on, checking the hash link and the
/// work predicate of every adjacent pair. Stops at the first violation.
pub fn verify_chain(pow: &ProofOfWork, chain: &[Block]) -> Result<()> {
    if chain.is_empty() {
        return Err(LedgerError::EmptyChain);
    }
    for pair in chain.windows(2) {
        let (prev, cur) = (&pair[0], &pair[1]);
        if cur.previous_hash != prev.hash() {
            return Err(LedgerError::BrokenLink { index: cur.index });
        }
        if !pow.valid_proof(prev.proof, cur.proof) {
            return Err(LedgerError::InvalidProof {
                index: cur.index,
                proof: cur.proof,
            });
        }
    }
    Ok(())
}

pub fn valid_chain(pow: &ProofOfWork, chain: &[Block]) -> bool {
    verify_chain(pow, chain).is_ok()
}

/// The layout every chain built by a ledger has: block `n` sits at position
/// `n` (1-based) and the first block carries the genesis sentinel.
pub fn verify_layout(chain: &[Block]) -> Result<()> {
    let first = chain.first().ok_or(LedgerError::EmptyChain)?;
    if first.previous_hash != GENESIS_PREVIOUS_HASH {
        return Err(LedgerError::NotGenesis);
    }
    for (position, block) in (1u64..).zip(chain) {
        if block.index != position {
            return Err(LedgerError::MisplacedBlock {
                position,
                index: block.index,
            });
        }
    }
    Ok(())
}

/// Everything a peer chain must pass before it may replace ours: layout,
/// then links and proofs.
pub fn verify_candidate(pow: &ProofOfWork, chain: &[Block]) -> Result<()> {
    verify_layout(chain)?;
    verify_chain(pow, chain)
}

/// Decode an untyped chain, e.g. straight off the wire. Anything that is not
/// a list of well-formed blocks is `Malformed`.
pub fn parse_chain(value: Value) -> Result<Vec<Block>> {
    serde_json::from_value(value).map_err(|e| LedgerError::Malformed(e.to_string()))
}
