use crate::pow::ProofOfWork;
use crate::validate;
use crate::{Block, Transaction};
use tracing::{debug, info, warn};

/// The authoritative chain plus the pool of transactions waiting for a block.
///
/// `chain` only changes through [`Ledger::new_block`] (append) and
/// [`Ledger::replace_chain`] (wholesale replacement by a longer valid chain).
#[derive(Clone, Debug)]
pub struct Ledger {
    chain: Vec<Block>,
    pending: Vec<Transaction>,
    node_id: String,
    pow: ProofOfWork,
}

impl Ledger {
    pub fn new(node_id: impl Into<String>, pow: ProofOfWork) -> Self {
        Self {
            chain: vec![Block::genesis()],
            pending: Vec::new(),
            node_id: node_id.into(),
            pow,
        }
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn pow(&self) -> &ProofOfWork {
        &self.pow
    }

    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    pub fn pending(&self) -> &[Transaction] {
        &self.pending
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    /// Always false: the genesis block exists from construction on.
    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    pub fn last_block(&self) -> &Block {
        // The constructor appends genesis and replacements are never shorter.
        &self.chain[self.chain.len() - 1]
    }

    /// Append a block holding every pending transaction and clear the pool.
    /// `previous_hash` defaults to the hash of the current tip.
    pub fn new_block(&mut self, proof: u64, previous_hash: Option<String>) -> &Block {
        let previous_hash = match previous_hash {
            Some(hash) => hash,
            None => self.last_block().hash(),
        };
        let index = self.chain.len() as u64 + 1;
        let transactions = std::mem::take(&mut self.pending);
        let block = Block::new(index, transactions, proof, previous_hash);
        debug!(index, proof, txs = block.transactions.len(), "appending block");
        self.chain.push(block);
        self.last_block()
    }

    /// Queue a transaction; returns the index of the block expected to hold it.
    pub fn new_transaction(
        &mut self,
        sender: impl Into<String>,
        recipient: impl Into<String>,
        amount: u64,
    ) -> u64 {
        self.pending.push(Transaction::new(sender, recipient, amount));
        self.chain.len() as u64 + 1
    }

    /// Proof search, reward and append in one step on the calling thread.
    /// `node::Node::mine` is the variant that searches without holding the lock.
    pub fn mine(&mut self) -> &Block {
        let last_proof = self.last_block().proof;
        let proof = self.pow.proof_of_work(last_proof);
        self.forge(proof)
    }

    /// Pay the reward into the pool, then append the block carrying it.
    pub(crate) fn forge(&mut self, proof: u64) -> &Block {
        let previous_hash = self.last_block().hash();
        self.pending.push(Transaction::reward(self.node_id.clone()));
        let block = self.new_block(proof, Some(previous_hash));
        info!(index = block.index, proof = block.proof, "new block forged");
        block
    }

    pub fn valid_chain(&self, chain: &[Block]) -> bool {
        validate::valid_chain(&self.pow, chain)
    }

    /// Adopt `candidate` if it is strictly longer than the local chain and
    /// valid. Pending transactions are left in place.
    pub fn replace_chain(&mut self, candidate: Vec<Block>) -> bool {
        if !self.is_longer(&candidate) {
            return false;
        }
        if let Err(err) = validate::verify_candidate(&self.pow, &candidate) {
            warn!(%err, "rejecting candidate chain");
            return false;
        }
        self.install(candidate);
        true
    }

    /// [`Ledger::replace_chain`] for a candidate whose links and proofs were
    /// already checked off-lock. Only the length and layout are re-checked.
    pub(crate) fn adopt_verified(&mut self, candidate: Vec<Block>) -> bool {
        if !self.is_longer(&candidate) {
            return false;
        }
        if let Err(err) = validate::verify_layout(&candidate) {
            warn!(%err, "rejecting candidate chain");
            return false;
        }
        self.install(candidate);
        true
    }

    fn is_longer(&self, candidate: &[Block]) -> bool {
        if candidate.len() > self.chain.len() {
            return true;
        }
        debug!(
            local = self.chain.len(),
            candidate = candidate.len(),
            "candidate is not longer, keeping local chain"
        );
        false
    }

    fn install(&mut self, candidate: Vec<Block>) {
        info!(
            from = self.chain.len(),
            to = candidate.len(),
            "replacing local chain"
        );
        self.chain = candidate;
    }
}
