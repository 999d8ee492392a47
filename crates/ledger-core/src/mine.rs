use crate::pow::ProofOfWork;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Shared flag used to abandon an in-flight proof search.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Searches proofs in parallel for the smallest one satisfying the predicate
/// against `last_proof`. Returns `None` once `cancel` is raised.
pub fn search(pow: &ProofOfWork, last_proof: u64, cancel: &CancelFlag) -> Option<u64> {
    // A raised flag matches any candidate so every worker stops early; the
    // flag is checked again below to tell that apart from a real hit.
    let found = (0u64..u64::MAX)
        .into_par_iter()
        .find_first(|proof| cancel.is_cancelled() || pow.valid_proof(last_proof, *proof));

    if cancel.is_cancelled() {
        debug!(last_proof, "proof search cancelled");
        return None;
    }
    let proof = found?;
    info!(last_proof, proof, "found proof");
    Some(proof)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parallel_search_matches_sequential() {
        let pow = ProofOfWork::new(3).unwrap();
        for last_proof in [100u64, 7, 35_293] {
            let expected = pow.proof_of_work(last_proof);
            assert_eq!(search(&pow, last_proof, &CancelFlag::new()), Some(expected));
        }
    }

    #[test]
    fn cancelled_search_returns_none() {
        let pow = ProofOfWork::new(64).unwrap();
        let cancel = CancelFlag::new();
        let handle = {
            let cancel = cancel.clone();
            std::thread::spawn(move || search(&pow, 100, &cancel))
        };
        std::thread::sleep(std::time::Duration::from_millis(50));
        cancel.cancel();
        assert_eq!(handle.join().unwrap(), None);
    }

    #[test]
    fn pre_cancelled_flag_skips_search() {
        let pow = ProofOfWork::default();
        let cancel = CancelFlag::new();
        cancel.cancel();
        assert!(cancel.is_cancelled());
        assert_eq!(search(&pow, 100, &cancel), None);
    }
}
