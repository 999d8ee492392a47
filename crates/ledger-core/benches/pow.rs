use criterion::{criterion_group, criterion_main, Criterion};
use ledger_core::chain::Ledger;
use ledger_core::mine::{search, CancelFlag};
use ledger_core::pow::ProofOfWork;
use ledger_core::validate::valid_chain;

fn bench_pow(c: &mut Criterion) {
    let pow = ProofOfWork::default();

    c.bench_function("proof_of_work_difficulty_4", |b| {
        b.iter(|| pow.proof_of_work(100));
    });

    c.bench_function("parallel_search_difficulty_4", |b| {
        let cancel = CancelFlag::new();
        b.iter(|| search(&pow, 100, &cancel));
    });
}

fn bench_validate(c: &mut Criterion) {
    let pow = ProofOfWork::new(2).unwrap();
    let mut ledger = Ledger::new("bench", pow);
    for i in 0..50 {
        ledger.new_transaction(format!("alice-{i}"), "bob", i);
        ledger.mine();
    }
    let chain = ledger.chain().to_vec();

    c.bench_function("valid_chain_51_blocks", |b| {
        b.iter(|| valid_chain(&pow, &chain));
    });
}

criterion_group!(benches, bench_pow, bench_validate);
criterion_main!(benches);
