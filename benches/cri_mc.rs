use criterion::{criterion_group, criterion_main, Criterion};
use tinyrand::{Seeded, StdRand, Wyrand};

use swish::data::Role;
use swish::mc::{Chain, MonteCarloEngine, DEFAULT_MAX_STEPS};
use swish::metric::PerMetric;
use swish::model::combine;
use swish::state::StateTally;
use swish::transition::{sample_matrix, PossessionProbs, TargetRates};

fn neutral_chain() -> Chain {
    let targets = TargetRates::default();
    let ratings = PerMetric::filled(1500.0);
    let build = |role: Role| {
        let probs = PossessionProbs::calibrate(&ratings, targets.get(role), 1_000.0).unwrap();
        sample_matrix(&probs, 25_000, &mut StdRand::seed(0))
    };
    let mut combined = combine(&build(Role::For), &build(Role::Against));
    combined.normalise_rows();
    Chain::new(&combined)
}

fn criterion_benchmark(c: &mut Criterion) {
    let chain = neutral_chain();

    // sanity check
    let mut tally = StateTally::default();
    chain.walk(&mut tally, 1.0, DEFAULT_MAX_STEPS, &mut StdRand::default());
    assert!(tally.total() >= 2.0);

    c.bench_function("cri_mc_walk_wyrand", |b| {
        let mut rand = Wyrand::default();
        let mut tally = StateTally::default();
        b.iter(|| {
            tally.clear();
            chain.walk(&mut tally, 1.0, DEFAULT_MAX_STEPS, &mut rand)
        });
    });

    c.bench_function("cri_mc_game", |b| {
        let engine = MonteCarloEngine::default();
        let mut rand = StdRand::default();
        b.iter(|| engine.simulate_game(&chain, &chain, &mut rand));
    });

    c.bench_function("cri_mc_batch_1k", |b| {
        let engine = MonteCarloEngine::default().with_games(1_000);
        b.iter(|| engine.simulate(&chain, &chain));
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
