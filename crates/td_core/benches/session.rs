//! Session tick benchmarks for td_core.
//!
//! Run with: `cargo bench -p td_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

use td_core::level::LevelSpec;
use td_core::session::{InputEvent, Mode, Session};

const DT: f32 = 1.0 / 60.0;

/// A session three seconds into wave 1 with a full tower line-up.
fn busy_session() -> Session {
    let mut session = Session::new(LevelSpec::s_curve(), Mode::Campaign, None).unwrap();
    for (gx, gy) in [(2, 4), (4, 3), (7, 3)] {
        session.handle_input(InputEvent::PlaceTower { gx, gy });
    }
    session.handle_input(InputEvent::StartWave);
    for _ in 0..180 {
        session.update(DT);
    }
    session
}

/// Measures one update tick of a mid-wave session.
pub fn session_benchmark(c: &mut Criterion) {
    let baseline = busy_session();

    c.bench_function("session_update_tick", |b| {
        b.iter_batched(
            || baseline.clone(),
            |mut session| black_box(session.update(DT)),
            BatchSize::SmallInput,
        )
    });

    c.bench_function("session_state_hash", |b| {
        b.iter(|| black_box(baseline.state_hash()))
    });
}

criterion_group!(benches, session_benchmark);
criterion_main!(benches);
