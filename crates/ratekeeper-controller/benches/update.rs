//! Rate controller benchmarks
//!
//! - Full `update` path (aggregator and PID)
//! - Clamp engine
//! - Buffer history reads

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ratekeeper_controller::{
    Address, AuthorizationPolicy, ClampEngine, ControllerSettings, Fraction, ManualClock,
    Observation, PidConfig, RateBuffer, RateComponent, RateConfig, RateController,
    SourceRegistry, StaticInputSource, StaticValueSource,
};

const OWNER: Address = Address::new([0xaa; 20]);
const TOKEN: Address = Address::new([0x01; 20]);

fn config(components: usize) -> RateConfig {
    let mut config = RateConfig::fixed(1_000_000);
    config.max_increase = 10_000;
    config.max_decrease = 10_000;
    config.components = (0..components)
        .map(|i| RateComponent::new(Address::repeat_byte(0x10 + i as u8), 1 + i as u64))
        .collect();
    config
}

fn controller(components: usize, clock: Arc<ManualClock>) -> RateController {
    let mut sources = SourceRegistry::new();
    for i in 0..components {
        let address = Address::repeat_byte(0x10 + i as u8);
        let source = StaticValueSource::new(address);
        source.set(TOKEN, 5_000 * (i as u128 + 1));
        sources.register_value_source(address, Arc::new(source));
    }

    let mut controller = RateController::new(
        ControllerSettings::default()
            .with_period_secs(1)
            .with_event_history(16),
        AuthorizationPolicy::self_managed(OWNER),
        sources,
    )
    .expect("valid settings")
    .with_clock(clock);
    controller
        .set_config(OWNER, TOKEN, config(components))
        .expect("valid config");
    controller
}

// ============ UPDATE BENCHMARKS ============

fn bench_update_aggregator(c: &mut Criterion) {
    let mut group = c.benchmark_group("update_aggregator");

    for components in [0usize, 1, 4, 16].iter() {
        group.bench_with_input(
            BenchmarkId::new("components", components),
            components,
            |b, &components| {
                let clock = Arc::new(ManualClock::new(0));
                let mut controller = controller(components, clock.clone());
                b.iter(|| {
                    clock.advance(1);
                    black_box(controller.update(OWNER, TOKEN).expect("update"))
                });
            },
        );
    }

    group.finish();
}

fn bench_update_pid(c: &mut Criterion) {
    let clock = Arc::new(ManualClock::new(0));
    let mut controller = controller(0, clock.clone());

    let input_address = Address::repeat_byte(0x60);
    let inputs = StaticInputSource::new(input_address);
    inputs.set(TOKEN, 400, 500);
    controller
        .sources_mut()
        .register_input_source(input_address, Arc::new(inputs));

    let pid = PidConfig::new(
        input_address,
        Fraction::new(1, 3),
        Fraction::new(1, 7),
        Fraction::new(1, 11),
    );
    controller
        .set_pid_config(OWNER, TOKEN, pid)
        .expect("valid pid config");

    c.bench_function("update_pid", |b| {
        b.iter(|| {
            clock.advance(1);
            black_box(controller.update(OWNER, TOKEN).expect("update"))
        });
    });
}

// ============ CLAMP BENCHMARKS ============

fn bench_clamp(c: &mut Criterion) {
    let config = config(0);
    c.bench_function("clamp", |b| {
        b.iter(|| ClampEngine::clamp(black_box(&config), black_box(Some(1_000_000)), black_box(2_000_000)))
    });
}

// ============ BUFFER BENCHMARKS ============

fn bench_buffer_reads(c: &mut Criterion) {
    let mut group = c.benchmark_group("buffer");

    for capacity in [24usize, 256, 4096].iter() {
        let mut buffer = RateBuffer::with_capacity(*capacity).expect("capacity");
        for i in 0..(*capacity as u64 * 2) {
            buffer
                .push(Observation::new(i as u128, i as u128, i))
                .expect("unpaused");
        }

        group.throughput(Throughput::Elements(*capacity as u64));
        group.bench_with_input(BenchmarkId::new("rates", capacity), capacity, |b, &capacity| {
            b.iter(|| black_box(buffer.rates(capacity, 0, 1).expect("enough data")))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_update_aggregator,
    bench_update_pid,
    bench_clamp,
    bench_buffer_reads,
);

criterion_main!(benches);
