use buzzd::config::KernelConfig;
use buzzd::kernel::Kernel;
use buzzd::state::{Store, annotate};
use criterion::{Criterion, Throughput, criterion_group, criterion_main};

// Store benchmarks measure the raw mutation path; the kernel benchmark adds
// the cost of the request queue and reply channel on top of it.

fn annotate_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("annotate");
    let text = "Shipping #Rust 2024 today, thanks @alice and @bob_ for the #review!";
    group.throughput(Throughput::Bytes(text.len() as u64));

    group.bench_function("mentions_and_tags", |b| {
        b.iter(|| (annotate::mentions(text), annotate::tags(text)))
    });

    group.finish();
}

fn store_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("store");
    group.throughput(Throughput::Elements(1));

    let mut store = Store::new();
    store.register("alice", "pw").unwrap();
    for i in 0..100 {
        let name = format!("fan{i}");
        store.register(&name, "pw").unwrap();
        store.follow("alice", &name).unwrap();
    }

    group.bench_function("post", |b| {
        b.iter(|| store.post("alice", "hello @fan1 #bench").unwrap())
    });

    group.finish();
}

fn kernel_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("kernel");
    group.throughput(Throughput::Elements(1));

    let runtime = tokio::runtime::Runtime::new().unwrap();
    let kernel = runtime.block_on(async {
        let (kernel, _join) = Kernel::spawn(&KernelConfig::default());
        kernel.register("alice", "pw").await.unwrap();
        kernel
    });

    group.bench_function("post_round_trip", |b| {
        b.to_async(&runtime)
            .iter(|| async { kernel.post("alice", "hello #bench").await.unwrap() })
    });

    group.finish();
}

criterion_group!(benches, annotate_benchmark, store_benchmark, kernel_benchmark);
criterion_main!(benches);
