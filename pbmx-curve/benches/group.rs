use criterion::*;
use pbmx_curve::{Point, Scalar};

fn group_bench(c: &mut Criterion) {
    c.bench_function("Point scalar multiply", |b| {
        let rng = &mut rand::thread_rng();
        let x = Scalar::random(rng);
        let g = Point::generator();
        b.iter(|| std::hint::black_box(g * x));
    });

    c.bench_function("Point encode", |b| {
        let rng = &mut rand::thread_rng();
        let p = Point::generator() * Scalar::random(rng);
        b.iter(|| std::hint::black_box(p.to_bytes()));
    });

    c.bench_function("Point decode", |b| {
        let rng = &mut rand::thread_rng();
        let bytes = (Point::generator() * Scalar::random(rng)).to_bytes();
        b.iter(|| std::hint::black_box(Point::decode(&bytes).unwrap()));
    });
}

criterion_group!(benches, group_bench);
criterion_main!(benches);
