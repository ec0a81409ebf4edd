use criterion::*;
use pbmx_crypto::proofs::ShuffleProof;
use pbmx_crypto::{Mask, PrivateKey, Token};

fn sample_stack(n: u64, h: &pbmx_crypto::SharedKey, rng: &mut impl rand::Rng) -> Vec<Mask> {
    (0..n).map(|i| Mask::mask(h, Token::new(i).unwrap(), 1, rng).0).collect()
}

fn reverse(n: usize) -> Vec<usize> {
    (0..n).rev().collect()
}

fn shuffle_bench(c: &mut Criterion) {
    let rng = &mut rand::thread_rng();
    let sk = PrivateKey::random(rng);
    let h = sk.public_key();

    for &n in &[8usize, 32, 64] {
        let before = sample_stack(n as u64, &h, rng);
        let dest = reverse(n);

        c.bench_function(&format!("ShuffleProof::prove n={n}"), |b| {
            b.iter_batched(
                || before.clone(),
                |before| std::hint::black_box(ShuffleProof::prove(&h, &before, &dest, &mut rand::thread_rng()).unwrap()),
                BatchSize::SmallInput,
            );
        });

        let (proof, after) = ShuffleProof::prove(&h, &before, &dest, rng).unwrap();
        c.bench_function(&format!("ShuffleProof::verify n={n}"), |b| {
            b.iter(|| std::hint::black_box(proof.verify(&h, &before, &after).unwrap()));
        });
    }
}

criterion_group!(benches, shuffle_bench);
criterion_main!(benches);
