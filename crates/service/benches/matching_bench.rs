use criterion::{black_box, criterion_group, criterion_main, Criterion};

use service::auth::token::{issue_token, TokenVerifier};
use service::xero::matching::{assign, Candidate, AUTO_MATCH_THRESHOLD};

fn bench_assign(c: &mut Criterion) {
    let names: Vec<String> = (0..40).map(|i| format!("Business Account {i} Saver")).collect();
    let numbers: Vec<String> = (0..40).map(|i| format!("062-000 {:08}", i * 7919)).collect();
    let xero: Vec<Candidate<'_>> = names.iter().zip(&numbers).map(|(n, d)| Candidate { name: n, number: Some(d) }).collect();
    let local: Vec<Candidate<'_>> = names.iter().rev().map(|n| Candidate { name: n, number: None }).collect();

    c.bench_function("xero_assign_40x40", |b| {
        b.iter(|| assign(black_box(&xero), black_box(&local), AUTO_MATCH_THRESHOLD));
    });
}

fn bench_verify(c: &mut Criterion) {
    let verifier = TokenVerifier::new("bench-secret", "");
    let token = issue_token("bench-secret", uuid::Uuid::new_v4(), 3600, None).unwrap();

    c.bench_function("bearer_token_verify", |b| {
        b.iter(|| verifier.verify(black_box(&token)).unwrap());
    });
}

criterion_group!(benches, bench_assign, bench_verify);
criterion_main!(benches);
