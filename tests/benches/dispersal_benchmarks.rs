//! # DA Dispersal Benchmarks
//!
//! CPU-bound parts of a dispersal, measured without any network:
//!
//! | Area | Operation |
//! |------|-----------|
//! | Encoding | payload → blob, blob → payload |
//! | Attestation | threshold evaluation per snapshot |
//! | Certificates | encode / decode |
//! | Keys | blob key from header |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use da_dispersal::adapters::signed_snapshot;
use da_dispersal::algorithms::evaluate_thresholds;
use da_dispersal::config::DEFAULT_MAX_BLOB_SYMBOLS;
use da_dispersal::domain::{
    BlobHeader, BlobStatus, Certificate, Payload, PolynomialForm, QuorumId,
};
use rand::Rng;
use std::time::Duration;

fn random_payload(len: usize) -> Payload {
    let mut rng = rand::thread_rng();
    Payload::new((0..len).map(|_| rng.gen::<u8>()).collect::<Vec<_>>())
}

// ============================================================================
// ENCODING
// ============================================================================

fn bench_blob_encoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("blob-encoding");
    group.measurement_time(Duration::from_secs(10));

    for size in [4 * 1024, 128 * 1024, 1024 * 1024] {
        let payload = random_payload(size);
        let blob = payload
            .to_blob(PolynomialForm::Coeff, DEFAULT_MAX_BLOB_SYMBOLS)
            .expect("payload fits");

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("payload_to_blob", size), &payload, |b, p| {
            b.iter(|| black_box(p.to_blob(PolynomialForm::Coeff, DEFAULT_MAX_BLOB_SYMBOLS)))
        });
        group.bench_with_input(BenchmarkId::new("blob_to_payload", size), &blob, |b, blob| {
            b.iter(|| black_box(blob.to_payload()))
        });
    }

    group.finish();
}

// ============================================================================
// ATTESTATION
// ============================================================================

fn bench_threshold_evaluation(c: &mut Criterion) {
    let mut group = c.benchmark_group("threshold-evaluation");

    for quorum_count in [2u8, 16, 64] {
        let quorums: Vec<QuorumId> = (0..quorum_count).collect();
        let signed: Vec<(QuorumId, u8)> = quorums.iter().map(|q| (*q, 50 + q % 50)).collect();
        let snapshot = signed_snapshot(BlobStatus::GatheringSignatures, 1, &quorums, &signed);

        group.bench_with_input(
            BenchmarkId::new("evaluate", quorum_count),
            &snapshot,
            |b, snapshot| b.iter(|| black_box(evaluate_thresholds(snapshot, 55))),
        );
    }

    group.finish();
}

// ============================================================================
// CERTIFICATES & KEYS
// ============================================================================

fn bench_certificate_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("certificate-codec");

    let snapshot = signed_snapshot(BlobStatus::Complete, 1, &[0, 1], &[(0, 90), (1, 90)]);
    let cert = Certificate {
        blob_inclusion_info: snapshot.blob_inclusion_info.clone().unwrap_or_default(),
        batch_header: snapshot
            .signed_batch
            .as_ref()
            .map(|b| b.header.clone())
            .unwrap_or_default(),
        signed_quorum_numbers: vec![0, 1],
        ..Default::default()
    };
    let bytes = cert.to_bytes();

    group.bench_function("encode", |b| b.iter(|| black_box(cert.to_bytes())));
    group.bench_function("decode", |b| {
        b.iter(|| black_box(Certificate::from_bytes(&bytes)))
    });

    let header = BlobHeader {
        quorum_numbers: vec![0, 1],
        ..Default::default()
    };
    group.bench_function("blob_key", |b| b.iter(|| black_box(header.blob_key())));

    group.finish();
}

criterion_group!(
    benches,
    bench_blob_encoding,
    bench_threshold_evaluation,
    bench_certificate_codec,
);

criterion_main!(benches);
