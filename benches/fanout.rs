//! Router fan-out benchmark suite.
//!
//! Benchmarks routing a batch of events at different scales:
//! - Viewer counts: 1, 16, 128
//! - Batch sizes: 1, 64
//!
//! Run with: cargo bench --bench fanout
//! Results saved to: target/criterion/

use std::sync::Arc;

use async_trait::async_trait;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use serde_json::json;
use tokio::runtime::Runtime;

use cot_relay::protocol::FeatureProperties;
use cot_relay::{
    AuthMaterial, ChatRecord, ChatStore, ConnectionConfig, CotEvent, Envelope, Feature, ImportJob,
    ImportPipeline, Result, Router, RouterOptions, SinkLayer, Viewer, ViewerFormat, ViewerRegistry,
};

// ============================================================================
// Benchmark Parameters
// ============================================================================

const VIEWER_COUNTS: &[usize] = &[1, 16, 128];
const BATCH_SIZES: &[usize] = &[1, 64];

// ============================================================================
// Collaborators
// ============================================================================

struct Discard;

#[async_trait]
impl SinkLayer for Discard {
    async fn forward(&self, _config: &ConnectionConfig, _atoms: &[CotEvent]) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl ChatStore for Discard {
    async fn record(&self, _record: ChatRecord) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl ImportPipeline for Discard {
    async fn submit(&self, _job: ImportJob) -> Result<()> {
        Ok(())
    }
}

/// Serializes every envelope, like a socket viewer would.
struct Serializing(ViewerFormat);

impl Viewer for Serializing {
    fn format(&self) -> ViewerFormat {
        self.0
    }

    fn send(&self, envelope: &Envelope) -> Result<()> {
        envelope.to_json().map(drop)
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn router(viewer_count: usize, config: &ConnectionConfig) -> Router {
    let viewers = Arc::new(ViewerRegistry::new());
    for i in 0..viewer_count {
        let format = if i % 2 == 0 {
            ViewerFormat::Feature
        } else {
            ViewerFormat::Raw
        };
        viewers.register(config.id.clone(), Arc::new(Serializing(format)));
    }

    let discard = Arc::new(Discard);
    Router::new(
        RouterOptions::default(),
        viewers,
        discard.clone(),
        discard.clone(),
        discard,
    )
}

fn events(count: usize) -> Vec<CotEvent> {
    (0..count)
        .map(|i| {
            let uid = format!("ANDROID-{i}");
            let feature = Feature::point(
                uid.clone(),
                FeatureProperties::new("a-f-G-U-C"),
                [-105.0, 39.7, 1600.0],
            );
            CotEvent::new(
                json!({ "event": { "_attributes": { "type": "a-f-G-U-C", "uid": uid } } }),
                feature,
            )
        })
        .collect()
}

// ============================================================================
// Benchmark: Route
// ============================================================================

fn bench_route(c: &mut Criterion) {
    let rt = Runtime::new().expect("tokio runtime");
    let config = ConnectionConfig::new(1, "bench", AuthMaterial::new("cert", "key"));

    let mut group = c.benchmark_group("route");

    for &viewer_count in VIEWER_COUNTS {
        let router = router(viewer_count, &config);
        for &batch in BATCH_SIZES {
            let batch_events = events(batch);
            let id = format!("{viewer_count}v_{batch}e");
            group.bench_with_input(BenchmarkId::new("fanout", &id), &batch_events, |b, evs| {
                b.to_async(&rt)
                    .iter(|| async { router.route(&config, evs, false).await });
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_route);
criterion_main!(benches);
