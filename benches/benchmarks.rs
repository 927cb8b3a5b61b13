use std::sync::Arc;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use ghostshell::config::{ReconcileConfig, RouterConfig};
use ghostshell::router::Backend;
use ghostshell::session::TabInit;
use ghostshell::storage::{MemoryStore, SitePolicyTable};
use ghostshell::testing::{FakeFrame, FakeFrameHost, FixedClock, RecordingHistory};
use ghostshell::{ReconciliationLoop, Router, SessionManager, ShellOptions};

fn router() -> Arc<Router> {
    Arc::new(Router::new(
        RouterConfig::default(),
        ShellOptions::default(),
        Arc::new(FixedClock::default()),
    ))
}

/// Encode/decode round trips for both backends
fn benchmark_codec(c: &mut Criterion) {
    let router = router();
    let literal = "https://www.example.com/search?q=relay+shell&page=2";
    let masked = router.encode(literal, Backend::Masked);
    let direct = router.encode(literal, Backend::Direct);

    let mut group = c.benchmark_group("codec");
    group.bench_function("resolve", |b| {
        b.iter(|| router.resolve(black_box("example.com/some/path")))
    });
    group.bench_function("encode_masked", |b| {
        b.iter(|| router.encode(black_box(literal), Backend::Masked))
    });
    group.bench_function("decode_masked", |b| b.iter(|| router.decode(black_box(&masked))));
    group.bench_function("decode_direct", |b| b.iter(|| router.decode(black_box(&direct))));
    group.finish();
}

/// One sweep over a full tab strip
fn benchmark_sweep(c: &mut Criterion) {
    let router = router();
    let mut sessions = SessionManager::new(
        router.clone(),
        Arc::new(RecordingHistory::default()),
        Arc::new(FixedClock::default()),
    );
    let mut host = FakeFrameHost::default();
    for i in 0..20 {
        let url = router.request_for(&format!("site{}.example", i)).unwrap_or_default();
        if let Some(id) = sessions.add_tab(TabInit::new(url.clone())) {
            host.insert(id, FakeFrame::showing(url));
        }
    }
    let mut looper = ReconciliationLoop::new(
        ReconcileConfig::default(),
        router,
        SitePolicyTable::new(Arc::new(MemoryStore::new())),
        Arc::new(RecordingHistory::default()),
        Arc::new(FixedClock::default()),
    );

    c.bench_function("sweep_20_tabs", |b| {
        b.iter(|| looper.sweep(&mut sessions, &mut host, tokio::time::Instant::now()))
    });
}

criterion_group!(benches, benchmark_codec, benchmark_sweep);
criterion_main!(benches);
