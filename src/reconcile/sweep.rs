//! The reconciliation loop
//!
//! One shared timer sweeps every tab. Per tab, a sweep reflects the frame's
//! address and title into the session store, watches for relay error pages
//! and schedules bounded reloads, and re-applies content policy. Frame reads
//! that are refused are skipped until the next sweep.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};

use super::frame::{ContentFrame, FrameHost};
use super::observe::{ObservedLocation, PollingObserver};
use super::policy::{ContentPolicyEnforcer, default_enforcers};
use super::retry::{RetryDecision, RetryState, RetryTracker};
use crate::config::{ReconcileConfig, ShellOptions};
use crate::router::{Router, host_of, is_passthrough, is_sentinel};
use crate::session::{SessionManager, SharedSessions, TabId};
use crate::storage::{
    EffectivePolicy, HistoryEntry, HistorySink, SitePolicy, SitePolicyTable, resolve_policy,
};
use crate::utils::Clock;

/// Summary of one sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub visited: usize,
    pub url_updates: usize,
    pub title_updates: usize,
    pub errors_seen: usize,
    pub scheduled: Vec<(TabId, Duration)>,
    pub reloaded: Vec<TabId>,
    pub pruned: usize,
}

#[derive(Debug, Default)]
struct Watch {
    last_url: Option<String>,
    last_title: Option<String>,
}

/// Inputs shared by every tab in one sweep
struct SweepContext<'a> {
    now: Instant,
    markers: Vec<&'a str>,
    table: HashMap<String, SitePolicy>,
    options: ShellOptions,
    skip_errors: HashSet<TabId>,
}

pub struct ReconciliationLoop {
    config: ReconcileConfig,
    router: Arc<Router>,
    policies: SitePolicyTable,
    history: Arc<dyn HistorySink>,
    clock: Arc<dyn Clock>,
    observer: Box<dyn ObservedLocation>,
    enforcers: Vec<Box<dyn ContentPolicyEnforcer>>,
    retries: RetryTracker,
    watched: HashMap<TabId, Watch>,
}

impl ReconciliationLoop {
    pub fn new(
        config: ReconcileConfig,
        router: Arc<Router>,
        policies: SitePolicyTable,
        history: Arc<dyn HistorySink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let retries = RetryTracker::new(config.retry_delays.clone());
        Self {
            config,
            router,
            policies,
            history,
            clock,
            observer: Box::new(PollingObserver),
            enforcers: default_enforcers(),
            retries,
            watched: HashMap::new(),
        }
    }

    /// Replace the default polling observer
    pub fn with_observer(mut self, observer: Box<dyn ObservedLocation>) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    pub fn retry_state(&self, tab: TabId) -> RetryState {
        self.retries.state(tab)
    }

    /// Run one sweep over every tab
    pub fn sweep(
        &mut self,
        sessions: &mut SessionManager,
        host: &mut dyn FrameHost,
        now: Instant,
    ) -> SweepReport {
        let mut report = SweepReport::default();
        self.prune(sessions, &mut report);

        let mut skip_errors = HashSet::new();
        for tab in self.retries.take_due(now) {
            let Some(url) = sessions.navigable_url(tab) else {
                continue;
            };
            let Some(frame) = host.frame(tab) else {
                continue;
            };
            log::info!("{} reloading after relay error: {}", tab, url);
            frame.navigate(&url);
            sessions.set_loading(tab, true);
            skip_errors.insert(tab);
            report.reloaded.push(tab);
        }

        let markers = self.config.error_markers.clone();
        let ctx = SweepContext {
            now,
            markers: markers.iter().map(String::as_str).collect(),
            table: self.policies.snapshot(),
            options: self.router.options(),
            skip_errors,
        };

        let ids: Vec<TabId> = sessions
            .tabs()
            .iter()
            .filter(|t| !is_sentinel(t.url()))
            .map(|t| t.id())
            .collect();
        for id in ids {
            let Some(frame) = host.frame(id) else {
                continue;
            };
            report.visited += 1;
            self.reconcile_tab(sessions, id, frame, &ctx, &mut report);
        }
        report
    }

    /// Handle a frame's load event for one tab
    pub fn on_frame_load(
        &mut self,
        sessions: &mut SessionManager,
        tab: TabId,
        frame: &mut dyn ContentFrame,
        now: Instant,
    ) {
        if sessions.tab(tab).is_none() {
            return;
        }
        sessions.set_loading(tab, false);
        let markers = self.config.error_markers.clone();
        let ctx = SweepContext {
            now,
            markers: markers.iter().map(String::as_str).collect(),
            table: self.policies.snapshot(),
            options: self.router.options(),
            skip_errors: HashSet::new(),
        };
        let mut report = SweepReport::default();
        self.reconcile_tab(sessions, tab, frame, &ctx, &mut report);
    }

    /// Drop all loop state for a tab, cancelling its pending reload
    pub fn forget_tab(&mut self, tab: TabId) {
        self.retries.cancel(tab);
        self.observer.forget(tab);
        self.watched.remove(&tab);
    }

    /// Cancel every pending reload and remove installed policy
    pub fn teardown(&mut self, host: &mut dyn FrameHost) {
        let tabs: Vec<TabId> = self.watched.keys().copied().collect();
        for tab in tabs {
            if let Some(frame) = host.frame(tab) {
                if let Ok(doc) = frame.document() {
                    for enforcer in &self.enforcers {
                        enforcer.teardown(doc);
                    }
                }
            }
            self.forget_tab(tab);
        }
        self.retries.clear();
        log::debug!("reconciliation loop torn down");
    }

    /// Sweep on the configured interval until `shutdown` turns true
    pub async fn run<H>(
        mut self,
        sessions: SharedSessions,
        host: Arc<Mutex<H>>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Self
    where
        H: FrameHost + Send,
    {
        let mut ticker = tokio::time::interval(self.config.sweep_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        log::info!(
            "reconciliation loop started (every {:?})",
            self.config.sweep_interval
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep_shared(&sessions, &host);
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        {
            let mut host = host.lock().unwrap_or_else(PoisonError::into_inner);
            self.teardown(&mut *host);
        }
        self
    }

    fn sweep_shared<H: FrameHost>(&mut self, sessions: &SharedSessions, host: &Mutex<H>) {
        let mut sessions = sessions.lock().unwrap_or_else(PoisonError::into_inner);
        let mut host = host.lock().unwrap_or_else(PoisonError::into_inner);
        let report = self.sweep(&mut sessions, &mut *host, Instant::now());
        if !report.scheduled.is_empty() || !report.reloaded.is_empty() {
            log::debug!("sweep: {:?}", report);
        }
    }

    fn prune(&mut self, sessions: &SessionManager, report: &mut SweepReport) {
        let live: HashSet<TabId> = sessions.tabs().iter().map(|t| t.id()).collect();
        let gone: Vec<TabId> = self
            .watched
            .keys()
            .copied()
            .filter(|id| !live.contains(id))
            .collect();
        for tab in gone {
            log::debug!("{} closed, dropping its loop state", tab);
            self.forget_tab(tab);
            report.pruned += 1;
        }
    }

    fn reconcile_tab(
        &mut self,
        sessions: &mut SessionManager,
        id: TabId,
        frame: &mut dyn ContentFrame,
        ctx: &SweepContext<'_>,
        report: &mut SweepReport,
    ) {
        let observation = self.observer.observe(id, frame);
        let Some((recorded_url, recorded_title, loading)) = sessions
            .tab(id)
            .map(|t| (t.url().to_string(), t.title().to_string(), t.is_loading()))
        else {
            return;
        };

        let seen = self.watched.entry(id).or_default();
        if let Some(url) = observation.url.filter(|u| !is_sentinel(u)) {
            if url != recorded_url && seen.last_url.as_deref() != Some(url.as_str()) {
                sessions.update_url(id, &url, false);
                let literal = self.router.decode(&url);
                let title = observation
                    .title
                    .clone()
                    .unwrap_or_else(|| recorded_title.clone());
                self.history
                    .record(HistoryEntry::new(literal, title, self.clock.now_millis()));
                report.url_updates += 1;
            }
            seen.last_url = Some(url);
        }
        if let Some(title) = observation.title.filter(|t| !t.is_empty()) {
            if title != recorded_title && seen.last_title.as_deref() != Some(title.as_str()) {
                sessions.update_title(id, &title);
                report.title_updates += 1;
            }
            seen.last_title = Some(title);
        }

        let doc = match frame.document() {
            Ok(doc) => doc,
            Err(e) => {
                log::trace!("{} document unreadable: {}", id, e);
                return;
            }
        };

        if doc.matches_any(&ctx.markers) {
            report.errors_seen += 1;
            if !ctx.skip_errors.contains(&id) {
                match self.retries.on_error(id, ctx.now) {
                    RetryDecision::Scheduled { attempt, delay } => {
                        log::info!("{} relay error, retry {} in {:?}", id, attempt, delay);
                        report.scheduled.push((id, delay));
                    }
                    RetryDecision::Exhausted => {
                        log::warn!(
                            "{} relay error persists after {} retries",
                            id,
                            self.retries.max_attempts()
                        );
                    }
                    RetryDecision::AlreadyPending | RetryDecision::GaveUp => {}
                }
                // the error state is idle; only the retry table remembers it
                if loading && doc.is_loaded() {
                    sessions.set_loading(id, false);
                }
            }
        } else if doc.is_loaded() {
            self.retries.on_success(id);
            if loading {
                sessions.set_loading(id, false);
            }
        }

        let url = sessions.tab(id).map(|t| t.url().to_string()).unwrap_or_default();
        let policy = self.policy_for(&url, ctx);
        for enforcer in &self.enforcers {
            enforcer.apply(doc, policy.enabled(enforcer.kind()));
        }
    }

    /// Effective policy for a tab url; internal and same-origin pages are
    /// never policed
    fn policy_for(&self, url: &str, ctx: &SweepContext<'_>) -> EffectivePolicy {
        if is_sentinel(url) || self.router.is_internal(url) {
            return EffectivePolicy::NONE;
        }
        let literal = self.router.decode(url);
        if is_passthrough(&literal) || self.router.is_same_origin(&literal) {
            return EffectivePolicy::NONE;
        }
        match host_of(&literal) {
            Some(host) => resolve_policy(&ctx.table, &host, &ctx.options),
            None => EffectivePolicy::NONE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouterConfig;
    use crate::reconcile::{AD_OBSERVER_ID, AD_STYLE_ID, ClickGuard, FrameDocument};
    use crate::session::TabInit;
    use crate::storage::{MemoryStore, PolicyKind};
    use crate::testing::{FakeDocument, FakeFrame, FakeFrameHost, FixedClock, RecordingHistory};
    use pretty_assertions::assert_eq;

    struct Fixture {
        sessions: SessionManager,
        host: FakeFrameHost,
        looper: ReconciliationLoop,
        history: Arc<RecordingHistory>,
        store: Arc<MemoryStore>,
        start: Instant,
    }

    impl Fixture {
        fn new(options: ShellOptions) -> Self {
            let clock = Arc::new(FixedClock::default());
            let router = Arc::new(Router::new(RouterConfig::default(), options, clock.clone()));
            let history = Arc::new(RecordingHistory::default());
            let store = Arc::new(MemoryStore::new());
            let sessions = SessionManager::new(router.clone(), history.clone(), clock.clone());
            let looper = ReconciliationLoop::new(
                ReconcileConfig::default(),
                router,
                SitePolicyTable::new(store.clone()),
                history.clone(),
                clock,
            );
            Self {
                sessions,
                host: FakeFrameHost::default(),
                looper,
                history,
                store,
                start: Instant::now(),
            }
        }

        fn request(&self, input: &str) -> String {
            self.sessions.router().request_for(input).unwrap()
        }

        fn open(&mut self, input: &str) -> TabId {
            let url = self.request(input);
            let id = self.sessions.add_tab(TabInit::new(url.clone())).unwrap();
            self.host.insert(id, FakeFrame::showing(url));
            id
        }

        fn frame(&mut self, id: TabId) -> &mut FakeFrame {
            self.host.get_mut(id).unwrap()
        }

        fn sweep_at(&mut self, ms: u64) -> SweepReport {
            let now = self.start + Duration::from_millis(ms);
            self.looper.sweep(&mut self.sessions, &mut self.host, now)
        }
    }

    fn unpoliced() -> ShellOptions {
        ShellOptions {
            ad_block: false,
            popup_block: false,
            download_block: false,
            ..ShellOptions::default()
        }
    }

    #[test]
    fn test_redirect_updates_url_without_history_entry() {
        let mut f = Fixture::new(unpoliced());
        let id = f.open("example.com");
        let redirected = f.request("example.org");
        f.frame(id).location = redirected.clone();
        f.frame(id).title = "Example Org".to_string();

        let report = f.sweep_at(0);
        assert_eq!(report.url_updates, 1);
        let tab = f.sessions.tab(id).unwrap();
        assert_eq!(tab.url(), redirected);
        assert_eq!(tab.history().len(), 1);

        let entries = f.history.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].url, "https://example.org");
        assert_eq!(entries[0].title, "Example Org");

        assert_eq!(f.sweep_at(220).url_updates, 0);
        assert_eq!(f.history.entries().len(), 1);
    }

    #[test]
    fn test_title_follows_frame() {
        let mut f = Fixture::new(unpoliced());
        let id = f.open("example.com");
        f.frame(id).title = "Example Domain".to_string();

        assert_eq!(f.sweep_at(0).title_updates, 1);
        assert_eq!(f.sessions.tab(id).unwrap().title(), "Example Domain");
        assert_eq!(f.sweep_at(220).title_updates, 0);
    }

    #[test]
    fn test_cross_origin_frame_is_skipped() {
        let mut f = Fixture::new(ShellOptions::default());
        let id = f.open("example.com");
        let original = f.sessions.tab(id).unwrap().url().to_string();
        f.frame(id).location = "https://elsewhere.example/".to_string();
        f.frame(id).cross_origin = true;

        let report = f.sweep_at(0);
        assert_eq!(report.visited, 1);
        assert_eq!(report.url_updates, 0);
        assert_eq!(f.sessions.tab(id).unwrap().url(), original);
        assert!(!f.frame(id).document.has_style(AD_STYLE_ID));
    }

    #[test]
    fn test_new_tab_pages_are_not_swept() {
        let mut f = Fixture::new(ShellOptions::default());
        let id = f.sessions.add_tab(TabInit::default()).unwrap();
        f.host.insert(id, FakeFrame::showing("https://stray.example"));
        assert_eq!(f.sweep_at(0).visited, 0);
    }

    #[test]
    fn test_error_page_retries_with_backoff_then_stops() {
        let mut f = Fixture::new(unpoliced());
        let id = f.open("example.com");
        f.frame(id).document = FakeDocument::error_page();
        f.frame(id).on_navigate = Some(FakeDocument::error_page());

        let mut delays = Vec::new();
        let mut reload_times = Vec::new();
        for ms in (0..=20_000).step_by(100) {
            let report = f.sweep_at(ms);
            delays.extend(report.scheduled.iter().map(|(_, d)| d.as_millis()));
            if report.reloaded.contains(&id) {
                reload_times.push(ms);
            }
        }

        assert_eq!(delays, vec![1500, 3000, 6000]);
        assert_eq!(reload_times, vec![1500, 4600, 10_700]);
        assert_eq!(f.frame(id).navigations.len(), 3);
        assert_eq!(f.looper.retry_state(id), RetryState::Exhausted);
    }

    #[test]
    fn test_error_page_leaves_tab_idle() {
        let mut f = Fixture::new(unpoliced());
        let id = f.open("example.com");
        let unreachable = f.request("unreachable.example");
        f.sessions.update_url(id, &unreachable, true);
        f.frame(id).location = unreachable;
        f.frame(id).document = FakeDocument::error_page();
        f.frame(id).on_navigate = Some(FakeDocument::error_page());
        assert!(f.sessions.tab(id).unwrap().is_loading());

        f.sweep_at(0);
        assert!(!f.sessions.tab(id).unwrap().is_loading());

        let report = f.sweep_at(1500);
        assert_eq!(report.reloaded, vec![id]);
        assert!(f.sessions.tab(id).unwrap().is_loading());

        for ms in (1600..=20_000).step_by(100) {
            f.sweep_at(ms);
        }
        assert_eq!(f.looper.retry_state(id), RetryState::Exhausted);
        assert!(!f.sessions.tab(id).unwrap().is_loading());
    }

    #[test]
    fn test_successful_load_cancels_pending_retry() {
        let mut f = Fixture::new(unpoliced());
        let id = f.open("example.com");
        f.sessions.set_loading(id, true);
        f.frame(id).document = FakeDocument::error_page();

        assert_eq!(f.sweep_at(0).scheduled.len(), 1);
        f.frame(id).document = FakeDocument::default();
        f.sweep_at(500);

        assert_eq!(f.looper.retry_state(id), RetryState::Idle);
        assert!(!f.sessions.tab(id).unwrap().is_loading());
        assert!(f.sweep_at(2000).reloaded.is_empty());
        assert!(f.frame(id).navigations.is_empty());
    }

    #[test]
    fn test_closed_tab_drops_pending_retry() {
        let mut f = Fixture::new(unpoliced());
        let keep = f.open("example.org");
        let id = f.open("example.com");
        f.frame(id).document = FakeDocument::error_page();
        f.sweep_at(0);

        f.sessions.remove_tab(id);
        let report = f.sweep_at(2000);
        assert_eq!(report.pruned, 1);
        assert!(report.reloaded.is_empty());
        assert!(f.frame(id).navigations.is_empty());
        assert_eq!(f.looper.retry_state(id), RetryState::Idle);
        assert_eq!(f.looper.retry_state(keep), RetryState::Idle);
    }

    #[test]
    fn test_site_policy_applies_per_host() {
        let mut f = Fixture::new(unpoliced());
        let policed = f.open("example.com");
        let other = f.open("example.org");
        SitePolicyTable::new(f.store.clone())
            .set("www.example.com", PolicyKind::Ad, Some(true))
            .unwrap();

        f.sweep_at(0);
        let doc = &f.frame(policed).document;
        assert!(doc.has_style(AD_STYLE_ID));
        assert!(doc.has_observer(AD_OBSERVER_ID));
        let doc = &f.frame(other).document;
        assert!(!doc.has_style(AD_STYLE_ID));
        assert!(!doc.has_observer(AD_OBSERVER_ID));
    }

    #[test]
    fn test_policy_toggled_off_tears_down() {
        let mut f = Fixture::new(ShellOptions::default());
        let id = f.open("example.com");
        f.sweep_at(0);
        assert!(f.frame(id).document.has_style(AD_STYLE_ID));
        assert!(f.frame(id).document.window_open_blocked);

        let table = SitePolicyTable::new(f.store.clone());
        table.set("example.com", PolicyKind::Ad, Some(false)).unwrap();
        table.set("example.com", PolicyKind::Popup, Some(false)).unwrap();
        f.sweep_at(220);

        let doc = &f.frame(id).document;
        assert!(!doc.has_style(AD_STYLE_ID));
        assert!(!doc.window_open_blocked);
        assert!(!doc.guard_enabled(ClickGuard::Popup));
        assert_eq!(doc.guard_installs(ClickGuard::Popup), 1);
    }

    #[test]
    fn test_internal_and_same_origin_pages_unpoliced() {
        let mut f = Fixture::new(ShellOptions::default());
        let settings = f.open("ghost://settings");
        let local = f.sessions.add_tab(TabInit::new("http://localhost:8080/landing")).unwrap();
        f.host.insert(local, FakeFrame::showing("http://localhost:8080/landing"));

        f.sweep_at(0);
        assert!(!f.frame(settings).document.has_style(AD_STYLE_ID));
        assert!(!f.frame(local).document.has_style(AD_STYLE_ID));
        assert!(!f.frame(local).document.window_open_blocked);
    }

    #[test]
    fn test_frame_load_clears_loading() {
        let mut f = Fixture::new(unpoliced());
        let id = f.open("example.com");
        let next = f.request("example.org");
        f.sessions.update_url(id, &next, true);
        assert!(f.sessions.tab(id).unwrap().is_loading());

        let now = f.start;
        let frame = f.host.get_mut(id).unwrap();
        frame.navigate(&next);
        f.looper.on_frame_load(&mut f.sessions, id, frame, now);
        assert!(!f.sessions.tab(id).unwrap().is_loading());
    }

    #[test]
    fn test_teardown_removes_policy() {
        let mut f = Fixture::new(ShellOptions::default());
        let id = f.open("example.com");
        f.sweep_at(0);
        f.looper.teardown(&mut f.host);

        let doc = &f.frame(id).document;
        assert!(!doc.has_style(AD_STYLE_ID));
        assert!(!doc.window_open_blocked);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_sweeps_until_shutdown() {
        let mut f = Fixture::new(ShellOptions::default());
        let id = f.open("example.com");
        f.frame(id).title = "Example Domain".to_string();

        let sessions: SharedSessions = Arc::new(Mutex::new(f.sessions));
        let host = Arc::new(Mutex::new(f.host));
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(f.looper.run(sessions.clone(), host.clone(), rx));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(
            sessions.lock().unwrap().tab(id).unwrap().title(),
            "Example Domain"
        );
        assert!(host.lock().unwrap().get(id).unwrap().document.has_style(AD_STYLE_ID));

        tx.send(true).unwrap();
        let looper = handle.await.unwrap();
        assert_eq!(looper.retry_state(id), RetryState::Idle);
        assert!(!host.lock().unwrap().get(id).unwrap().document.has_style(AD_STYLE_ID));
    }
}
