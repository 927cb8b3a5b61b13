//! Tab session store
//!
//! Owns the tab collection, the closed-tab stack and per-tab zoom. Every
//! public mutator is one atomic transition that leaves these invariants
//! intact:
//! - `history_index < history.len()` for every tab
//! - exactly one tab is active whenever the collection is non-empty
//! - at most [`MAX_TABS`] tabs and [`CLOSED_TAB_CAPACITY`] closed snapshots
//!
//! Capacity overruns are silent no-ops. `revision()` increments on every
//! change so observers can detect updates without diffing.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::closed::{CLOSED_TAB_CAPACITY, ClosedTabs};
use super::tab::{Tab, TabId, TabInit};
use super::zoom::{ZoomLevel, ZoomSurface};
use crate::router::{NEW_TAB, Router, is_sentinel};
use crate::storage::{HistoryEntry, HistorySink, KeyValueStore, read_json, write_json};
use crate::utils::{Clock, Result};

/// Maximum number of open tabs
pub const MAX_TABS: usize = 20;

/// Key under which the saved-tabs snapshot is persisted
pub const SAVED_TABS_KEY: &str = "savedTabs";

/// Persisted session snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub tabs: Vec<Tab>,
}

/// The tab session store
pub struct SessionManager {
    tabs: Vec<Tab>,
    closed: ClosedTabs,
    zoom: HashMap<TabId, ZoomLevel>,
    next_id: u64,
    revision: u64,
    router: Arc<Router>,
    history: Arc<dyn HistorySink>,
    clock: Arc<dyn Clock>,
    autosave: Option<Arc<dyn KeyValueStore>>,
}

impl SessionManager {
    /// Create an empty store
    pub fn new(router: Arc<Router>, history: Arc<dyn HistorySink>, clock: Arc<dyn Clock>) -> Self {
        Self {
            tabs: Vec::new(),
            closed: ClosedTabs::new(),
            zoom: HashMap::new(),
            next_id: 1,
            revision: 0,
            router,
            history,
            clock,
            autosave: None,
        }
    }

    /// Write the snapshot to `store` after every mutation while the
    /// `saveTabs` option is on
    pub fn enable_autosave(&mut self, store: Arc<dyn KeyValueStore>) {
        self.autosave = Some(store);
    }

    pub fn disable_autosave(&mut self) {
        self.autosave = None;
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    // ---- reads ----

    pub fn tabs(&self) -> &[Tab] {
        &self.tabs
    }

    pub fn tab(&self, id: TabId) -> Option<&Tab> {
        self.tabs.iter().find(|t| t.id == id)
    }

    pub fn active_tab(&self) -> Option<&Tab> {
        self.tabs.iter().find(|t| t.active)
    }

    pub fn count(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    pub fn closed_tabs(&self) -> &ClosedTabs {
        &self.closed
    }

    /// Change counter, bumped by every mutation
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Zoom level of a tab (default when never set)
    pub fn zoom(&self, id: TabId) -> ZoomLevel {
        self.zoom.get(&id).copied().unwrap_or_default()
    }

    /// Re-derive the request url for the tab's current literal address
    pub fn navigable_url(&self, id: TabId) -> Option<String> {
        let tab = self.tab(id)?;
        if is_sentinel(&tab.url) || self.router.is_internal(&tab.url) {
            return Some(tab.url.clone());
        }
        let literal = self.router.decode(&tab.url);
        if self.router.is_same_origin(&literal) {
            return Some(tab.url.clone());
        }
        self.router.request_for(&literal)
    }

    // ---- collection actions ----

    /// Append a tab. Returns `None` when [`MAX_TABS`] are already open.
    pub fn add_tab(&mut self, init: TabInit) -> Option<TabId> {
        if self.tabs.len() >= MAX_TABS {
            log::debug!("tab ceiling reached, add ignored");
            return None;
        }

        let id = self.allocate_id();
        let activate = init.active || self.tabs.is_empty();
        let mut tab = Tab::from_init(id, init);
        tab.active = activate;
        if activate {
            self.deactivate_all();
        }
        self.tabs.push(tab);
        self.touch();
        Some(id)
    }

    /// Remove a tab, keeping a snapshot in the closed-tab stack. If the
    /// removed tab was active its left neighbor (or right, when it was
    /// first) becomes active.
    pub fn remove_tab(&mut self, id: TabId) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };

        let mut snapshot = self.tabs.remove(index);
        let was_active = snapshot.active;
        snapshot.active = false;
        snapshot.is_loading = false;
        self.closed.push(snapshot);
        self.zoom.remove(&id);

        if was_active && !self.tabs.is_empty() {
            let fallback = index.saturating_sub(1).min(self.tabs.len() - 1);
            self.tabs[fallback].active = true;
        }
        self.touch();
        true
    }

    /// Restore the most recently closed tab under a fresh id and focus it.
    /// No-op when the stack is empty or the tab ceiling is reached.
    pub fn reopen_closed_tab(&mut self) -> Option<TabId> {
        if self.tabs.len() >= MAX_TABS {
            log::debug!("tab ceiling reached, reopen ignored");
            return None;
        }
        let mut tab = self.closed.pop()?;

        tab.id = self.allocate_id();
        tab.active = true;
        tab.is_loading = !is_sentinel(&tab.url);
        let id = tab.id;
        self.deactivate_all();
        self.tabs.push(tab);
        self.touch();
        Some(id)
    }

    /// Make `id` the only active tab
    pub fn set_active(&mut self, id: TabId) -> bool {
        if self.index_of(id).is_none() {
            return false;
        }
        for tab in &mut self.tabs {
            tab.active = tab.id == id;
        }
        self.touch();
        true
    }

    /// Activate the tab left of `id`, or the one right of it when `id` is
    /// first. Used before closing the current tab.
    pub fn set_last_active(&mut self, id: TabId) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        let target = if index > 0 {
            index - 1
        } else if self.tabs.len() > 1 {
            1
        } else {
            index
        };
        let target_id = self.tabs[target].id;
        self.set_active(target_id)
    }

    pub fn set_pinned(&mut self, id: TabId, pinned: bool) -> bool {
        self.mutate(id, |tab| tab.pinned = pinned)
    }

    pub fn set_group(&mut self, id: TabId, group: Option<String>) -> bool {
        self.mutate(id, |tab| tab.group = group)
    }

    // ---- navigation ----

    /// Point a tab at `url`.
    ///
    /// With `add_to_history`, forward entries past the cursor are dropped,
    /// `url` is appended, the tab starts loading (unless it is the new-tab
    /// page) and the visit is written to the history log. Without it, only
    /// the current url changes, for redirects reported by the frame.
    pub fn update_url(&mut self, id: TabId, url: &str, add_to_history: bool) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };

        let tab = &mut self.tabs[index];
        tab.url = url.to_string();
        if add_to_history {
            tab.history.truncate(tab.history_index + 1);
            tab.history.push(url.to_string());
            tab.history_index = tab.history.len() - 1;
            tab.is_loading = url != NEW_TAB;
        }
        let title = tab.title.clone();

        if add_to_history && !is_sentinel(url) {
            self.log_visit(url, &title);
        }
        self.touch();
        true
    }

    /// Write the tab's current address to the history log; the new-tab
    /// page is never logged
    pub fn record_visit(&self, id: TabId) -> bool {
        match self.tab(id) {
            Some(tab) if !is_sentinel(&tab.url) => {
                self.log_visit(&tab.url, &tab.title);
                true
            }
            _ => false,
        }
    }

    /// Step back one history entry. `on_new_tab` runs when the entry landed
    /// on is the new-tab page.
    pub fn go_back(&mut self, id: TabId, on_new_tab: impl FnOnce()) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        if self.tabs[index].history_index == 0 {
            return false;
        }
        let landed_on_new_tab = self.move_cursor(index, -1);
        self.touch();
        if landed_on_new_tab {
            on_new_tab();
        }
        true
    }

    /// Step forward one history entry
    pub fn go_forward(&mut self, id: TabId) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        if !self.tabs[index].can_go_forward() {
            return false;
        }
        self.move_cursor(index, 1);
        self.touch();
        true
    }

    // ---- reconciliation setters ----

    pub fn update_title(&mut self, id: TabId, title: &str) -> bool {
        self.mutate(id, |tab| tab.title = title.to_string())
    }

    pub fn set_loading(&mut self, id: TabId, loading: bool) -> bool {
        self.mutate(id, |tab| tab.is_loading = loading)
    }

    // ---- zoom ----

    /// Set a tab's zoom (clamped to [50, 200]) and apply it to `surface`
    pub fn set_zoom(
        &mut self,
        id: TabId,
        percent: i32,
        surface: &mut dyn ZoomSurface,
    ) -> Option<ZoomLevel> {
        self.index_of(id)?;
        let level = ZoomLevel::new(percent);
        surface.apply_zoom(level.transform());
        self.zoom.insert(id, level);
        self.touch();
        Some(level)
    }

    pub fn reset_zoom(&mut self, id: TabId, surface: &mut dyn ZoomSurface) -> Option<ZoomLevel> {
        self.set_zoom(id, ZoomLevel::default().percent() as i32, surface)
    }

    pub fn zoom_in(&mut self, id: TabId, surface: &mut dyn ZoomSurface) -> Option<ZoomLevel> {
        let next = self.zoom(id).zoomed_in();
        self.set_zoom(id, next.percent() as i32, surface)
    }

    pub fn zoom_out(&mut self, id: TabId, surface: &mut dyn ZoomSurface) -> Option<ZoomLevel> {
        let next = self.zoom(id).zoomed_out();
        self.set_zoom(id, next.percent() as i32, surface)
    }

    // ---- persistence ----

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            tabs: self.tabs.clone(),
        }
    }

    /// Write the snapshot now (visibility change, unload)
    pub fn persist_now(&self, store: &dyn KeyValueStore) -> Result<()> {
        write_json(store, SAVED_TABS_KEY, &self.snapshot())
    }

    /// Replace the collection with a saved snapshot. Tabs get fresh ids,
    /// cursors are clamped and exactly one tab ends up active. Returns the
    /// number of restored tabs.
    pub fn restore(&mut self, snapshot: SessionSnapshot) -> usize {
        self.tabs.clear();
        self.zoom.clear();

        for mut tab in snapshot.tabs.into_iter().take(MAX_TABS) {
            tab.id = self.allocate_id();
            if tab.history.is_empty() {
                tab.history.push(tab.url.clone());
            }
            tab.history_index = tab.history_index.min(tab.history.len() - 1);
            tab.is_loading = false;
            self.tabs.push(tab);
        }

        let first_active = self.tabs.iter().position(|t| t.active);
        for (i, tab) in self.tabs.iter_mut().enumerate() {
            tab.active = Some(i) == first_active.or(Some(0));
        }

        self.touch();
        self.tabs.len()
    }

    /// Restore from the saved-tabs record, if any
    pub fn load_saved(&mut self, store: &dyn KeyValueStore) -> usize {
        match read_json::<SessionSnapshot>(store, SAVED_TABS_KEY) {
            Some(snapshot) if !snapshot.tabs.is_empty() => self.restore(snapshot),
            _ => 0,
        }
    }

    // ---- internals ----

    fn allocate_id(&mut self) -> TabId {
        let id = TabId::new(self.next_id);
        self.next_id += 1;
        id
    }

    fn index_of(&self, id: TabId) -> Option<usize> {
        self.tabs.iter().position(|t| t.id == id)
    }

    fn deactivate_all(&mut self) {
        for tab in &mut self.tabs {
            tab.active = false;
        }
    }

    /// Move the cursor by one; returns true when it lands on the new-tab page
    fn move_cursor(&mut self, index: usize, delta: isize) -> bool {
        let tab = &mut self.tabs[index];
        tab.history_index = tab.history_index.saturating_add_signed(delta);
        tab.url = tab.history[tab.history_index].clone();
        tab.is_loading = tab.url != NEW_TAB;
        tab.url == NEW_TAB
    }

    fn mutate(&mut self, id: TabId, apply: impl FnOnce(&mut Tab)) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        apply(&mut self.tabs[index]);
        self.touch();
        true
    }

    fn log_visit(&self, url: &str, title: &str) {
        let literal = self.router.decode(url);
        self.history
            .record(HistoryEntry::new(literal, title, self.clock.now_millis()));
    }

    fn touch(&mut self) {
        self.revision += 1;
        let Some(store) = &self.autosave else {
            return;
        };
        if self.router.options().save_tabs {
            if let Err(e) = write_json(store.as_ref(), SAVED_TABS_KEY, &self.snapshot()) {
                log::warn!("session autosave failed: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RouterConfig, ShellOptions};
    use crate::storage::{MemoryStore, MockHistorySink};
    use crate::testing::{FixedClock, RecordingHistory, RecordingSurface};
    use pretty_assertions::assert_eq;

    fn manager_with(history: Arc<dyn HistorySink>) -> SessionManager {
        let clock = Arc::new(FixedClock::default());
        let router = Arc::new(Router::new(
            RouterConfig::default(),
            ShellOptions::default(),
            clock.clone(),
        ));
        SessionManager::new(router, history, clock)
    }

    fn manager() -> SessionManager {
        manager_with(Arc::new(RecordingHistory::default()))
    }

    fn active_count(m: &SessionManager) -> usize {
        m.tabs().iter().filter(|t| t.is_active()).count()
    }

    #[test]
    fn test_first_tab_always_active() {
        let mut m = manager();
        let id = m.add_tab(TabInit::new("a").background()).unwrap();
        assert!(m.tab(id).unwrap().is_active());
    }

    #[test]
    fn test_add_activates_and_deactivates_others() {
        let mut m = manager();
        let a = m.add_tab(TabInit::new("a")).unwrap();
        let b = m.add_tab(TabInit::new("b")).unwrap();
        assert!(!m.tab(a).unwrap().is_active());
        assert!(m.tab(b).unwrap().is_active());

        let c = m.add_tab(TabInit::new("c").background()).unwrap();
        assert!(!m.tab(c).unwrap().is_active());
        assert_eq!(active_count(&m), 1);
    }

    #[test]
    fn test_tab_ceiling() {
        let mut m = manager();
        for i in 0..MAX_TABS {
            assert!(m.add_tab(TabInit::new(format!("t{}", i))).is_some());
        }
        assert!(m.add_tab(TabInit::new("overflow")).is_none());
        assert_eq!(m.count(), MAX_TABS);
    }

    #[test]
    fn test_ids_never_reused() {
        let mut m = manager();
        let a = m.add_tab(TabInit::default()).unwrap();
        m.remove_tab(a);
        let b = m.add_tab(TabInit::default()).unwrap();
        assert_ne!(a, b);
        let c = m.reopen_closed_tab().unwrap();
        assert_ne!(c, a);
        assert_ne!(c, b);
    }

    #[test]
    fn test_remove_active_falls_back_to_neighbor() {
        let mut m = manager();
        let a = m.add_tab(TabInit::new("a")).unwrap();
        let b = m.add_tab(TabInit::new("b")).unwrap();
        let c = m.add_tab(TabInit::new("c")).unwrap();

        m.set_active(b);
        assert!(m.remove_tab(b));
        assert_eq!(m.active_tab().map(|t| t.id()), Some(a));

        m.set_active(a);
        m.remove_tab(a);
        assert_eq!(m.active_tab().map(|t| t.id()), Some(c));

        m.remove_tab(c);
        assert!(m.active_tab().is_none());
        assert_eq!(m.closed_tabs().len(), 3);
    }

    #[test]
    fn test_removed_snapshot_is_deactivated() {
        let mut m = manager();
        let a = m.add_tab(TabInit::new("a")).unwrap();
        m.remove_tab(a);
        let snapshot = m.closed_tabs().peek().unwrap();
        assert!(!snapshot.is_active());
        assert_eq!(snapshot.url(), "a");
    }

    #[test]
    fn test_reopen_restores_and_focuses() {
        let mut m = manager();
        let a = m.add_tab(TabInit::new("a")).unwrap();
        let b = m.add_tab(TabInit::new("b")).unwrap();
        m.remove_tab(a);

        let restored = m.reopen_closed_tab().unwrap();
        let tab = m.tab(restored).unwrap();
        assert_eq!(tab.url(), "a");
        assert!(tab.is_active());
        assert!(!m.tab(b).unwrap().is_active());
        assert!(m.closed_tabs().is_empty());
        assert!(m.reopen_closed_tab().is_none());
    }

    #[test]
    fn test_reopen_respects_ceiling() {
        let mut m = manager();
        let first = m.add_tab(TabInit::new("x")).unwrap();
        m.remove_tab(first);
        for i in 0..MAX_TABS {
            m.add_tab(TabInit::new(format!("t{}", i)));
        }
        assert!(m.reopen_closed_tab().is_none());
        assert_eq!(m.closed_tabs().len(), 1);
    }

    #[test]
    fn test_set_last_active() {
        let mut m = manager();
        let a = m.add_tab(TabInit::new("a")).unwrap();
        let b = m.add_tab(TabInit::new("b")).unwrap();

        m.set_last_active(b);
        assert_eq!(m.active_tab().map(|t| t.id()), Some(a));
        m.set_last_active(a);
        assert_eq!(m.active_tab().map(|t| t.id()), Some(b));
        assert!(!m.set_last_active(TabId::new(999)));
    }

    #[test]
    fn test_update_url_pushes_history() {
        let history = Arc::new(RecordingHistory::default());
        let mut m = manager_with(history.clone());
        let id = m.add_tab(TabInit::default()).unwrap();
        let request = m.router().request_for("example.com").unwrap();

        m.update_url(id, &request, true);
        let tab = m.tab(id).unwrap();
        assert_eq!(tab.history().len(), 2);
        assert_eq!(tab.history_index(), 1);
        assert!(tab.is_loading());

        let entries = history.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].url, "https://example.com");
    }

    #[test]
    fn test_update_url_truncates_forward_history() {
        let mut m = manager();
        let id = m.add_tab(TabInit::new("a")).unwrap();
        m.update_url(id, "b", true);
        m.update_url(id, "c", true);
        m.go_back(id, || {});
        m.go_back(id, || {});
        m.update_url(id, "d", true);

        let tab = m.tab(id).unwrap();
        assert_eq!(tab.history(), ["a".to_string(), "d".to_string()]);
        assert_eq!(tab.history_index(), 1);
        assert!(!tab.can_go_forward());
    }

    #[test]
    fn test_silent_update_leaves_history() {
        let mut mock = MockHistorySink::new();
        mock.expect_record().times(0);
        let mut m = manager_with(Arc::new(mock));
        let id = m.add_tab(TabInit::new("a")).unwrap();

        m.update_url(id, "a-redirected", false);
        let tab = m.tab(id).unwrap();
        assert_eq!(tab.url(), "a-redirected");
        assert_eq!(tab.history(), ["a".to_string()]);
        assert!(!tab.is_loading());
    }

    #[test]
    fn test_new_tab_url_not_logged_or_loading() {
        let mut mock = MockHistorySink::new();
        mock.expect_record().times(0);
        let mut m = manager_with(Arc::new(mock));
        let id = m.add_tab(TabInit::new("a")).unwrap();

        m.update_url(id, NEW_TAB, true);
        assert!(!m.tab(id).unwrap().is_loading());
    }

    #[test]
    fn test_back_and_forward() {
        let mut m = manager();
        let id = m.add_tab(TabInit::new("A")).unwrap();
        m.update_url(id, "B", true);

        assert!(m.go_back(id, || {}));
        assert_eq!(m.tab(id).unwrap().history_index(), 0);
        assert_eq!(m.tab(id).unwrap().url(), "A");
        assert!(!m.go_back(id, || {}));

        assert!(m.go_forward(id));
        assert_eq!(m.tab(id).unwrap().history_index(), 1);
        assert_eq!(m.tab(id).unwrap().url(), "B");
        assert!(!m.go_forward(id));
    }

    #[test]
    fn test_back_to_new_tab_runs_callback() {
        let mut m = manager();
        let id = m.add_tab(TabInit::default()).unwrap();
        m.update_url(id, "B", true);

        let mut reset = false;
        m.go_back(id, || reset = true);
        assert!(reset);
        assert!(!m.tab(id).unwrap().is_loading());
    }

    #[test]
    fn test_zoom_clamped_applied_and_pruned() {
        let mut m = manager();
        let id = m.add_tab(TabInit::default()).unwrap();
        let mut surface = RecordingSurface::default();

        let level = m.set_zoom(id, 250, &mut surface).unwrap();
        assert_eq!(level.percent(), 200);
        assert_eq!(surface.last().map(|t| t.scale), Some(2.0));

        m.zoom_out(id, &mut surface);
        assert_eq!(m.zoom(id).percent(), 190);

        m.reset_zoom(id, &mut surface);
        assert_eq!(m.zoom(id).percent(), 100);

        m.set_zoom(id, 10, &mut surface);
        assert_eq!(m.zoom(id).percent(), 50);

        m.remove_tab(id);
        assert_eq!(m.zoom(id).percent(), 100);
        assert!(m.set_zoom(id, 120, &mut surface).is_none());
    }

    #[test]
    fn test_title_loading_setters() {
        let mut m = manager();
        let id = m.add_tab(TabInit::default()).unwrap();
        let before = m.revision();
        assert!(m.update_title(id, "Example"));
        assert!(m.set_loading(id, true));
        assert_eq!(m.tab(id).unwrap().title(), "Example");
        assert!(m.tab(id).unwrap().is_loading());
        assert_eq!(m.revision(), before + 2);
        assert!(!m.update_title(TabId::new(42), "x"));
    }

    #[test]
    fn test_pin_and_group() {
        let mut m = manager();
        let id = m.add_tab(TabInit::default()).unwrap();
        m.set_pinned(id, true);
        m.set_group(id, Some("research".to_string()));
        let tab = m.tab(id).unwrap();
        assert!(tab.is_pinned());
        assert_eq!(tab.group(), Some("research"));
    }

    #[test]
    fn test_navigable_url_rederives_request() {
        let mut m = manager();
        let request = m.router().request_for("example.com").unwrap();
        let id = m.add_tab(TabInit::new(request.clone())).unwrap();
        assert_eq!(m.navigable_url(id), Some(request));

        let home = m.add_tab(TabInit::new("/home?internal=1")).unwrap();
        assert_eq!(m.navigable_url(home).as_deref(), Some("/home?internal=1"));

        let landing = m
            .add_tab(TabInit::new("http://localhost:8080/landing"))
            .unwrap();
        assert_eq!(
            m.navigable_url(landing).as_deref(),
            Some("http://localhost:8080/landing")
        );
    }

    #[test]
    fn test_autosave_and_restore() {
        let store = Arc::new(MemoryStore::new());
        let mut m = manager();
        m.enable_autosave(store.clone());
        let a = m.add_tab(TabInit::new("a")).unwrap();
        m.update_url(a, "b", true);
        m.add_tab(TabInit::new("c").background());

        let mut restored = manager();
        assert_eq!(restored.load_saved(store.as_ref()), 2);
        let tabs = restored.tabs();
        assert_eq!(tabs[0].url(), "b");
        assert_eq!(tabs[0].history_index(), 1);
        assert!(tabs[0].is_active());
        assert!(!tabs[1].is_active());
    }

    #[test]
    fn test_autosave_respects_save_tabs_option() {
        let store = Arc::new(MemoryStore::new());
        let mut m = manager();
        m.router().set_options(ShellOptions {
            save_tabs: false,
            ..ShellOptions::default()
        });
        m.enable_autosave(store.clone());
        let a = m.add_tab(TabInit::new("a")).unwrap();
        m.update_url(a, "b", true);
        assert!(store.is_empty());

        m.router().set_options(ShellOptions::default());
        m.update_title(a, "B");
        assert_eq!(manager().load_saved(store.as_ref()), 1);
    }

    #[test]
    fn test_restore_repairs_invariants() {
        let mut source = manager();
        let a = source.add_tab(TabInit::new("a")).unwrap();
        source.add_tab(TabInit::new("b")).unwrap();
        source.set_active(a);
        let mut snapshot = source.snapshot();
        for tab in &mut snapshot.tabs {
            tab.active = true;
            tab.history_index = 9;
        }

        let mut m = manager();
        m.restore(snapshot);
        assert_eq!(active_count(&m), 1);
        assert!(m.tabs().iter().all(|t| t.history_index() < t.history().len()));
    }

    #[test]
    fn test_persist_now() {
        let store = MemoryStore::new();
        let mut m = manager();
        m.add_tab(TabInit::new("a"));
        m.persist_now(&store).unwrap();
        assert!(store.get(SAVED_TABS_KEY).unwrap().contains("\"tabs\""));
    }
}
