//! In-memory fakes for the shell's ports
//!
//! Used by the unit tests, the integration tests and the benchmarks to drive
//! the session store and the reconciliation loop without a real frame.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::reconcile::{ClickGuard, ContentFrame, FrameAccessError, FrameDocument, FrameHost};
use crate::session::{TabId, ZoomSurface, ZoomTransform};
use crate::storage::{HistoryEntry, HistorySink};
use crate::utils::Clock;

/// Clock pinned to a settable instant
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Noon UTC on `date`
    pub fn on(date: NaiveDate) -> Self {
        let noon = NaiveTime::from_hms_opt(12, 0, 0).unwrap_or_default();
        Self::at(Utc.from_utc_datetime(&date.and_time(noon)))
    }

    /// Move to `date`, keeping the time of day
    pub fn set_date(&self, date: NaiveDate) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now = Utc.from_utc_datetime(&date.and_time(now.time()));
    }

    pub fn advance_millis(&self, millis: i64) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += Duration::milliseconds(millis);
    }
}

impl Default for FixedClock {
    fn default() -> Self {
        Self::on(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap_or_default())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// History sink that keeps every entry in arrival order
#[derive(Debug, Default)]
pub struct RecordingHistory {
    entries: Mutex<Vec<HistoryEntry>>,
}

impl RecordingHistory {
    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl HistorySink for RecordingHistory {
    fn record(&self, entry: HistoryEntry) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }
}

/// Zoom surface that remembers what was applied
#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub applied: Vec<ZoomTransform>,
}

impl RecordingSurface {
    pub fn last(&self) -> Option<ZoomTransform> {
        self.applied.last().copied()
    }
}

impl ZoomSurface for RecordingSurface {
    fn apply_zoom(&mut self, transform: ZoomTransform) {
        self.applied.push(transform);
    }
}

/// Document modelled as a set of matching selectors
#[derive(Debug, Clone)]
pub struct FakeDocument {
    pub loaded: bool,
    /// Selectors that currently match at least one element
    pub elements: HashSet<String>,
    pub markers: HashSet<String>,
    pub styles: HashMap<String, String>,
    pub observers: HashMap<String, Vec<String>>,
    /// Every click guard ever attached, in order
    pub guards: Vec<ClickGuard>,
    pub enabled_guards: HashSet<ClickGuard>,
    pub window_open_blocked: bool,
    pub removed: usize,
}

impl Default for FakeDocument {
    fn default() -> Self {
        Self {
            loaded: true,
            elements: HashSet::new(),
            markers: HashSet::new(),
            styles: HashMap::new(),
            observers: HashMap::new(),
            guards: Vec::new(),
            enabled_guards: HashSet::new(),
            window_open_blocked: false,
            removed: 0,
        }
    }
}

impl FakeDocument {
    pub fn with_elements(selectors: &[&str]) -> Self {
        Self {
            elements: selectors.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }

    /// Relay-rendered error page
    pub fn error_page() -> Self {
        Self::with_elements(&["#relay-error"])
    }

    /// Add elements as a page script would; live observers remove matches
    pub fn mutate(&mut self, added: &[&str]) {
        for selector in added {
            let observed = self
                .observers
                .values()
                .any(|watched| watched.iter().any(|w| w == selector));
            if observed {
                self.removed += 1;
            } else {
                self.elements.insert(selector.to_string());
            }
        }
    }

    pub fn guard_installs(&self, guard: ClickGuard) -> usize {
        self.guards.iter().filter(|g| **g == guard).count()
    }

    pub fn guard_enabled(&self, guard: ClickGuard) -> bool {
        self.enabled_guards.contains(&guard)
    }
}

impl FrameDocument for FakeDocument {
    fn is_loaded(&self) -> bool {
        self.loaded
    }

    fn matches_any(&self, selectors: &[&str]) -> bool {
        selectors.iter().any(|s| self.elements.contains(*s))
    }

    fn has_marker(&self, marker: &str) -> bool {
        self.markers.contains(marker)
    }

    fn set_marker(&mut self, marker: &str) {
        self.markers.insert(marker.to_string());
    }

    fn has_style(&self, id: &str) -> bool {
        self.styles.contains_key(id)
    }

    fn insert_style(&mut self, id: &str, css: &str) {
        self.styles.insert(id.to_string(), css.to_string());
    }

    fn remove_style(&mut self, id: &str) {
        self.styles.remove(id);
    }

    fn remove_matching(&mut self, selectors: &[&str]) -> usize {
        let before = self.elements.len();
        self.elements.retain(|e| !selectors.contains(&e.as_str()));
        let removed = before - self.elements.len();
        self.removed += removed;
        removed
    }

    fn has_observer(&self, id: &str) -> bool {
        self.observers.contains_key(id)
    }

    fn observe_mutations(&mut self, id: &str, selectors: &[&str]) {
        self.observers.insert(
            id.to_string(),
            selectors.iter().map(|s| s.to_string()).collect(),
        );
    }

    fn disconnect_observer(&mut self, id: &str) {
        self.observers.remove(id);
    }

    fn add_click_guard(&mut self, guard: ClickGuard) {
        self.guards.push(guard);
    }

    fn set_guard_enabled(&mut self, guard: ClickGuard, enabled: bool) {
        if enabled {
            self.enabled_guards.insert(guard);
        } else {
            self.enabled_guards.remove(&guard);
        }
    }

    fn set_window_open_blocked(&mut self, blocked: bool) {
        self.window_open_blocked = blocked;
    }
}

/// Content frame with scriptable reads
#[derive(Debug, Clone, Default)]
pub struct FakeFrame {
    pub location: String,
    pub title: String,
    pub cross_origin: bool,
    pub detached: bool,
    pub document: FakeDocument,
    /// Document shown after each navigation; a blank one when `None`
    pub on_navigate: Option<FakeDocument>,
    pub navigations: Vec<String>,
    pub zoom: Option<ZoomTransform>,
}

impl FakeFrame {
    pub fn showing(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            ..Self::default()
        }
    }

    fn check_access(&self) -> Result<(), FrameAccessError> {
        if self.detached {
            Err(FrameAccessError::Detached)
        } else if self.cross_origin {
            Err(FrameAccessError::CrossOrigin)
        } else {
            Ok(())
        }
    }
}

impl ZoomSurface for FakeFrame {
    fn apply_zoom(&mut self, transform: ZoomTransform) {
        self.zoom = Some(transform);
    }
}

impl ContentFrame for FakeFrame {
    fn location(&self) -> Result<String, FrameAccessError> {
        self.check_access()?;
        Ok(self.location.clone())
    }

    fn title(&self) -> Result<String, FrameAccessError> {
        self.check_access()?;
        Ok(self.title.clone())
    }

    fn document(&mut self) -> Result<&mut dyn FrameDocument, FrameAccessError> {
        self.check_access()?;
        let doc: &mut dyn FrameDocument = &mut self.document;
        Ok(doc)
    }

    fn navigate(&mut self, url: &str) {
        self.navigations.push(url.to_string());
        self.location = url.to_string();
        self.document = self.on_navigate.clone().unwrap_or_default();
    }
}

/// Frame host backed by a map of fake frames
#[derive(Debug, Default)]
pub struct FakeFrameHost {
    pub frames: HashMap<TabId, FakeFrame>,
}

impl FakeFrameHost {
    pub fn insert(&mut self, tab: TabId, frame: FakeFrame) {
        self.frames.insert(tab, frame);
    }

    pub fn get(&self, tab: TabId) -> Option<&FakeFrame> {
        self.frames.get(&tab)
    }

    pub fn get_mut(&mut self, tab: TabId) -> Option<&mut FakeFrame> {
        self.frames.get_mut(&tab)
    }
}

impl FrameHost for FakeFrameHost {
    fn frame(&mut self, tab: TabId) -> Option<&mut dyn ContentFrame> {
        match self.frames.get_mut(&tab) {
            Some(frame) => Some(frame),
            None => None,
        }
    }
}
