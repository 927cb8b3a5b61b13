//! Reflecting a frame's address and title back into the tab record

use std::collections::HashMap;

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

use super::frame::ContentFrame;
use crate::session::TabId;

/// What a frame currently shows; `None` when unknown or unreadable
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Observation {
    pub url: Option<String>,
    pub title: Option<String>,
}

/// Source of frame observations
pub trait ObservedLocation: Send {
    fn observe(&mut self, tab: TabId, frame: &mut dyn ContentFrame) -> Observation;

    /// Drop any state kept for a tab
    fn forget(&mut self, tab: TabId);
}

/// Reads the frame directly on every sweep
#[derive(Debug, Default)]
pub struct PollingObserver;

impl ObservedLocation for PollingObserver {
    fn observe(&mut self, tab: TabId, frame: &mut dyn ContentFrame) -> Observation {
        let url = frame
            .location()
            .inspect_err(|e| log::trace!("{} location unreadable: {}", tab, e))
            .ok();
        let title = frame
            .title()
            .inspect_err(|e| log::trace!("{} title unreadable: {}", tab, e))
            .ok();
        Observation { url, title }
    }

    fn forget(&mut self, _tab: TabId) {}
}

/// Message a frame posts to its parent when it changes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameMessage {
    Location { tab: TabId, url: String },
    Title { tab: TabId, title: String },
}

/// Push-based observer fed by frames posting [`FrameMessage`]s
pub struct ChannelObserver {
    rx: UnboundedReceiver<FrameMessage>,
    pending: HashMap<TabId, Observation>,
}

impl ChannelObserver {
    pub fn channel() -> (UnboundedSender<FrameMessage>, Self) {
        let (tx, rx) = unbounded_channel();
        (
            tx,
            Self {
                rx,
                pending: HashMap::new(),
            },
        )
    }

    fn drain(&mut self) {
        while let Ok(message) = self.rx.try_recv() {
            match message {
                FrameMessage::Location { tab, url } => {
                    self.pending.entry(tab).or_default().url = Some(url);
                }
                FrameMessage::Title { tab, title } => {
                    self.pending.entry(tab).or_default().title = Some(title);
                }
            }
        }
    }
}

impl ObservedLocation for ChannelObserver {
    fn observe(&mut self, tab: TabId, _frame: &mut dyn ContentFrame) -> Observation {
        self.drain();
        self.pending.remove(&tab).unwrap_or_default()
    }

    fn forget(&mut self, tab: TabId) {
        self.pending.remove(&tab);
    }
}
