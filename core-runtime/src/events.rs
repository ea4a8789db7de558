//! # Explorer events
//!
//! State changes are broadcast over `tokio::sync::broadcast` so a
//! presentation layer can decide what to re-render without polling the store.
//! The explorer emits; any number of views subscribe. Past events are never
//! replayed, and a subscriber that falls too far behind gets
//! `RecvError::Lagged` and should re-read the store.
//!
//! ```rust
//! use core_runtime::events::{EventBus, ExplorerEvent, SaveEvent};
//! use std::path::PathBuf;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(100);
//! let mut stream = bus.subscribe();
//!
//! bus.emit(ExplorerEvent::Save(SaveEvent::InProgress {
//!     folder: PathBuf::from("/media/usb"),
//! }))
//! .ok();
//!
//! let event = stream.recv().await.unwrap();
//! assert!(event.is_blocking());
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, SendError};

pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

/// Top-level event enum published through the event bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum ExplorerEvent {
    /// Store structure changes
    Tree(TreeEvent),
    /// Save progress for one folder
    Save(SaveEvent),
    /// Copy/cut staging changes
    Clipboard(ClipboardEvent),
}

impl ExplorerEvent {
    /// Paths a view showing them should refresh
    pub fn affected_paths(&self) -> Vec<&Path> {
        match self {
            ExplorerEvent::Tree(TreeEvent::RootOpened { path })
            | ExplorerEvent::Tree(TreeEvent::FolderLoaded { path, .. })
            | ExplorerEvent::Clipboard(ClipboardEvent::Staged { path, .. }) => vec![path.as_path()],
            ExplorerEvent::Tree(TreeEvent::ItemsChanged { paths }) => {
                paths.iter().map(PathBuf::as_path).collect()
            }
            ExplorerEvent::Save(save) => vec![save.folder()],
            ExplorerEvent::Clipboard(ClipboardEvent::Cleared) => Vec::new(),
        }
    }

    /// Whether the event concerns `folder` or anything below it
    pub fn touches(&self, folder: &Path) -> bool {
        self.affected_paths()
            .iter()
            .any(|path| path.starts_with(folder))
    }

    /// A save is running and the UI should hold off further input
    pub fn is_blocking(&self) -> bool {
        matches!(self, ExplorerEvent::Save(SaveEvent::InProgress { .. }))
    }
}

/// Structural changes to the in-memory tree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum TreeEvent {
    /// A new root replaced the whole store.
    RootOpened { path: PathBuf },
    /// A folder was re-read from disk.
    FolderLoaded {
        path: PathBuf,
        /// Number of direct children after reconciliation
        child_count: usize,
    },
    /// Items were created, renamed, edited or removed in memory.
    ItemsChanged { paths: Vec<PathBuf> },
}

/// The three-state outcome of persisting one folder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SaveEvent {
    InProgress {
        folder: PathBuf,
    },
    Succeeded {
        folder: PathBuf,
        /// Songs written to the record file
        song_count: usize,
    },
    Failed {
        folder: PathBuf,
        message: String,
    },
}

impl SaveEvent {
    pub fn folder(&self) -> &Path {
        match self {
            SaveEvent::InProgress { folder }
            | SaveEvent::Succeeded { folder, .. }
            | SaveEvent::Failed { folder, .. } => folder,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum ClipboardEvent {
    /// An item was staged for paste.
    Staged {
        path: PathBuf,
        /// `"copy"` or `"cut"`
        operation: String,
    },
    /// The staged item was consumed or dropped.
    Cleared,
}

/// Central event bus for broadcasting events to multiple subscribers.
///
/// Cloning the bus shares the same underlying channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ExplorerEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// Subscribers that fall behind by more than `capacity` events receive
    /// `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an
    /// error if there are none.
    pub fn emit(&self, event: ExplorerEvent) -> Result<usize, SendError<ExplorerEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<ExplorerEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

type EventFilter = Box<dyn Fn(&ExplorerEvent) -> bool + Send + Sync>;

/// A subscription that skips events a view is not interested in.
///
/// ```rust
/// use core_runtime::events::{EventBus, EventStream, ExplorerEvent};
///
/// let bus = EventBus::new(100);
/// let saves = EventStream::new(bus.subscribe())
///     .filter(|event| matches!(event, ExplorerEvent::Save(_)));
/// let usb = EventStream::for_folder(bus.subscribe(), "/media/usb");
/// ```
pub struct EventStream {
    receiver: Receiver<ExplorerEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<ExplorerEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Events touching `folder` or its descendants, plus clipboard clears
    pub fn for_folder(receiver: Receiver<ExplorerEvent>, folder: impl Into<PathBuf>) -> Self {
        let folder = folder.into();
        Self::new(receiver).filter(move |event| {
            event.touches(&folder) || matches!(event, ExplorerEvent::Clipboard(ClipboardEvent::Cleared))
        })
    }

    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&ExplorerEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn wants(&self, event: &ExplorerEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Next event that passes the filter.
    ///
    /// # Errors
    ///
    /// `RecvError::Lagged(n)` after missing `n` events, `RecvError::Closed`
    /// once the explorer is gone.
    pub async fn recv(&mut self) -> Result<ExplorerEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.wants(&event) {
                return Ok(event);
            }
        }
    }

    /// Like [`recv`](Self::recv) without waiting; `None` when nothing is queued.
    pub fn try_recv(&mut self) -> Option<Result<ExplorerEvent, RecvError>> {
        use broadcast::error::TryRecvError;

        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.wants(&event) => return Some(Ok(event)),
                Ok(_) => continue,
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Lagged(n)) => return Some(Err(RecvError::Lagged(n))),
                Err(TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn saved(folder: &str) -> ExplorerEvent {
        ExplorerEvent::Save(SaveEvent::Succeeded {
            folder: PathBuf::from(folder),
            song_count: 2,
        })
    }

    #[tokio::test]
    async fn test_emission_without_subscribers_is_err() {
        let bus = EventBus::new(10);
        assert!(bus.emit(saved("/a")).is_err());
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_multiple_subscribers_receive_same_event() {
        let bus = EventBus::new(10);
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();

        assert_eq!(bus.emit(saved("/a")).unwrap(), 2);

        assert_eq!(first.recv().await.unwrap(), saved("/a"));
        assert_eq!(second.recv().await.unwrap(), saved("/a"));
    }

    #[tokio::test]
    async fn test_event_stream_with_filter() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe())
            .filter(|event| matches!(event, ExplorerEvent::Save(_)));

        bus.emit(ExplorerEvent::Clipboard(ClipboardEvent::Cleared))
            .ok();
        bus.emit(saved("/b")).ok();

        assert_eq!(stream.recv().await.unwrap(), saved("/b"));
        assert!(stream.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_lagged_subscriber() {
        let bus = EventBus::new(2);
        let mut sub = bus.subscribe();

        for i in 0..5 {
            bus.emit(ExplorerEvent::Tree(TreeEvent::FolderLoaded {
                path: PathBuf::from(format!("/f{}", i)),
                child_count: i,
            }))
            .ok();
        }

        assert!(matches!(sub.recv().await, Err(RecvError::Lagged(_))));
    }

    #[test]
    fn test_affected_paths() {
        let changed = ExplorerEvent::Tree(TreeEvent::ItemsChanged {
            paths: vec![PathBuf::from("/a/SONG_001"), PathBuf::from("/b")],
        });
        assert_eq!(
            changed.affected_paths(),
            vec![Path::new("/a/SONG_001"), Path::new("/b")]
        );
        assert!(changed.touches(Path::new("/a")));
        assert!(!saved("/c").touches(Path::new("/a")));
        assert!(ExplorerEvent::Clipboard(ClipboardEvent::Cleared)
            .affected_paths()
            .is_empty());
    }

    #[test]
    fn test_only_in_progress_save_blocks() {
        let running = ExplorerEvent::Save(SaveEvent::InProgress {
            folder: PathBuf::from("/a"),
        });
        assert!(running.is_blocking());
        assert!(!saved("/a").is_blocking());
    }

    #[tokio::test]
    async fn test_folder_stream_skips_other_folders() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::for_folder(bus.subscribe(), "/usb/SETS");

        bus.emit(saved("/usb/OTHER")).ok();
        bus.emit(ExplorerEvent::Clipboard(ClipboardEvent::Cleared)).ok();
        bus.emit(saved("/usb/SETS")).ok();

        assert_eq!(
            stream.recv().await.unwrap(),
            ExplorerEvent::Clipboard(ClipboardEvent::Cleared)
        );
        assert_eq!(stream.recv().await.unwrap(), saved("/usb/SETS"));
        assert!(stream.try_recv().is_none());
    }

    #[test]
    fn test_event_serialization() {
        let event = ExplorerEvent::Clipboard(ClipboardEvent::Staged {
            path: PathBuf::from("/a/SONG_001"),
            operation: "cut".to_string(),
        });

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"Clipboard\""));
        let back: ExplorerEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
