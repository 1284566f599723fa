//! Last-known pointer position.
//!
//! A page-wide listener consumes pointer events from a channel and records
//! the latest move in a shared [`PointerPosition`]. The mouse-position probe
//! only reads that cell; last write wins, and the value may be stale if the
//! pointer has not moved since the last event.

use crate::environment::Position;
use chrono::{DateTime, Utc};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;

/// Shared last-known pointer position; `{0, 0}` until the first move.
#[derive(Debug, Clone, Default)]
pub struct PointerPosition {
    inner: Arc<RwLock<Option<Position>>>,
}

impl PointerPosition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new position.
    pub fn update(&self, position: Position) {
        let mut slot = self.inner.write().unwrap_or_else(|e| e.into_inner());
        *slot = Some(position);
    }

    /// The most recently recorded position.
    pub fn last_known(&self) -> Position {
        let slot = self.inner.read().unwrap_or_else(|e| e.into_inner());
        (*slot).unwrap_or_default()
    }
}

/// Kind of pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointerEventKind {
    Move,
    Down,
    Up,
}

/// A pointer event in client (viewport) coordinates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointerEvent {
    pub timestamp: DateTime<Utc>,
    pub kind: PointerEventKind,
    pub client_x: f64,
    pub client_y: f64,
}

impl PointerEvent {
    pub fn movement(client_x: f64, client_y: f64) -> Self {
        Self {
            timestamp: Utc::now(),
            kind: PointerEventKind::Move,
            client_x,
            client_y,
        }
    }

    pub fn button(is_down: bool, client_x: f64, client_y: f64) -> Self {
        Self {
            timestamp: Utc::now(),
            kind: if is_down {
                PointerEventKind::Down
            } else {
                PointerEventKind::Up
            },
            client_x,
            client_y,
        }
    }
}

/// Errors that can occur when running the listener.
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("Pointer listener is already running")]
    AlreadyRunning,
}

/// Background listener feeding a [`PointerPosition`].
///
/// The listener has no event source of its own. The embedder forwards
/// pointer events from its windowing or input layer through [`sender`];
/// without one, the collected `mouse_position` stays at `{0, 0}`. The
/// bundled CLI has no pointer input and never starts a listener.
///
/// ```
/// use analytics_collector::environment::Position;
/// use analytics_collector::{PointerEvent, PointerListener, PointerPosition};
/// use std::time::{Duration, Instant};
///
/// let position = PointerPosition::new();
/// let mut listener = PointerListener::new(position.clone());
/// listener.start().unwrap();
///
/// // e.g. from a window's cursor-moved handler
/// listener.sender().send(PointerEvent::movement(120.0, 48.0)).unwrap();
///
/// let deadline = Instant::now() + Duration::from_secs(2);
/// while position.last_known() != Position::new(120.0, 48.0) && Instant::now() < deadline {
///     std::thread::sleep(Duration::from_millis(10));
/// }
/// assert_eq!(position.last_known(), Position::new(120.0, 48.0));
/// listener.stop();
/// ```
///
/// [`sender`]: PointerListener::sender
pub struct PointerListener {
    position: PointerPosition,
    sender: Sender<PointerEvent>,
    receiver: Receiver<PointerEvent>,
    running: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
}

impl PointerListener {
    /// Create a listener writing into `position`.
    pub fn new(position: PointerPosition) -> Self {
        // Bounded so a stalled listener cannot grow memory without limit
        let (sender, receiver) = bounded(10_000);
        Self {
            position,
            sender,
            receiver,
            running: Arc::new(AtomicBool::new(false)),
            thread_handle: None,
        }
    }

    /// Channel on which event sources deliver pointer events.
    pub fn sender(&self) -> Sender<PointerEvent> {
        self.sender.clone()
    }

    /// The cell this listener writes.
    pub fn position(&self) -> PointerPosition {
        self.position.clone()
    }

    /// Start consuming events in a background thread.
    pub fn start(&mut self) -> Result<(), ListenerError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(ListenerError::AlreadyRunning);
        }
        self.running.store(true, Ordering::SeqCst);

        let receiver = self.receiver.clone();
        let running = self.running.clone();
        let position = self.position.clone();

        self.thread_handle = Some(thread::spawn(move || {
            while running.load(Ordering::SeqCst) {
                match receiver.recv_timeout(Duration::from_millis(100)) {
                    Ok(event) => {
                        if event.kind == PointerEventKind::Move {
                            position.update(Position::new(event.client_x, event.client_y));
                        }
                    }
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            running.store(false, Ordering::SeqCst);
        }));

        Ok(())
    }

    /// Stop the background thread.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }

    /// Check if the listener is currently running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for PointerListener {
    fn drop(&mut self) {
        self.stop();
    }
}
