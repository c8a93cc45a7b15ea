//! Background input reader that turns key state reports into listener calls.
//!
//! A single worker thread runs while at least one listener is registered. It
//! is stopped cooperatively: the worker checks the listening flag after every
//! bounded read and exits once it is cleared. Registering again before that
//! happens keeps the same worker.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use deck_core::{HidTransport, KeyListener, Result};
use parking_lot::Mutex;
use streamdeck_xl_protocol::{KeyStateFrame, KeyTracker, INPUT_REPORT_LEN};
use tracing::{debug, warn};

/// Bound on a single blocking input read
pub const READ_TIMEOUT: Duration = Duration::from_secs(1);
/// Pause between iterations while the device is closed
const IDLE_DELAY: Duration = Duration::from_millis(50);
/// Pause after a failed read
const ERROR_DELAY: Duration = Duration::from_millis(100);

/// Handle returned by listener registration
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
struct Registry {
    listeners: Vec<(ListenerId, Arc<dyn KeyListener>)>,
    next_id: u64,
    /// Whether the worker should keep reading
    listening: bool,
    /// Whether a worker thread exists. Only the worker clears this, under the
    /// lock, right before it returns.
    worker: bool,
}

pub(crate) struct Pump {
    transport: Arc<dyn HidTransport>,
    registry: Arc<Mutex<Registry>>,
}

impl Pump {
    pub fn new(transport: Arc<dyn HidTransport>) -> Self {
        Self {
            transport,
            registry: Arc::default(),
        }
    }

    /// Add a listener, starting the worker if this is the first one.
    ///
    /// A worker that was told to stop but is still inside its last read is
    /// revived rather than replaced, keeping its key state.
    pub fn register(&self, listener: Arc<dyn KeyListener>) -> Result<ListenerId> {
        let mut registry = self.registry.lock();
        if !registry.worker {
            let transport = Arc::clone(&self.transport);
            let shared = Arc::clone(&self.registry);
            // detached; never keeps the process alive
            thread::Builder::new()
                .name("streamdeck-xl input".into())
                .spawn(move || run(transport, shared))?;
            registry.worker = true;
            debug!("input worker started");
        } else if !registry.listening {
            debug!("input worker resumed");
        }
        registry.listening = true;
        let id = ListenerId(registry.next_id);
        registry.next_id += 1;
        registry.listeners.push((id, listener));
        Ok(id)
    }

    /// Remove a listener, stopping the worker if none are left.
    /// Returns whether the id was registered.
    pub fn unregister(&self, id: ListenerId) -> bool {
        let mut registry = self.registry.lock();
        let before = registry.listeners.len();
        registry.listeners.retain(|(i, _)| *i != id);
        let removed = registry.listeners.len() != before;
        if registry.listeners.is_empty() {
            stop(&mut registry);
        }
        removed
    }

    pub fn listener_count(&self) -> usize {
        self.registry.lock().listeners.len()
    }

    pub fn is_listening(&self) -> bool {
        self.registry.lock().listening
    }

    /// Stop the worker without dropping listeners
    pub fn stop(&self) {
        stop(&mut self.registry.lock());
    }
}

fn stop(registry: &mut Registry) {
    if registry.listening {
        registry.listening = false;
        debug!("input worker stopping");
    }
}

fn run(transport: Arc<dyn HidTransport>, registry: Arc<Mutex<Registry>>) {
    let mut tracker = KeyTracker::new();
    let mut buf = [0u8; INPUT_REPORT_LEN];
    loop {
        {
            let mut registry = registry.lock();
            if !registry.listening {
                registry.worker = false;
                break;
            }
        }

        if !transport.is_open() {
            thread::sleep(IDLE_DELAY);
            continue;
        }

        buf.fill(0);
        let len = match transport.read_input(&mut buf, READ_TIMEOUT) {
            Ok(len) => len.min(buf.len()),
            Err(e) => {
                warn!("key state read failed: {e}");
                thread::sleep(ERROR_DELAY);
                continue;
            },
        };

        // edges are computed under the lock, listeners run on a snapshot so
        // they may register or unregister from inside the callback
        let (edges, listeners) = {
            let registry = registry.lock();
            if !registry.listening || registry.listeners.is_empty() {
                continue;
            }
            let edges = tracker.update(KeyStateFrame::parse(&buf[..len]));
            if edges.is_empty() {
                continue;
            }
            let listeners: Vec<_> = registry.listeners.iter().map(|(_, l)| Arc::clone(l)).collect();
            (edges, listeners)
        };

        for (key, state) in edges {
            debug!(%key, %state, "key edge");
            for listener in &listeners {
                listener.key_state_changed(key, state);
            }
        }
    }
    debug!("input worker exited");
}
