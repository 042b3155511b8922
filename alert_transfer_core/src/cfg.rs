use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferCfg {
    /// Only transfer an alert back to the summary within this many
    /// milliseconds of the forward transfer. `None` means no limit.
    pub transfer_back_window_ms: Option<u64>,
    /// Ask the row to prepare content when a transfer is deferred.
    pub request_content_on_defer: bool,
}

impl Default for TransferCfg {
    fn default() -> Self {
        Self {
            transfer_back_window_ms: None,
            request_content_on_defer: true,
        }
    }
}

impl TransferCfg {
    pub fn transfer_back_window(&self) -> Option<Duration> {
        self.transfer_back_window_ms.map(Duration::from_millis)
    }
}

pub trait Clock {
    fn now(&self) -> Instant;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Hand-advanced clock for tests. Clones share the same time.
#[derive(Clone, Debug)]
pub struct ManualClock {
    base: Instant,
    offset: Rc<Cell<Duration>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self {
            base: Instant::now(),
            offset: Rc::new(Cell::new(Duration::ZERO)),
        }
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.offset.set(self.offset.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + self.offset.get()
    }
}
