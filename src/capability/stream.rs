//! Receiving side of a watch.

use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};

use crate::descriptor::ResourceDescriptor;
use crate::error::{BrokerError, BrokerResult, ExecutionError};

use super::object::WatchEvent;

/// A stream of change notifications for one resource kind.
///
/// Dropping the stream ends the watch; the producing side notices on its next
/// send and forgets the subscriber.
#[derive(Debug)]
pub struct WatchStream {
    descriptor: ResourceDescriptor,
    rx: Receiver<WatchEvent>,
}

impl WatchStream {
    /// Wraps the receiving end of a watch channel.
    #[must_use]
    pub fn new(descriptor: ResourceDescriptor, rx: Receiver<WatchEvent>) -> Self {
        Self { descriptor, rx }
    }

    /// The resource kind this stream watches.
    #[must_use]
    pub const fn descriptor(&self) -> &ResourceDescriptor {
        &self.descriptor
    }

    /// Receive the next event (blocking).
    pub fn recv(&self) -> BrokerResult<WatchEvent> {
        self.rx.recv().map_err(|_| self.disconnected())
    }

    /// Receive the next event with a timeout.
    pub fn recv_timeout(&self, timeout: Duration) -> BrokerResult<WatchEvent> {
        self.rx.recv_timeout(timeout).map_err(|err| match err {
            RecvTimeoutError::Timeout => BrokerError::Execution(ExecutionError::Timeout {
                duration_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            }),
            RecvTimeoutError::Disconnected => self.disconnected(),
        })
    }

    /// Returns the next queued event, if any, without blocking.
    pub fn try_recv(&self) -> BrokerResult<Option<WatchEvent>> {
        match self.rx.try_recv() {
            Ok(ev) => Ok(Some(ev)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(self.disconnected()),
        }
    }

    fn disconnected(&self) -> BrokerError {
        BrokerError::Execution(ExecutionError::Disconnected {
            path: format!("watch/{}", self.descriptor),
        })
    }
}
