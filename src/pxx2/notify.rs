//! # Link Notifications
//!
//! One-shot events the frame generator raises towards the user interface.

use serde::Serialize;
use tracing::info;

/// Event raised while generating frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkEvent {
    /// The bind wait period elapsed and the module went back to normal
    BindSucceeded,
}

/// Sink for link events
#[cfg_attr(test, mockall::automock)]
pub trait Notifier {
    /// Post an event for a module
    fn notify(&mut self, module: usize, event: LinkEvent);
}

/// Notifier that only writes events to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&mut self, module: usize, event: LinkEvent) {
        match event {
            LinkEvent::BindSucceeded => info!("Module {}: bind OK", module),
        }
    }
}
