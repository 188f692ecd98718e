pub mod terminal;

use crate::strategy::SignalReport;

/// Sink for finished signal reports.
pub trait Notifier: Send + Sync {
    fn notify(&self, instrument: &str, report: &SignalReport);
}
