//! Minimal logging capability handed to components that report to the user

use tracing::{error, info, warn};

/// Info/Warn/Error sink
pub trait Logger: Send + Sync {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}

/// Logger forwarding to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn info(&self, message: &str) {
        info!("{}", message);
    }

    fn warn(&self, message: &str) {
        warn!("{}", message);
    }

    fn error(&self, message: &str) {
        error!("{}", message);
    }
}

/// Logger that records messages, handy for asserting on warnings
#[derive(Debug, Default)]
pub struct MemoryLogger {
    entries: parking_lot::Mutex<Vec<(Level, String)>>,
}

/// Level of a recorded message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages recorded at `level`, in order
    pub fn messages(&self, level: Level) -> Vec<String> {
        self.entries
            .lock()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }
}

impl Logger for MemoryLogger {
    fn info(&self, message: &str) {
        self.entries.lock().push((Level::Info, message.to_string()));
    }

    fn warn(&self, message: &str) {
        self.entries.lock().push((Level::Warn, message.to_string()));
    }

    fn error(&self, message: &str) {
        self.entries.lock().push((Level::Error, message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_logger_levels() {
        let logger = MemoryLogger::new();
        logger.info("starting");
        logger.warn("host a.example unresolved");
        logger.warn("host b.example unresolved");
        logger.error("failed");

        assert_eq!(logger.messages(Level::Info), vec!["starting"]);
        assert_eq!(logger.messages(Level::Warn).len(), 2);
        assert_eq!(logger.messages(Level::Error), vec!["failed"]);
    }
}
