//! Statement logger capability.

/// Receives every statement (and then its parameters) before it executes.
///
/// Any `Fn(&str) + Send + Sync` closure is a logger.
pub trait Logger: Send + Sync {
    fn log(&self, message: &str);
}

impl<F> Logger for F
where
    F: Fn(&str) + Send + Sync,
{
    fn log(&self, message: &str) {
        self(message);
    }
}

/// Forwards statements to `tracing` at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, message: &str) {
        tracing::info!(target: "sqlrecord::sql", "{message}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_closure_logger() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let logger: Arc<dyn Logger> = Arc::new(move |msg: &str| {
            sink.lock().expect("lock").push(msg.to_string());
        });
        logger.log("SELECT 1");
        TracingLogger.log("SELECT 2");
        assert_eq!(*seen.lock().expect("lock"), vec!["SELECT 1".to_string()]);
    }
}
