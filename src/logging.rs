//! Diagnostic logging collaborators.
//!
//! The engine only emits fully formatted diagnostic strings, and only after
//! asking the logger whether it is enabled, so formatting costs nothing when
//! diagnostics are off.

/// Receives diagnostic messages from a machine.
pub trait Logger {
    fn is_enabled(&self) -> bool;

    fn log(&self, message: &str);
}

/// Forwards diagnostics to `tracing` at DEBUG level under the `statetree`
/// target. This is the default logger.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn is_enabled(&self) -> bool {
        tracing::enabled!(target: "statetree", tracing::Level::DEBUG)
    }

    fn log(&self, message: &str) {
        tracing::debug!(target: "statetree", "{message}");
    }
}

/// Discards all diagnostics.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn is_enabled(&self) -> bool {
        false
    }

    fn log(&self, _message: &str) {}
}

/// Any closure taking a message is an always-enabled logger.
impl<F> Logger for F
where
    F: Fn(&str),
{
    fn is_enabled(&self) -> bool {
        true
    }

    fn log(&self, message: &str) {
        self(message)
    }
}

/// Emit a message built lazily by `message` when `logger` is enabled.
pub(crate) fn emit(logger: &dyn Logger, message: impl FnOnce() -> String) {
    if logger.is_enabled() {
        logger.log(&message());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    #[test]
    fn closures_are_enabled_loggers() {
        let lines = RefCell::new(Vec::new());
        let logger = |message: &str| lines.borrow_mut().push(message.to_string());

        emit(&logger, || "dispatch".to_string());

        assert_eq!(lines.into_inner(), vec!["dispatch".to_string()]);
    }

    #[test]
    fn disabled_logger_skips_formatting() {
        let formatted = Cell::new(false);

        emit(&NoopLogger, || {
            formatted.set(true);
            String::new()
        });

        assert!(!formatted.get());
    }

    #[test]
    fn tracing_logger_without_subscriber_is_disabled() {
        assert!(!TracingLogger.is_enabled());
    }
}
