use crate::models::LogLevel;

/// Progress and status sink injected into every core call.
///
/// Purely observational: nothing in the core branches on what a logger does.
pub trait Logger {
    fn log(&self, message: &str, level: LogLevel);

    fn info(&self, message: &str) {
        self.log(message, LogLevel::Info);
    }

    fn warn(&self, message: &str) {
        self.log(message, LogLevel::Warning);
    }

    fn error(&self, message: &str) {
        self.log(message, LogLevel::Error);
    }

    fn debug(&self, message: &str) {
        self.log(message, LogLevel::Debug);
    }

    fn success(&self, message: &str) {
        self.log(message, LogLevel::Success);
    }
}

impl<F> Logger for F
where
    F: Fn(&str, LogLevel),
{
    fn log(&self, message: &str, level: LogLevel) {
        self(message, level)
    }
}

/// Forwards log calls to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, message: &str, level: LogLevel) {
        match level {
            LogLevel::Info => tracing::info!("{}", message),
            LogLevel::Success => tracing::info!(success = true, "{}", message),
            LogLevel::Warning => tracing::warn!("{}", message),
            LogLevel::Error => tracing::error!("{}", message),
            LogLevel::Debug => tracing::debug!("{}", message),
        }
    }
}
