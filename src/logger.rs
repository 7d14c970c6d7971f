//! Logger contract: every
//! part of the tree that wants to log asks a shared [`Logger`] for a
//! named [`LoggerComponent`] and writes structured, leveled messages
//! through it. Logging never throws - every method here swallows its
//! own formatting/emission concerns rather than propagating a `Result`.
//!
//! The core never picks a sink; it only ever calls through this
//! contract, which is backed by `tracing` the same way every other
//! module in this crate reports diagnostics (component attribute
//! writes, core-event subscriber panics, module-manager failures).
//! Concrete sinks (file, console, remote) are an out-of-scope external
//! collaborator wired up by `tracing-subscriber` at the
//! application's entry point, not by this crate.

use std::sync::Arc;

use dashmap::DashMap;

/// The six severities a [`LoggerComponent`] can log at. `tracing`
/// has no `Critical` level, so it is mapped onto `error` with an extra
/// `critical = true` field rather than silently collapsed into a plain
/// error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

/// A named logger, scoped the way a device, function block or signal
/// scopes its own diagnostics. `fields` are rendered as `key=value`
/// pairs ahead of `message`, a structured key/value replacement for
/// printf-style format strings.
pub struct LoggerComponent {
    name: String,
}

impl LoggerComponent {
    fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn log(&self, level: LogLevel, message: &str, fields: &[(&str, &str)]) {
        let rendered = render_fields(fields);
        match level {
            LogLevel::Trace => tracing::trace!(target: "opendaq", component = %self.name, fields = %rendered, "{message}"),
            LogLevel::Debug => tracing::debug!(target: "opendaq", component = %self.name, fields = %rendered, "{message}"),
            LogLevel::Info => tracing::info!(target: "opendaq", component = %self.name, fields = %rendered, "{message}"),
            LogLevel::Warning => tracing::warn!(target: "opendaq", component = %self.name, fields = %rendered, "{message}"),
            LogLevel::Error => tracing::error!(target: "opendaq", component = %self.name, fields = %rendered, "{message}"),
            LogLevel::Critical => tracing::error!(target: "opendaq", component = %self.name, fields = %rendered, critical = true, "{message}"),
        }
    }

    pub fn trace(&self, message: &str) {
        self.log(LogLevel::Trace, message, &[]);
    }

    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message, &[]);
    }

    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message, &[]);
    }

    pub fn warning(&self, message: &str) {
        self.log(LogLevel::Warning, message, &[]);
    }

    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, message, &[]);
    }

    pub fn critical(&self, message: &str) {
        self.log(LogLevel::Critical, message, &[]);
    }
}

fn render_fields(fields: &[(&str, &str)]) -> String {
    fields.iter().map(|(k, v)| format!("{k}={v}")).collect::<Vec<_>>().join(" ")
}

/// Registry of named [`LoggerComponent`]s.
/// Concurrent lookups are expected - every component in the tree may
/// request its own logger on construction - so the registry uses a
/// sharded map rather than a single lock.
#[derive(Default)]
pub struct Logger {
    components: DashMap<String, Arc<LoggerComponent>>,
}

impl Logger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the named component, creating it on first request.
    pub fn get_or_add_component(&self, name: &str) -> Arc<LoggerComponent> {
        self.components.entry(name.to_string()).or_insert_with(|| Arc::new(LoggerComponent::new(name))).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_or_add_component_returns_the_same_instance_for_repeat_lookups() {
        let logger = Logger::new();
        let a = logger.get_or_add_component("Device");
        let b = logger.get_or_add_component("Device");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn distinct_names_produce_distinct_components() {
        let logger = Logger::new();
        let a = logger.get_or_add_component("Device");
        let b = logger.get_or_add_component("Signal");
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(a.name(), "Device");
        assert_eq!(b.name(), "Signal");
    }

    #[test]
    fn logging_never_panics_with_or_without_fields() {
        let logger = Logger::new();
        let component = logger.get_or_add_component("Test");
        component.trace("a trace message");
        component.log(LogLevel::Critical, "disk full", &[("path", "/data"), ("bytes_free", "0")]);
    }
}
