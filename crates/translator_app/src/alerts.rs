use translator_logging::translator_warn;

/// Where user-facing messages go.
pub trait AlertSink: Send {
    fn alert(&mut self, message: &str);
}

/// Prints alerts to stderr and mirrors them into the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrAlertSink;

impl AlertSink for StderrAlertSink {
    fn alert(&mut self, message: &str) {
        translator_warn!("alert: {}", message);
        eprintln!("{message}");
    }
}
