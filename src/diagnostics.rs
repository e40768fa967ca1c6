/// Receives warnings raised while a converter is being built.
///
/// Formatting itself never reports anything; only construction problems
/// (a rejected pattern, an unknown zone) reach the sink.
pub trait DiagnosticSink {
    fn warn(&self, message: &str);
}

/// Forwards diagnostics to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn warn(&self, message: &str) {
        tracing::warn!(target: "datestamp", "{message}");
    }
}

/// Drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn warn(&self, _message: &str) {}
}
