/// `expect`-style helpers that route the failure through `tracing` before
/// panicking, so invariant violations show up in the logs of a daemonized
/// agent.
pub trait TraceExpect<T> {
    fn trace_expect(self, msg: &str) -> T;
}

impl<T, E: std::fmt::Debug> TraceExpect<T> for Result<T, E> {
    fn trace_expect(self, msg: &str) -> T {
        self.inspect_err(|e| tracing::error!("{msg}: {e:?}")).expect(msg)
    }
}

impl<T> TraceExpect<T> for Option<T> {
    fn trace_expect(self, msg: &str) -> T {
        if self.is_none() {
            tracing::error!("{msg}");
        }
        self.expect(msg)
    }
}
