use tokio::task::JoinHandle;

/// Runs CPU-heavy work (password hashing) on tokio's blocking pool, inside the caller's span so
/// that its logs stay attached to the request that triggered it.
pub fn spawn_blocking_with_tracing<F, R>(f: F) -> JoinHandle<R>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    let current_span = tracing::Span::current();
    tokio::task::spawn_blocking(move || current_span.in_scope(f))
}
