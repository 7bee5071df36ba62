// SPDX-License-Identifier: MPL-2.0

//! Shared async runtime for relay and backend operations.
//!
//! The CLI drives everything through one Tokio runtime rather than creating
//! a runtime per command.

use once_cell::sync::Lazy;
use std::future::Future;
use tokio::runtime::Runtime;

/// Shared multi-threaded Tokio runtime for all async operations.
/// Two worker threads are plenty for I/O-bound relay traffic.
static RUNTIME: Lazy<Runtime> = Lazy::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .thread_name("nostrfeed-async")
        .build()
        .expect("failed to create async runtime")
});

/// Execute a future on the shared runtime, blocking until completion.
pub fn block_on<F: Future>(future: F) -> F::Output {
    RUNTIME.block_on(future)
}

/// Spawn a future on the shared runtime without blocking.
pub fn spawn<F>(future: F) -> tokio::task::JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    RUNTIME.spawn(future)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_and_block_on() {
        let handle = spawn(async { 40 + 2 });
        let value = block_on(handle).unwrap();
        assert_eq!(value, 42);
    }
}
