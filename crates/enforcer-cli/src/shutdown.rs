//! OS signals → cancellation token.

use std::future::Future;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Cancel `cancel` on Ctrl-C or SIGTERM. Later signals are ignored.
pub fn spawn_signal_listener(cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(cancel_when(wait_for_signal(), cancel))
}

/// Cancel `cancel` once `signal` resolves. Does nothing else.
pub async fn cancel_when<F: Future<Output = ()>>(signal: F, cancel: CancellationToken) {
    tokio::select! {
        _ = signal => {
            tracing::info!("shutdown signal received, finishing current work");
            cancel.cancel();
        }
        _ = cancel.cancelled() => {}
    }
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "cannot listen for SIGTERM");
            ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    ctrl_c().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn signal_cancels_token() {
        let token = CancellationToken::new();
        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(cancel_when(
            async move {
                let _ = rx.await;
            },
            token.clone(),
        ));

        assert!(!token.is_cancelled());
        tx.send(()).unwrap();
        handle.await.unwrap();
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn listener_exits_when_cancelled_elsewhere() {
        let token = CancellationToken::new();
        let handle = tokio::spawn(cancel_when(std::future::pending::<()>(), token.clone()));
        token.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("listener should stop")
            .unwrap();
    }
}
