//! # OS termination-signal handling.
//!
//! [`wait_for_shutdown_signal`] completes when the gateway process receives a
//! termination signal. The gateway treats it exactly like a `shutdown`
//! directive from the parent orchestrator and records which signal fired as
//! the shutdown reason.
//!
//! Unix: `SIGINT`, `SIGTERM`, `SIGQUIT` (plus Ctrl-C). Elsewhere: Ctrl-C.

/// Waits for a termination signal and reports which one fired.
///
/// Each call installs independent listeners. Returns the signal name once any
/// signal is received, or `Err` if listener registration fails.
#[cfg(unix)]
pub async fn wait_for_shutdown_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    let name = tokio::select! {
        _ = tokio::signal::ctrl_c() => "SIGINT",
        _ = sigint.recv() => "SIGINT",
        _ = sigterm.recv() => "SIGTERM",
        _ = sigquit.recv() => "SIGQUIT",
    };
    Ok(name)
}

/// Waits for a termination signal and reports which one fired.
///
/// Each call installs independent listeners. Returns the signal name once any
/// signal is received, or `Err` if listener registration fails.
#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await.map(|()| "ctrl-c")
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_reports_which_signal_fired() {
        let wait = wait_for_shutdown_signal();
        tokio::pin!(wait);

        // the listeners register on the first poll; only then is it safe to
        // send the signal
        assert!(tokio::time::timeout(Duration::from_millis(50), &mut wait)
            .await
            .is_err());

        let status = std::process::Command::new("kill")
            .args(["-TERM", &std::process::id().to_string()])
            .status()
            .unwrap();
        assert!(status.success());

        let name = tokio::time::timeout(Duration::from_secs(5), &mut wait)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(name, "SIGTERM");
    }
}
