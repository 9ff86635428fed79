//! Gateway binary: loads configuration, bridges the orchestrator protocol to
//! stdin/stdout, and maps the run outcome onto the process exit code.
//!
//! Logs go to stderr; stdout carries only `online`/`shutdown` lines for the
//! parent process.

use std::path::Path;
use std::process::ExitCode;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use devgate::{Directive, Gateway, GatewayConfig, Notice, Uploader};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cfg = match std::env::args().nth(1) {
        Some(path) => match GatewayConfig::load(Path::new(&path)) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::error!(error = %e, "failed to load configuration");
                return ExitCode::FAILURE;
            }
        },
        None => GatewayConfig::default(),
    };

    let (directives_tx, directives_rx) = mpsc::channel::<Directive>(4);
    let (notices_tx, mut notices_rx) = mpsc::channel::<Notice>(4);

    // parent → gateway: directives, one per stdin line
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if let Some(directive) = Directive::parse(&line) {
                if directives_tx.send(directive).await.is_err() {
                    break;
                }
            }
        }
    });

    // gateway → parent: notices, one per stdout line
    tokio::spawn(async move {
        let mut out = tokio::io::stdout();
        while let Some(notice) = notices_rx.recv().await {
            let line = format!("{}\n", notice.as_wire());
            if out.write_all(line.as_bytes()).await.is_err() {
                break;
            }
            let _ = out.flush().await;
        }
    });

    let uploader = Uploader::new(cfg.uploader.clone());
    match Gateway::new(cfg, uploader).run(directives_rx, notices_tx).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, label = e.as_label(), "gateway stopped after error");
            ExitCode::FAILURE
        }
    }
}
