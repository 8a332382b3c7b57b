//! Workload controller for the interactive UI.
//!
//! Handles one `UiCommand` at a time so ledger and runtime calls stay serialized,
//! and emits `AppEvent`s for the presentation layer.

use super::snapshot::{take_snapshot, Snapshot};
use crate::catalog::CatalogClient;
use crate::context::AppContext;
use crate::model::{short_container_id, CatalogImage, CatalogSource, LaunchRequest};
use crate::runtime::{ContainerRuntime, ImageRuntime};
use anyhow::Result;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::time::Duration;
use tracing::{debug, warn};

/// Commands emitted by UI layers.
#[derive(Debug, Clone)]
pub(crate) enum UiCommand {
    /// Reconcile and reload the catalog.
    Refresh,
    Run {
        image: String,
        name: String,
        description: String,
        gpu: bool,
    },
    Stop(String),
    GenerateToken,
    Quit,
}

#[derive(Debug, Clone)]
pub(crate) enum AppEvent {
    Snapshot(Snapshot),
    Catalog {
        images: Vec<CatalogImage>,
        sources: Vec<CatalogSource>,
    },
    Message(String),
}

const RECONCILE_EVERY: Duration = Duration::from_secs(10);

fn send_snapshot<R: ContainerRuntime + ImageRuntime>(
    ctx: &AppContext<R>,
    event_tx: &UnboundedSender<AppEvent>,
) {
    match tokio::task::block_in_place(|| take_snapshot(ctx)) {
        Ok(snap) => {
            let _ = event_tx.send(AppEvent::Snapshot(snap));
        }
        Err(e) => {
            let _ = event_tx.send(AppEvent::Message(format!("Refresh failed: {e:#}")));
        }
    }
}

async fn send_catalog(catalog: &CatalogClient, event_tx: &UnboundedSender<AppEvent>) {
    let (images, sources) = tokio::join!(catalog.list_images(), catalog.list_sources());
    match (images, sources) {
        (Ok(images), Ok(sources)) => {
            let _ = event_tx.send(AppEvent::Catalog { images, sources });
        }
        (Err(e), _) | (_, Err(e)) => {
            warn!(error = %e, "catalog fetch failed");
            let _ = event_tx.send(AppEvent::Message(format!("Catalog unavailable: {e:#}")));
        }
    }
}

/// Serve UI commands until `Quit` or the UI hangs up.
pub(crate) async fn run_controller<R: ContainerRuntime + ImageRuntime>(
    ctx: &mut AppContext<R>,
    catalog: &CatalogClient,
    event_tx: UnboundedSender<AppEvent>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    send_snapshot(ctx, &event_tx);
    send_catalog(catalog, &event_tx).await;

    let mut ticker = tokio::time::interval(RECONCILE_EVERY);
    ticker.tick().await;

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                let Some(cmd) = cmd else { break };
                debug!(?cmd, "ui command");
                match cmd {
                    UiCommand::Refresh => {
                        send_snapshot(ctx, &event_tx);
                        send_catalog(catalog, &event_tx).await;
                        let _ = event_tx.send(AppEvent::Message("Refreshed".into()));
                    }
                    UiCommand::Run { image, name, description, gpu } => {
                        let token = match ctx.ensure_token() {
                            Ok(t) => t,
                            Err(e) => {
                                let _ = event_tx.send(AppEvent::Message(format!("Token error: {e}")));
                                continue;
                            }
                        };
                        let _ = event_tx.send(AppEvent::Message(format!("Starting {image}…")));
                        let req = LaunchRequest {
                            image,
                            remote_name: name,
                            remote_description: description,
                            token: Some(token),
                            gpu,
                        };
                        let msg = match tokio::task::block_in_place(|| ctx.lifecycle().start(&req)) {
                            Ok(row) => format!("Started {} ({})", row.short_id(), row.remote_name),
                            Err(e) => format!("Start failed: {e}"),
                        };
                        let _ = event_tx.send(AppEvent::Message(msg));
                        send_snapshot(ctx, &event_tx);
                    }
                    UiCommand::Stop(container_id) => {
                        let msg = match tokio::task::block_in_place(|| ctx.lifecycle().stop(&container_id)) {
                            Ok(()) => format!("Stopped {}", short_container_id(&container_id)),
                            Err(e) => format!("Stop reported an error (ledger updated): {e}"),
                        };
                        let _ = event_tx.send(AppEvent::Message(msg));
                        send_snapshot(ctx, &event_tx);
                    }
                    UiCommand::GenerateToken => {
                        let msg = match ctx.regenerate_token() {
                            Ok(_) => "Generated a new token".to_string(),
                            Err(e) => format!("Token generation failed: {e}"),
                        };
                        let _ = event_tx.send(AppEvent::Message(msg));
                        send_snapshot(ctx, &event_tx);
                    }
                    UiCommand::Quit => break,
                }
            }
            _ = ticker.tick() => {
                send_snapshot(ctx, &event_tx);
            }
        }
    }
    Ok(())
}
