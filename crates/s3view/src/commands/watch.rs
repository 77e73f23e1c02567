//! `watch` handler: follow notifications and print every reconciled change.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use owo_colors::OwoColorize;
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use s3view_core::{Catalog, CatalogUpdate, Decision, Detail, EventKind, ObjectKey, ViewScope};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output;

/// One printed line of the watch feed.
#[derive(Debug, Serialize)]
struct WatchLine {
    at: DateTime<Utc>,
    event: &'static str,
    subject: String,
    key: String,
    outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pending: Option<bool>,
}

impl WatchLine {
    fn from_update(update: &CatalogUpdate) -> Self {
        let pending = match &update.decision {
            Decision::Insert(summary) | Decision::Patch { summary, .. } => {
                Some(summary.has_pending_detail)
            }
            Decision::NoOp { stale: Some(_) } => Some(true),
            _ => None,
        };
        Self {
            at: update.event.timestamp,
            event: match update.event.kind {
                EventKind::Created => "created",
                EventKind::Removed => "removed",
            },
            subject: update.event.facet.tag().to_owned(),
            key: update.event.key.to_string(),
            outcome: update.decision.label(),
            pending,
        }
    }

    fn refreshed(detail: &Detail) -> Self {
        Self {
            at: detail.fetched_at,
            event: "fetched",
            subject: "detail".into(),
            key: detail.summary.key.to_string(),
            outcome: "refreshed",
            pending: Some(false),
        }
    }

    fn text(&self, color: bool) -> String {
        let outcome = format!("{:<9}", self.outcome);
        let outcome = if color {
            match self.outcome {
                "insert" => outcome.green().to_string(),
                "patch" | "refreshed" => outcome.yellow().to_string(),
                "remove" => outcome.red().to_string(),
                _ => outcome.dimmed().to_string(),
            }
        } else {
            outcome
        };
        format!(
            "{}  {outcome} {:<8} {:<14} {}",
            self.at.format("%H:%M:%S"),
            self.event,
            self.subject,
            self.key
        )
    }

    fn render(&self, format: &OutputFormat, color: bool) -> Result<String, CliError> {
        match format {
            OutputFormat::Table | OutputFormat::Plain => Ok(self.text(color)),
            OutputFormat::Json | OutputFormat::JsonCompact => output::render_json_compact(self),
            OutputFormat::Yaml => Ok(format!("---\n{}", output::render_yaml(self)?)),
        }
    }
}

/// Report details of open views that were fetched since the last call.
fn newly_fetched<'a>(
    snapshot: &'a [std::sync::Arc<Detail>],
    views: &[ViewScope],
    seen: &mut HashMap<ObjectKey, DateTime<Utc>>,
) -> Vec<&'a Detail> {
    let mut fresh = Vec::new();
    for detail in snapshot {
        let key = &detail.summary.key;
        if !views.iter().any(|v| v.key() == key) {
            continue;
        }
        let newer = seen.get(key).is_none_or(|at| *at < detail.fetched_at);
        if newer {
            seen.insert(key.clone(), detail.fetched_at);
            fresh.push(detail.as_ref());
        }
    }
    fresh
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(catalog: &Catalog, args: WatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    if !catalog.config().websocket_enabled {
        warn!("notifications are disabled for this profile, only the initial listing is loaded");
    }
    let color = output::should_color(&global.color);

    let mut updates = catalog.updates();
    let mut state = catalog.connection_state();
    let mut details = catalog.subscribe_details();

    catalog.connect().await?;
    info!(summaries = catalog.summaries().len(), "watching catalog (Ctrl-C to stop)");

    let views: Vec<ViewScope> = args.open.into_iter().map(|k| catalog.open_view(k)).collect();
    for view in &views {
        if let Err(e) = catalog.refresh_view(view).await {
            warn!(key = %view.key(), error = %e, "initial detail fetch failed");
        }
    }
    let mut seen = HashMap::new();
    newly_fetched(&details.latest(), &views, &mut seen);

    loop {
        tokio::select! {
            biased;
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted, disconnecting");
                break;
            }
            update = updates.recv() => match update {
                Ok(update) => {
                    let line = WatchLine::from_update(&update).render(&global.output, color)?;
                    output::print_output(&line, global.quiet);
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "watch feed lagged"),
                Err(RecvError::Closed) => break,
            },
            Some(snapshot) = details.changed() => {
                for detail in newly_fetched(&snapshot, &views, &mut seen) {
                    let line = WatchLine::refreshed(detail).render(&global.output, color)?;
                    output::print_output(&line, global.quiet);
                }
            }
            Ok(()) = state.changed() => {
                let current = *state.borrow_and_update();
                info!(state = %current, "connection state changed");
            }
        }
    }

    drop(views);
    catalog.disconnect().await;
    Ok(())
}
