//! Panel builder epics.
//!
//! `QueryEpic`: QuerySubmitted → one call to the data source → ResultsLoaded
//! or QueryFailed. Latest submission wins; an earlier query still in flight
//! is cancelled and its result never reaches the store.
//!
//! `AcknowledgeEpic`: QuerySubmitted → QueryAcknowledged, no effects.

use std::sync::Arc;

use epicflow_engine::{ActionStream, Emitter, Epic, Switch, Ticket};
use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt};
use tracing::{debug, info, warn, Instrument};

use super::actions::PanelAction;
use crate::traits::PanelDataSource;

const QUERY_TRIGGERS: &[&str] = &[PanelAction::QUERY_SUBMITTED];

pub struct QueryEpic {
    source: Arc<dyn PanelDataSource>,
}

impl QueryEpic {
    pub fn new(source: Arc<dyn PanelDataSource>) -> Self {
        Self { source }
    }
}

impl Epic<PanelAction> for QueryEpic {
    fn name(&self) -> &'static str {
        "panel_query"
    }

    fn wire(
        &self,
        actions: ActionStream<PanelAction>,
        out: Emitter<PanelAction>,
    ) -> BoxFuture<'static, anyhow::Result<()>> {
        let (actions, mut switch) = Switch::attach(actions, "panel_query", QUERY_TRIGGERS, &out);
        let mut submissions = actions.select(|action| match action {
            PanelAction::QuerySubmitted { query } => Some(query),
            _ => None,
        });
        let source = self.source.clone();

        async move {
            while let Some(query) = submissions.next().await {
                let ticket = switch.advance();
                tokio::spawn(
                    run_query(source.clone(), query, ticket, out.clone()).in_current_span(),
                );
            }
            Ok(())
        }
        .boxed()
    }
}

async fn run_query(
    source: Arc<dyn PanelDataSource>,
    query: String,
    ticket: Ticket,
    out: Emitter<PanelAction>,
) {
    debug!(query = %query, generation = ticket.generation(), "executing panel query");

    let Some(outcome) = ticket.run(source.query(&query)).await else {
        debug!(query = %query, "panel query superseded");
        return;
    };

    let action = match outcome {
        Ok(results) => {
            info!(
                query = %query,
                series = results.series.len(),
                points = results.point_count(),
                "panel query loaded"
            );
            PanelAction::ResultsLoaded { results }
        }
        Err(err) => {
            warn!(query = %query, error = %err, "panel query failed");
            PanelAction::QueryFailed {
                error: format!("Error: {err}"),
            }
        }
    };
    out.emit_current(&ticket, action);
}

pub struct AcknowledgeEpic;

impl Epic<PanelAction> for AcknowledgeEpic {
    fn name(&self) -> &'static str {
        "panel_acknowledge"
    }

    fn wire(
        &self,
        actions: ActionStream<PanelAction>,
        out: Emitter<PanelAction>,
    ) -> BoxFuture<'static, anyhow::Result<()>> {
        let mut submissions = actions.select(|action| match action {
            PanelAction::QuerySubmitted { query } => Some(query),
            _ => None,
        });

        async move {
            while let Some(query) = submissions.next().await {
                out.emit(PanelAction::QueryAcknowledged { query });
            }
            Ok(())
        }
        .boxed()
    }
}
