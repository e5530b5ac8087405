//! `report` command: one usage collection from submission to deletion.

use super::args::ReportArgs;
use super::directory::print_output;
use super::{connect, disconnect};
use crate::core::models::QueryStatus;
use crate::core::query::{CompletedQuery, PollPolicy, Queries, QueryId};
use crate::core::UsageClient;
use crate::error::{Result, UsageError};
use crate::render::{OutputOptions, human};
use crate::storage::ResolvedConfig;

/// Execute the report command.
///
/// The query is deleted once it reaches a terminal status, or when the wait
/// is interrupted. It is left on the gateway when the polling cap is reached
/// so it can be inspected with `status`.
pub async fn execute(args: &ReportArgs, config: &ResolvedConfig, output: &OutputOptions) -> Result<()> {
    let client = connect(config).await?;
    let result = collect(&client, args, &config.poll).await;
    disconnect(&client).await;
    let completed = result?;

    let rendered = output.render("report", &completed, |no_color| {
        human::render_collection(&completed.id, &completed.collection, no_color)
    })?;
    print_output(&rendered);

    match completed.collection.status {
        QueryStatus::Done => Ok(()),
        status => Err(UsageError::QueryUnsuccessful {
            query_id: completed.id.to_string(),
            status: status.to_string(),
        }),
    }
}

async fn collect(client: &UsageClient, args: &ReportArgs, policy: &PollPolicy) -> Result<CompletedQuery> {
    client.orchestrators().find(&args.orchestrator).await?;
    client
        .collectors()
        .find(&args.orchestrator, &args.location_type)
        .await?;

    let queries = client.queries();
    let id = queries
        .submit(
            &args.orchestrator,
            &args.location_type,
            &args.location,
            args.query_params(),
        )
        .await?;

    let waited = tokio::select! {
        result = queries.wait_for_completion(&id, policy) => result,
        Ok(()) = tokio::signal::ctrl_c() => Err(UsageError::Interrupted),
    };

    match waited {
        Ok(collection) => {
            queries.delete(&id).await?;
            Ok(CompletedQuery { id, collection })
        }
        Err(err @ UsageError::PollLimitExceeded { .. }) => {
            tracing::warn!(query = %id, "polling limit reached, query left on the gateway");
            Err(err)
        }
        Err(err) => {
            delete_quietly(&queries, &id).await;
            Err(err)
        }
    }
}

async fn delete_quietly(queries: &Queries<'_>, id: &QueryId) {
    if let Err(err) = queries.delete(id).await {
        tracing::warn!(query = %id, error = %err, "failed to delete query");
    }
}
