//! `status` and `delete` commands.

use serde_json::json;

use super::args::QueryArgs;
use super::directory::print_output;
use super::{connect, disconnect};
use crate::error::Result;
use crate::render::{OutputOptions, human};
use crate::storage::ResolvedConfig;

/// Print the current status of a query, and its results once DONE.
pub async fn status(args: &QueryArgs, config: &ResolvedConfig, output: &OutputOptions) -> Result<()> {
    let client = connect(config).await?;
    let result = client.queries().status(&args.query_id).await;
    disconnect(&client).await;
    let collection = result?;

    let data = json!({
        "id": &args.query_id,
        "status": &collection.status,
        "result_set": &collection.result_set,
    });
    let rendered = output.render("status", data, |no_color| {
        human::render_collection(&args.query_id, &collection, no_color)
    })?;
    print_output(&rendered);
    Ok(())
}

/// Delete a query.
pub async fn delete(args: &QueryArgs, config: &ResolvedConfig, output: &OutputOptions) -> Result<()> {
    let client = connect(config).await?;
    let result = client.queries().delete(&args.query_id).await;
    disconnect(&client).await;
    result?;

    let rendered = output.render("delete", json!({ "deleted": &args.query_id }), |no_color| {
        human::render_deleted(&args.query_id, no_color)
    })?;
    print_output(&rendered);
    Ok(())
}
