//! `orchestrators`, `collectors` and `queries` commands.

use super::args::{CollectorsArgs, QueriesArgs};
use super::{connect, disconnect};
use crate::error::Result;
use crate::render::{OutputOptions, human};
use crate::storage::ResolvedConfig;

/// List orchestrators.
pub async fn orchestrators(config: &ResolvedConfig, output: &OutputOptions) -> Result<()> {
    let client = connect(config).await?;
    let result = client.orchestrators().list().await;
    disconnect(&client).await;
    let orchestrators = result?;

    let rendered = output.render("orchestrators", &orchestrators, |no_color| {
        human::render_orchestrators(&orchestrators, no_color)
    })?;
    print_output(&rendered);
    Ok(())
}

/// List usage collectors of one orchestrator.
pub async fn collectors(
    args: &CollectorsArgs,
    config: &ResolvedConfig,
    output: &OutputOptions,
) -> Result<()> {
    let client = connect(config).await?;
    let result = client.collectors().list(&args.orchestrator).await;
    disconnect(&client).await;
    let collectors = result?;

    let rendered = output.render("collectors", &collectors, |no_color| {
        human::render_collectors(&args.orchestrator, &collectors, no_color)
    })?;
    print_output(&rendered);
    Ok(())
}

/// List query ids of one orchestrator, optionally of one collector.
pub async fn queries(
    args: &QueriesArgs,
    config: &ResolvedConfig,
    output: &OutputOptions,
) -> Result<()> {
    let client = connect(config).await?;
    let result = client
        .queries()
        .list_ids(&args.orchestrator, args.collector.as_deref().unwrap_or_default())
        .await;
    disconnect(&client).await;
    let ids = result?;

    let rendered = output.render("queries", &ids, |no_color| {
        human::render_queries(&args.orchestrator, &ids, no_color)
    })?;
    print_output(&rendered);
    Ok(())
}

/// Print rendered output, adding a final newline when it lacks one.
pub(crate) fn print_output(rendered: &str) {
    if rendered.ends_with('\n') {
        print!("{rendered}");
    } else {
        println!("{rendered}");
    }
}
