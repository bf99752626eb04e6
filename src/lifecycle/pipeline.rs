//! Load → split → publish.

use tracing::Instrument;

use crate::dataset::{train_test_split, DatasetDict, DatasetLoader, DatasetPublisher, PublishReport};
use crate::lifecycle::startup::Context;
use crate::lifecycle::PipelineError;
use crate::resilience::RetryPolicy;

/// Load the source split (retried) and partition it.
pub async fn load_and_split(ctx: &Context) -> Result<DatasetDict, PipelineError> {
    let config = &ctx.config;
    let retry = RetryPolicy::from(&config.retry);

    let loader = DatasetLoader::new(&ctx.client, &config.source);
    let dataset = retry.run_async("load dataset", || loader.load()).await?;
    tracing::info!(records = dataset.len(), labels = ?dataset.labels, "Dataset loaded");

    Ok(train_test_split(dataset, config.split.test_size, config.split.seed)?)
}

/// Publish every split, one retried commit per batch.
pub async fn publish(ctx: &Context, dict: &DatasetDict) -> Result<PublishReport, PipelineError> {
    let config = &ctx.config;
    let retry = RetryPolicy::from(&config.retry);
    let publisher = DatasetPublisher::new(&ctx.client, &config.publish);

    let mut report = PublishReport::default();
    for batch in publisher.plan(dict)? {
        let info = retry
            .run_async("publish dataset", || publisher.publish_batch(&batch))
            .await?;
        report.files += batch.uploads.len();
        report.commits.push(info);
    }

    tracing::info!(files = report.files, commits = report.commits.len(), "Dataset published");
    Ok(report)
}

/// Full run: load, split and publish.
pub async fn run(ctx: &Context) -> Result<(DatasetDict, PublishReport), PipelineError> {
    let span = tracing::info_span!("pipeline", run_id = %uuid::Uuid::new_v4());
    async {
        let dict = load_and_split(ctx).await?;
        let report = publish(ctx, &dict).await?;
        Ok::<_, PipelineError>((dict, report))
    }
    .instrument(span)
    .await
}
