use anyhow::Context as _;

/// Initializes the tracing subscriber once per process. Parse
/// diagnostics and degraded enrichment paths are only visible through
/// this; callers embedding the pipeline should install their own
/// subscriber instead.
pub fn init() -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new("catalogify=info"))
        .context("build log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!("initialize tracing subscriber: {err}"))?;

    Ok(())
}
