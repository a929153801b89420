use anyhow::Context;
use clap::Parser;
use sentiment_serve::config::{Cli, Command, ServeArgs, UploadArgs};
use sentiment_serve::loaders::{upload_dir, S3ArtifactStore};
use sentiment_serve::logging;
use sentiment_serve::server::{self, Lifespan};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.log_level)?;

    match cli.into_command() {
        Command::Serve(args) => serve(args).await,
        Command::Upload(args) => upload(args).await,
    }
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    info!("Starting sentiment analysis server");

    let store = S3ArtifactStore::from_env();
    let lifespan = Lifespan::startup(&args, &store)
        .await
        .context("startup failed; refusing to serve")?;

    let app = server::create_router(lifespan.state());

    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(address = %addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(server::shutdown_signal())
        .await?;

    drop(lifespan);
    Ok(())
}

async fn upload(args: UploadArgs) -> anyhow::Result<()> {
    let bucket = args.bucket_name.unwrap_or_default();
    let store = S3ArtifactStore::from_env();

    info!(
        bucket = %bucket,
        prefix = %args.model_prefix,
        source = %args.source_dir.display(),
        "Uploading model directory"
    );
    let keys = upload_dir(&store, &args.source_dir, &bucket, &args.model_prefix).await?;
    info!(count = keys.len(), "Upload finished");

    Ok(())
}
