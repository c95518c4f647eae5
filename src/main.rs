use anyhow::Context;
use futures::StreamExt;
use ragline::{
    build_app,
    cli::{output::Output, Cli, Commands, LogFormat},
    db::{PineconeStore, UploadLog, VectorStore},
    llm::{LLMClient, OpenAIClient},
    rag::{EmbeddingClient, OpenAIEmbeddings},
    AppState, Config,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse_args();
    init_tracing(cli.log_format, cli.verbose);

    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    let mut config = Config::from_env().context("failed to load configuration")?;
    cli.apply(&mut config);

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(&config, &output).await,
        Commands::Ingest { paths } => {
            let state = connect(&config).await?;
            let mut failed = 0;
            for path in &paths {
                match state.ingestion.ingest_path(path).await {
                    Ok(report) => output.indexed(&report.filename, report.chunks),
                    Err(e) => {
                        failed += 1;
                        output.error(&format!("{}: {}", path.display(), e));
                    }
                }
            }
            if failed > 0 {
                anyhow::bail!("{} of {} files failed to index", failed, paths.len());
            }
            output.success(&format!("Indexed {} files", paths.len()));
            Ok(())
        }
        Commands::Ask { question, stream } => {
            let state = connect(&config).await?;
            if stream {
                let (sources, mut fragments) =
                    state.query.answer_stream_with_sources(&question).await?;
                while let Some(fragment) = fragments.next().await {
                    output.fragment(&fragment?);
                }
                output.newline();
                print_sources(&output, &sources);
            } else {
                let answer = state.query.answer(&question).await?;
                println!("{}", answer.answer);
                print_sources(&output, &answer.sources);
            }
            Ok(())
        }
        Commands::Files => {
            let log = UploadLog::open(&config.rag.data_dir).await?;
            let details = log.details().await?;
            if details.is_empty() {
                output.info("No files uploaded yet");
                return Ok(());
            }
            output.file_table_header();
            for detail in &details {
                output.file_table_row(&detail.filename, detail.chunks);
            }
            Ok(())
        }
    }
}

fn init_tracing(format: LogFormat, verbose: bool) {
    let default_filter = if verbose {
        "debug,tower_http=debug"
    } else {
        "info,tower_http=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

/// Build the outbound clients, resolve the Pinecone index and open the upload log.
async fn connect(config: &Config) -> anyhow::Result<AppState> {
    let mut http = reqwest::Client::builder();
    if let Some(secs) = config.server.request_timeout_secs {
        http = http.timeout(Duration::from_secs(secs));
    }
    let http = http.build().context("failed to build HTTP client")?;

    let embedder: Arc<dyn EmbeddingClient> = Arc::new(OpenAIEmbeddings::new(
        http.clone(),
        config.openai.api_key.clone(),
        config.openai.api_base.clone(),
        config.openai.embedding_model.clone(),
        config.openai.embedding_dimensions,
    ));
    let llm: Arc<dyn LLMClient> = Arc::new(OpenAIClient::new(
        http.clone(),
        config.openai.api_key.clone(),
        config.openai.api_base.clone(),
        config.openai.chat_model.clone(),
    ));
    let store: Arc<dyn VectorStore> = Arc::new(
        PineconeStore::connect(http, &config.pinecone)
            .await
            .context("failed to connect to Pinecone")?,
    );
    let log = UploadLog::open(&config.rag.data_dir)
        .await
        .context("failed to open upload log")?;

    tracing::info!(
        embedding_model = embedder.model_name(),
        chat_model = llm.model_name(),
        data_dir = %config.rag.data_dir.display(),
        "Clients ready"
    );

    Ok(AppState::new(embedder, store, llm, log, &config.rag))
}

async fn serve(config: &Config, output: &Output) -> anyhow::Result<()> {
    let state = connect(config).await?;
    let app = build_app(state, config.server.max_upload_bytes);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    output.banner(&addr);
    tracing::info!(%addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

fn print_sources(output: &Output, sources: &[String]) {
    if sources.is_empty() {
        output.warning("No indexed documents matched the question");
        return;
    }
    output.header("Sources");
    for source in sources {
        output.list_item(source);
    }
}
