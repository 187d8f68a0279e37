use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use miette::{IntoDiagnostic, Result};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tutor_core::config::{self, Config, LoggingConfig};
use tutor_core::{
    AnnouncementFeed, ClassRequestService, CourseApi, CredentialProvider, HttpCourseApi,
    JwtCredentialProvider, ResponseLedger, SubmissionCoordinator,
};
use tutor_discord::{BotSettings, TutorBot, run_discord_bot};

#[derive(Parser, Debug)]
#[command(name = "tutor-bot", version, about = "Discord relay for tutor course requests")]
struct Args {
    /// Path to the TOML configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Drop every pending response before connecting
    #[arg(long)]
    purge_ledger: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    config::load_dotenv();
    let config = Config::load(args.config.as_deref())?;
    config.validate()?;

    // Held until exit so buffered log lines are flushed
    let _guard = init_logging(&config.logging)?;
    info!("Starting tutor relay bot");

    let client = HttpCourseApi::build_client(config.api.request_timeout())?;

    let mut provider = JwtCredentialProvider::new(
        client.clone(),
        &config.api.url_prefix,
        config.api.username.clone(),
        config.api.password.clone(),
    );
    if let Some(token) = &config.api.token {
        provider = provider.with_token(token.clone());
    }
    let credentials: Arc<dyn CredentialProvider> = Arc::new(provider);
    let api: Arc<dyn CourseApi> =
        Arc::new(HttpCourseApi::new(client, config.api.url_prefix.clone()));

    let ledger = Arc::new(ResponseLedger::open(&config.ledger.path));
    if args.purge_ledger || config.ledger.purge_on_start {
        let dropped = ledger.purge().await?;
        info!("Purged {} pending response(s) from {}", dropped, ledger.location());
    } else {
        info!(
            "Ledger at {} holds {} pending response(s)",
            ledger.location(),
            ledger.pending_count().await?
        );
    }

    let coordinator = Arc::new(
        SubmissionCoordinator::new(ledger, api.clone(), credentials.clone())
            .with_forward_timeout(config.api.forward_timeout()),
    );
    let class_requests = Arc::new(ClassRequestService::new(api.clone(), credentials.clone()));
    let feed = Arc::new(AnnouncementFeed::new(api, credentials));

    let settings = BotSettings {
        token: config.discord.token.clone(),
        application_id: config.discord.application_id,
        guild_id: config.discord.guild_id,
        announcement_channel_id: config.discord.announcement_channel_id,
        polling_enabled: config.polling.enabled,
        announcements_interval: config.polling.announcements_interval(),
        private_messages_interval: config.polling.private_messages_interval(),
    };

    run_discord_bot(TutorBot::new(coordinator, class_requests, feed, settings)).await?;
    Ok(())
}

fn init_logging(logging: &LoggingConfig) -> Result<WorkerGuard> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    std::fs::create_dir_all(&logging.directory).into_diagnostic()?;

    let file_appender = tracing_appender::rolling::daily(&logging.directory, &logging.file_prefix);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "tutor_core=info,tutor_discord=info,tutor_bot=info,serenity=warn".into()
            }),
        )
        .with(
            // Console output
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_line_number(true),
        )
        .with(
            // File output
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_target(true)
                .with_thread_ids(true)
                .with_line_number(true)
                .with_ansi(false),
        )
        .init();

    Ok(guard)
}
