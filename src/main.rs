use clap::Parser;
use photo_chat::{cli, commands, config, error, file_storage};
use photo_chat_common::HttpGateway;
use cli::{Cli, Commands, PhotoAction, ProfileAction};
use config::Config;
use error::Result;
use file_storage::FileStorage;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = Config::load()?;

    // 設定コマンドはバックエンドに接続しない
    if let Commands::Config { set_backend_url, show } = cli.command {
        if let Some(url) = set_backend_url {
            config.set_backend_url(url)?;
            println!("✔ バックエンドURLを設定しました");
        }

        if show {
            println!("設定:");
            println!("  パス: {}", Config::config_path()?.display());
            println!("  バックエンドURL: {}", config.backend_url());
            println!("  プロフィールAPI: {}", config.routes.profiles);
            println!("  写真API: {}", config.routes.photos);
            println!("  アシスタントAPI: {}", config.routes.assistant);
            println!("  タイムアウト: {}秒", config.timeout_seconds);
        }
        return Ok(());
    }

    if let Commands::Fortune { index } = cli.command {
        commands::show_fortune(index);
        return Ok(());
    }

    let backend_url = cli.backend_url.clone().unwrap_or_else(|| config.backend_url());
    tracing::debug!(backend_url = %backend_url, "using backend");
    let gateway = HttpGateway::with_timeout(
        backend_url.clone(),
        config.routes.clone(),
        Duration::from_secs(config.timeout_seconds),
    )?;
    let storage = Arc::new(FileStorage::open(Config::session_dir()?)?);
    let coordinator = commands::open_session(Arc::new(gateway), storage);

    match cli.command {
        Commands::Profiles { action } => match action {
            ProfileAction::List => commands::list_profiles(&coordinator).await?,
            ProfileAction::Create { name } => commands::create_profile(&coordinator, name).await?,
            ProfileAction::Delete { name, yes } => {
                commands::delete_profile(&coordinator, name, yes).await?
            }
            ProfileAction::Select { name } => commands::select_profile(&coordinator, name).await?,
            ProfileAction::Deselect => commands::deselect_profile(&coordinator),
        },

        Commands::Photos { action } => match action {
            PhotoAction::List => commands::list_photos(&coordinator).await?,
            PhotoAction::Select { filename } => commands::select_photo(&coordinator, filename).await?,
        },

        Commands::Upload { path, chat } => {
            println!("📤 photo-chat - アップロード\n");
            commands::upload(&coordinator, &path).await?;
            if chat {
                println!();
                commands::chat(&coordinator, None, false).await?;
            }
        }

        Commands::Chat { message, review } => {
            commands::chat(&coordinator, message, review).await?;
        }

        Commands::Review => commands::review(&coordinator).await?,
        Commands::Graph => commands::graph(&coordinator).await?,

        Commands::Status => commands::status(&coordinator, &backend_url),

        Commands::Ping => commands::ping(coordinator.gateway()).await?,

        Commands::Config { .. } | Commands::Fortune { .. } => {}
    }

    Ok(())
}

/// RUST_LOG を優先し、未指定なら --verbose で debug まで出す
fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "photo_chat=debug,photo_chat_common=debug"
    } else {
        "photo_chat=warn,photo_chat_common=warn"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
