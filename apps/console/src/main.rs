use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;
use welfare_application::{build_alert, ClientConfig, Services, Shell};
use welfare_events::TracingEventBus;
use welfare_input::HostSignal;
use welfare_remote::WelfareApi;
use welfare_session::RemoteLogout;
use welfare_storage::{Database, MemoryPreferences, PreferenceStore};

mod commands;

use commands::{Command, HELP};

#[derive(Parser)]
#[command(name = "welfare-console")]
#[command(about = "Headless welfare client: session lock and notification feed", long_about = None)]
struct Cli {
    /// Config file (defaults to <config dir>/welfare/client.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured service url
    #[arg(long)]
    api_base_url: Option<String>,

    /// Keep preferences in memory instead of the local database
    #[arg(long)]
    ephemeral: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,welfare=debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build runtime")?;
    runtime.block_on(run(cli))
}

fn load_config(cli: &Cli) -> Result<ClientConfig> {
    let mut config = match cli.config.clone().or_else(ClientConfig::default_path) {
        Some(path) => ClientConfig::load_or_default(&path)?,
        None => ClientConfig::default(),
    };
    if let Some(url) = &cli.api_base_url {
        config.api_base_url = url.clone();
    }
    config.validate()?;
    Ok(config)
}

fn open_preferences(config: &ClientConfig, ephemeral: bool) -> Arc<dyn PreferenceStore> {
    if ephemeral {
        return Arc::new(MemoryPreferences::new());
    }
    let Some(path) = config.resolved_database_path() else {
        tracing::warn!("no data directory, preferences kept in memory");
        return Arc::new(MemoryPreferences::new());
    };
    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            tracing::warn!(path = %parent.display(), error = %e, "failed to create data directory");
        }
    }
    match Database::open(&path) {
        Ok(db) => Arc::new(db),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "preferences database unavailable, using memory");
            Arc::new(MemoryPreferences::new())
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    let api = Arc::new(WelfareApi::new(&config.api_base_url)?);
    tracing::info!(api = %api.base_url(), "starting welfare console");

    let shell = Shell::new(
        &config,
        Services {
            identity: api.clone(),
            notifications: api,
            preferences: open_preferences(&config, cli.ephemeral),
            alert: Arc::new(build_alert(config.alert_asset_path.as_deref())),
            events: Arc::new(TracingEventBus),
        },
    )?;

    let status = shell.start().await;
    println!("session: {status}");
    if let Some(username) = shell.session().remembered_username() {
        println!("last user: {username}");
    }
    println!("type 'help' for commands");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("failed to read stdin")?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }

        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };
        if command == Command::Quit {
            break;
        }
        execute(&shell, command).await;
    }

    shell.shutdown();
    Ok(())
}

async fn execute(shell: &Shell, command: Command) {
    match command {
        Command::Login { username, password } => match shell.login(&username, &password).await {
            Ok(identity) => println!("welcome, {}", identity.display_name),
            Err(e) => println!("{e}"),
        },
        Command::Lock => {
            if !shell.lock() {
                println!("nothing to lock");
            }
        }
        Command::Unlock { password } => match shell.unlock(&password).await {
            Ok(()) => println!("unlocked"),
            Err(e) => println!("{e}"),
        },
        Command::Logout => match shell.logout().await {
            RemoteLogout::Failed(e) => println!("logged out locally ({e})"),
            RemoteLogout::Invalidated => println!("logged out"),
            RemoteLogout::Skipped => println!("no session"),
        },
        Command::Activity => {
            shell.dispatch(HostSignal::PointerMove);
        }
        Command::Key(chord) => {
            shell.dispatch(HostSignal::KeyDown(chord));
        }
        Command::Click => {
            shell.dispatch(HostSignal::PointerDown);
            shell.dispatch(HostSignal::Click);
        }
        Command::Refresh => match shell.refresh().await {
            Ok(_) => print_feed(shell),
            Err(e) => println!("{e}"),
        },
        Command::List => print_feed(shell),
        Command::Read { id } => match shell.mark_as_read(&id).await {
            Ok(_) => print_feed(shell),
            Err(e) => println!("{e}"),
        },
        Command::Status => {
            let snapshot = shell.snapshot();
            match snapshot.identity {
                Some(identity) => println!(
                    "{} as {} ({})",
                    snapshot.status, identity.username, identity.role
                ),
                None => println!("{}", snapshot.status),
            }
        }
        Command::Help => println!("{HELP}"),
        Command::Quit => {}
    }
}

fn print_feed(shell: &Shell) {
    let Some(feed) = shell.feed_snapshot() else {
        println!("notifications unavailable ({})", shell.snapshot().status);
        return;
    };
    println!("{} unread", feed.unread_count);
    for item in feed.items {
        let marker = if item.read { ' ' } else { '*' };
        println!(
            "{marker} [{}] {} ({})",
            item.id,
            item.title,
            item.created_at.format("%Y-%m-%d %H:%M")
        );
    }
}
