mod api;
mod config;
mod error;
mod notifications;
mod session;
mod types;
mod views;

use anyhow::{anyhow, bail, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use std::io::Write;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use api::{DashboardApi, HttpApi};
use config::Settings;
use notifications::FeedEvent;
use session::{SessionContext, SledTokenStore};
use types::{BotId, ManualOrder, TradeFilter};
use views::{render, AppView, AuthView, BotsView, ChartView, HistoryView, NotificationsView, Screen};

#[derive(Parser)]
#[command(name = "minibot")]
#[command(author = "Trading Bot")]
#[command(version = "0.1.0")]
#[command(about = "Terminal dashboard for miniBot trading bots", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log output format
    #[arg(long, value_enum, default_value = "text", global = true)]
    log_format: LogFormat,

    /// Override the REST API address
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Override the notification channel address
    #[arg(long, global = true)]
    ws_url: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and store the session token
    Login {
        #[arg(short, long)]
        username: String,
        /// Read from stdin when omitted
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Forget the stored session token
    Logout,
    /// Manage bots
    Bots {
        #[command(subcommand)]
        command: BotCommands,
    },
    /// Show trades and logs
    History {
        /// Trade type filter (all, buy, sell)
        #[arg(short, long, default_value = "all")]
        filter: TradeFilter,
        /// Print one trade as JSON
        #[arg(short, long)]
        detail: Option<u64>,
    },
    /// Show market history with indicators
    Chart,
    /// Stream live notifications until Ctrl-C
    Watch,
    /// Print every panel, then stream notifications
    Dashboard,
}

#[derive(Subcommand)]
enum BotCommands {
    /// List all bots
    List,
    /// Show one bot
    Show { id: BotId },
    /// Create a bot
    Create {
        #[arg(short, long)]
        name: String,
        #[arg(short, long, default_value = "")]
        description: String,
    },
    /// Rename a bot or change its description
    Update {
        id: BotId,
        #[arg(short, long)]
        name: String,
        #[arg(short, long, default_value = "")]
        description: String,
    },
    /// Start a bot
    Start { id: BotId },
    /// Pause a bot
    Pause { id: BotId },
    /// Delete a bot
    Delete {
        id: BotId,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Place a manual limit order through a bot
    Trade {
        id: BotId,
        #[arg(long)]
        symbol: String,
        #[arg(long, value_parser = ["BUY", "SELL"])]
        side: String,
        #[arg(long)]
        price: Decimal,
        #[arg(long)]
        quantity: Decimal,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.log_format)?;

    let settings = Settings::load(cli.config.as_deref())?.with_overrides(cli.api_url, cli.ws_url)?;
    let store = SledTokenStore::open(&settings.session_path)?;
    let session = SessionContext::restore(Arc::new(store))?;
    let api: Arc<dyn DashboardApi> = Arc::new(HttpApi::from_settings(&settings, session.clone())?);

    match cli.command {
        Commands::Login { username, password } => {
            login(api, session, username, password).await?;
        }
        Commands::Logout => {
            AuthView::new(api, session).logout().await;
            println!("Logged out");
        }
        Commands::Bots { command } => {
            run_bot_command(api, command).await?;
        }
        Commands::History { filter, detail } => {
            show_history(api, filter, detail).await?;
        }
        Commands::Chart => {
            show_chart(api).await?;
        }
        Commands::Watch => {
            let mut view = NotificationsView::new(settings.ws_url.clone(), settings.reconnect_policy());
            let events = view.subscribe();
            view.mount().await;
            watch_notifications(&view, events).await;
            view.unmount().await;
        }
        Commands::Dashboard => {
            run_dashboard(api, session, &settings).await?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool, format: LogFormat) -> Result<()> {
    let log_level = if verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.as_str().to_lowercase()));

    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    match format {
        LogFormat::Text => tracing::subscriber::set_global_default(builder.finish())?,
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish())?,
    }
    Ok(())
}

async fn login(
    api: Arc<dyn DashboardApi>,
    session: SessionContext,
    username: String,
    password: Option<String>,
) -> Result<()> {
    let password = match password {
        Some(password) => password,
        None => prompt("Password: ")?,
    };

    let mut view = AuthView::new(api, session);
    view.username = username;
    view.password = password;

    if !view.submit().await {
        bail!("{}", view.error().unwrap_or(views::LOGIN_FAILED));
    }
    println!("Logged in as {}", view.username);
    Ok(())
}

async fn run_bot_command(api: Arc<dyn DashboardApi>, command: BotCommands) -> Result<()> {
    let mut view = BotsView::new(api);

    let ok = match command {
        BotCommands::List => {
            view.mount().await;
            view.error().is_none()
        }
        BotCommands::Show { id } => match view.get(id).await {
            Some(bot) => {
                print!("{}", render::bot_detail(&bot));
                return Ok(());
            }
            None => false,
        },
        BotCommands::Create { name, description } => {
            view.name = name;
            view.description = description;
            view.create().await
        }
        BotCommands::Update { id, name, description } => view.update(id, &name, &description).await,
        BotCommands::Start { id } => view.start(id).await,
        BotCommands::Pause { id } => view.pause(id).await,
        BotCommands::Delete { id, yes } => {
            if !yes && !confirm(&format!("Delete bot {}?", id))? {
                info!("Delete cancelled");
                return Ok(());
            }
            view.delete(id).await
        }
        BotCommands::Trade { id, symbol, side, price, quantity } => {
            let order = ManualOrder::limit(symbol, side, price, quantity);
            match view.manual_trade(id, &order).await {
                Some(response) => {
                    println!("{}", serde_json::to_string_pretty(&response)?);
                    true
                }
                None => false,
            }
        }
    };

    if !ok {
        bail!("{}", view.error().unwrap_or(views::LOAD_FAILED));
    }
    print!("{}", render::bots_table(view.bots()));
    Ok(())
}

async fn show_history(api: Arc<dyn DashboardApi>, filter: TradeFilter, detail: Option<u64>) -> Result<()> {
    let mut view = HistoryView::new(api);
    view.mount().await;
    if let Some(error) = view.error() {
        bail!("{}", error);
    }
    view.set_filter(filter);

    if let Some(trade_id) = detail {
        if !view.show_detail(trade_id) {
            bail!("Trade {} not found", trade_id);
        }
        println!("{}", view.detail_json().unwrap_or_default());
        return Ok(());
    }

    println!("\nFilter: {}", view.filter());
    print!("{}", render::trades_table(&view.visible_trades()));
    print!("{}", render::logs_table(view.logs()));
    Ok(())
}

async fn show_chart(api: Arc<dyn DashboardApi>) -> Result<()> {
    let mut view = ChartView::new(api);
    view.mount().await;
    if let Some(error) = view.error() {
        bail!("{}", error);
    }
    info!("Loaded {} market points", view.points().len());
    print!("{}", render::chart_table(&view.series()));
    Ok(())
}

async fn run_dashboard(api: Arc<dyn DashboardApi>, session: SessionContext, settings: &Settings) -> Result<()> {
    let mut app = AppView::new(api, session, settings.ws_url.clone(), settings.reconnect_policy());
    let events = app.dashboard.notifications.subscribe();
    app.start().await;
    if app.screen() == Screen::Auth {
        bail!("Not logged in. Run `minibot login` first.");
    }

    let dashboard = &app.dashboard;
    match dashboard.bots.error() {
        Some(error) => println!("\n{}", error),
        None => print!("{}", render::bots_table(dashboard.bots.bots())),
    }
    match dashboard.history.error() {
        Some(error) => println!("\n{}", error),
        None => {
            print!("{}", render::trades_table(&dashboard.history.visible_trades()));
            print!("{}", render::logs_table(dashboard.history.logs()));
        }
    }
    match dashboard.charts.error() {
        Some(error) => println!("\n{}", error),
        None => print!("{}", render::chart_table(&dashboard.charts.series())),
    }

    watch_notifications(&dashboard.notifications, events).await;
    app.dashboard.unmount().await;
    Ok(())
}

/// Prints notifications as they arrive until Ctrl-C or the channel gives up.
/// `events` must be subscribed before the view is mounted.
async fn watch_notifications(view: &NotificationsView, mut events: broadcast::Receiver<FeedEvent>) {
    print!(
        "{}",
        render::notifications_panel(
            &view.notifications().await,
            view.state().await,
            view.status().await.as_deref(),
        )
    );

    if view.is_finished() {
        warn!("Notification channel ended");
        return;
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, closing notification channel");
                break;
            }
            event = events.recv() => match event {
                Ok(FeedEvent::Added(notification)) => {
                    println!("{}", render::notification_line(&notification));
                }
                Ok(FeedEvent::StatusChanged(Some(status))) => println!("! {}", status),
                Ok(FeedEvent::StateChanged(state)) if state.is_terminal() => warn!("Channel {}", state),
                Ok(FeedEvent::StateChanged(state)) => info!("Channel {}", state),
                Ok(FeedEvent::ChannelEnded) => {
                    warn!("Notification channel ended");
                    break;
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => warn!("Skipped {} notification events", skipped),
                Err(RecvError::Closed) => break,
            }
        }
    }
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .map_err(|e| anyhow!("Failed to read input: {}", e))?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn confirm(question: &str) -> Result<bool> {
    let answer = prompt(&format!("{} [y/N] ", question))?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
