use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use tokio::signal;

use lib_sentinel::api::{
    EventQuery, InviteData, RegisterData, SecurityLevel, SettingsUpdate, TeamRole,
};
use lib_sentinel::auth::Route;
use lib_sentinel::configs::{load_config, ConsoleConfig};
use lib_sentinel::console::Console;
use lib_sentinel::core::ConnectionState;
use lib_sentinel::loggers::setup_logging;
use lib_sentinel::views::{filter_members, severity_by_day, DashboardView, EventFilter};

mod output;

#[derive(Parser, Debug)]
#[clap(name = "sentinel", about = "Sentinel security console", version)]
struct Cli {
    #[clap(flatten)]
    config: ConsoleConfig,

    /// Also write log records to stderr.
    #[clap(long, short)]
    verbose: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and store the session token.
    Login {
        email: String,
        #[clap(long, env = "SENTINEL_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored session token.
    Logout,
    /// Create an account, optionally creating its organization first.
    Register {
        email: String,
        #[clap(long)]
        full_name: String,
        #[clap(long, env = "SENTINEL_PASSWORD", hide_env_values = true)]
        password: String,
        #[clap(long)]
        confirm_password: String,
        /// Existing organization id.
        #[clap(long, conflicts_with = "organization_name")]
        organization_id: Option<String>,
        /// Name of a new organization to create.
        #[clap(long)]
        organization_name: Option<String>,
    },
    /// System health and recent anomalies.
    Health,
    /// Security events table.
    Events {
        /// Zero-based page.
        #[clap(long, default_value_t = 0)]
        page: u32,
        #[clap(long, default_value_t = 10)]
        per_page: u32,
        #[clap(long)]
        search: Option<String>,
        #[clap(long)]
        severity: Option<String>,
        #[clap(long)]
        event_type: Option<String>,
        #[clap(long)]
        start_date: Option<String>,
        #[clap(long)]
        end_date: Option<String>,
        /// Print the per-day severity counts as well.
        #[clap(long)]
        chart: bool,
    },
    /// Team management.
    Team {
        #[clap(subcommand)]
        action: TeamAction,
    },
    /// Organization settings.
    Settings {
        #[clap(subcommand)]
        action: SettingsAction,
    },
    /// Follow the live feed until interrupted.
    Watch {
        /// Stop after this many seconds.
        #[clap(long)]
        seconds: Option<u64>,
    },
}

#[derive(Subcommand, Debug)]
enum TeamAction {
    List {
        #[clap(long, default_value = "")]
        search: String,
    },
    Invite {
        email: String,
        #[clap(long, value_enum, default_value_t = RoleArg::User)]
        role: RoleArg,
    },
    Remove {
        id: String,
    },
}

#[derive(Subcommand, Debug)]
enum SettingsAction {
    Show,
    Set {
        #[clap(long)]
        notification_email: Option<String>,
        #[clap(long)]
        alert_threshold: Option<f64>,
        #[clap(long)]
        enable_notifications: Option<bool>,
        #[clap(long, value_enum)]
        security_level: Option<LevelArg>,
        #[clap(long)]
        auto_block_threats: Option<bool>,
        #[clap(long)]
        retention_days: Option<u32>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum RoleArg {
    Admin,
    User,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum LevelArg {
    Low,
    Medium,
    High,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Explicitly install the default crypto provider for rustls
    let _ = rustls::crypto::ring::default_provider().install_default();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = load_config(cli.config.clone())?;

    let log_dir = config.log_dir.clone().unwrap_or_else(|| PathBuf::from("./logs"));
    let log_level = config.log_level.clone().unwrap_or_else(|| "info".to_string());
    setup_logging(&log_dir, &log_level, cli.verbose)?;

    let mut console = Console::from_config(&config)?;
    console.start();

    let result = run(&console, cli.command).await;
    console.shutdown();
    result
}

async fn run(console: &Console, command: Command) -> Result<()> {
    match command {
        Command::Login { email, password } => {
            let user = console.auth.login(&email, &password).await?;
            console.navigator.navigate(Route::Dashboard);
            println!("{} {}", "Logged in as".green(), user.email);
        }
        Command::Logout => {
            console.auth.logout();
            console.navigator.navigate(Route::Login);
            println!("Logged out.");
        }
        Command::Register {
            email,
            full_name,
            password,
            confirm_password,
            organization_id,
            organization_name,
        } => {
            let organization_id = match (organization_id, organization_name) {
                (Some(id), _) => id,
                (None, Some(name)) => console.auth.create_organization(&name).await?.id,
                (None, None) => bail!("Pass --organization-id or --organization-name"),
            };
            let data = RegisterData {
                email,
                password,
                full_name,
                organization_id,
            };
            let user = console.auth.register(&data, &confirm_password).await?;
            console.navigator.navigate(Route::Login);
            println!("{} {}. You can now log in.", "Registered".green(), user.email);
        }
        Command::Health => {
            require(console, Route::Dashboard)?;
            let mut view = DashboardView::new(console.api.clone());
            view.load().await;
            output::dashboard(&view);
        }
        Command::Events {
            page,
            per_page,
            search,
            severity,
            event_type,
            start_date,
            end_date,
            chart,
        } => {
            require(console, Route::Events)?;
            let query = EventQuery {
                page,
                per_page,
                search: search.clone(),
                severity: severity.clone(),
                event_type: event_type.clone(),
                start_date,
                end_date,
            };
            let response = console.api.security().events(&query).await?;
            // The server filters too; this keeps the table consistent if it ignores a filter.
            let filter = EventFilter {
                search: search.unwrap_or_default(),
                severity,
                event_type,
            };
            output::events_table(&filter.apply(&response.events));
            println!(
                "{}",
                format!("page {} of {} events", response.page, response.total).truecolor(128, 128, 128)
            );
            if chart {
                output::severity_chart(&severity_by_day(&response.events));
            }
        }
        Command::Team { action } => {
            require(console, Route::Team)?;
            let team = console.api.team();
            match action {
                TeamAction::List { search } => {
                    let members = team.members().await?;
                    output::team(&filter_members(&members, &search));
                }
                TeamAction::Invite { email, role } => {
                    let role = match role {
                        RoleArg::Admin => TeamRole::Admin,
                        RoleArg::User => TeamRole::User,
                    };
                    let organization_id = console.api.auth().me().await?.organization_id;
                    team.invite(&InviteData {
                        email: email.clone(),
                        role,
                        organization_id,
                    })
                    .await?;
                    println!("Invited {}", email);
                }
                TeamAction::Remove { id } => {
                    team.remove(&id).await?;
                    println!("Removed {}", id);
                }
            }
        }
        Command::Settings { action } => {
            require(console, Route::Settings)?;
            let me = console.api.auth().me().await?;
            let organization_id = me
                .organization_id
                .context("The current user does not belong to an organization")?;
            let settings = console.api.settings();
            match action {
                SettingsAction::Show => {
                    output::settings(&settings.get(&organization_id).await?)?;
                }
                SettingsAction::Set {
                    notification_email,
                    alert_threshold,
                    enable_notifications,
                    security_level,
                    auto_block_threats,
                    retention_days,
                } => {
                    let update = SettingsUpdate {
                        notification_email,
                        alert_threshold,
                        enable_notifications,
                        security_level: security_level.map(|level| match level {
                            LevelArg::Low => SecurityLevel::Low,
                            LevelArg::Medium => SecurityLevel::Medium,
                            LevelArg::High => SecurityLevel::High,
                        }),
                        auto_block_threats,
                        retention_days,
                        ..Default::default()
                    };
                    output::settings(&settings.update(&organization_id, &update).await?)?;
                    println!("{}", "Settings saved.".green());
                }
            }
        }
        Command::Watch { seconds } => {
            require(console, Route::Dashboard)?;
            watch(console, seconds.map(Duration::from_secs)).await?;
        }
    }
    Ok(())
}

/// Applies the route guard; protected commands need a stored session.
fn require(console: &Console, route: Route) -> Result<()> {
    if console.navigator.navigate(route) != route {
        bail!("Not logged in. Run `sentinel login <email>` first.");
    }
    Ok(())
}

async fn watch(console: &Console, limit: Option<Duration>) -> Result<()> {
    let _toasts = console.notifications.add_notification_listener(output::toast);
    let _events = console
        .notifications
        .add_security_event_listener(output::security_event);
    let _traffic = console.traffic.add_listener(output::traffic);

    let mut states = console.feed.watch_state();
    let mut route = console.navigator.watch_route();
    console.feed.connect();
    println!("Watching {} (Ctrl-C to stop)", console.feed.url());

    let deadline = async {
        match limit {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                log::info!("Ctrl-C received, stopping the live feed.");
                break;
            }
            _ = &mut deadline => break,
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *states.borrow_and_update();
                println!("{}", format!("live feed: {}", state).truecolor(128, 128, 128));
                if state == ConnectionState::Exhausted {
                    bail!("Live feed unavailable after repeated reconnect attempts");
                }
            }
            changed = route.changed() => {
                if changed.is_ok() && *route.borrow_and_update() == Route::Login {
                    bail!("Session expired. Run `sentinel login <email>` again.");
                }
            }
        }
    }

    console.feed.disconnect();
    Ok(())
}
