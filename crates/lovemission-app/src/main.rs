use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use lovemission_app::screens::{
    HistoryScreen, MyTasksScreen, NewTask, ScheduleScreen, SettingsScreen, SharedTasksScreen,
    ViewMode,
};
use lovemission_app::{Alert, AppConfig, AppContext, SessionManager};
use lovemission_core::mission::MissionType;
use lovemission_core::session::Destination;
use lovemission_core::task::{AssignedTo, Task};
use lovemission_core::theme::ThemeMode;
use lovemission_core::user::User;

#[derive(Parser)]
#[command(name = "lovemission", version, about = "Shared to-dos and missions for two")]
struct Cli {
    #[command(flatten)]
    config: AppConfig,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and remember the account on this device
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "LOVEMISSION_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign out and forget the account
    Logout,
    /// Show the signed-in user and where the app would start
    Whoami,
    /// Shared tasks
    Tasks {
        #[command(subcommand)]
        command: TaskCommands,
    },
    /// Missions scheduled for your partner
    Missions {
        #[command(subcommand)]
        command: MissionCommands,
    },
    /// Change your nickname
    Nickname { name: String },
    /// Show or change the theme for this session
    Theme {
        #[arg(value_parser = ["light", "dark", "toggle"])]
        mode: Option<String>,
    },
}

#[derive(Subcommand)]
enum TaskCommands {
    /// Pending tasks you created for yourself or for both of you
    Mine,
    /// All pending shared tasks
    Shared,
    /// Completed and cancelled tasks
    History,
    /// Pending tasks by due day
    Calendar {
        /// Day to list (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Add a task
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: Option<String>,
        /// Due day (YYYY-MM-DD)
        #[arg(long)]
        due: Option<NaiveDate>,
        /// Who does it: me, partner or both
        #[arg(long, value_parser = parse_assignment, default_value = "both")]
        assign: AssignedTo,
    },
    /// Mark a task done
    Complete { id: i64 },
    /// Cancel a task
    Cancel { id: i64 },
    /// Audit trail of a task
    Log { id: i64 },
}

#[derive(Subcommand)]
enum MissionCommands {
    List,
    /// Schedule a mission for your partner
    Add {
        #[arg(long)]
        title: String,
        /// special, daily or emergency
        #[arg(long = "type", value_parser = parse_mission_type, default_value = "daily")]
        kind: MissionType,
    },
    Complete { id: i64 },
}

fn parse_assignment(s: &str) -> Result<AssignedTo, String> {
    AssignedTo::parse_str(s).ok_or_else(|| format!("unknown assignment '{s}'"))
}

fn parse_mission_type(s: &str) -> Result<MissionType, String> {
    MissionType::parse_str(s).ok_or_else(|| format!("unknown mission type '{s}'"))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let ctx = AppContext::from_config(&cli.config)
        .await
        .context("initializing app")?;

    let result = run(&ctx, cli.command).await;
    ctx.persist_session().await.context("saving session")?;
    result
}

async fn run(ctx: &AppContext, command: Commands) -> Result<()> {
    let session = SessionManager::new(ctx.clone());
    match command {
        Commands::Login { email, password } => match session.sign_in(&email, &password).await {
            Some(user) => {
                println!("Signed in as {}", user.email);
                if !user.has_partner() {
                    println!("No partner linked yet.");
                }
            }
            None => bail!("sign in failed"),
        },
        Commands::Logout => {
            let user = current_user(ctx).await?;
            session.sign_out(user.id).await?;
            println!("Signed out.");
        }
        Commands::Whoami => {
            let resolution = session.resolve().await;
            match resolution.user {
                Some(user) => println!(
                    "{} ({}) -> {}",
                    user.email,
                    user.nickname.as_deref().unwrap_or("-"),
                    resolution.destination
                ),
                None => println!("not signed in -> {}", resolution.destination),
            }
        }
        Commands::Tasks { command } => run_tasks(ctx, command).await?,
        Commands::Missions { command } => run_missions(ctx, command).await?,
        Commands::Nickname { name } => {
            let mut screen = SettingsScreen::new(ctx.clone(), current_user(ctx).await?);
            screen.update_nickname(&name).await;
            report(screen.take_alert())?;
        }
        Commands::Theme { mode } => {
            match mode.as_deref() {
                Some("toggle") => {
                    ctx.theme.toggle();
                }
                Some(m) => {
                    if let Some(mode) = ThemeMode::parse_str(m) {
                        ctx.theme.set_mode(mode);
                    }
                }
                None => {}
            }
            let palette = ctx.theme.palette();
            println!("theme: {}", ctx.theme.mode());
            println!("  background {}", palette.background.primary);
            println!("  text       {}", palette.text.primary);
            println!("  brand      {}", palette.brand);
        }
    }
    Ok(())
}

async fn run_tasks(ctx: &AppContext, command: TaskCommands) -> Result<()> {
    let user = current_user(ctx).await?;
    match command {
        TaskCommands::Mine => {
            let mut screen = MyTasksScreen::new(ctx.clone(), user);
            screen.on_focus().await;
            print_tasks(screen.tasks(), |t| t.assigned_to.display_name().to_string());
        }
        TaskCommands::Shared => {
            let mut screen = SharedTasksScreen::new(ctx.clone(), user);
            screen.on_focus().await;
            print_tasks(&screen.visible_tasks(), |t| screen.assignment_label(t));
        }
        TaskCommands::History => {
            let mut screen = HistoryScreen::new(ctx.clone(), user);
            screen.on_focus().await;
            let buckets = screen.buckets();
            if buckets.is_empty() {
                println!("Nothing finished yet.");
            }
            println!("Completed ({})", buckets.completed.len());
            print_tasks(&buckets.completed, |t| {
                t.completed_at
                    .map(|at| at.format("%Y-%m-%d").to_string())
                    .unwrap_or_default()
            });
            println!("Cancelled ({})", buckets.cancelled.len());
            print_tasks(&buckets.cancelled, |t| t.status.display_name().to_string());
        }
        TaskCommands::Calendar { date } => {
            let mut screen = SharedTasksScreen::new(ctx.clone(), user);
            screen.set_mode(ViewMode::Calendar);
            screen.select_date(date);
            screen.on_focus().await;
            let calendar = screen.calendar();
            for (day, marker) in &calendar.markers {
                let sel = if marker.selected { "*" } else { " " };
                println!("{sel} {day}  {} task(s)", marker.task_count);
            }
            if calendar.selected.is_some() {
                print_tasks(&screen.visible_tasks(), |t| screen.assignment_label(t));
            }
        }
        TaskCommands::Create {
            title,
            description,
            due,
            assign,
        } => {
            let mut screen = SharedTasksScreen::new(ctx.clone(), user);
            screen
                .create(NewTask {
                    title,
                    description,
                    due_date: due,
                    assigned_to: assign,
                })
                .await;
            report(screen.take_alert())?;
        }
        TaskCommands::Complete { id } => {
            let mut screen = SharedTasksScreen::new(ctx.clone(), user);
            if screen.complete(id).await {
                println!("Task {id} completed.");
            }
            report(screen.take_alert())?;
        }
        TaskCommands::Cancel { id } => {
            let mut screen = SharedTasksScreen::new(ctx.clone(), user);
            if screen.cancel(id).await {
                println!("Task {id} cancelled.");
            }
            report(screen.take_alert())?;
        }
        TaskCommands::Log { id } => {
            let screen = HistoryScreen::new(ctx.clone(), user);
            for entry in screen.task_log(id).await? {
                println!(
                    "{}  {:<10} by {}",
                    entry.created_at.format("%Y-%m-%d %H:%M"),
                    entry.action,
                    entry.user_id
                );
            }
        }
    }
    Ok(())
}

async fn run_missions(ctx: &AppContext, command: MissionCommands) -> Result<()> {
    let user = current_user(ctx).await?;
    if !user.has_partner() {
        bail!("missions need a linked partner");
    }
    let mut screen = ScheduleScreen::new(ctx.clone(), user);
    match command {
        MissionCommands::List => {
            screen.on_focus().await;
            let board = screen.board();
            println!("To do");
            for m in &board.incomplete {
                println!("  #{:<5} [{}] {}", m.id, m.label(), m.title);
            }
            println!("Done");
            for m in &board.completed {
                println!("  #{:<5} [{}] {}", m.id, m.label(), m.title);
            }
            if !screen.partner_reachable() {
                println!("(partner has no push token; they will not be notified)");
            }
        }
        MissionCommands::Add { title, kind } => {
            screen.register(&title, kind).await;
            report(screen.take_alert())?;
        }
        MissionCommands::Complete { id } => {
            if screen.complete(id).await {
                println!("Mission {id} completed.");
            }
            report(screen.take_alert())?;
        }
    }
    Ok(())
}

async fn current_user(ctx: &AppContext) -> Result<User> {
    let resolution = SessionManager::new(ctx.clone()).resolve().await;
    match (resolution.destination, resolution.user) {
        (Destination::SignIn, _) | (_, None) => {
            bail!("not signed in; run `lovemission login` first")
        }
        (_, Some(user)) => Ok(user),
    }
}

fn print_tasks(tasks: &[Task], tag: impl Fn(&Task) -> String) {
    if tasks.is_empty() {
        println!("  (none)");
    }
    for t in tasks {
        println!(
            "  #{:<5} {:<30} {:<12} {}",
            t.id,
            t.title,
            t.due_date.as_deref().unwrap_or("-"),
            tag(t)
        );
    }
}

fn report(alert: Option<Alert>) -> Result<()> {
    match alert {
        Some(Alert::Error(msg)) => bail!(msg),
        Some(Alert::Success(msg)) => {
            println!("{msg}");
            Ok(())
        }
        None => Ok(()),
    }
}
