use std::collections::BTreeMap;

use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use roster_manager_lib::application::commands;
use roster_manager_lib::application::dto::{
    AbsenceRequest, EditServiceRequest, GenerateRequest, MemberRequest, ServiceView,
};
use roster_manager_lib::application::time::{parse_date, parse_service_timestamp};
use roster_manager_lib::config::RosterConfig;
use roster_manager_lib::AppServices;

#[derive(Parser)]
#[command(name = "roster_tools")]
#[command(version)]
#[command(about = "Manage members, absences and service rosters", long_about = None)]
struct Cli {
    /// sqlx SQLite URL
    #[arg(long, env = "ROSTER_DATABASE_URL", default_value = "sqlite://roster.db")]
    database_url: String,

    /// Trailing window for recent-assignment counts
    #[arg(long, default_value_t = 90)]
    history_days: u32,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Member management
    #[command(subcommand)]
    Member(MemberCommand),
    /// Absence management
    #[command(subcommand)]
    Absence(AbsenceCommand),
    /// Schedule generation and maintenance
    #[command(subcommand)]
    Schedule(ScheduleCommand),
}

#[derive(Subcommand)]
enum MemberCommand {
    Add {
        name: String,
        /// Role name; repeat or separate with commas
        #[arg(short, long = "role", required = true)]
        roles: Vec<String>,
    },
    List,
    Update {
        id: i64,
        name: String,
        #[arg(short, long = "role", required = true)]
        roles: Vec<String>,
    },
    Delete {
        id: i64,
    },
    Stats {
        /// Defaults to the local date
        #[arg(long, value_parser = date_arg)]
        today: Option<NaiveDate>,
    },
}

#[derive(Subcommand)]
enum AbsenceCommand {
    Add {
        member_id: i64,
        /// YYYY-MM-DD
        start: String,
        /// YYYY-MM-DD
        end: String,
        #[arg(short, long)]
        reason: Option<String>,
    },
    List {
        #[arg(long)]
        member: Option<i64>,
    },
    Delete {
        id: i64,
    },
}

#[derive(Args)]
struct GenerateArgs {
    /// Service timestamp, YYYY-MM-DD or YYYY-MM-DDTHH:MM[:SS]; repeatable
    #[arg(short, long = "date", required = true)]
    dates: Vec<String>,

    /// Role=headcount, e.g. Vocalist=2; repeatable
    #[arg(short, long = "quota", required = true, value_parser = quota_arg)]
    quotas: Vec<(String, u32)>,

    /// Persist the result right away
    #[arg(long)]
    confirm: bool,

    /// Reference date for the history window; defaults to the local date
    #[arg(long, value_parser = date_arg)]
    today: Option<NaiveDate>,
}

#[derive(Subcommand)]
enum ScheduleCommand {
    Generate(GenerateArgs),
    List,
    Show {
        service: String,
    },
    Delete {
        service: String,
    },
    Edit {
        service: String,
        /// Move the service to this timestamp
        #[arg(long)]
        to: Option<String>,
        /// Role=id[,id...]; repeatable
        #[arg(short, long = "assign", required = true, value_parser = assign_arg)]
        assignments: Vec<(String, Vec<i64>)>,
    },
    Stats,
}

fn date_arg(raw: &str) -> Result<NaiveDate, String> {
    parse_date(raw).map_err(|e| e.to_string())
}

fn quota_arg(raw: &str) -> Result<(String, u32), String> {
    let (role, count) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected Role=N, got {raw:?}"))?;
    let count = count
        .trim()
        .parse::<u32>()
        .map_err(|e| format!("bad headcount in {raw:?}: {e}"))?;
    Ok((role.trim().to_string(), count))
}

fn assign_arg(raw: &str) -> Result<(String, Vec<i64>), String> {
    let (role, ids) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected Role=id[,id...], got {raw:?}"))?;
    let ids = ids
        .split(',')
        .map(|id| id.trim().parse::<i64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("bad member id in {raw:?}: {e}"))?;
    Ok((role.trim().to_string(), ids))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn today_or_local(today: Option<NaiveDate>) -> NaiveDate {
    today.unwrap_or_else(|| Local::now().date_naive())
}

async fn run_member(app: &AppServices, command: MemberCommand) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        MemberCommand::Add { name, roles } => {
            let record = commands::add_member(app, &MemberRequest { name, roles }).await?;
            print_json(&record)
        }
        MemberCommand::List => print_json(&commands::list_members(app).await?),
        MemberCommand::Update { id, name, roles } => {
            let record = commands::update_member(app, id, &MemberRequest { name, roles }).await?;
            print_json(&record)
        }
        MemberCommand::Delete { id } => print_json(&commands::delete_member(app, id).await?),
        MemberCommand::Stats { today } => {
            print_json(&commands::member_stats(app, today_or_local(today)).await?)
        }
    }
}

async fn run_absence(app: &AppServices, command: AbsenceCommand) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        AbsenceCommand::Add {
            member_id,
            start,
            end,
            reason,
        } => {
            let outcome = commands::record_absence(
                app,
                &AbsenceRequest {
                    member_id,
                    start_date: start,
                    end_date: end,
                    reason,
                },
            )
            .await?;
            for message in outcome.messages() {
                info!(member_id, "{message}");
            }
            print_json(&outcome)
        }
        AbsenceCommand::List { member } => match member {
            Some(id) => print_json(&commands::absences_for_member(app, id).await?),
            None => print_json(&commands::list_absences(app).await?),
        },
        AbsenceCommand::Delete { id } => print_json(&commands::delete_absence(app, id).await?),
    }
}

async fn run_schedule(app: &AppServices, command: ScheduleCommand) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        ScheduleCommand::Generate(args) => {
            let request = GenerateRequest {
                dates: args.dates,
                quota: args.quotas.into_iter().collect(),
            };
            let schedule = commands::generate_schedule(app, &request, today_or_local(args.today)).await?;
            if args.confirm {
                let inserted = commands::confirm_schedule(app, &schedule).await?;
                info!(inserted, "schedule saved");
            }
            let views: Vec<ServiceView> = schedule.services.iter().map(ServiceView::from).collect();
            print_json(&views)
        }
        ScheduleCommand::List => print_json(&commands::list_saved(app).await?),
        ScheduleCommand::Show { service } => {
            let service_at = parse_service_timestamp(&service)?;
            let saved = commands::service_roster(app, service_at).await?;
            print_json(&ServiceView::from(&saved))
        }
        ScheduleCommand::Delete { service } => {
            let service_at = parse_service_timestamp(&service)?;
            let removed = commands::delete_service(app, service_at).await?;
            print_json(&serde_json::json!({ "removed": removed }))
        }
        ScheduleCommand::Edit {
            service,
            to,
            assignments,
        } => {
            let roles: BTreeMap<String, Vec<i64>> = assignments.into_iter().collect();
            let request = EditServiceRequest {
                original: service,
                replacement: to,
                roles,
            };
            let inserted = commands::edit_service(app, &request).await?;
            print_json(&serde_json::json!({ "assignments": inserted }))
        }
        ScheduleCommand::Stats => print_json(&commands::schedule_stats(app).await?),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Cli::parse();
    let config = RosterConfig::default()
        .with_database_url(args.database_url)
        .with_history_window_days(args.history_days);
    let app = AppServices::open(&config).await?;

    match args.command {
        Commands::Member(command) => run_member(&app, command).await,
        Commands::Absence(command) => run_absence(&app, command).await,
        Commands::Schedule(command) => run_schedule(&app, command).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_argument_splits_on_equals() {
        assert_eq!(quota_arg("Vocalist=2").unwrap(), ("Vocalist".to_string(), 2));
        assert!(quota_arg("Vocalist").is_err());
        assert!(quota_arg("Vocalist=-1").is_err());
    }

    #[test]
    fn assign_argument_reads_id_list() {
        assert_eq!(
            assign_arg("Drummer=3, 4").unwrap(),
            ("Drummer".to_string(), vec![3, 4])
        );
        assert!(assign_arg("Drummer=x").is_err());
    }

    #[test]
    fn cli_parses_generate() {
        let cli = Cli::try_parse_from([
            "roster_tools",
            "--database-url",
            "sqlite::memory:",
            "schedule",
            "generate",
            "-d",
            "2025-10-05T10:00",
            "-q",
            "Vocalist=1",
            "--confirm",
        ])
        .unwrap();
        match cli.command {
            Commands::Schedule(ScheduleCommand::Generate(args)) => {
                assert!(args.confirm);
                assert_eq!(args.quotas, vec![("Vocalist".to_string(), 1)]);
            }
            _ => panic!("wrong subcommand"),
        }
    }
}
