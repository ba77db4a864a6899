pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use partsdesk_core::config::{ConfigOverrides, LoadOptions, LogFormat};
use partsdesk_core::query::{SortDirection, SortField};
use partsdesk_core::{Decision, PortalConfig, Priority, RequestStatus};
use partsdesk_gateway::HttpGateway;

use crate::commands::inventory::InventoryQuery;
use crate::commands::queue::QueueQuery;
use crate::commands::requests::RequestsQuery;
use crate::commands::CommandResult;

#[derive(Debug, Parser)]
#[command(
    name = "partsdesk",
    about = "Partsdesk operator CLI",
    long_about = "Inspect part requests, work the approval queue, and report on workshop demand against the parts backend.",
    after_help = "Examples:\n  partsdesk config\n  partsdesk queue --priority critical\n  partsdesk decide 42 rejected --comments \"over budget\"\n  partsdesk inventory --file stock.json --category hydraulics"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to a partsdesk.toml file")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Override the backend base url")]
    base_url: Option<String>,
    #[arg(long, global = true, help = "Act as this backend user id")]
    acting_user: Option<i64>,
    #[arg(long, global = true, help = "Override the log level")]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Summarize request, workshop and user counts with recent activity")]
    Dashboard,
    #[command(about = "List part requests with filters and sorting")]
    Requests {
        #[arg(long)]
        status: Option<RequestStatus>,
        #[arg(long)]
        priority: Option<Priority>,
        #[arg(long)]
        workshop: Option<i64>,
        #[arg(long, help = "Match part name, part number or description")]
        search: Option<String>,
        #[arg(long)]
        sort: Option<SortField>,
        #[arg(long)]
        direction: Option<SortDirection>,
    },
    #[command(about = "Show pending requests awaiting approval")]
    Queue {
        #[arg(long)]
        priority: Option<Priority>,
        #[arg(long)]
        sort: Option<SortField>,
        #[arg(long, help = "Reverse the default direction for the chosen column")]
        toggle: bool,
    },
    #[command(about = "Approve or reject a pending part request")]
    Decide {
        request_id: i64,
        decision: Decision,
        #[arg(long, help = "Required when rejecting")]
        comments: Option<String>,
    },
    #[command(about = "Show the approval record behind a part request's status")]
    History { request_id: i64 },
    #[command(about = "Approval rate, value, priority mix, workshop performance and top parts")]
    Report,
    #[command(about = "Stock status for an exported inventory file")]
    Inventory {
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        category: Option<String>,
    },
}

impl Cli {
    fn load_options(&self) -> LoadOptions {
        LoadOptions {
            require_file: self.config.is_some(),
            config_path: self.config.clone(),
            overrides: ConfigOverrides {
                base_url: self.base_url.clone(),
                acting_user_id: self.acting_user,
                log_level: self.log_level.clone(),
                ..ConfigOverrides::default()
            },
        }
    }
}

pub fn init_logging(config: &PortalConfig) {
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    let _ = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let result = dispatch(cli);

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

fn dispatch(cli: Cli) -> CommandResult {
    let options = cli.load_options();
    if let Command::Config = cli.command {
        return commands::config::run(options);
    }

    let command_name = command_name(&cli.command);
    let config = match PortalConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                command_name,
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };
    init_logging(&config);

    if let Command::Inventory { file, search, category } = cli.command {
        return commands::inventory::run(&config, InventoryQuery { file, search, category });
    }

    let gateway = match HttpGateway::new(&config.gateway) {
        Ok(gateway) => gateway,
        Err(error) => {
            return CommandResult::failure(
                command_name,
                "config_validation",
                format!("backend client could not be built: {error}"),
                2,
            );
        }
    };

    match cli.command {
        Command::Dashboard => commands::dashboard::run(gateway, &config),
        Command::Requests { status, priority, workshop, search, sort, direction } => {
            let query =
                RequestsQuery { status, priority, workshop_id: workshop, search, sort, direction };
            commands::requests::run(gateway, &config, query)
        }
        Command::Queue { priority, sort, toggle } => {
            commands::queue::run(gateway, &config, QueueQuery { priority, sort, toggle })
        }
        Command::Decide { request_id, decision, comments } => {
            commands::decide::run(gateway, &config, request_id, decision, comments)
        }
        Command::History { request_id } => commands::history::run(gateway, &config, request_id),
        Command::Report => commands::report::run(gateway, &config),
        Command::Config | Command::Inventory { .. } => {
            CommandResult::failure(command_name, "internal", "command dispatched twice", 3)
        }
    }
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Config => "config",
        Command::Dashboard => "dashboard",
        Command::Requests { .. } => "requests",
        Command::Queue { .. } => "queue",
        Command::Decide { .. } => "decide",
        Command::History { .. } => "history",
        Command::Report => "report",
        Command::Inventory { .. } => "inventory",
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use partsdesk_core::{Decision, Priority};

    use super::{Cli, Command};

    #[test]
    fn decide_parses_decision_and_comments() {
        let cli = Cli::try_parse_from([
            "partsdesk",
            "decide",
            "42",
            "rejected",
            "--comments",
            "over budget",
        ])
        .expect("parse");

        match cli.command {
            Command::Decide { request_id, decision, comments } => {
                assert_eq!(request_id, 42);
                assert_eq!(decision, Decision::Rejected);
                assert_eq!(comments.as_deref(), Some("over budget"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn global_overrides_reach_load_options() {
        let cli = Cli::try_parse_from([
            "partsdesk",
            "queue",
            "--priority",
            "critical",
            "--base-url",
            "http://parts.depot:9000/api",
            "--acting-user",
            "7",
        ])
        .expect("parse");

        let options = cli.load_options();
        assert_eq!(options.overrides.base_url.as_deref(), Some("http://parts.depot:9000/api"));
        assert_eq!(options.overrides.acting_user_id, Some(7));
        assert!(!options.require_file);
        assert!(matches!(cli.command, Command::Queue { priority: Some(Priority::Critical), .. }));
    }

    #[test]
    fn unknown_priority_is_rejected_by_the_parser() {
        assert!(Cli::try_parse_from(["partsdesk", "queue", "--priority", "whenever"]).is_err());
    }
}
