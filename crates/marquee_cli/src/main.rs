//! Command line caller for the marquee item store.
//!
//! # Responsibility
//! - Parse commands into validated service calls.
//! - Render results and error kinds as JSON envelopes on stdout.
//!
//! # Invariants
//! - Backend error detail goes to the log, never to stdout.
//! - Any failed command exits with a non-zero status.

use clap::{Args, Parser, Subcommand};
use log::error;
use marquee_core::{
    init_logging, open_store_pool, open_store_pool_in_memory, AppConfig, Filters, ItemId,
    ItemPatch, ItemService, ListQuery, LogTarget, NewItem, Runtime, ServiceError,
    SqliteItemRepository, ITEM_SORT_SAFELIST,
};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::process::ExitCode;

const NOT_FOUND_MESSAGE: &str = "the requested resource could not be found";
const SERVER_ERROR_MESSAGE: &str =
    "the server encountered a problem and could not process your request";

#[derive(Debug, Parser)]
#[command(name = "marquee", version, about = "Item record store")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct GlobalArgs {
    /// TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// SQLite database file. Omit for a throwaway in-memory database.
    #[arg(long, env = "MARQUEE_DB_PATH", global = true)]
    db_path: Option<PathBuf>,
    #[arg(long, global = true)]
    db_max_open_conns: Option<u32>,
    #[arg(long, global = true)]
    db_max_idle_conns: Option<u32>,
    /// Seconds an idle pooled connection is kept.
    #[arg(long, global = true)]
    db_max_idle_time: Option<u64>,
    #[arg(long, global = true)]
    log_level: Option<String>,
    /// Absolute directory for rolling log files. Logs go to stderr otherwise.
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Store a new item.
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        year: i32,
        /// Running time, e.g. "102 mins".
        #[arg(long)]
        runtime: Runtime,
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// Print one item.
    Show {
        #[arg(allow_hyphen_values = true)]
        id: ItemId,
    },
    /// Change some fields of an item.
    Update {
        #[arg(allow_hyphen_values = true)]
        id: ItemId,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        runtime: Option<Runtime>,
        /// Replaces the whole tag list when given at least once.
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Refuse the update unless the stored version still matches.
        #[arg(long)]
        expected_version: Option<i32>,
    },
    /// Remove an item.
    Delete {
        #[arg(allow_hyphen_values = true)]
        id: ItemId,
    },
    /// List items with search, tag filter and paging.
    List {
        /// Title search text.
        #[arg(long, default_value = "")]
        title: String,
        /// Comma separated tags every result must carry.
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 20)]
        page_size: u32,
        #[arg(long, default_value = "id")]
        sort: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match resolve_config(&cli.global) {
        Ok(config) => config,
        Err(message) => {
            eprintln!("marquee: {message}");
            return ExitCode::FAILURE;
        }
    };

    let target = match &config.log_dir {
        Some(dir) => match LogTarget::directory(dir) {
            Ok(target) => target,
            Err(message) => {
                eprintln!("marquee: {message}");
                return ExitCode::FAILURE;
            }
        },
        None => LogTarget::Stderr,
    };
    if let Err(message) = init_logging(&config.log_level, target) {
        eprintln!("marquee: {message}");
        return ExitCode::FAILURE;
    }

    let pool = match &config.db_path {
        Some(path) => open_store_pool(path, &config.store),
        None => open_store_pool_in_memory(&config.store),
    };
    let pool = match pool {
        Ok(pool) => pool,
        Err(err) => {
            error!("event=cli_start module=cli status=error error={}", err);
            print_json(&json!({ "error": SERVER_ERROR_MESSAGE }));
            return ExitCode::FAILURE;
        }
    };

    let service = ItemService::new(SqliteItemRepository::new(pool, &config.store));
    match run(&service, cli.command) {
        Ok(body) => {
            print_json(&body);
            ExitCode::SUCCESS
        }
        Err(err) => {
            print_json(&error_envelope(&err));
            ExitCode::FAILURE
        }
    }
}

fn resolve_config(args: &GlobalArgs) -> Result<AppConfig, String> {
    let mut config = match &args.config {
        Some(path) => AppConfig::load(path).map_err(|err| err.to_string())?,
        None => AppConfig::default(),
    };

    if let Some(path) = &args.db_path {
        config.db_path = Some(path.clone());
    }
    if let Some(value) = args.db_max_open_conns {
        config.store.max_open_conns = value;
    }
    if let Some(value) = args.db_max_idle_conns {
        config.store.max_idle_conns = value;
    }
    if let Some(value) = args.db_max_idle_time {
        config.store.max_idle_time_secs = value;
    }
    if let Some(level) = &args.log_level {
        config.log_level = level.clone();
    }
    if let Some(dir) = &args.log_dir {
        config.log_dir = Some(dir.clone());
    }

    config.store.validate().map_err(|err| err.to_string())?;
    Ok(config)
}

fn run(
    service: &ItemService<SqliteItemRepository>,
    command: Command,
) -> Result<Value, ServiceError> {
    match command {
        Command::Create {
            title,
            year,
            runtime,
            tags,
        } => {
            let item = service.create_item(NewItem {
                title,
                year,
                runtime,
                tags,
            })?;
            Ok(json!({ "item": item }))
        }
        Command::Show { id } => Ok(json!({ "item": service.show_item(id)? })),
        Command::Update {
            id,
            title,
            year,
            runtime,
            tags,
            expected_version,
        } => {
            let patch = ItemPatch {
                title,
                year,
                runtime,
                tags: (!tags.is_empty()).then_some(tags),
            };
            let item = service.update_item(id, &patch, expected_version)?;
            Ok(json!({ "item": item }))
        }
        Command::Delete { id } => {
            service.delete_item(id)?;
            Ok(json!({ "message": "item successfully deleted" }))
        }
        Command::List {
            title,
            tags,
            page,
            page_size,
            sort,
        } => {
            let query = ListQuery {
                search_text: title,
                tags,
                filters: Filters {
                    page,
                    page_size,
                    sort,
                    sort_safelist: ITEM_SORT_SAFELIST.iter().map(|key| key.to_string()).collect(),
                },
            };
            let page = service.list_items(&query)?;
            Ok(json!({ "items": page.items, "metadata": page.metadata }))
        }
    }
}

fn error_envelope(err: &ServiceError) -> Value {
    match err {
        ServiceError::Validation(errors) => json!({ "error": errors }),
        ServiceError::NotFound => json!({ "error": NOT_FOUND_MESSAGE }),
        ServiceError::EditConflict => json!({ "error": err.to_string() }),
        ServiceError::Store(detail) => {
            error!("event=cli_command module=cli status=error error={}", detail);
            json!({ "error": SERVER_ERROR_MESSAGE })
        }
    }
}

fn print_json(body: &Value) {
    match serde_json::to_string_pretty(body) {
        Ok(text) => println!("{text}"),
        Err(err) => eprintln!("marquee: failed to encode output: {err}"),
    }
}
