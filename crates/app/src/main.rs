mod logging;

use std::fmt::{self, Write as _};
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use services::{AppServices, CatalogSource, Clock};
use tour_core::model::{AreaKey, PrefectureId, StoreId};
use tour_core::progress::Progress;

const DEFAULT_DB_URL: &str = "sqlite://tour.sqlite3";
const DEFAULT_CATALOG: &str = "data/store_list.json";
const DEFAULT_SEED_COUNT: usize = 10;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingArgument { command: &'static str, name: &'static str },
    UnknownArg(String),
    UnknownCommand(String),
    InvalidId { raw: String },
    InvalidCount { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingArgument { command, name } => {
                write!(f, "{command} requires <{name}>")
            }
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown subcommand: {cmd}"),
            ArgsError::InvalidId { raw } => write!(f, "invalid id: {raw:?}"),
            ArgsError::InvalidCount { raw } => write!(f, "invalid --count value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  app [command] [--db <sqlite_url>] [--catalog <path|url>] [--json]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  summary                         progress report (default)");
    eprintln!("  regions                         progress per region");
    eprintln!("  map                             progress and fill opacity per prefecture");
    eprintln!("  info                            stored counts, app version and last update");
    eprintln!("  toggle <store-id>               flip a store's visited state");
    eprintln!("  favorite-prefecture <id>        flip a favorite prefecture");
    eprintln!("  favorite-area <pref_area>       flip a favorite area, e.g. tokyo_shibuya");
    eprintln!("  export [--out <file>]           write a backup (stdout by default)");
    eprintln!("  import <file>                   restore a backup");
    eprintln!("  clear                           remove all visits and favorites");
    eprintln!("  migrate-ids                     rewrite retired store ids");
    eprintln!("  seed [--count <n>]              mark random stores visited");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db {DEFAULT_DB_URL}");
    eprintln!("  --catalog {DEFAULT_CATALOG}");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  TOUR_DB_URL, TOUR_CATALOG, RUST_LOG, DEBUG_LOGGING");
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Summary,
    Regions,
    Map,
    Info,
    Toggle(StoreId),
    FavoritePrefecture(PrefectureId),
    FavoriteArea(AreaKey),
    Export { out: Option<PathBuf> },
    Import(PathBuf),
    Clear,
    MigrateIds,
    Seed { count: usize },
}

#[derive(Debug)]
struct Args {
    command: Command,
    db_url: String,
    catalog: String,
    json: bool,
}

impl Args {
    /// Parse arguments after the program name. `Ok(None)` means help was requested.
    fn parse(
        argv: impl IntoIterator<Item = String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Option<Self>, ArgsError> {
        let mut args = argv.into_iter().peekable();

        let explicit = args.peek().is_some_and(|first| !first.starts_with('-'));
        let name = match args.next_if(|_| explicit) {
            Some(name) => name,
            None => "summary".to_string(),
        };

        let mut db_url = env("TOUR_DB_URL").unwrap_or_else(|| DEFAULT_DB_URL.into());
        let mut catalog = env("TOUR_CATALOG").unwrap_or_else(|| DEFAULT_CATALOG.into());
        let mut json = false;
        let mut out = None;
        let mut count = None;
        let mut positional = Vec::new();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--catalog" => catalog = require_value(&mut args, "--catalog")?,
                "--json" => json = true,
                "--out" if name == "export" => {
                    out = Some(PathBuf::from(require_value(&mut args, "--out")?));
                }
                "--count" if name == "seed" => {
                    let value = require_value(&mut args, "--count")?;
                    let parsed = value
                        .parse::<usize>()
                        .map_err(|_| ArgsError::InvalidCount { raw: value.clone() })?;
                    count = Some(parsed);
                }
                "--help" | "-h" => return Ok(None),
                other if other.starts_with("--") => return Err(ArgsError::UnknownArg(arg)),
                _ => positional.push(arg),
            }
        }

        let mut positional = positional.into_iter();
        let command = match name.as_str() {
            "summary" => Command::Summary,
            "regions" => Command::Regions,
            "map" => Command::Map,
            "info" => Command::Info,
            "toggle" => Command::Toggle(parse_id(positional.next(), "toggle", "store-id")?),
            "favorite-prefecture" => Command::FavoritePrefecture(parse_id(
                positional.next(),
                "favorite-prefecture",
                "id",
            )?),
            "favorite-area" => {
                Command::FavoriteArea(parse_id(positional.next(), "favorite-area", "pref_area")?)
            }
            "export" => Command::Export { out },
            "import" => Command::Import(PathBuf::from(positional.next().ok_or(
                ArgsError::MissingArgument {
                    command: "import",
                    name: "file",
                },
            )?)),
            "clear" => Command::Clear,
            "migrate-ids" => Command::MigrateIds,
            "seed" => Command::Seed {
                count: count.unwrap_or(DEFAULT_SEED_COUNT),
            },
            "help" => return Ok(None),
            _ => return Err(ArgsError::UnknownCommand(name)),
        };

        if let Some(extra) = positional.next() {
            return Err(ArgsError::UnknownArg(extra));
        }

        Ok(Some(Self {
            command,
            db_url: normalize_sqlite_url(&db_url),
            catalog,
            json,
        }))
    }
}

fn parse_id<T: std::str::FromStr>(
    raw: Option<String>,
    command: &'static str,
    name: &'static str,
) -> Result<T, ArgsError> {
    let raw = raw.ok_or(ArgsError::MissingArgument { command, name })?;
    raw.parse().map_err(|_| ArgsError::InvalidId { raw })
}

/// Rewrite a file-backed URL (or bare path) as `sqlite://` plus an absolute
/// path, keeping any `?query`. In-memory databases pass through.
fn normalize_sqlite_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed == "sqlite::memory:" || trimmed.contains("mode=memory") {
        return trimmed.to_string();
    }

    let rest = trimmed
        .strip_prefix("sqlite://")
        .or_else(|| trimmed.strip_prefix("sqlite:"))
        .unwrap_or(trimmed);
    let (path, query) = rest.split_once('?').map_or((rest, None), |(p, q)| (p, Some(q)));
    let path = std::path::Path::new(path);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    match query {
        Some(query) => format!("sqlite://{}?{query}", absolute.display()),
        None => format!("sqlite://{}", absolute.display()),
    }
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" || db_url.contains("mode=memory") {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

fn to_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(value)
}

fn progress_line(name: &str, progress: Progress) -> String {
    let badge = progress.badge();
    let mut line = format!(
        "{name}: {}/{} ({}%)",
        progress.visited(),
        progress.total(),
        progress.percentage()
    );
    if !badge.icon().is_empty() {
        let _ = write!(line, " {} {}", badge.icon(), badge.label());
    }
    line
}

fn describe_time(at: Option<DateTime<Utc>>, missing: &str) -> String {
    at.map_or_else(|| missing.to_string(), |at| at.to_rfc3339())
}

/// Run one command and render what it prints on stdout.
async fn execute(
    app: &AppServices,
    command: Command,
    json: bool,
) -> Result<String, Box<dyn std::error::Error>> {
    let output = match command {
        Command::Summary => {
            let snapshot = app.progress().snapshot().await?;
            let calc = snapshot.calculator();
            if json {
                to_json(&calc.achievements_summary())?
            } else {
                calc.progress_report()
            }
        }
        Command::Regions => {
            let snapshot = app.progress().snapshot().await?;
            let regions = snapshot.calculator().regional_progress();
            if json {
                to_json(&regions)?
            } else {
                regions
                    .iter()
                    .map(|region| progress_line(&region.name, region.progress))
                    .collect::<Vec<_>>()
                    .join("\n")
            }
        }
        Command::Map => {
            let snapshot = app.progress().snapshot().await?;
            let entries = snapshot.calculator().prefecture_map_data();
            if json {
                to_json(&entries)?
            } else {
                entries
                    .iter()
                    .map(|entry| {
                        format!(
                            "{} [opacity {:.2}]",
                            progress_line(&entry.name, entry.progress),
                            entry.fill_opacity
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            }
        }
        Command::Info => {
            let info = app.backup().info().await?;
            if json {
                to_json(&info)?
            } else {
                [
                    format!("visited stores: {}", info.visited),
                    format!("favorite prefectures: {}", info.favorite_prefectures),
                    format!("favorite areas: {}", info.favorite_areas),
                    format!(
                        "app version: {}",
                        info.app_version.as_deref().unwrap_or("unknown")
                    ),
                    format!("last update: {}", describe_time(info.last_update, "never")),
                    format!("first visit: {}", describe_time(info.first_visit, "none")),
                    format!("latest visit: {}", describe_time(info.latest_visit, "none")),
                ]
                .join("\n")
            }
        }
        Command::Toggle(store_id) => {
            let catalog = app.catalog();
            if !catalog.contains_store(&store_id) {
                tracing::warn!(store = %store_id, "store is not in the catalog");
            }
            let visited = app.visits().toggle(&store_id).await?;
            if json {
                to_json(&serde_json::json!({ "storeId": store_id, "visited": visited }))?
            } else {
                let name = catalog
                    .store(&store_id)
                    .map_or(store_id.as_str(), |store| store.name());
                let state = if visited { "visited" } else { "not visited" };
                format!("{name}: {state}")
            }
        }
        Command::FavoritePrefecture(prefecture_id) => {
            let favorite = app.favorites().toggle_prefecture(&prefecture_id).await?;
            if json {
                to_json(&serde_json::json!({
                    "prefectureId": prefecture_id,
                    "favorite": favorite,
                }))?
            } else {
                let state = if favorite { "added to" } else { "removed from" };
                format!("{prefecture_id} {state} favorites")
            }
        }
        Command::FavoriteArea(key) => {
            let favorite = app.favorites().toggle_area(&key).await?;
            if json {
                to_json(&serde_json::json!({ "areaKey": key, "favorite": favorite }))?
            } else {
                let state = if favorite { "added to" } else { "removed from" };
                format!("{key} {state} favorites")
            }
        }
        Command::Export { out } => {
            let backup = app.backup().export().await?;
            match out {
                Some(path) => {
                    tokio::fs::write(&path, backup).await?;
                    if json {
                        to_json(&serde_json::json!({ "path": path.display().to_string() }))?
                    } else {
                        format!("backup written to {}", path.display())
                    }
                }
                None => backup,
            }
        }
        Command::Import(path) => {
            let raw = tokio::fs::read_to_string(&path).await?;
            let outcome = app.backup().import(&raw).await?;
            if json {
                to_json(&outcome)?
            } else {
                let describe = |count: Option<usize>| {
                    count.map_or_else(|| "unchanged".to_string(), |n| n.to_string())
                };
                [
                    format!("visited stores: {}", describe(outcome.visited)),
                    format!("favorite areas: {}", describe(outcome.favorite_areas)),
                    format!(
                        "favorite prefectures: {}",
                        describe(outcome.favorite_prefectures)
                    ),
                ]
                .join("\n")
            }
        }
        Command::Clear => {
            app.backup().clear_all().await?;
            if json {
                to_json(&serde_json::json!({ "cleared": true }))?
            } else {
                "cleared all visits and favorites".to_string()
            }
        }
        Command::MigrateIds => {
            let migrated = app.visits().migrate_legacy_ids(&app.catalog()).await?;
            if json {
                to_json(&serde_json::json!({ "migrated": migrated }))?
            } else {
                format!("migrated {migrated} store ids")
            }
        }
        Command::Seed { count } => {
            let marked = app.visits().mark_random(&app.catalog(), count).await?;
            if json {
                to_json(&serde_json::json!({ "marked": marked }))?
            } else {
                format!("marked {marked} stores visited")
            }
        }
    };
    Ok(output)
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let parsed = Args::parse(std::env::args().skip(1), |key| std::env::var(key).ok()).map_err(
        |e| {
            eprintln!("{e}");
            print_usage();
            e
        },
    )?;
    let Some(args) = parsed else {
        print_usage();
        return Ok(());
    };

    let source = CatalogSource::parse(&args.catalog)?;
    let catalog = Arc::new(source.load().await?);

    // The database file must exist before sqlx opens it.
    prepare_sqlite_file(&args.db_url)?;
    let app = AppServices::new_sqlite(&args.db_url, catalog, Clock::system()).await?;
    if app.first_run() {
        tracing::info!(db = %args.db_url, "created new visit database");
    }

    let output = execute(&app, args.command, args.json).await?;
    println!("{output}");
    Ok(())
}

#[tokio::main]
async fn main() {
    logging::init();
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use storage::Storage;
    use tour_core::model::{
        APP_VERSION, Area, AreaId, Prefecture, Region, RegionId, Store, StoreCatalog,
    };
    use tour_core::time::{fixed_clock, fixed_now};

    fn argv(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| (*s).to_string()).collect()
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn defaults_to_summary() {
        let args = Args::parse(argv(&[]), no_env).unwrap().unwrap();
        assert_eq!(args.command, Command::Summary);
        assert_eq!(args.db_url, normalize_sqlite_url(DEFAULT_DB_URL));
        assert!(args.db_url.starts_with("sqlite:///"));
        assert!(args.db_url.ends_with("/tour.sqlite3"));
        assert_eq!(args.catalog, DEFAULT_CATALOG);
        assert!(!args.json);

        let args = Args::parse(argv(&["--json"]), no_env).unwrap().unwrap();
        assert_eq!(args.command, Command::Summary);
        assert!(args.json);
    }

    #[test]
    fn flags_override_environment() {
        let env = |key: &str| match key {
            "TOUR_CATALOG" => Some("https://example.com/stores.json".to_string()),
            "TOUR_DB_URL" => Some("sqlite::memory:".to_string()),
            _ => None,
        };
        let args = Args::parse(argv(&["regions"]), env).unwrap().unwrap();
        assert_eq!(args.catalog, "https://example.com/stores.json");
        assert_eq!(args.db_url, "sqlite::memory:");

        let args = Args::parse(argv(&["regions", "--catalog", "local.json"]), env)
            .unwrap()
            .unwrap();
        assert_eq!(args.catalog, "local.json");
    }

    #[test]
    fn parses_commands_with_arguments() {
        let args = Args::parse(argv(&["toggle", "tokyo-shibuya-01"]), no_env)
            .unwrap()
            .unwrap();
        assert_eq!(args.command, Command::Toggle(StoreId::new("tokyo-shibuya-01")));

        let args = Args::parse(argv(&["favorite-area", "tokyo_shibuya"]), no_env)
            .unwrap()
            .unwrap();
        assert!(matches!(
            args.command,
            Command::FavoriteArea(ref key) if key.to_string() == "tokyo_shibuya"
        ));

        let args = Args::parse(argv(&["info", "--json"]), no_env).unwrap().unwrap();
        assert_eq!(args.command, Command::Info);
        assert!(args.json);

        let args = Args::parse(argv(&["seed", "--count", "3"]), no_env)
            .unwrap()
            .unwrap();
        assert_eq!(args.command, Command::Seed { count: 3 });

        let args = Args::parse(argv(&["export", "--out", "backup.json"]), no_env)
            .unwrap()
            .unwrap();
        assert_eq!(
            args.command,
            Command::Export {
                out: Some(PathBuf::from("backup.json"))
            }
        );
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(
            Args::parse(argv(&["toggle"]), no_env),
            Err(ArgsError::MissingArgument { .. })
        ));
        assert!(matches!(
            Args::parse(argv(&["favorite-area", "tokyo"]), no_env),
            Err(ArgsError::InvalidId { .. })
        ));
        assert!(matches!(
            Args::parse(argv(&["seed", "--count", "many"]), no_env),
            Err(ArgsError::InvalidCount { .. })
        ));
        assert!(matches!(
            Args::parse(argv(&["summary", "--out", "x"]), no_env),
            Err(ArgsError::UnknownArg(_))
        ));
        assert!(matches!(
            Args::parse(argv(&["dance"]), no_env),
            Err(ArgsError::UnknownCommand(_))
        ));
        assert!(matches!(
            Args::parse(argv(&["--db"]), no_env),
            Err(ArgsError::MissingValue { flag: "--db" })
        ));
    }

    #[test]
    fn help_returns_none() {
        assert!(Args::parse(argv(&["--help"]), no_env).unwrap().is_none());
        assert!(Args::parse(argv(&["map", "-h"]), no_env).unwrap().is_none());
    }

    #[test]
    fn normalizes_relative_sqlite_paths() {
        assert_eq!(normalize_sqlite_url("sqlite::memory:"), "sqlite::memory:");
        assert_eq!(
            normalize_sqlite_url("sqlite:///tmp/tour.db"),
            "sqlite:///tmp/tour.db"
        );
        assert_eq!(
            normalize_sqlite_url("sqlite:///tmp/tour.db?mode=rwc"),
            "sqlite:///tmp/tour.db?mode=rwc"
        );
        let cwd = std::env::current_dir().unwrap();
        for relative in ["sqlite:tour.db", "sqlite://tour.db", "tour.db"] {
            assert_eq!(
                normalize_sqlite_url(relative),
                format!("sqlite://{}", cwd.join("tour.db").display())
            );
        }
    }

    fn fixture_catalog() -> Arc<StoreCatalog> {
        let osaka = PrefectureId::new("osaka");
        let umeda = AreaId::new("umeda");
        let stores = ["o1", "o2"]
            .into_iter()
            .map(|id| {
                Store::new(
                    StoreId::new(id),
                    format!("Umeda {id}"),
                    "",
                    osaka.clone(),
                    umeda.clone(),
                    None,
                )
            })
            .collect();
        let catalog = StoreCatalog::new(
            vec![Region::new(RegionId::new("kansai"), "関西", vec![osaka.clone()])],
            vec![Prefecture::new(
                osaka,
                "大阪府",
                vec![Area::new(umeda, "梅田")],
            )],
            stores,
        )
        .unwrap();
        Arc::new(catalog)
    }

    async fn in_memory_app() -> AppServices {
        AppServices::new(Storage::in_memory(), fixture_catalog(), fixed_clock())
            .await
            .unwrap()
    }

    async fn run_json(app: &AppServices, command: Command) -> serde_json::Value {
        let output = execute(app, command, true).await.unwrap();
        serde_json::from_str(&output).unwrap()
    }

    #[tokio::test]
    async fn every_command_honors_json() {
        let app = in_memory_app().await;

        let toggled = run_json(&app, Command::Toggle(StoreId::new("o1"))).await;
        assert_eq!(toggled["visited"], true);

        let seeded = run_json(&app, Command::Seed { count: 5 }).await;
        assert_eq!(seeded["marked"], 1);

        let migrated = run_json(&app, Command::MigrateIds).await;
        assert_eq!(migrated["migrated"], 0);

        let info = run_json(&app, Command::Info).await;
        assert_eq!(info["visited"], 2);
        assert_eq!(info["appVersion"], APP_VERSION);
        assert!(info["lastUpdate"].is_null());

        let exported = run_json(&app, Command::Export { out: None }).await;
        assert_eq!(exported["visited"].as_array().map(Vec::len), Some(2));

        let cleared = run_json(&app, Command::Clear).await;
        assert_eq!(cleared["cleared"], true);

        let info = run_json(&app, Command::Info).await;
        assert_eq!(info["visited"], 0);
        assert_eq!(info["lastUpdate"], serde_json::to_value(fixed_now()).unwrap());
    }

    #[tokio::test]
    async fn info_text_lists_version_and_last_update() {
        let app = in_memory_app().await;
        let output = execute(&app, Command::Info, false).await.unwrap();
        assert!(output.contains("visited stores: 0"));
        assert!(output.contains(&format!("app version: {APP_VERSION}")));
        assert!(output.contains("last update: never"));
    }
}
