//! Command-line interface for warcdb.
//!
//! Provides commands for importing WARC files, querying the response
//! index, and inspecting the store and configuration.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, ArgGroup, Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use crate::config;
use crate::domain::{ContentDigest, RecordType, UrlResponse};
use crate::engine::{IngestOptions, Ingester, QueryEngine};
use crate::store::{OpenMode, Store, StoreSettings};

/// warcdb - Import WARC archives into SQLite and query them by URL
#[derive(Parser, Debug)]
#[command(name = "warcdb")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Import WARC files and directories into the store
    Import {
        /// Database file (falls back to WARCDB_DB or the config file)
        #[arg(long)]
        db: Option<PathBuf>,

        /// WARC files, or directories searched for *.warc and *.warc.gz
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Skip records already imported (false: fail on the first one)
        #[arg(long, action = ArgAction::Set)]
        allow_existing: Option<bool>,

        /// Do not VACUUM after importing
        #[arg(long)]
        no_vacuum: bool,
    },

    /// Query an existing store; URLs, then payload, then records
    #[command(group(
        ArgGroup::new("action")
            .required(true)
            .multiple(true)
            .args(["get_urls_like", "get_url_payload", "get_url_records"])
    ))]
    Query {
        /// Database file (falls back to WARCDB_DB or the config file)
        #[arg(long)]
        db: Option<PathBuf>,

        /// Print every indexed URL matching a pattern (`*` is a wildcard)
        #[arg(long, value_name = "PATTERN")]
        get_urls_like: Option<String>,

        /// Write the payload of the first response for a URL to stdout
        #[arg(long, value_name = "URL")]
        get_url_payload: Option<String>,

        /// Print response records for a URL as JSON lines
        #[arg(long, value_name = "URL")]
        get_url_records: Option<String>,

        /// Maximum number of records to print
        #[arg(long, default_value = "10")]
        limit: usize,

        /// Only responses with a status below 300
        #[arg(long)]
        only_ok: bool,
    },

    /// Show table row counts
    Stats {
        /// Database file (falls back to WARCDB_DB or the config file)
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// Show resolved configuration (debug)
    Config,
}

/// One line of `query --get-url-records` output
#[derive(Debug, Serialize)]
struct RecordLine<'a> {
    url: &'a str,
    record_id: &'a str,
    record_type: &'a RecordType,
    http_status: Option<u16>,
    payload_digest: Option<&'a ContentDigest>,
    payload_length: usize,
    header_text: &'a str,
    protocol_header_text: Option<&'a str>,
}

impl<'a> From<&'a UrlResponse> for RecordLine<'a> {
    fn from(r: &'a UrlResponse) -> Self {
        Self {
            url: &r.url,
            record_id: &r.record_id,
            record_type: &r.record_type,
            http_status: r.http_status,
            payload_digest: r.payload_digest.as_ref(),
            payload_length: r.payload_bytes.len(),
            header_text: &r.header_text,
            protocol_header_text: r.protocol_header_text.as_deref(),
        }
    }
}

/// What `query` was asked to do
#[derive(Debug)]
enum QueryAction {
    UrlsLike(String),
    Payload(String),
    Records { url: String, limit: usize, only_ok: bool },
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Import {
                db,
                inputs,
                allow_existing,
                no_vacuum,
            } => {
                import(db, inputs, allow_existing, no_vacuum).await
            }
            Commands::Query {
                db,
                get_urls_like,
                get_url_payload,
                get_url_records,
                limit,
                only_ok,
            } => {
                let actions: Vec<QueryAction> = [
                    get_urls_like.map(QueryAction::UrlsLike),
                    get_url_payload.map(QueryAction::Payload),
                    get_url_records.map(|url| QueryAction::Records { url, limit, only_ok }),
                ]
                .into_iter()
                .flatten()
                .collect();
                if actions.is_empty() {
                    anyhow::bail!("Nothing to query. Use --get-urls-like, --get-url-payload or --get-url-records");
                }
                query(db, actions).await
            }
            Commands::Stats { db } => {
                show_stats(db).await
            }
            Commands::Config => {
                show_config().await
            }
        }
    }
}

/// Import inputs into a writable store
async fn import(
    db: Option<PathBuf>,
    inputs: Vec<PathBuf>,
    allow_existing: Option<bool>,
    no_vacuum: bool,
) -> Result<()> {
    let cfg = config::config()?;
    let db = cfg.database_or(db)?;
    let settings = cfg.store.clone();
    let options = IngestOptions {
        skip_existing: allow_existing.unwrap_or(cfg.ingest.skip_existing),
        vacuum: cfg.ingest.vacuum && !no_vacuum,
    };

    info!(db = %db.display(), inputs = inputs.len(), ?options, "Starting import");

    let report = tokio::task::spawn_blocking(move || -> Result<_> {
        let mut store = Store::open(&db, OpenMode::ReadWrite, &settings)?;
        let report = Ingester::new(&mut store, options).ingest_paths(&inputs)?;
        Ok(report)
    })
    .await
    .context("Import task panicked")??;

    info!(
        files = report.files.len(),
        inserted = report.records_inserted(),
        skipped = report.records_skipped(),
        "Import finished"
    );
    info!("{}", serde_json::to_string(&report)?);

    Ok(())
}

/// Run a read-only query
async fn query(db: Option<PathBuf>, actions: Vec<QueryAction>) -> Result<()> {
    let cfg = config::config()?;
    let db = cfg.database_or(db)?;
    let settings = cfg.store.clone();

    tokio::task::spawn_blocking(move || run_query(&db, &settings, actions))
        .await
        .context("Query task panicked")?
}

fn run_query(db: &std::path::Path, settings: &StoreSettings, actions: Vec<QueryAction>) -> Result<()> {
    let store = Store::open(db, OpenMode::ReadOnly, settings)?;
    let engine = QueryEngine::new(&store);

    let stdout = io::stdout();
    let mut out = stdout.lock();

    for action in actions {
        run_action(&engine, &mut out, action)?;
    }

    out.flush()?;
    Ok(())
}

/// Run one lookup, writing its output to `out`
fn run_action(engine: &QueryEngine<'_>, out: &mut impl Write, action: QueryAction) -> Result<()> {
    match action {
        QueryAction::UrlsLike(pattern) => {
            for url in engine.list_urls(&pattern)? {
                writeln!(out, "{}", url)?;
            }
        }
        QueryAction::Payload(url) => {
            let Some(bytes) = engine.first_payload(&url)? else {
                anyhow::bail!("Could not find response for {}", url);
            };
            out.write_all(&bytes)?;
        }
        QueryAction::Records { url, limit, only_ok } => {
            for response in engine.fetch_payload(&url, limit, only_ok)? {
                let line = serde_json::to_string(&RecordLine::from(&response))?;
                writeln!(out, "{}", line)?;
            }
        }
    }

    Ok(())
}

/// Show table row counts
async fn show_stats(db: Option<PathBuf>) -> Result<()> {
    let cfg = config::config()?;
    let db = cfg.database_or(db)?;
    let settings = cfg.store.clone();

    let path = db.clone();
    let counts = tokio::task::spawn_blocking(move || -> Result<_> {
        let store = Store::open(&path, OpenMode::ReadOnly, &settings)?;
        Ok(store.counts()?)
    })
    .await
    .context("Stats task panicked")??;

    println!("Database: {}", db.display());
    println!("  Payloads:  {}", counts.payloads);
    println!("  Records:   {}", counts.records);
    println!("  Responses: {}", counts.responses);

    Ok(())
}

/// Show resolved configuration
async fn show_config() -> Result<()> {
    let cfg = config::config()?;

    println!("warcdb configuration");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!(
        "Database:    {}",
        cfg.database
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(not set - pass --db)".to_string())
    );
    println!();
    println!("Import:");
    println!("  Allow existing: {}", cfg.ingest.skip_existing);
    println!("  Vacuum:         {}", cfg.ingest.vacuum);
    println!();
    println!("SQLite:");
    println!("  Busy timeout: {}s", cfg.store.busy_timeout.as_secs());
    println!("  Synchronous:  {:?}", cfg.store.synchronous);
    println!("  Page size:    {} bytes", cfg.store.page_size);
    println!("  Cache size:   {} KiB", cfg.store.cache_size_kib);
    println!("  mmap size:    {} bytes", cfg.store.mmap_size_bytes);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ArchiveRecord;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_import_flags() {
        let cli = Cli::try_parse_from([
            "warcdb",
            "import",
            "--db",
            "a.sqlite3",
            "one.warc",
            "dir/",
            "--allow-existing=false",
            "--no-vacuum",
        ])
        .unwrap();

        match cli.command {
            Commands::Import {
                db,
                inputs,
                allow_existing,
                no_vacuum,
            } => {
                assert_eq!(db, Some(PathBuf::from("a.sqlite3")));
                assert_eq!(inputs, vec![PathBuf::from("one.warc"), PathBuf::from("dir/")]);
                assert_eq!(allow_existing, Some(false));
                assert!(no_vacuum);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_query_needs_an_action() {
        assert!(Cli::try_parse_from(["warcdb", "query", "--db", "a.sqlite3"]).is_err());
        assert!(Cli::try_parse_from(["warcdb", "query", "--get-url-records", "http://a/", "--only-ok"]).is_ok());
    }

    #[test]
    fn test_query_accepts_several_actions() {
        let cli = Cli::try_parse_from([
            "warcdb",
            "query",
            "--get-urls-like",
            "*",
            "--get-url-payload",
            "http://a/",
        ])
        .unwrap();

        match cli.command {
            Commands::Query {
                get_urls_like,
                get_url_payload,
                get_url_records,
                ..
            } => {
                assert_eq!(get_urls_like.as_deref(), Some("*"));
                assert_eq!(get_url_payload.as_deref(), Some("http://a/"));
                assert!(get_url_records.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_actions_run_in_order_and_missing_payload_fails() {
        let mut store = Store::open_in_memory().unwrap();
        let records = [
            ArchiveRecord::response("<urn:uuid:1>", "http://a/", 200, "body-a"),
            ArchiveRecord::new(RecordType::Response, "<urn:uuid:2>").with_target_url("http://empty/"),
        ];
        let mut ingester = Ingester::new(&mut store, IngestOptions::default());
        for record in &records {
            ingester.ingest_record(record).unwrap();
        }
        let engine = QueryEngine::new(&store);

        let mut out: Vec<u8> = Vec::new();
        run_action(&engine, &mut out, QueryAction::UrlsLike("http://a/".to_string())).unwrap();
        run_action(&engine, &mut out, QueryAction::Payload("http://a/".to_string())).unwrap();
        assert_eq!(out, b"http://a/\nbody-a");

        let err = run_action(&engine, &mut Vec::<u8>::new(), QueryAction::Payload("http://empty/".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("Could not find response"));
    }

    #[test]
    fn test_record_line_omits_bytes() {
        let response = UrlResponse {
            url: "http://a/".to_string(),
            record_id: "<urn:uuid:1>".to_string(),
            header_text: "WARC-Type: response\r\n".to_string(),
            protocol_header_text: Some("HTTP/1.1 200 OK".to_string()),
            http_status: Some(200),
            record_type: RecordType::Response,
            payload_digest: Some(ContentDigest::new("sha1:ABC")),
            payload_bytes: b"hello".to_vec(),
        };

        let json: serde_json::Value =
            serde_json::to_value(RecordLine::from(&response)).unwrap();
        assert_eq!(json["payload_length"], 5);
        assert_eq!(json["record_type"], "response");
        assert_eq!(json["payload_digest"], "sha1:ABC");
        assert!(json.get("payload_bytes").is_none());
    }
}
