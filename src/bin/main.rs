//! Command-line entry point: wires the library's three subsystems (scan,
//! diff, ct) to file/stdin/stdout plumbing. Kept thin.
use std::collections::HashSet;
use std::io::{BufRead, BufReader, IsTerminal, Write};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use log::error;

use subdomain_scout::ct::subdomains_to_labels;
use subdomain_scout::diff::{compute_diff, load_jsonl};
use subdomain_scout::error::ScoutError;
use subdomain_scout::hostname::normalize_domain;
use subdomain_scout::resolver::{load_nameservers_file, DnsClient, ResolverMode};
use subdomain_scout::retry::RetryConfig;
use subdomain_scout::scan::labels::read_label_stream;
use subdomain_scout::scan::resume::load_resume_set;
use subdomain_scout::scan::{run_scan, OutputSink, ScanConfig, Status};
use subdomain_scout::summary::{diff_summary_human, diff_summary_json};
use subdomain_scout::takeover::{FingerprintCatalog, TakeoverChecker};
use subdomain_scout::wildcard::{WildcardDetector, DEFAULT_PROBE_COUNT, DEFAULT_WILDCARD_THRESHOLD};

const EXIT_SUCCESS: i32 = 0;
const EXIT_FAILURE: i32 = 1;
const EXIT_USER_ERROR: i32 = 2;

#[derive(Parser)]
#[command(name = "subdomain-scout", version, about = "Active subdomain discovery engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    Scan(ScanArgs),
    Diff(DiffArgs),
    Ct(CtArgs),
    Version,
}

#[derive(Args)]
struct ScanArgs {
    /// Apex domain to scan under.
    #[arg(long)]
    domain: String,
    /// Wordlist file; omit to read from standard input.
    #[arg(long)]
    wordlist: Option<PathBuf>,
    /// Output path; omit (or "-") to write to standard output.
    #[arg(long)]
    output: Option<PathBuf>,
    #[arg(long, default_value = "3")]
    timeout_secs: u64,
    #[arg(long, default_value = "10")]
    concurrency: usize,
    #[arg(long, default_value = "0")]
    retries: u32,
    #[arg(long, default_value = "0")]
    retry_backoff_ms: u64,
    /// Comma-separated status allowlist; mutually exclusive with --only-resolved.
    #[arg(long, value_delimiter = ',')]
    status: Option<Vec<String>>,
    #[arg(long)]
    only_resolved: bool,
    #[arg(long)]
    no_wildcard_detect: bool,
    #[arg(long, default_value_t = DEFAULT_PROBE_COUNT)]
    wildcard_probes: usize,
    #[arg(long, default_value_t = DEFAULT_WILDCARD_THRESHOLD)]
    wildcard_threshold: u32,
    #[arg(long)]
    wildcard_http_suppression: bool,
    #[arg(long)]
    takeover: bool,
    #[arg(long)]
    fingerprints_file: Option<PathBuf>,
    /// Resolver spec file; when absent, the OS resolver is used.
    #[arg(long)]
    resolvers: Option<PathBuf>,
    #[arg(long)]
    resume: bool,
    /// Reclassify not_found candidates with a CNAME in their chain as cname.
    /// Requires --resolvers.
    #[arg(long)]
    include_cname: bool,
    /// Pre-fetched CT subdomain list (JSON array of strings).
    #[arg(long)]
    ct_file: Option<PathBuf>,
    #[arg(long)]
    json_summary: bool,
}

#[derive(Args)]
struct DiffArgs {
    old: PathBuf,
    new: PathBuf,
    #[arg(long)]
    resolved_only: bool,
    #[arg(long)]
    skip_invalid: bool,
    #[arg(long)]
    fail_on_changes: bool,
    #[arg(long)]
    json_summary: bool,
}

#[derive(Args)]
struct CtArgs {
    #[arg(long)]
    domain: String,
    /// Pre-fetched JSON array of subdomains; omit to read from standard input.
    #[arg(long)]
    input: Option<PathBuf>,
    #[arg(long)]
    json_summary: bool,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    let code = match cli.command {
        Command::Scan(args) => run(cmd_scan(args)),
        Command::Diff(args) => run(cmd_diff(args)),
        Command::Ct(args) => run(cmd_ct(args)),
        Command::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            EXIT_SUCCESS
        }
    };
    std::process::exit(code);
}

fn run(result: Result<i32, ScoutError>) -> i32 {
    match result {
        Ok(code) => code,
        Err(ScoutError::Validation(msg)) => {
            eprintln!("error: {msg}");
            EXIT_USER_ERROR
        }
        // File-not-found is a user error (bad path) even though it surfaces
        // as an io::Error rather than ScoutError::Validation.
        Err(ScoutError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            eprintln!("error: {e}");
            EXIT_USER_ERROR
        }
        Err(e) => {
            error!("{e}");
            eprintln!("error: {e}");
            EXIT_FAILURE
        }
    }
}

fn open_input(path: &Option<PathBuf>) -> Result<Box<dyn BufRead>, ScoutError> {
    match path {
        Some(p) => Ok(Box::new(BufReader::new(std::fs::File::open(p)?))),
        None => Ok(Box::new(BufReader::new(std::io::stdin()))),
    }
}

fn cmd_scan(args: ScanArgs) -> Result<i32, ScoutError> {
    if args.status.is_some() && args.only_resolved {
        return Err(ScoutError::validation(
            "--status and --only-resolved are mutually exclusive",
        ));
    }
    if args.include_cname && args.resolvers.is_none() {
        return Err(ScoutError::validation("--include-cname requires --resolvers"));
    }
    if args.resume && args.output.is_none() {
        return Err(ScoutError::validation("--resume requires --output (not stdout)"));
    }

    let domain = normalize_domain(&args.domain)?;
    let timeout = Duration::from_secs(args.timeout_secs);

    let mode = match &args.resolvers {
        Some(path) => {
            let contents = std::fs::read_to_string(path)?;
            let nameservers = load_nameservers_file(&contents, &path.to_string_lossy())?;
            ResolverMode::custom(DnsClient::new(nameservers, timeout))
        }
        None => ResolverMode::System,
    };

    let wordlist_labels = read_label_stream(open_input(&args.wordlist)?)?;

    let ct_labels = match &args.ct_file {
        Some(path) => {
            let contents = std::fs::read_to_string(path)?;
            let raw: Vec<String> = serde_json::from_str(&contents)?;
            subdomains_to_labels(&raw, &domain)
        }
        None => Vec::new(),
    };

    let resume_seen = if args.resume {
        let path = args.output.as_ref().unwrap();
        if path.exists() {
            load_resume_set(BufReader::new(std::fs::File::open(path)?), &domain)?
        } else {
            HashSet::new()
        }
    } else {
        HashSet::new()
    };

    let status_filter = args
        .status
        .map(|names| {
            names
                .iter()
                .map(|n| parse_status(n))
                .collect::<Result<HashSet<_>, _>>()
        })
        .transpose()?
        .or_else(|| {
            if args.only_resolved {
                Some(HashSet::from([Status::Resolved]))
            } else {
                None
            }
        });

    let wildcard = if args.no_wildcard_detect {
        None
    } else {
        Some(WildcardDetector::new(args.wildcard_probes, args.wildcard_threshold))
    };

    let takeover = if args.takeover {
        let catalog = match &args.fingerprints_file {
            Some(path) => FingerprintCatalog::load_from_file(path)?,
            None => FingerprintCatalog::default_catalog(),
        };
        Some(TakeoverChecker::new(timeout, catalog)?)
    } else {
        None
    };

    let mut sink = match &args.output {
        Some(path) if args.resume => OutputSink::append_file(path)?,
        Some(path) => OutputSink::new_file(path)?,
        None => OutputSink::stdout(),
    };

    let cfg = ScanConfig {
        domain,
        concurrency: args.concurrency.max(1),
        retry: RetryConfig {
            retries: args.retries,
            backoff_ms: args.retry_backoff_ms,
        },
        status_filter,
        include_cname: args.include_cname,
        wildcard_http_suppression: args.wildcard_http_suppression,
        http_timeout: timeout,
    };

    let summary = run_scan(
        mode,
        wordlist_labels,
        ct_labels,
        cfg,
        wildcard,
        takeover,
        resume_seen,
        &mut sink,
    )?;
    sink.finish()?;

    if args.json_summary {
        println!("{}", summary.to_json_line()?);
    } else {
        println!("{}", summary.human_readable());
    }

    Ok(summary.exit_code())
}

fn parse_status(name: &str) -> Result<Status, ScoutError> {
    match name.trim() {
        "resolved" => Ok(Status::Resolved),
        "not_found" => Ok(Status::NotFound),
        "error" => Ok(Status::Error),
        "wildcard" => Ok(Status::Wildcard),
        "cname" => Ok(Status::Cname),
        other => Err(ScoutError::validation(format!("unknown status filter: {other}"))),
    }
}

fn cmd_diff(args: DiffArgs) -> Result<i32, ScoutError> {
    let old = load_jsonl(
        BufReader::new(std::fs::File::open(&args.old)?),
        &args.old.to_string_lossy(),
        args.resolved_only,
        args.skip_invalid,
    )?;
    let new = load_jsonl(
        BufReader::new(std::fs::File::open(&args.new)?),
        &args.new.to_string_lossy(),
        args.resolved_only,
        args.skip_invalid,
    )?;

    let (summary, events) = compute_diff(&old, &new);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for event in &events {
        writeln!(out, "{}", serde_json::to_string(event)?)?;
    }

    if args.json_summary {
        println!("{}", diff_summary_json(&summary)?);
    } else {
        println!("{}", diff_summary_human(&summary));
    }

    let changes = summary.added + summary.removed + summary.changed;
    if args.fail_on_changes && changes > 0 {
        Ok(EXIT_FAILURE)
    } else {
        Ok(EXIT_SUCCESS)
    }
}

fn cmd_ct(args: CtArgs) -> Result<i32, ScoutError> {
    let domain = normalize_domain(&args.domain)?;
    let start = std::time::Instant::now();

    let contents = match &args.input {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            use std::io::Read;
            let mut buf = String::new();
            if std::io::stdin().is_terminal() {
                return Err(ScoutError::validation(
                    "--input is required when standard input is a terminal",
                ));
            }
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    let raw: Vec<String> = serde_json::from_str(&contents)?;
    let names_seen = raw.len();
    let labels = subdomains_to_labels(&raw, &domain);

    for label in &labels {
        println!("{label}");
    }

    let summary = subdomain_scout::summary::CtSummary {
        records_fetched: raw.len(),
        names_seen,
        emitted: labels.len(),
        elapsed_ms: start.elapsed().as_millis() as u64,
    };
    if args.json_summary {
        println!("{}", summary.to_json_line()?);
    } else {
        println!("{}", summary.human_readable());
    }

    Ok(EXIT_SUCCESS)
}
