//! fs-vcard: CLI tool for vCard parsing, contact export and composition.

use anyhow::Result;
use clap::{Parser, Subcommand};
use foodshare_cli::output::{format_count, format_duration, format_size, OutputMode, Status};
use foodshare_cli::progress;
use foodshare_core::config::Config;
use foodshare_core::error::{exit_codes, Error, ResultExt};
use foodshare_core::file_scanner::{file_size, FileScanner};
use foodshare_telemetry::{metrics, names, TelemetryConfig, Timer};
use foodshare_vcard::{
    Charset, Contact, ContactOptions, ParserOptions, VCardComposer, VCardParser,
    VCardSourceDetector, Version, VersionedParser,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "fs-vcard")]
#[command(about = "vCard 2.1/3.0 parsing, contact export and composition")]
#[command(version)]
struct Cli {
    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase output verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a vCard file and print its records
    Parse {
        /// Path to vCard file
        file: PathBuf,
        /// Force a vCard version (2.1 or 3.0) instead of judging it
        #[arg(long)]
        version: Option<Version>,
        /// Charset of the file
        #[arg(long)]
        charset: Option<Charset>,
        /// Print parse statistics
        #[arg(long)]
        stats: bool,
    },
    /// Convert the records of a vCard file into contacts
    Contacts {
        /// Path to vCard file
        file: PathBuf,
        /// Charset of the file
        #[arg(long)]
        charset: Option<Charset>,
    },
    /// Write contacts from a JSON file as vCard text
    Compose {
        /// JSON file holding one contact or an array of contacts
        json_file: PathBuf,
        /// Output version (2.1 or 3.0)
        #[arg(long)]
        version: Option<Version>,
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Guess the device family that produced a vCard file
    Detect {
        /// Path to vCard file
        file: PathBuf,
    },
    /// Parse every vCard file under a directory
    Scan {
        /// Directory to scan
        dir: PathBuf,
        /// Extra glob patterns to skip
        #[arg(long)]
        exclude: Vec<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.no_color {
        owo_colors::set_override(false);
    }
    let mode = OutputMode::from_flags(cli.json, cli.quiet);

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => std::process::exit(report_error(&e, mode)),
    };

    let mut telemetry = TelemetryConfig::default()
        .with_verbosity(&config.schema.logging.level, cli.verbose, cli.quiet);
    telemetry.show_target |= config.schema.logging.show_target;
    foodshare_telemetry::init_with_config(telemetry)?;

    let result = match cli.command {
        Commands::Parse { file, version, charset, stats } => {
            run_parse(&file, version, charset, stats, &config, mode)
        }
        Commands::Contacts { file, charset } => run_contacts(&file, charset, &config, mode),
        Commands::Compose { json_file, version, output } => {
            run_compose(&json_file, version, output.as_deref(), &config, mode)
        }
        Commands::Detect { file } => run_detect(&file, &config, mode),
        Commands::Scan { dir, exclude } => run_scan(&dir, &exclude, &config, mode),
    };

    let exit_code = match result {
        Ok(code) => code,
        Err(e) => report_error(&e, mode),
    };

    if cli.verbose >= 2 && mode != OutputMode::Json {
        eprintln!("{}", metrics().export_json());
    }

    std::process::exit(exit_code);
}

/// Print an error and return its exit code
fn report_error(err: &Error, mode: OutputMode) -> i32 {
    match mode {
        OutputMode::Json => match serde_json::to_string_pretty(&err.to_report()) {
            Ok(json) => eprintln!("{}", json),
            Err(_) => eprintln!("{}", err),
        },
        _ => Status::error(&err.to_string()),
    }
    err.exit_code()
}

fn parser_options(
    config: &Config,
    version: Option<Version>,
    charset: Option<Charset>,
) -> foodshare_core::Result<ParserOptions> {
    let mut options = config.schema.parser.parser_options()?;
    if version.is_some() {
        options.version = version;
    }
    if let Some(charset) = charset {
        options.charset = charset;
    }
    Ok(options)
}

fn read_file(path: &Path) -> foodshare_core::Result<Vec<u8>> {
    if !path.exists() {
        return Err(Error::file_not_found(path));
    }
    std::fs::read(path)
        .map_err(Error::from)
        .context(format!("Reading {}", path.display()))
}

fn run_parse(
    file: &Path,
    version: Option<Version>,
    charset: Option<Charset>,
    show_stats: bool,
    config: &Config,
    mode: OutputMode,
) -> foodshare_core::Result<i32> {
    let bytes = read_file(file)?;
    let mut parser = VCardParser::with_options(parser_options(config, version, charset)?);

    let timer = Timer::start("parse_ms");
    let nodes = parser
        .parse_bytes(&bytes)
        .map_err(Error::from)
        .context(format!("Parsing {}", file.display()))?;
    timer.stop();

    let report = serde_json::json!({
        "file": file.display().to_string(),
        "version": parser.version(),
        "source_type": parser.source_type(),
        "stats": parser.stats(),
        "records": nodes,
    });

    mode.emit(&report, || {
        for (i, node) in nodes.iter().enumerate() {
            if mode.is_interactive() {
                Status::header(&format!("{} #{}", node.name, i + 1));
            }
            for property in &node.properties {
                println!("  {}", property);
            }
        }
        if show_stats && mode.is_interactive() {
            let stats = parser.stats();
            Status::header("Statistics");
            Status::field("records", &stats.records.to_string());
            Status::field("properties", &stats.properties.to_string());
            Status::field("warnings", &stats.warnings.to_string());
            Status::field("total", &format_duration(stats.total));
        }
    })?;

    Ok(exit_codes::SUCCESS)
}

fn run_contacts(
    file: &Path,
    charset: Option<Charset>,
    config: &Config,
    mode: OutputMode,
) -> foodshare_core::Result<i32> {
    let bytes = read_file(file)?;
    let mut parser = VCardParser::with_options(parser_options(config, None, charset)?);
    let contact_options = config.schema.contact.contact_options()?;

    let nodes = parser
        .parse_bytes(&bytes)
        .map_err(Error::from)
        .context(format!("Parsing {}", file.display()))?;
    let contacts: Vec<Contact> = nodes
        .iter()
        .filter_map(|node| Contact::from_vnode(node, &contact_options))
        .filter(|contact| !contact.is_ignorable())
        .collect();

    mode.emit(&contacts, || {
        for contact in &contacts {
            println!("{}", contact.display_string());
            if mode.is_interactive() {
                for phone in &contact.phones {
                    Status::field("phone", &phone.data);
                }
                for method in &contact.contact_methods {
                    Status::field(&format!("{:?}", method.kind).to_lowercase(), &method.data);
                }
            }
        }
        if mode.is_interactive() {
            Status::success(&format_count(contacts.len(), "contact", "contacts"));
        }
    })?;

    Ok(exit_codes::SUCCESS)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ContactInput {
    Many(Vec<Contact>),
    One(Box<Contact>),
}

fn run_compose(
    json_file: &Path,
    version: Option<Version>,
    output: Option<&Path>,
    config: &Config,
    mode: OutputMode,
) -> foodshare_core::Result<i32> {
    let bytes = read_file(json_file)?;
    let input: ContactInput = serde_json::from_slice(&bytes)
        .map_err(Error::from)
        .context(format!("Reading contacts from {}", json_file.display()))?;
    let contacts = match input {
        ContactInput::Many(contacts) => contacts,
        ContactInput::One(contact) => vec![*contact],
    };

    let version = match version {
        Some(version) => version,
        None => config.schema.composer.output_version()?,
    };

    let mut text = String::new();
    for contact in &contacts {
        let card = VCardComposer::create_vcard(contact, version)
            .map_err(Error::from)
            .context(format!("Composing {}", contact.display_string()))?;
        text.push_str(&card);
    }

    match output {
        Some(path) => {
            std::fs::write(path, &text)?;
            if mode.is_interactive() {
                Status::success(&format!(
                    "Wrote {} to {}",
                    format_count(contacts.len(), "vCard", "vCards"),
                    path.display()
                ));
            }
        }
        None => {
            #[derive(Serialize)]
            struct Composed<'a> {
                version: Version,
                count: usize,
                text: &'a str,
            }
            let composed = Composed {
                version,
                count: contacts.len(),
                text: &text,
            };
            mode.emit(&composed, || print!("{}", text))?;
        }
    }

    Ok(exit_codes::SUCCESS)
}

#[derive(Serialize)]
struct Detection {
    file: String,
    version: Version,
    source_type: foodshare_vcard::SourceType,
    specified_charset: Option<String>,
    estimated_charset: Option<String>,
}

fn run_detect(file: &Path, config: &Config, mode: OutputMode) -> foodshare_core::Result<i32> {
    let bytes = read_file(file)?;
    let options = config.schema.parser.parser_options()?;
    let text = options.charset.decode_lossy(&bytes);

    let version = options
        .version
        .unwrap_or_else(|| VCardParser::judge_version(&text));
    let normalized = VCardParser::normalize(&text);

    let mut detector = VCardSourceDetector::new();
    if let Err(e) = VersionedParser::new(version).parse(&normalized, &mut detector) {
        tracing::warn!("Detection stopped early: {}", e);
    }

    let detection = Detection {
        file: file.display().to_string(),
        version,
        source_type: detector.source_type(),
        specified_charset: detector.specified_charset().map(str::to_string),
        estimated_charset: detector.estimated_charset().map(str::to_string),
    };

    mode.emit(&detection, || {
        if mode.is_interactive() {
            Status::header(&detection.file);
        }
        Status::field("version", detection.version.as_str());
        Status::field("source", &detection.source_type.to_string());
        Status::field(
            "charset",
            detection.estimated_charset.as_deref().unwrap_or("unknown"),
        );
    })?;

    Ok(exit_codes::SUCCESS)
}

#[derive(Debug, Serialize)]
struct FileReport {
    path: String,
    size_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<Version>,
    records: usize,
    contacts: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn scan_file(path: &Path, options: ParserOptions, contact_options: &ContactOptions) -> FileReport {
    let _timer = Timer::start(names::SCAN_FILE_MS);
    let mut report = FileReport {
        path: path.display().to_string(),
        size_bytes: file_size(path).unwrap_or(0),
        version: None,
        records: 0,
        contacts: 0,
        error: None,
    };

    let mut parser = VCardParser::with_options(options);
    let parsed = std::fs::read(path)
        .map_err(Error::from)
        .and_then(|bytes| parser.parse_bytes(&bytes).map_err(Error::from));

    match parsed {
        Ok(nodes) => {
            report.version = parser.version();
            report.records = nodes.len();
            report.contacts = nodes
                .iter()
                .filter_map(|node| Contact::from_vnode(node, contact_options))
                .filter(|contact| !contact.is_ignorable())
                .count();
            metrics().increment_by(names::RECORDS_PARSED, nodes.len() as u64);
        }
        Err(e) => {
            metrics().increment(names::PARSE_ERRORS);
            report.error = Some(e.message);
        }
    }
    metrics().increment(names::FILES_SCANNED);
    report
}

fn run_scan(
    dir: &Path,
    exclude: &[String],
    config: &Config,
    mode: OutputMode,
) -> foodshare_core::Result<i32> {
    let start = Instant::now();
    let mut scan_config = config.schema.scan.clone();
    scan_config.exclude.extend(exclude.iter().cloned());

    let files = FileScanner::from_config(dir, &scan_config)?.scan()?;
    metrics().gauge(names::FILES_FOUND, files.len() as u64);
    let options = config.schema.parser.parser_options()?;
    let contact_options = config.schema.contact.contact_options()?;

    let pb = progress::file_progress(files.len() as u64, mode.is_interactive());
    let reports: Vec<FileReport> = files
        .par_iter()
        .map(|path| {
            let report = scan_file(path, options, &contact_options);
            pb.inc(1);
            report
        })
        .collect();

    let failed = reports.iter().filter(|r| r.error.is_some()).count();
    if failed == 0 {
        progress::finish_success(&pb, "done");
    } else {
        progress::finish_error(&pb, &format_count(failed, "failure", "failures"));
    }

    let total_bytes: u64 = reports.iter().map(|r| r.size_bytes).sum();
    let total_contacts: usize = reports.iter().map(|r| r.contacts).sum();
    tracing::debug!(
        files = metrics().counter(names::FILES_SCANNED),
        records = metrics().counter(names::RECORDS_PARSED),
        errors = metrics().counter(names::PARSE_ERRORS),
        "Scan finished"
    );

    let summary = serde_json::json!({
        "directory": dir.display().to_string(),
        "files": reports,
        "total_files": reports.len(),
        "total_contacts": total_contacts,
        "failed": failed,
        "elapsed_ms": start.elapsed().as_millis() as u64,
        "file_ms": metrics().histogram_stats(names::SCAN_FILE_MS),
    });

    mode.emit(&summary, || {
        for report in &reports {
            match &report.error {
                Some(error) => Status::warning(&format!("{}: {}", report.path, error)),
                None if mode.is_interactive() => println!(
                    "{} ({}, {})",
                    report.path,
                    format_size(report.size_bytes),
                    format_count(report.contacts, "contact", "contacts")
                ),
                None => println!("{}", report.path),
            }
        }
        if mode.is_interactive() {
            Status::info(&format!(
                "{} in {}, {} total, {} in {}",
                format_count(reports.len(), "file", "files"),
                dir.display(),
                format_size(total_bytes),
                format_count(total_contacts, "contact", "contacts"),
                format_duration(start.elapsed()),
            ));
        }
    })?;

    if failed > 0 {
        return Err(Error::parse(format!(
            "{} could not be parsed",
            format_count(failed, "file", "files")
        )));
    }
    Ok(exit_codes::SUCCESS)
}
