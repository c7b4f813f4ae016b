mod output;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use output::{print_text_line, JsonReport, Summary};
use sheet_audit::{scan, AuditConfig, RuleId, RuleOptions, ScanEvent};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "sheet-audit")]
#[command(about = "Audit Excel workbooks in a directory tree against a rule battery")]
#[command(version)]
struct Cli {
    #[arg(help = "Directory to scan for workbooks")]
    root: PathBuf,
    #[arg(long, short, value_name = "PATH", help = "JSON configuration file")]
    config: Option<PathBuf>,
    #[arg(long, short = 'j', value_name = "N", help = "Worker threads (default: available parallelism)")]
    concurrency: Option<usize>,
    #[arg(long, short, value_enum, default_value = "text", help = "Output format")]
    format: OutputFormat,
    #[arg(long, value_name = "RULE", help = "Disable a rule by key (repeatable)")]
    disable: Vec<String>,
    #[arg(long, help = "List rule keys and exit")]
    list_rules: bool,
}

#[derive(Clone, Copy, ValueEnum, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    if cli.list_rules {
        for rule in RuleId::ALL {
            println!("{:<24} {}", rule.key(), rule.label());
        }
        return Ok(ExitCode::SUCCESS);
    }

    let config = match &cli.config {
        Some(path) => AuditConfig::from_json_file(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => AuditConfig::default(),
    };

    let mut options = RuleOptions::new();
    for key in &cli.disable {
        if RuleId::from_key(key).is_none() {
            anyhow::bail!("unknown rule key '{key}' (see --list-rules)");
        }
        options.set(key.clone(), false);
    }

    let concurrency = cli.concurrency.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4)
    });

    let (handle, events) = scan(&cli.root, config, options, concurrency)
        .with_context(|| format!("scanning {}", cli.root.display()))?;

    let mut summary = Summary::default();
    let mut results = Vec::new();
    for event in events {
        match event {
            ScanEvent::Result(result) => {
                summary.record(result.status);
                match cli.format {
                    OutputFormat::Text => print_text_line(&result),
                    OutputFormat::Json => results.push(result),
                }
            }
            ScanEvent::Progress { .. } => {}
            ScanEvent::Finished => break,
        }
    }
    handle.join();

    match cli.format {
        OutputFormat::Text => summary.print_text(),
        OutputFormat::Json => {
            let findings = summary.error + summary.cancelled;
            let report = JsonReport { results, summary };
            println!("{}", report.render().context("rendering JSON report")?);
            return Ok(exit_code_for_findings(findings));
        }
    }

    Ok(exit_code_for_findings(summary.error + summary.cancelled))
}

fn exit_code_for_findings(findings: usize) -> ExitCode {
    if findings == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}
