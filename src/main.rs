use anyhow::Result;
use clap::{Parser, Subcommand};
use unconflict::presentation::cli_summary::{print_perf_summary, print_session_summary};
use unconflict::presentation::writers::{all_writers, write_to_file, writer_for};
use unconflict::{AppConfig, LogLevel, Resolution, SessionReport};

#[derive(Parser, Debug)]
#[command(
    name = "unconflict",
    about = "Unconflict: settle merge conflicts file by file, write back only when all are done."
)]
struct Cli {
    /// Config file (defaults to <config dir>/unconflict/config.toml when present)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Report format written to the output dir: json, text, all or none
    #[arg(short, long, global = true)]
    format: Option<String>,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Show per-segment parser events
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show where every file stands. Exits non-zero while conflicts remain.
    Status {
        #[arg(required = true)]
        files: Vec<String>,
    },
    /// Print a file with its conflict blocks in marker form
    Preview { file: String },
    /// Resolve every conflict with one strategy and write the files back
    Resolve {
        /// ours, theirs or both (falls back to resolve.default_strategy)
        #[arg(short, long)]
        strategy: Option<Resolution>,

        #[arg(long)]
        dry_run: bool,

        #[arg(required = true)]
        files: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = AppConfig::load(cli.config.as_deref())?;

    let level = if cli.quiet {
        LogLevel::Error
    } else if cli.verbose {
        LogLevel::Debug
    } else {
        cfg.logging.level.parse()?
    };
    unconflict::init_tracing(level);

    let format = cli.format.clone().unwrap_or_else(|| cfg.output.format.clone());

    match cli.command {
        Command::Status { files } => {
            let report = unconflict::status(&files).await?;
            write_reports(&report, &format, &cfg.output.dir)?;
            if !print_session_summary(&report) {
                std::process::exit(1);
            }
        }
        Command::Preview { file } => {
            print!("{}", unconflict::preview(&file).await?);
        }
        Command::Resolve {
            strategy,
            dry_run,
            files,
        } => {
            let run = unconflict::run_resolve(&cfg, &files, strategy, dry_run).await?;
            print_session_summary(&run.report);
            print_perf_summary(&run.perf);
            write_reports(&run.report, &format, &cfg.output.dir)?;
            if run.committed {
                println!("{} file(s) written.", run.report.files.len());
            } else {
                println!("Dry run: nothing written.");
            }
        }
    }

    Ok(())
}

fn write_reports(report: &SessionReport, format: &str, dir: &str) -> Result<()> {
    match format {
        "none" => {}
        "all" => {
            for writer in all_writers() {
                let path = write_to_file(&*writer, report, dir)?;
                println!("Report written to {}", path.display());
            }
        }
        fmt => {
            let writer =
                writer_for(fmt).ok_or_else(|| anyhow::anyhow!("Unknown format: {}", fmt))?;
            let path = write_to_file(&*writer, report, dir)?;
            println!("Report written to {}", path.display());
        }
    }
    Ok(())
}
