//! `shiftreport` command-line client.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};

use shiftreport_client::export::ExportFormat;
use shiftreport_client::notice::NoticeBoard;
use shiftreport_client::{
    ClientConfig, DeleteOutcome, FileStore, HttpReportsApi, OfflineQueue, ReportsApi, ReviewFlow,
    StoredReport, SubmissionFlow, SubmissionOutcome,
};
use shiftreport_core::{ReportForm, ReportId};

#[derive(Parser)]
#[command(name = "shiftreport", about = "Submit and review driver shift reports")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Submit a report. Pending reports are sent first.
    Submit {
        #[arg(long)]
        driver: String,
        #[arg(long)]
        plate: String,
        #[arg(long)]
        route: String,
        /// Number of packages assigned.
        #[arg(long)]
        packages: String,
        #[arg(long)]
        received: String,
        #[arg(long)]
        stops: String,
        #[arg(long, default_value = "")]
        delivered: String,
        #[arg(long, default_value = "")]
        returned: String,
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// Send every pending report.
    Sync,
    /// List reports waiting to be sent.
    Pending,
    /// List stored reports, optionally only those of one day.
    List {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Delete a stored report.
    Delete {
        id: String,
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
    /// Export stored reports to a CSV or TSV file.
    Export {
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long, default_value = "csv")]
        format: ExportFormat,
        /// Directory the file is written to.
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    shiftreport_observability::init();

    let cli = Cli::parse();
    let config = ClientConfig::from_env();
    let api: Arc<dyn ReportsApi> = Arc::new(HttpReportsApi::new(&config));
    let notices = NoticeBoard::new(config.notice_ttl);

    match cli.command {
        Command::Submit {
            driver,
            plate,
            route,
            packages,
            received,
            stops,
            delivered,
            returned,
            notes,
        } => {
            let mut flow = submission_flow(&config, api, notices);
            report_sync(flow.on_load().await);

            let mut form = ReportForm {
                driver_name: driver,
                vehicle_plate: plate,
                route,
                package_count: packages,
                packages_received: received,
                stop_count: stops,
                packages_delivered: delivered,
                packages_returned: returned,
                notes,
            };
            let outcome = flow.submit(&mut form).await;
            if let Some(notice) = flow.notices().current() {
                println!("{}", notice.text);
            }
            match outcome {
                SubmissionOutcome::Confirmed { stored, .. } => {
                    if let Some(stored) = stored {
                        println!("id: {}", stored.id);
                    }
                }
                SubmissionOutcome::Invalid(errors) => {
                    for error in errors.iter() {
                        eprintln!("  {error}");
                    }
                    bail!("report is incomplete");
                }
                SubmissionOutcome::QueuedOffline { queued, error } => {
                    bail!("report {} kept for retry: {error}", queued.local_id);
                }
            }
        }
        Command::Sync => {
            let mut flow = submission_flow(&config, api, notices);
            let summary = flow.on_load().await;
            report_sync(summary);
            if summary.remaining > 0 {
                bail!("{} report(s) still pending", summary.remaining);
            }
        }
        Command::Pending => {
            let flow = submission_flow(&config, api, notices);
            let pending = flow.pending();
            if pending.is_empty() {
                println!("No pending reports");
            }
            for queued in pending {
                println!(
                    "{}  {}  {}  {}  {}",
                    queued.local_id,
                    queued.timestamp.to_rfc3339(),
                    queued.report.driver_name,
                    queued.report.vehicle_plate,
                    queued.report.route
                );
            }
        }
        Command::List { date } => {
            let mut flow = ReviewFlow::new(api, config.utc_offset, notices);
            let shown = match date {
                Some(date) => flow.filter_by_date(date).await?,
                None => flow.load_all().await?,
            };
            print_reports(shown, &config);
            println!("{} report(s)", shown.len());
        }
        Command::Delete { id, yes } => {
            let id: ReportId = id.parse()?;
            let mut flow = ReviewFlow::new(api, config.utc_offset, notices);
            flow.load_all().await?;

            let outcome = flow
                .delete(&id, |prompt| yes || confirm_on_stdin(prompt))
                .await?;
            match outcome {
                DeleteOutcome::Deleted => println!("Deleted {id}"),
                DeleteOutcome::Cancelled => println!("Cancelled"),
            }
        }
        Command::Export { date, format, out } => {
            let mut flow = ReviewFlow::new(api, config.utc_offset, notices);
            match date {
                Some(date) => flow.filter_by_date(date).await?,
                None => flow.load_all().await?,
            };

            let today = Utc::now().with_timezone(&config.utc_offset).date_naive();
            match flow.export(format, today).await? {
                Some(file) => {
                    std::fs::create_dir_all(&out)
                        .with_context(|| format!("creating {}", out.display()))?;
                    let path = out.join(&file.filename);
                    std::fs::write(&path, &file.contents)
                        .with_context(|| format!("writing {}", path.display()))?;
                    println!("{} row(s) written to {}", file.rows, path.display());
                }
                None => {
                    if let Some(notice) = flow.notices().current() {
                        println!("{}", notice.text);
                    }
                }
            }
        }
    }

    Ok(())
}

fn submission_flow(
    config: &ClientConfig,
    api: Arc<dyn ReportsApi>,
    notices: NoticeBoard,
) -> SubmissionFlow {
    let store = Arc::new(FileStore::new(&config.storage_dir));
    SubmissionFlow::new(api, OfflineQueue::new(store), notices)
}

fn report_sync(summary: shiftreport_client::ReconcileSummary) {
    if summary.attempted > 0 {
        println!(
            "Pending reports: {} sent, {} failed, {} remaining",
            summary.sent,
            summary.failed(),
            summary.remaining
        );
    }
}

fn print_reports(reports: &[StoredReport], config: &ClientConfig) {
    for stored in reports {
        let when = stored
            .timestamp()
            .map(|ts| shiftreport_client::export::format_timestamp(ts, config.utc_offset))
            .unwrap_or_else(|| "-".to_string());
        let r = &stored.report;
        println!(
            "{}  {}  {}  {}  {}  paquetes {}/{}  paradas {}",
            stored.id,
            when,
            r.driver_name,
            r.vehicle_plate,
            r.route,
            r.packages_received,
            r.package_count,
            r.stop_count
        );
    }
}

fn confirm_on_stdin(prompt: &str) -> bool {
    print!("{prompt} [s/N] ");
    if io::stdout().flush().is_err() {
        return false;
    }

    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(
        answer.trim().to_lowercase().as_str(),
        "s" | "si" | "sí" | "y" | "yes"
    )
}
