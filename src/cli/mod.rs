use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::application::{ImageOutcome, ReceiptService};
use crate::domain::{format_cents, parse_cents, ReceiptId, ReferenceKind, DATE_FORMAT};

/// Receipts - Purchase Receipt Keeper
#[derive(Parser)]
#[command(name = "receipts")]
#[command(about = "A local-first keeper for purchase receipts and their images")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, default_value = "receipts.db", global = true)]
    pub database: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Record a receipt
    Add {
        /// Total amount (e.g., "42.17" or "42"; negative for refunds)
        #[arg(allow_negative_numbers = true)]
        amount: String,

        /// Store name
        #[arg(short, long)]
        store: String,

        /// Spending category (e.g., "Groceries")
        #[arg(short, long)]
        category: String,

        /// Payment method (e.g., "Credit Card")
        #[arg(short, long)]
        method: String,

        /// Purchase date (ISO 8601 format: YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,

        /// Image file to attach (stored as raw bytes)
        #[arg(short, long)]
        image: Option<PathBuf>,
    },

    /// Write a receipt's stored image to a file
    Image {
        /// Receipt ID
        id: ReceiptId,

        /// Destination file (overwritten if it exists)
        output: PathBuf,
    },

    /// Delete a receipt
    Delete {
        /// Receipt ID
        id: ReceiptId,
    },

    /// List all receipts
    List,

    /// Show detailed receipt information
    Show {
        /// Receipt ID
        id: ReceiptId,
    },

    /// List known stores
    Stores,

    /// List known categories
    Categories,

    /// List known payment methods
    Methods,

    /// Export receipts to CSV or JSON
    Export {
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,

        /// Format: csv, json
        #[arg(short, long, default_value = "csv")]
        format: String,
    },
}

/// Install the global tracing subscriber. Logs go to stderr so listings and
/// exports on stdout stay clean. `RUST_LOG` takes precedence when set.
pub fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .try_init();
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        self.run_with_output(&mut out).await
    }

    /// Run the command, writing its console output to `out`.
    /// Every command opens the database with create-if-missing.
    pub async fn run_with_output<W: Write>(self, out: &mut W) -> Result<()> {
        let service = ReceiptService::init(&self.database)
            .await
            .with_context(|| format!("Failed to open database: {}", self.database))?;

        let result = run_command(&service, &self.database, self.command, out).await;
        service.close().await;
        result
    }
}

async fn run_command<W: Write>(
    service: &ReceiptService,
    database: &str,
    command: Commands,
    out: &mut W,
) -> Result<()> {
    match command {
        Commands::Init => {
            writeln!(out, "Database initialized: {}", database)?;
        }

        Commands::Add {
            amount,
            store,
            category,
            method,
            date,
            image,
        } => {
            let total_cents =
                parse_cents(&amount).context("Invalid amount format. Use '42.17' or '42'")?;

            let purchase_date = match date {
                Some(date_str) => parse_date(&date_str).with_context(|| {
                    format!("Invalid date format '{}'. Use YYYY-MM-DD", date_str)
                })?,
                None => Local::now().date_naive(),
            };

            let id = match image {
                Some(path) => {
                    service
                        .record_receipt_with_image(
                            &store,
                            &category,
                            &method,
                            total_cents,
                            purchase_date,
                            &path,
                        )
                        .await?
                }
                None => {
                    service
                        .record_receipt(&store, &category, &method, total_cents, purchase_date)
                        .await?
                }
            };

            writeln!(
                out,
                "Recorded receipt {}: {} at {} on {}",
                id,
                format_cents(total_cents),
                store,
                purchase_date.format(DATE_FORMAT)
            )?;
        }

        Commands::Image { id, output } => {
            if let ImageOutcome::Written { path, bytes } =
                service.retrieve_image(id, &output).await?
            {
                writeln!(out, "Wrote {} bytes to {}", bytes, path.display())?;
            }
        }

        Commands::Delete { id } => {
            if service.delete_receipt(id).await? {
                writeln!(out, "Deleted receipt with ID: {}", id)?;
            } else {
                writeln!(out, "No receipt found with ID: {}", id)?;
            }
        }

        Commands::List => {
            service.write_listing(&mut *out).await?;
        }

        Commands::Show { id } => {
            let receipt = service.get_receipt(id).await?;
            writeln!(out, "Receipt: {}", receipt.id)?;
            writeln!(out, "  Store:    {}", receipt.store)?;
            writeln!(out, "  Category: {}", receipt.category)?;
            writeln!(out, "  Method:   {}", receipt.payment_method)?;
            writeln!(out, "  Date:     {}", receipt.purchase_date.format(DATE_FORMAT))?;
            writeln!(out, "  Amount:   {}", format_cents(receipt.total_cents))?;
            if receipt.has_image() {
                writeln!(out, "  Image:    {} bytes", receipt.image_size)?;
            } else {
                writeln!(out, "  Image:    none")?;
            }
        }

        Commands::Stores => {
            print_references(out, &service.list_stores().await?)?;
        }

        Commands::Categories => {
            print_references(out, &service.list_categories().await?)?;
        }

        Commands::Methods => {
            print_references(out, &service.list_payment_methods().await?)?;
        }

        Commands::Export { output, format } => {
            run_export_command(service, output.as_deref(), &format, out).await?;
        }
    }

    Ok(())
}

fn print_references<W: Write, K: ReferenceKind>(out: &mut W, rows: &[K]) -> Result<()> {
    if rows.is_empty() {
        writeln!(out, "No {} entries found.", K::LABEL)?;
        return Ok(());
    }

    writeln!(out, "{:<6} NAME", "ID")?;
    writeln!(out, "{}", "-".repeat(30))?;
    for row in rows {
        writeln!(out, "{:<6} {}", row.id(), row.key())?;
    }
    Ok(())
}

async fn run_export_command<W: Write>(
    service: &ReceiptService,
    output: Option<&str>,
    format: &str,
    out: &mut W,
) -> Result<()> {
    use crate::io::Exporter;
    use std::fs::File;

    let exporter = Exporter::new(service);

    let writer: Box<dyn Write + '_> = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(&mut *out),
    };

    match format {
        "csv" => {
            let count = exporter.export_receipts_csv(writer).await?;
            if output.is_some() {
                eprintln!("Exported {} receipts", count);
            }
        }
        "json" => {
            let snapshot = exporter.export_full_json(writer).await?;
            if output.is_some() {
                eprintln!(
                    "Exported {} receipts, {} stores, {} categories, {} payment methods",
                    snapshot.receipts.len(),
                    snapshot.stores.len(),
                    snapshot.categories.len(),
                    snapshot.payment_methods.len()
                );
            }
        }
        _ => {
            anyhow::bail!("Invalid export format '{}'. Valid formats: csv, json", format);
        }
    }

    Ok(())
}

fn parse_date(date_str: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date_str, DATE_FORMAT).context("Date must be in YYYY-MM-DD format")
}
