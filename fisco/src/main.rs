use clap::{Parser, ValueEnum};
use fiscolib::{
    batch::{ImportBatch, SubmitOutcome},
    coerce::format_decimal,
    config::{DocumentFlow, ImportConfig},
    error::{FiscoError, Result},
    ingest::SourceFormat,
    payload::{Payload, SubmissionResponse},
    traits::SubmissionEndpoint,
};
use std::fs::File;
use std::io::{self, Write};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Fmt {
    Auto,
    Delimited,
    Spreadsheet,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Flow {
    Purchase,
    Sales,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Emit {
    /// Проблемы по строкам и предварительные итоги
    Report,
    /// JSON-пакет из валидных строк
    Payload,
}

#[derive(Parser, Debug)]
#[command(name = "fisco", version, about = "Импорт пакета фискальных документов")]
struct Cli {
    /// Входной файл (CSV или электронная таблица)
    #[arg(short = 'i', long = "input")]
    input: String,

    /// Конфигурация TOML (по умолчанию встроенная)
    #[arg(short = 'c', long = "config")]
    config: Option<String>,

    /// Выходной файл (по умолчанию stdout)
    #[arg(short = 'o', long = "output")]
    output: Option<String>,

    /// Формат входа
    #[arg(long = "format", value_enum, default_value = "auto")]
    format: Fmt,

    /// Направление документов (переопределяет конфигурацию)
    #[arg(long = "flow", value_enum)]
    flow: Option<Flow>,

    /// Что вывести
    #[arg(long = "emit", value_enum, default_value = "report")]
    emit: Emit,
}

/// Пишет пакет как JSON и считает все документы принятыми.
struct JsonEndpoint<W: Write> {
    out: W,
}

impl<W: Write> SubmissionEndpoint for JsonEndpoint<W> {
    fn submit(&mut self, payload: &Payload) -> Result<SubmissionResponse> {
        serde_json::to_writer_pretty(&mut self.out, payload)?;
        writeln!(self.out)?;
        Ok(SubmissionResponse::accept_all(payload.documents.len()))
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ImportConfig::load(path)?,
        None => ImportConfig::default(),
    };
    if let Some(flow) = cli.flow {
        config.flow = match flow {
            Flow::Purchase => DocumentFlow::Purchase,
            Flow::Sales => DocumentFlow::Sales,
        };
    }

    let format = match cli.format {
        Fmt::Auto => None,
        Fmt::Delimited => Some(SourceFormat::Delimited),
        Fmt::Spreadsheet => Some(SourceFormat::Spreadsheet),
    };

    // нечитаемый или битый файл -> предупреждение и пустой пакет
    let mut batch = ImportBatch::new(config);
    let loaded = batch.load_file_as(&cli.input, format)?;
    for w in &loaded.warnings {
        warn!("{w}");
    }

    // writer
    let writer: Box<dyn Write> = match cli.output {
        Some(path) => Box::new(File::create(path)?),
        None => Box::new(io::stdout()),
    };

    match cli.emit {
        Emit::Report => write_report(writer, &batch, &loaded.warnings),
        Emit::Payload if batch.is_empty() => {
            warn!("batch is empty, no payload written");
            Ok(())
        }
        Emit::Payload => {
            let mut endpoint = JsonEndpoint { out: writer };
            match batch.submit(&mut endpoint)? {
                SubmitOutcome::Accepted { documents, .. } => {
                    info!(documents, "payload written");
                    endpoint.out.flush().map_err(FiscoError::from)
                }
                other => Err(FiscoError::Submission(format!("{other:?}"))),
            }
        }
    }
}

fn write_report(mut w: Box<dyn Write>, batch: &ImportBatch, warnings: &[String]) -> Result<()> {
    let view = batch.view();

    for warning in warnings {
        writeln!(w, "warning: {warning}")?;
    }
    writeln!(w, "rows: {}, valid: {}", batch.len(), view.valid_rows.len())?;
    for issue in &view.issues {
        writeln!(w, "row {}: {}", issue.row_index + 1, issue.message)?;
    }

    writeln!(w)?;
    for (label, total) in view.preview.iter() {
        writeln!(w, "{label:<20} {:>16}", format_decimal(total))?;
    }
    writeln!(w, "{:<20} {:>16}", "TOTAL", format_decimal(view.preview.grand_total()))?;

    w.flush().map_err(FiscoError::from)
}
