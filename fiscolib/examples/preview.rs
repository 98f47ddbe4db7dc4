use fiscolib::{
    coerce::format_decimal, config::ImportConfig, ingest::SourceFormat, pipeline,
};
use std::io::Read;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Пример: CSV из stdin -> предварительные итоги в stdout
    let mut input = Vec::new();
    std::io::stdin().read_to_end(&mut input)?;

    let config = ImportConfig::default();
    let ingested = pipeline::ingest(&input, SourceFormat::Delimited, &config)?;
    let view = pipeline::derive(&ingested.records, &config, &config.rate_table());

    for (label, total) in view.preview.iter() {
        println!("{label}: {}", format_decimal(total));
    }
    println!("valid rows: {}/{}", view.valid_rows.len(), ingested.records.len());
    Ok(())
}
