use std::path::Path;

use crate::cli::open_db;
use crate::error::Result;
use crate::importer;

pub fn run(file: &str, account: &str) -> Result<()> {
    let mut conn = open_db()?;
    let summary = importer::import_csv(&mut conn, Path::new(file), account)?;
    println!(
        "Imported {} transactions into {account} ({} duplicates skipped, {} with a suggested account)",
        summary.imported, summary.skipped_duplicates, summary.suggested
    );
    Ok(())
}
