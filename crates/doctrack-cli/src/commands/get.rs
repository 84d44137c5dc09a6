//! Get command
//!
//! Usage: doctrack get --path <DOCUMENT_PATH>

use clap::Args;
use doctrack_core::errors::{ExError, ExErrorKind};
use doctrack_core::DocPath;
use std::path::Path;

#[derive(Debug, Args)]
pub struct GetArgs {
    /// Document path, e.g. stores/s1/products/p1
    #[arg(long)]
    pub path: String,
}

/// Print the document at `args.path` as pretty JSON
pub fn execute(db: &Path, args: GetArgs) -> Result<(), Box<dyn std::error::Error>> {
    let path = DocPath::parse(&args.path)?;
    if !path.is_document() {
        return Err(Box::new(
            ExError::new(ExErrorKind::InvalidPath)
                .with_op("get")
                .with_path(path.as_str())
                .with_message("path names a collection, not a document"),
        ));
    }

    let conn = super::open_existing(db)?;
    let doc = doctrack_store::documents::get_document(&conn, path.as_str())?.ok_or_else(|| {
        ExError::new(ExErrorKind::NotFound)
            .with_op("get")
            .with_path(path.as_str())
            .with_message("document not found")
    })?;

    println!("{}", serde_json::to_string_pretty(&super::document_json(&doc))?);
    Ok(())
}
