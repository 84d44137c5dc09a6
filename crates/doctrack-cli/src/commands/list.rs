//! List command
//!
//! Usage: doctrack list --collection <COLLECTION_PATH> [--json]

use clap::Args;
use std::path::Path;

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Collection path, e.g. stores or stores/s1/products
    #[arg(long)]
    pub collection: String,

    /// Print full documents as a JSON object keyed by path
    #[arg(long)]
    pub json: bool,
}

/// Print the documents directly inside a collection
pub fn execute(db: &Path, args: ListArgs) -> Result<(), Box<dyn std::error::Error>> {
    let collection = args.collection.trim_matches('/');
    let conn = super::open_existing(db)?;
    let documents = doctrack_store::documents::list_collection(&conn, collection)?;
    tracing::debug!(collection, count = documents.len(), "collection listed");

    if args.json {
        let out: serde_json::Map<String, serde_json::Value> = documents
            .iter()
            .map(|(path, doc)| (path.clone(), super::document_json(doc)))
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        for (path, _) in &documents {
            println!("{}", path);
        }
    }
    Ok(())
}
