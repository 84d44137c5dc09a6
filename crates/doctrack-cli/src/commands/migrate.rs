//! Migrate command
//!
//! Usage: doctrack migrate [--db <FILE>]

use std::path::Path;

/// Create the database (and its directory) if needed and apply pending migrations
pub fn execute(db: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(dir) = db.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }

    let mut conn = doctrack_store::db::open(db)?;
    let applied = doctrack_store::migrations::apply_migrations(&mut conn)?;

    if applied == 0 {
        println!("✓ {} is up to date", db.display());
    } else {
        println!("✓ Applied {} migration(s) to {}", applied, db.display());
    }
    Ok(())
}
