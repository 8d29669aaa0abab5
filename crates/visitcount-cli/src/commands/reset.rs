use visitcount_core::{PersistentCache, Result};

use crate::app;

/// Forget every cached count and the flags of every session.
pub fn run() -> Result<()> {
    let db = app::open_database()?;
    PersistentCache::new(db.clone()).clear_all();
    let removed = db.clear_sessions()?;
    println!("counter state cleared ({removed} session flags removed)");
    Ok(())
}
