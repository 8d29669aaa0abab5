use visitcount_core::Result;

use crate::app;

pub fn run(path: &str) -> Result<()> {
    let key = app::load_config().page_key(path);
    println!("{}", key.key);
    Ok(())
}
