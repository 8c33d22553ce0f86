use std::path::PathBuf;

use crate::db::{get_connection, init_db, schema_version};
use crate::error::Result;
use crate::settings::{save_settings, shellexpand_path, Settings};

pub fn run(settings: &Settings, data_dir: Option<String>) -> Result<()> {
    let mut settings = settings.clone();
    if let Some(dir) = data_dir {
        settings.data_dir = shellexpand_path(&dir);
    }

    let resolved = PathBuf::from(&settings.data_dir);
    std::fs::create_dir_all(&resolved)?;
    save_settings(&settings)?;

    let conn = get_connection(&settings.db_path())?;
    init_db(&conn)?;

    println!(
        "Initialized dollardollar at {} (schema v{})",
        resolved.display(),
        schema_version(&conn)?
    );
    Ok(())
}
