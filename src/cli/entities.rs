use comfy_table::{Cell, Table};

use crate::cli::open_db;
use crate::error::{PennyError, Result};

pub fn add(name: &str) -> Result<()> {
    let conn = open_db()?;
    conn.execute("INSERT INTO entities (name) VALUES (?1)", [name])
        .map_err(|e| PennyError::conflict_on_unique(e, &format!("entity '{name}' already exists")))?;
    println!("Added entity: {name}");
    Ok(())
}

pub fn list() -> Result<()> {
    let conn = open_db()?;
    let mut stmt = conn.prepare("SELECT id, name, is_closed FROM entities ORDER BY name")?;
    let rows: Vec<(i64, String, bool)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", ""]);
    for (id, name, is_closed) in rows {
        table.add_row(vec![
            Cell::new(id),
            Cell::new(name),
            Cell::new(if is_closed { "closed" } else { "" }),
        ]);
    }
    println!("Entities\n{table}");
    Ok(())
}
