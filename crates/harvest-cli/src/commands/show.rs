//! Show command - print a stored table.

use colored::Colorize;
use harvest::{SqliteStore, TableStore, TidyTable};
use serde_json::{Map, Value, json};

pub fn run(
    database: String,
    table: String,
    limit: usize,
    json_output: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let stored = SqliteStore::new().get(&database, &table)?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&to_json(&stored, limit))?);
        return Ok(());
    }

    println!(
        "{} {} ({} rows)",
        "Table".cyan().bold(),
        table.white(),
        stored.row_count()
    );
    println!();

    let mut header = format!("{:6} {:16}", "Year", stored.entity_label());
    for metric in stored.metric_names() {
        header.push_str(&format!(" {:>14}", truncate(metric, 14)));
    }
    println!("{}", header.bold());

    for (row, key) in stored.keys().iter().enumerate().take(limit) {
        let mut line = format!("{:6} {:16}", key.year.value(), truncate(&key.entity, 16));
        for value in stored.row_values(row) {
            match value {
                Some(v) => line.push_str(&format!(" {:>14.2}", v)),
                None => line.push_str(&format!(" {:>14}", "-")),
            }
        }
        println!("{}", line);
    }

    if stored.row_count() > limit {
        println!("... {} more rows", stored.row_count() - limit);
    }
    Ok(())
}

fn to_json(table: &TidyTable, limit: usize) -> Value {
    let rows: Vec<Value> = table
        .keys()
        .iter()
        .enumerate()
        .take(limit)
        .map(|(row, key)| {
            let mut object = Map::new();
            object.insert("Year".to_string(), json!(key.year.value()));
            object.insert(table.entity_label().to_string(), json!(key.entity));
            for (metric, value) in table.metric_names().zip(table.row_values(row)) {
                object.insert(metric.to_string(), json!(value));
            }
            Value::Object(object)
        })
        .collect();

    json!({
        "table": table.summary(),
        "rows": rows,
    })
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let mut short: String = text.chars().take(width - 1).collect();
        short.push('…');
        short
    }
}
