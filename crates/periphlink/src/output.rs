use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use periphlink_router::DispatchStats;
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// One `id name` row.
#[derive(Debug, Serialize)]
pub struct Entry {
    pub id: u8,
    pub name: String,
}

/// Device description as printed by `describe`.
#[derive(Debug, Serialize)]
pub struct Description {
    pub platform: String,
    pub diagnostics: bool,
    pub libraries: Vec<Entry>,
    pub commands: Vec<Entry>,
    pub payload: String,
}

#[derive(Debug, Serialize)]
struct Unpacked<'a> {
    packed: &'a str,
    count: usize,
    bytes: String,
    values: &'a [u8],
}

pub fn print_stats(stats: &DispatchStats, format: OutputFormat, out: &mut dyn Write) {
    let rendered = match format {
        OutputFormat::Json => json_line(stats),
        OutputFormat::Table => {
            let mut table = new_table(vec!["FRAMES", "REPLIED", "DROPPED", "FAILED", "DISCARDED"]);
            table.add_row(vec![
                stats.frames.to_string(),
                stats.replied.to_string(),
                stats.dropped.to_string(),
                stats.failed.to_string(),
                stats.discarded.to_string(),
            ]);
            table.to_string()
        }
        OutputFormat::Pretty => format!(
            "frames={} replied={} dropped={} failed={} discarded={}",
            stats.frames, stats.replied, stats.dropped, stats.failed, stats.discarded
        ),
    };
    let _ = writeln!(out, "{rendered}");
    let _ = out.flush();
}

pub fn print_description(description: &Description, format: OutputFormat) {
    match format {
        OutputFormat::Json => println!("{}", json_line(description)),
        OutputFormat::Table => {
            let mut table = new_table(vec!["KIND", "ID", "NAME"]);
            for entry in &description.commands {
                table.add_row(vec![
                    "command".to_string(),
                    format!("0x{:02x}", entry.id),
                    entry.name.clone(),
                ]);
            }
            for entry in &description.libraries {
                table.add_row(vec![
                    "library".to_string(),
                    entry.id.to_string(),
                    entry.name.clone(),
                ]);
            }
            println!(
                "platform={} diagnostics={}",
                description.platform, description.diagnostics
            );
            println!("{table}");
            println!("payload: {}", description.payload);
        }
        OutputFormat::Pretty => {
            println!(
                "platform={} diagnostics={}",
                description.platform, description.diagnostics
            );
            for entry in &description.libraries {
                println!("library {} {}", entry.id, entry.name);
            }
            println!("payload={}", description.payload);
        }
    }
}

pub fn print_unpacked(packed: &str, values: &[u8], format: OutputFormat) {
    let bytes = hex::encode(values);
    match format {
        OutputFormat::Json => {
            let out = Unpacked {
                packed,
                count: values.len(),
                bytes,
                values,
            };
            println!("{}", json_line(&out));
        }
        OutputFormat::Table => {
            let mut table = new_table(vec!["INDEX", "HEX", "DEC"]);
            for (index, value) in values.iter().enumerate() {
                table.add_row(vec![
                    index.to_string(),
                    format!("0x{value:02x}"),
                    value.to_string(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => println!("{bytes}"),
    }
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn json_line<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
}
