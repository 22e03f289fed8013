use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use uavlink_frame::Packet;
use uavlink_transport::PortInfo;

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

#[derive(Serialize)]
struct PortOutput<'a> {
    name: &'a str,
    kind: &'a str,
    description: Option<&'a str>,
}

pub fn print_ports(ports: &[PortInfo], format: OutputFormat) {
    let rows: Vec<PortOutput<'_>> = ports
        .iter()
        .map(|port| PortOutput {
            name: &port.name,
            kind: &port.kind,
            description: port.description.as_deref(),
        })
        .collect();

    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(&rows).unwrap_or_else(|_| "[]".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["PORT", "KIND", "DESCRIPTION"]);
            for row in &rows {
                table.add_row(vec![
                    row.name.to_string(),
                    row.kind.to_string(),
                    row.description.unwrap_or("-").to_string(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            if rows.is_empty() {
                println!("no serial ports found");
            }
            for row in &rows {
                match row.description {
                    Some(description) => println!("{} ({}, {description})", row.name, row.kind),
                    None => println!("{} ({})", row.name, row.kind),
                }
            }
        }
    }
}

/// Result of decoding one captured line.
#[derive(Debug, Serialize)]
pub struct DecodeRecord {
    pub line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub packet: Option<Packet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<Packet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn print_decoded(records: &[DecodeRecord], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            for record in records {
                println!(
                    "{}",
                    serde_json::to_string(record).unwrap_or_else(|_| "{}".to_string())
                );
            }
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["LINE", "ID", "TYPE", "OUTCOME", "REPLY"]);
            for record in records {
                let (id, kind) = match &record.packet {
                    Some(packet) => (packet.id.to_string(), packet.kind.to_string()),
                    None => ("-".to_string(), "-".to_string()),
                };
                let outcome = record
                    .outcome
                    .as_deref()
                    .or(record.error.as_deref())
                    .unwrap_or("-");
                let reply = record
                    .reply
                    .as_ref()
                    .map(|reply| reply.kind.to_string())
                    .unwrap_or_else(|| "-".to_string());
                table.add_row(vec![record.line.to_string(), id, kind, outcome.to_string(), reply]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for record in records {
                match (&record.packet, &record.error) {
                    (Some(packet), _) => println!(
                        "{:>4}: {packet} -> {}",
                        record.line,
                        record.outcome.as_deref().unwrap_or("-")
                    ),
                    (None, Some(error)) => println!("{:>4}: error: {error}", record.line),
                    (None, None) => {}
                }
            }
        }
    }
}
