use std::io::Read;
use std::path::Path;

use bytes::{BufMut, BytesMut};
use uavlink_frame::{decode_packet, LineDecoder, DELIMITER};
use uavlink_session::{dispatch, Outcome};

use crate::cmd::DecodeArgs;
use crate::exit::{io_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_decoded, DecodeRecord, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let input = read_input(args.file.as_deref())?;
    let records = decode_capture(&input);
    print_decoded(&records, format);

    let failed = records.iter().filter(|r| r.error.is_some()).count();
    if failed > 0 {
        return Err(CliError::new(
            DATA_INVALID,
            format!("{failed} of {} lines failed to decode", records.len()),
        ));
    }
    Ok(SUCCESS)
}

fn read_input(path: Option<&Path>) -> CliResult<Vec<u8>> {
    match path {
        Some(path) if path != Path::new("-") => std::fs::read(path)
            .map_err(|err| io_error(&format!("failed to read {}", path.display()), err)),
        _ => {
            let mut input = Vec::new();
            std::io::stdin()
                .lock()
                .read_to_end(&mut input)
                .map_err(|err| io_error("failed to read stdin", err))?;
            Ok(input)
        }
    }
}

/// Decode every line of a capture and run it through the dispatch table.
pub fn decode_capture(input: &[u8]) -> Vec<DecodeRecord> {
    let mut buf = BytesMut::from(input);
    if !buf.is_empty() && buf.last() != Some(&DELIMITER) {
        buf.put_u8(DELIMITER);
    }

    let mut decoder = LineDecoder::default();
    let mut records = Vec::new();
    loop {
        let line = match decoder.decode(&mut buf) {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                records.push(failed(records.len() + 1, err.to_string()));
                continue;
            }
        };

        let number = records.len() + 1;
        let record = match decode_packet(&line) {
            Ok(packet) => {
                let (outcome, reply) = match dispatch(&packet) {
                    Outcome::Reply { rule, reply } => (
                        format!("reply {} ({})", rule.outbound, rule.label),
                        Some(reply),
                    ),
                    Outcome::Unknown => ("unknown packet type".to_string(), None),
                };
                DecodeRecord {
                    line: number,
                    packet: Some(packet),
                    outcome: Some(outcome),
                    reply,
                    error: None,
                }
            }
            Err(err) => failed(number, err.to_string()),
        };
        records.push(record);
    }
    records
}

fn failed(line: usize, error: String) -> DecodeRecord {
    DecodeRecord {
        line,
        packet: None,
        outcome: None,
        reply: None,
        error: Some(error),
    }
}
