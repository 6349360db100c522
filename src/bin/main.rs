// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

use chrono::{DateTime, Utc};
use circulate_rs::{BorrowerId, Engine, ItemId, LoanId, ReservationId};
use clap::Parser;
use csv::{ReaderBuilder, Trim, Writer};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::PathBuf;
use std::process;

/// Circulation Engine - Process lending operation CSV files
///
/// Reads lending/reservation operations from a CSV file and outputs item
/// shelf states to stdout. Supports item registration, checkouts, returns,
/// renewals, reservations, cancellations, and sweeps.
#[derive(Parser, Debug)]
#[command(name = "circulate-rs")]
#[command(about = "A lending engine that processes operation CSVs", long_about = None)]
struct Args {
    /// Path to CSV file with operations
    ///
    /// Expected format: op,item,borrower,loan,reservation,copies,due
    /// Example: cargo run -- operations.csv > items.csv
    #[arg(value_name = "FILE")]
    input: PathBuf,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    // Parse command line arguments
    let args = Args::parse();

    // Open input file
    let file = match File::open(&args.input) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error opening file '{}': {}", args.input.display(), e);
            process::exit(1);
        }
    };

    // Process operations from CSV
    let engine = match process_operations(BufReader::new(file)) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Error processing operations: {}", e);
            process::exit(1);
        }
    };

    // Write results to stdout
    if let Err(e) = write_items(&engine, std::io::stdout()) {
        eprintln!("Error writing output: {}", e);
        process::exit(1);
    }
}

/// Raw CSV record matching the input format.
///
/// Fields: `op, item, borrower, loan, reservation, copies, due`
#[derive(Debug, Deserialize)]
struct CsvRecord {
    op: String,
    #[serde(deserialize_with = "csv::invalid_option")]
    item: Option<u32>,
    #[serde(deserialize_with = "csv::invalid_option")]
    borrower: Option<u32>,
    #[serde(deserialize_with = "csv::invalid_option")]
    loan: Option<u64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    reservation: Option<u64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    copies: Option<u32>,
    due: Option<String>,
}

/// A parsed lending operation.
#[derive(Debug)]
enum Operation {
    AddItem {
        item: ItemId,
        copies: u32,
    },
    RetireItem {
        item: ItemId,
    },
    Checkout {
        item: ItemId,
        borrower: BorrowerId,
        due: DateTime<Utc>,
    },
    Return {
        loan: LoanId,
    },
    Renew {
        loan: LoanId,
    },
    Reserve {
        item: ItemId,
        borrower: BorrowerId,
    },
    CancelReservation {
        reservation: ReservationId,
    },
    Sweep,
}

impl CsvRecord {
    /// Converts a CSV record to an operation.
    ///
    /// Returns `None` for unknown operations or missing required fields.
    fn into_operation(self) -> Option<Operation> {
        match self.op.to_lowercase().as_str() {
            "add_item" => Some(Operation::AddItem {
                item: ItemId(self.item?),
                copies: self.copies?,
            }),
            "retire_item" => Some(Operation::RetireItem {
                item: ItemId(self.item?),
            }),
            "checkout" => {
                let due = DateTime::parse_from_rfc3339(self.due?.trim())
                    .ok()?
                    .with_timezone(&Utc);
                Some(Operation::Checkout {
                    item: ItemId(self.item?),
                    borrower: BorrowerId(self.borrower?),
                    due,
                })
            }
            "return" => Some(Operation::Return {
                loan: LoanId(self.loan?),
            }),
            "renew" => Some(Operation::Renew {
                loan: LoanId(self.loan?),
            }),
            "reserve" => Some(Operation::Reserve {
                item: ItemId(self.item?),
                borrower: BorrowerId(self.borrower?),
            }),
            "cancel_reservation" => Some(Operation::CancelReservation {
                reservation: ReservationId(self.reservation?),
            }),
            "sweep" => Some(Operation::Sweep),
            _ => None,
        }
    }
}

fn apply(engine: &Engine, op: Operation) -> Result<(), circulate_rs::CirculationError> {
    match op {
        Operation::AddItem { item, copies } => engine.add_item(item, copies),
        Operation::RetireItem { item } => engine.retire_item(item),
        Operation::Checkout {
            item,
            borrower,
            due,
        } => engine.checkout(item, borrower, due).map(|_| ()),
        Operation::Return { loan } => engine.return_item(loan).map(|_| ()),
        Operation::Renew { loan } => engine.renew(loan).map(|_| ()),
        Operation::Reserve { item, borrower } => engine.reserve(item, borrower).map(|_| ()),
        Operation::CancelReservation { reservation } => {
            engine.cancel_reservation(reservation).map(|_| ())
        }
        Operation::Sweep => {
            circulate_rs::ExpirySweeper::new(engine).run();
            Ok(())
        }
    }
}

/// Process operations from a CSV reader.
///
/// Streams rows so arbitrarily large files are handled without loading
/// everything into memory. Malformed rows and failed operations are
/// skipped; the batch keeps going.
///
/// # CSV Format
///
/// Expected columns: `op, item, borrower, loan, reservation, copies, due`
/// - `op`: Operation (add_item, retire_item, checkout, return, renew,
///   reserve, cancel_reservation, sweep)
/// - `item` / `borrower`: u32 identifiers
/// - `loan` / `reservation`: u64 identifiers assigned by earlier rows,
///   starting at 1 in row order
/// - `copies`: copy count for add_item
/// - `due`: RFC 3339 due date for checkout
///
/// Unused columns are left empty.
///
/// # Example
///
/// ```csv
/// op,item,borrower,loan,reservation,copies,due
/// add_item,1,,,,2,
/// checkout,1,7,,,,2030-01-15T00:00:00Z
/// return,,,1,,,
/// ```
///
/// # Errors
///
/// Returns a CSV error if the reader fails or the CSV structure is
/// invalid. Individual operation errors are logged but don't stop
/// processing.
pub fn process_operations<R: Read>(reader: R) -> Result<Engine, csv::Error> {
    let engine = Engine::new();

    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All) // Handle whitespace in fields like " checkout "
        .flexible(true) // Allow trailing empty fields
        .has_headers(true) // Skip first row as header
        .from_reader(reader);

    for result in rdr.deserialize::<CsvRecord>() {
        match result {
            Ok(record) => {
                let Some(op) = record.into_operation() else {
                    tracing::warn!("skipping invalid operation record");
                    continue;
                };

                if let Err(e) = apply(&engine, op) {
                    tracing::warn!(error = %e, "skipping failed operation");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "skipping malformed row");
                continue;
            }
        }
    }

    Ok(engine)
}

/// Write item shelf states to a CSV writer.
///
/// # CSV Format
///
/// Columns: `item, total, available, active`
///
/// # Example
///
/// ```csv
/// item,total,available,active
/// 1,2,1,true
/// 2,5,5,true
/// ```
///
/// # Errors
///
/// Returns a CSV error if writing fails.
pub fn write_items<W: Write>(engine: &Engine, writer: W) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(writer);

    // Sort by item ID so batch output is deterministic.
    let mut items: Vec<_> = engine.items().collect();
    items.sort_by_key(|item| item.key().0);

    for item in items {
        wtr.serialize(item.value())?;
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use circulate_rs::LoanStatus;
    use std::io::Cursor;

    #[test]
    fn parse_add_item_and_checkout() {
        let csv = "op,item,borrower,loan,reservation,copies,due\n\
                   add_item,1,,,,2,\n\
                   checkout,1,7,,,,2030-01-15T00:00:00Z\n";
        let engine = process_operations(Cursor::new(csv)).unwrap();

        let item = engine.get_item(&ItemId(1)).unwrap();
        assert_eq!(item.total_copies(), 2);
        assert_eq!(item.available_copies(), 1);
    }

    #[test]
    fn parse_return_restores_shelf() {
        let csv = "op,item,borrower,loan,reservation,copies,due\n\
                   add_item,1,,,,1,\n\
                   checkout,1,7,,,,2030-01-15T00:00:00Z\n\
                   return,,,1,,,\n";
        let engine = process_operations(Cursor::new(csv)).unwrap();

        let item = engine.get_item(&ItemId(1)).unwrap();
        assert_eq!(item.available_copies(), 1);
        let loan = engine.get_loan(&LoanId(1)).unwrap();
        assert_eq!(loan.status, LoanStatus::Returned);
    }

    #[test]
    fn parse_reserve_and_cancel() {
        let csv = "op,item,borrower,loan,reservation,copies,due\n\
                   add_item,1,,,,1,\n\
                   reserve,1,7,,,,\n\
                   reserve,1,8,,,,\n\
                   cancel_reservation,,,,1,,\n";
        let engine = process_operations(Cursor::new(csv)).unwrap();

        let pending = engine.pending_reservations(ItemId(1));
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].queue_position, 2);
    }

    #[test]
    fn parse_with_whitespace() {
        let csv = "op,item,borrower,loan,reservation,copies,due\n add_item , 1 ,,,, 3 ,\n";
        let engine = process_operations(Cursor::new(csv)).unwrap();
        assert_eq!(engine.get_item(&ItemId(1)).unwrap().total_copies(), 3);
    }

    #[test]
    fn skip_malformed_rows() {
        let csv = "op,item,borrower,loan,reservation,copies,due\n\
                   add_item,1,,,,2,\n\
                   bogus,row,data,here,,,\n\
                   add_item,2,,,,5,\n";
        let engine = process_operations(Cursor::new(csv)).unwrap();

        assert_eq!(engine.items().count(), 2);
    }

    #[test]
    fn failed_operations_do_not_stop_the_batch() {
        // Second checkout hits OutOfStock; the add_item after it still runs.
        let csv = "op,item,borrower,loan,reservation,copies,due\n\
                   add_item,1,,,,1,\n\
                   checkout,1,7,,,,2030-01-15T00:00:00Z\n\
                   checkout,1,8,,,,2030-01-15T00:00:00Z\n\
                   add_item,2,,,,1,\n";
        let engine = process_operations(Cursor::new(csv)).unwrap();

        assert_eq!(engine.items().count(), 2);
        assert_eq!(engine.get_item(&ItemId(1)).unwrap().available_copies(), 0);
        assert!(engine.get_loan(&LoanId(2)).is_none());
    }

    #[test]
    fn write_items_to_csv() {
        let csv = "op,item,borrower,loan,reservation,copies,due\n\
                   add_item,2,,,,5,\n\
                   add_item,1,,,,2,\n\
                   checkout,1,7,,,,2030-01-15T00:00:00Z\n";
        let engine = process_operations(Cursor::new(csv)).unwrap();

        let mut output = Vec::new();
        write_items(&engine, &mut output).unwrap();

        let output_str = String::from_utf8(output).unwrap();
        assert!(output_str.contains("item,total,available,active"));

        // Sorted by item ID regardless of registration order.
        let lines: Vec<&str> = output_str.lines().collect();
        assert!(lines[1].starts_with("1,2,1,true"));
        assert!(lines[2].starts_with("2,5,5,true"));
    }
}
