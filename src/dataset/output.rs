//! CSV serialization of ground-truth rows.
//!
//! Layout: `address,raw bytes,instruction,ground_truth`, CRLF-terminated
//! records, fields quoted only when needed (operand lists contain commas).

use crate::dataset::labels::LabeledRow;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

/// Header record.
pub const CSV_HEADER: [&str; 4] = ["address", "raw bytes", "instruction", "ground_truth"];

#[derive(Debug, Serialize)]
struct CsvRecord<'a> {
    address: String,
    raw_bytes: String,
    instruction: &'a str,
    ground_truth: u8,
}

impl<'a> From<&'a LabeledRow> for CsvRecord<'a> {
    fn from(row: &'a LabeledRow) -> Self {
        Self {
            address: format!("{:#x}", row.address),
            raw_bytes: hex::encode(row.raw_bytes),
            instruction: &row.instruction,
            ground_truth: row.label.as_u8(),
        }
    }
}

/// Write the header and one record per row to `writer`.
pub fn write_csv<W: Write>(rows: &[LabeledRow], writer: W) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::CRLF)
        .from_writer(writer);
    wtr.write_record(CSV_HEADER)?;
    for row in rows {
        wtr.serialize(CsvRecord::from(row))?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::labels::GroundTruth;

    #[test]
    fn header_only_for_no_rows() {
        let mut out = Vec::new();
        write_csv(&[], &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "address,raw bytes,instruction,ground_truth\r\n"
        );
    }

    #[test]
    fn row_formatting() {
        let rows = vec![
            LabeledRow {
                address: 0x400120,
                raw_bytes: [0x27, 0xbd, 0xff, 0xe0],
                instruction: "addiu $sp, $sp, -0x20".to_string(),
                label: GroundTruth::Code,
            },
            LabeledRow {
                address: 0x10,
                raw_bytes: [0xff, 0xff, 0xff, 0xff],
                instruction: "invalid".to_string(),
                label: GroundTruth::Data,
            },
        ];
        let mut out = Vec::new();
        write_csv(&rows, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.split("\r\n").collect();
        assert_eq!(lines[1], "0x400120,27bdffe0,\"addiu $sp, $sp, -0x20\",0");
        assert_eq!(lines[2], "0x10,ffffffff,invalid,1");
        assert_eq!(lines[3], "");
    }
}
