//! CSV import of municipality records.
//!
//! ## Column contract (case-insensitive, order-independent)
//!
//! | Field           | Accepted headers                                                        |
//! |-----------------|-------------------------------------------------------------------------|
//! | name            | `Kommune`, `Name`, `Gemeinde`, `Stadt`, `Municipality`                  |
//! | reference value | `Wert 2019 (€)`, `Wert 2019`, `Wert_2019`, `Reference value`, `reference_value` |
//! | need count      | `Kinder U3 im SGB-II-Bezug`, `Kinder U3`, `Kinder_U3`, `U3`, `Need count`, `need_count` |
//!
//! The header is the first row that resolves all three fields; rows above it
//! (titles, notes) are skipped.  `;` is tried as the delimiter first, then `,`.
//! Amounts go through [`crate::parse_amount`].
//!
//! Files are read as UTF-8; bytes that are not valid UTF-8 are decoded as
//! Windows-1252, the encoding spreadsheet programs use for German CSV
//! exports.  [`ImportReport::encoding`] records which one applied.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use gs_engine::MunicipalityRecord;

const NAME_HEADERS: &[&str] = &["kommune", "name", "gemeinde", "stadt", "municipality"];
const REFERENCE_HEADERS: &[&str] = &[
    "wert 2019 (€)",
    "wert 2019",
    "wert_2019",
    "reference value",
    "reference_value",
];
const NEED_HEADERS: &[&str] = &[
    "kinder u3 im sgb-ii-bezug",
    "kinder u3",
    "kinder_u3",
    "u3",
    "need count",
    "need_count",
];

const DELIMITERS: &[u8] = b";,";

/// Header written by [`write_template`].
pub const TEMPLATE_HEADER: [&str; 3] = ["Kommune", "Wert 2019 (€)", "Kinder U3 im SGB-II-Bezug"];

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that abort an import.  Individual bad rows are not errors; they
/// are listed in [`ImportReport::rejected`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportError {
    /// An I/O or CSV-library error.
    Io(String),
    /// No row resolves all required columns.
    MissingColumns,
    /// A header was found but no row survived validation.
    NoValidRows { rejected: usize },
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportError::Io(msg) => write!(f, "import io error: {msg}"),
            ImportError::MissingColumns => write!(
                f,
                "no header row found; expected columns: {}",
                TEMPLATE_HEADER.join(", ")
            ),
            ImportError::NoValidRows { rejected } => {
                write!(f, "no valid municipality rows ({rejected} rejected)")
            }
        }
    }
}

impl std::error::Error for ImportError {}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    InvalidReferenceValue(String),
    InvalidNeedCount(String),
    NegativeValue,
    /// An earlier row already used this name.
    DuplicateName,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::InvalidReferenceValue(raw) => {
                write!(f, "cannot parse reference value '{raw}'")
            }
            RejectReason::InvalidNeedCount(raw) => write!(f, "cannot parse need count '{raw}'"),
            RejectReason::NegativeValue => write!(f, "negative value"),
            RejectReason::DuplicateName => write!(f, "duplicate name"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRow {
    /// 1-based line in the source file.
    pub line: u64,
    pub name: String,
    pub reason: RejectReason,
}

/// Outcome of a successful import.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportReport {
    pub records: Vec<MunicipalityRecord>,
    pub rejected: Vec<RejectedRow>,
    /// Data rows with an empty name.
    pub skipped_blank: usize,
    /// 1-based line of the header row.
    pub header_line: u64,
    pub delimiter: char,
    /// Encoding the source was decoded with (`UTF-8` or `windows-1252`).
    pub encoding: &'static str,
}

impl ImportReport {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Import municipality records from the CSV file at `path`.
pub fn import_csv_file(path: &Path) -> Result<ImportReport, ImportError> {
    let raw = std::fs::read(path)
        .map_err(|e| ImportError::Io(format!("read '{}': {e}", path.display())))?;
    import_csv_bytes(&raw)
}

/// Import municipality records from raw file bytes (UTF-8 or Windows-1252).
pub fn import_csv_bytes(raw: &[u8]) -> Result<ImportReport, ImportError> {
    let (src, encoding) = decode(raw);
    import_text(&src, encoding)
}

/// Import municipality records from in-memory CSV text.
pub fn import_csv_str(src: &str) -> Result<ImportReport, ImportError> {
    import_text(src, UTF_8)
}

fn import_text(src: &str, encoding: &'static Encoding) -> Result<ImportReport, ImportError> {
    let src = src.strip_prefix('\u{feff}').unwrap_or(src);

    for &delimiter in DELIMITERS {
        let rows = read_rows(src, delimiter)?;
        if let Some((header_idx, columns)) = find_header(&rows) {
            let mut report = collect_records(&rows, header_idx, columns, delimiter as char)?;
            report.encoding = encoding.name();
            return Ok(report);
        }
    }
    Err(ImportError::MissingColumns)
}

/// UTF-8 when the bytes are valid UTF-8, Windows-1252 otherwise.
///
/// Windows-1252 maps every byte, so the fallback never fails.
fn decode(raw: &[u8]) -> (Cow<'_, str>, &'static Encoding) {
    match std::str::from_utf8(raw) {
        Ok(text) => (Cow::Borrowed(text), UTF_8),
        Err(_) => {
            let (text, _) = WINDOWS_1252.decode_without_bom_handling(raw);
            (text, WINDOWS_1252)
        }
    }
}

/// Write an import template (header + one example row) to `path`.
pub fn write_template(path: &Path) -> Result<(), ImportError> {
    let io = |e: csv::Error| ImportError::Io(format!("write '{}': {e}", path.display()));

    let mut w = WriterBuilder::new().from_path(path).map_err(io)?;
    w.write_record(TEMPLATE_HEADER).map_err(io)?;
    w.write_record(["Stadt Beispiel", "50000", "100"]).map_err(io)?;
    w.flush()
        .map_err(|e| ImportError::Io(format!("flush '{}': {e}", path.display())))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct Columns {
    name: usize,
    reference: usize,
    need: usize,
}

fn read_rows(src: &str, delimiter: u8) -> Result<Vec<StringRecord>, ImportError> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(src.as_bytes());

    rdr.records()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ImportError::Io(format!("csv parse: {e}")))
}

fn find_header(rows: &[StringRecord]) -> Option<(usize, Columns)> {
    rows.iter()
        .enumerate()
        .find_map(|(i, row)| resolve_columns(row).map(|c| (i, c)))
}

fn resolve_columns(row: &StringRecord) -> Option<Columns> {
    let find = |synonyms: &[&str]| {
        row.iter()
            .position(|cell| synonyms.contains(&cell.trim().to_lowercase().as_str()))
    };
    Some(Columns {
        name: find(NAME_HEADERS)?,
        reference: find(REFERENCE_HEADERS)?,
        need: find(NEED_HEADERS)?,
    })
}

fn collect_records(
    rows: &[StringRecord],
    header_idx: usize,
    columns: Columns,
    delimiter: char,
) -> Result<ImportReport, ImportError> {
    let line_of = |row: &StringRecord| row.position().map(|p| p.line()).unwrap_or(0);

    let mut records = Vec::new();
    let mut rejected = Vec::new();
    let mut skipped_blank = 0;
    let mut seen: BTreeSet<String> = BTreeSet::new();

    for row in &rows[header_idx + 1..] {
        let cell = move |i: usize| row.get(i).map(str::trim).unwrap_or("");

        let name = cell(columns.name);
        if name.is_empty() {
            skipped_blank += 1;
            continue;
        }
        let reject = |reason| RejectedRow {
            line: line_of(row),
            name: name.to_string(),
            reason,
        };

        let raw_ref = cell(columns.reference);
        let Some(reference_value) = crate::parse_amount(raw_ref) else {
            rejected.push(reject(RejectReason::InvalidReferenceValue(raw_ref.to_string())));
            continue;
        };
        let raw_need = cell(columns.need);
        let Some(need_count) = crate::parse_amount(raw_need) else {
            rejected.push(reject(RejectReason::InvalidNeedCount(raw_need.to_string())));
            continue;
        };
        if reference_value < 0.0 || need_count < 0.0 {
            rejected.push(reject(RejectReason::NegativeValue));
            continue;
        }
        if !seen.insert(name.to_string()) {
            rejected.push(reject(RejectReason::DuplicateName));
            continue;
        }

        records.push(MunicipalityRecord::new(name, reference_value, need_count));
    }

    if records.is_empty() {
        return Err(ImportError::NoValidRows {
            rejected: rejected.len(),
        });
    }

    Ok(ImportReport {
        records,
        rejected,
        skipped_blank,
        header_line: line_of(&rows[header_idx]),
        delimiter,
        encoding: UTF_8.name(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
