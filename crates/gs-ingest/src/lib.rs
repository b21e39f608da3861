//! gs-ingest
//!
//! Read side of the municipality data: CSV import with header synonyms,
//! encoding fallback, locale-tolerant amount parsing, and the import template.  Produces
//! [`gs_engine::MunicipalityRecord`] values; does not compute anything.

mod import;
mod number;

pub use import::{
    import_csv_bytes, import_csv_file, import_csv_str, write_template, ImportError, ImportReport, RejectReason,
    RejectedRow, TEMPLATE_HEADER,
};
pub use number::parse_amount;
