//! Scenario: row-level problems are reported, not fatal.
//!
//! GREEN when:
//! - Preamble rows above the header are skipped.
//! - Blank-name rows are skipped and counted.
//! - Unparseable, negative and duplicate rows are listed with their line.
//! - A file with no surviving rows is an error.
//! - Windows-1252 files keep their umlauts and euro signs.

use gs_engine::MunicipalityRecord;
use gs_ingest::{import_csv_bytes, import_csv_file, import_csv_str, ImportError, RejectReason};

const MESSY: &str = "\
Fördermittel 2024,,
Stand: Januar,,
Kommune,Wert 2019 (€),Kinder U3 im SGB-II-Bezug
Stadt A,50000,120
,,
Stadt B,n/a,85
Gemeinde C,15000,-3
Stadt A,1,1
Gemeinde D,8000,15
";

#[test]
fn scenario_messy_file_imports_valid_rows() {
    let report = import_csv_str(MESSY).unwrap();

    assert_eq!(report.header_line, 3);
    assert_eq!(
        report.records,
        vec![
            MunicipalityRecord::new("Stadt A", 50_000.0, 120.0),
            MunicipalityRecord::new("Gemeinde D", 8_000.0, 15.0),
        ]
    );
    assert_eq!(report.skipped_blank, 1);

    let reasons: Vec<(u64, &str, &RejectReason)> = report
        .rejected
        .iter()
        .map(|r| (r.line, r.name.as_str(), &r.reason))
        .collect();
    assert_eq!(
        reasons,
        vec![
            (
                6,
                "Stadt B",
                &RejectReason::InvalidReferenceValue("n/a".to_string())
            ),
            (7, "Gemeinde C", &RejectReason::NegativeValue),
            (8, "Stadt A", &RejectReason::DuplicateName),
        ]
    );
    assert!(!report.is_clean());
}

#[test]
fn scenario_nothing_valid_is_an_error() {
    let src = "Kommune,Wert 2019,Kinder U3\nA,x,1\nB,1,y\n";
    let err = import_csv_str(src).unwrap_err();
    assert_eq!(err, ImportError::NoValidRows { rejected: 2 });
    assert_eq!(err.to_string(), "no valid municipality rows (2 rejected)");
}

#[test]
fn scenario_header_only_is_an_error() {
    let err = import_csv_str("Kommune,Wert 2019,Kinder U3\n").unwrap_err();
    assert_eq!(err, ImportError::NoValidRows { rejected: 0 });
}

#[test]
fn scenario_windows_1252_file_keeps_umlauts() {
    // 0xF6 = ö, 0x80 = € in Windows-1252; neither is valid UTF-8 here.
    let raw = b"Kommune;Wert 2019 (\x80);Kinder U3\nK\xF6ln;50000;120\nM\xFCnster;8000;15\n";

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kommunen.csv");
    std::fs::write(&path, raw).unwrap();

    let report = import_csv_file(&path).unwrap();
    assert_eq!(report.encoding, "windows-1252");
    assert_eq!(report.delimiter, ';');
    assert_eq!(
        report.records,
        vec![
            MunicipalityRecord::new("Köln", 50_000.0, 120.0),
            MunicipalityRecord::new("Münster", 8_000.0, 15.0),
        ]
    );
    assert!(report.records.iter().all(|r| !r.name.contains('\u{fffd}')));
}

#[test]
fn scenario_utf8_bytes_are_not_reinterpreted() {
    let raw = "Kommune;Wert 2019 (€);Kinder U3\nKöln;50000;120\n".as_bytes();
    let report = import_csv_bytes(raw).unwrap();
    assert_eq!(report.encoding, "UTF-8");
    assert_eq!(report.records[0].name, "Köln");
}
