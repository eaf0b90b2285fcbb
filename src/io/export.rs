//! CSV export for settlement results.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::settle::SettlementRun;

/// Column header of the daily settlement export.
const DAILY_HEADER: &str = "entity_id,role,date,capacity_revenue,response_fee,user_payout,\
                            assess_pre,assess_final,response_revenue,emergency_revenue,\
                            excess_kw,total_revenue";

/// Column header of the period summary export.
const SUMMARY_HEADER: &str =
    "entity_id,role,capacity_revenue,response_revenue,emergency_revenue,total_revenue";

fn create(path: &Path) -> io::Result<io::BufWriter<File>> {
    File::create(path).map(io::BufWriter::new)
}

/// Exports one row per entity and day to a CSV file.
///
/// Rows are ordered by entity id, then date. Produces identical output for
/// identical runs.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_daily_csv(run: &SettlementRun, path: &Path) -> io::Result<()> {
    write_daily_csv(run, create(path)?)
}

/// Writes daily settlement rows as CSV to any writer.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_daily_csv(run: &SettlementRun, writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(DAILY_HEADER.split(',').map(str::trim))?;

    for (s, d) in run.daily_rows() {
        wtr.write_record(&[
            s.id.to_string(),
            s.role.as_str().to_string(),
            d.date.to_string(),
            format!("{:.4}", d.capacity_revenue),
            format!("{:.4}", d.response_fee),
            format!("{:.4}", d.user_payout),
            format!("{:.4}", d.assess_pre),
            format!("{:.4}", d.assess_final),
            format!("{:.4}", d.response_revenue()),
            format!("{:.4}", d.emergency_revenue),
            format!("{:.4}", d.excess_kw),
            format!("{:.4}", d.total_revenue()),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Exports one period-total row per entity to a CSV file.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_summary_csv(run: &SettlementRun, path: &Path) -> io::Result<()> {
    write_summary_csv(run, create(path)?)
}

/// Writes period totals as CSV to any writer.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_summary_csv(run: &SettlementRun, writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(SUMMARY_HEADER.split(','))?;

    for s in run.entities.values() {
        let t = &s.totals;
        wtr.write_record(&[
            s.id.to_string(),
            s.role.as_str().to_string(),
            format!("{:.4}", t.capacity_revenue),
            format!("{:.4}", t.response_revenue),
            format!("{:.4}", t.emergency_revenue),
            format!("{:.4}", t.total_revenue),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::market::{EntityId, RoleKind};
    use crate::settle::{DayFigures, EntitySettlement};

    fn make_run(days: u32) -> SettlementRun {
        let figures = |d: u32| DayFigures {
            capacity_revenue: 100.0,
            response_fee: 40_000.0,
            assess_pre: 5_500.0,
            assess_final: 5_500.0,
            emergency_revenue: 2_000.0,
            ..DayFigures::empty(NaiveDate::from_ymd_opt(2024, 7, d).unwrap_or_default())
        };
        let mut run = SettlementRun::default();
        for id in ["D2", "D1"] {
            let s = EntitySettlement::from_days(
                EntityId::from(id),
                RoleKind::Direct,
                None,
                (1..=days).map(figures).collect(),
            );
            run.entities.insert(s.id.clone(), s);
        }
        run
    }

    fn to_string(write: impl FnOnce(&mut Vec<u8>) -> io::Result<()>) -> String {
        let mut buf = Vec::new();
        write(&mut buf).ok();
        String::from_utf8(buf).unwrap_or_default()
    }

    #[test]
    fn daily_header_and_row_count() {
        let run = make_run(3);
        let out = to_string(|b| write_daily_csv(&run, b));
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(
            lines[0],
            "entity_id,role,date,capacity_revenue,response_fee,user_payout,assess_pre,\
             assess_final,response_revenue,emergency_revenue,excess_kw,total_revenue"
        );
        // 1 header + 2 entities x 3 days
        assert_eq!(lines.len(), 7);
        assert!(lines[1].starts_with("D1,direct,2024-07-01,"));
    }

    #[test]
    fn summary_rows_carry_totals() {
        let run = make_run(2);
        let out = to_string(|b| write_summary_csv(&run, b));
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[1],
            "D1,direct,200.0000,69000.0000,4000.0000,73200.0000"
        );
    }

    #[test]
    fn deterministic_output() {
        let run = make_run(5);
        let a = to_string(|b| write_daily_csv(&run, b));
        let b = to_string(|b| write_daily_csv(&run, b));
        assert_eq!(a, b);
    }

    #[test]
    fn daily_rows_parse_back() {
        let run = make_run(2);
        let out = to_string(|b| write_daily_csv(&run, b));
        let mut rdr = csv::ReaderBuilder::new().from_reader(out.as_bytes());
        let mut rows = 0;
        for record in rdr.records() {
            let rec = record.unwrap();
            assert_eq!(rec.len(), 12);
            for i in 3..12 {
                assert!(rec[i].parse::<f64>().is_ok(), "column {i} should parse as f64");
            }
            let total: f64 = rec[11].parse().unwrap();
            assert!((total - 36_600.0).abs() < 1e-6);
            rows += 1;
        }
        assert_eq!(rows, 4);
    }
}
