//! Loading hour records and regional bids from CSV.
//!
//! Hour records use the header
//! `entity_id,date,hour,baseline_kw,output_kw,bid_kw,capacity_kw,clearing_price,capacity_price,day_ahead_active,emergency`
//! with ISO dates and `true`/`false` flags. Regional bids use
//! `date,hour,average_bid_kw`.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::LoadError;
use crate::market::region::RegionBid;
use crate::market::{HourRecord, RecordSet, RegionProfile};

fn open(path: &Path) -> Result<BufReader<File>, LoadError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })
}

/// Loads and groups hour records from a CSV file.
///
/// # Errors
///
/// Returns a [`LoadError`] if the file cannot be read, a row is malformed, or
/// the records break a grouping rule (duplicate hour, hour out of range).
pub fn load_records(path: &Path) -> Result<RecordSet, LoadError> {
    let records = read_records(open(path)?)?;
    log::info!(
        "loaded {} hour records from {}",
        records.record_count(),
        path.display()
    );
    Ok(records)
}

/// Reads and groups hour records from any CSV reader.
///
/// # Errors
///
/// See [`load_records`].
pub fn read_records(reader: impl Read) -> Result<RecordSet, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let records = rdr
        .deserialize::<HourRecord>()
        .collect::<Result<Vec<_>, _>>()?;
    RecordSet::from_records(records)
}

/// Loads regional mean bids from a CSV file.
///
/// # Errors
///
/// Returns a [`LoadError`] if the file cannot be read or a row is malformed.
pub fn load_region_bids(path: &Path) -> Result<RegionProfile, LoadError> {
    let profile = read_region_bids(open(path)?)?;
    log::info!(
        "loaded {} regional bid hours from {}",
        profile.len(),
        path.display()
    );
    Ok(profile)
}

/// Reads regional mean bids from any CSV reader.
///
/// # Errors
///
/// See [`load_region_bids`].
pub fn read_region_bids(reader: impl Read) -> Result<RegionProfile, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let bids = rdr
        .deserialize::<RegionBid>()
        .collect::<Result<Vec<_>, _>>()?;
    Ok(RegionProfile::from_bids(bids))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::market::EntityId;

    const RECORDS: &str = "\
entity_id,date,hour,baseline_kw,output_kw,bid_kw,capacity_kw,clearing_price,capacity_price,day_ahead_active,emergency
D1,2024-07-01,10,500,420,100,120,500,0.5,true,false
D1,2024-07-01,18,300,260,0,120,500,0.5,false,true
U1,2024-07-02,10,200,150,50,60,500,0.5,true,false
";

    #[test]
    fn reads_and_groups_records() {
        let set = read_records(RECORDS.as_bytes()).unwrap();
        assert_eq!(set.record_count(), 3);
        let d1 = set.period(&EntityId::from("D1")).unwrap();
        assert_eq!(d1.days.len(), 1);
        assert_eq!(d1.days[0].hours.len(), 2);
        assert!(d1.days[0].hours[1].emergency);
        assert!((d1.days[0].hours[0].raw_response_kw() - 80.0).abs() < 1e-9);
    }

    #[test]
    fn malformed_row_is_csv_error() {
        let bad = "\
entity_id,date,hour,baseline_kw,output_kw,bid_kw,capacity_kw,clearing_price,capacity_price,day_ahead_active,emergency
D1,2024-07-01,ten,500,420,100,120,500,0.5,true,false
";
        assert!(matches!(read_records(bad.as_bytes()), Err(LoadError::Csv(_))));
    }

    #[test]
    fn duplicate_hour_rejected() {
        let dup = format!("{RECORDS}D1,2024-07-01,10,500,420,100,120,500,0.5,true,false\n");
        assert!(matches!(
            read_records(dup.as_bytes()),
            Err(LoadError::DuplicateHour { hour: 10, .. })
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_records(Path::new("does/not/exist.csv")).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
        assert!(err.to_string().contains("exist.csv"));
    }

    #[test]
    fn reads_region_bids() {
        let csv = "date,hour,average_bid_kw\n2024-07-01,10,83.75\n2024-07-01,11,90\n";
        let profile = read_region_bids(csv.as_bytes()).unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
        assert_eq!(profile.len(), 2);
        assert_eq!(profile.mean_bid_kw(date, 10), Some(83.75));
        assert_eq!(profile.mean_bid_kw(date, 12), None);
    }
}
