//! Turns flattened records into Polars frames and serialized artifacts.

use std::io::Cursor;

use chrono::{DateTime, Utc};
use gridfeed_parser::{Detail, Record, RecordDetail};
use polars::io::parquet::write::{ParquetCompression, ParquetWriter, StatisticsOptions};
use polars::prelude::{
    Column, CsvWriter, DataFrame, Int64Chunked, IntoSeries, NamedFrom, NewChunkedArray,
    PolarsResult, SerWriter, Series, TimeUnit, TimeZone,
};

pub const PARQUET_CONTENT_TYPE: &str = "application/vnd.apache.parquet";
pub const CSV_CONTENT_TYPE: &str = "text/csv";

pub const MINIMAL_COLUMNS: [&str; 3] = ["psr_type", "datetime", "quantity"];
pub const FULL_COLUMNS: [&str; 15] = [
    "document_id",
    "revision",
    "doc_type",
    "process_type",
    "created_time",
    "time_series_id",
    "business_type",
    "psr_type",
    "unit",
    "period_start",
    "period_end",
    "resolution",
    "position",
    "datetime",
    "quantity",
];

/// One row per record. Records without detail leave the metadata columns null.
pub fn records_to_frame(records: &[Record], detail: Detail) -> PolarsResult<DataFrame> {
    let labels: Vec<&str> = records.iter().map(|record| record.label.as_str()).collect();
    let psr_type: Column = Series::new("psr_type".into(), labels).into();
    let datetime = datetime_column("datetime", records.iter().map(|record| record.timestamp))?;
    let quantity: Column = Series::new(
        "quantity".into(),
        records.iter().map(|record| record.quantity).collect::<Vec<f64>>(),
    )
    .into();

    let columns = match detail {
        Detail::Minimal => vec![psr_type, datetime, quantity],
        Detail::Full => {
            let details: Vec<Option<&RecordDetail>> =
                records.iter().map(|record| record.detail.as_ref()).collect();
            let positions: Vec<Option<i64>> = details
                .iter()
                .map(|detail| detail.map(|detail| i64::from(detail.position)))
                .collect();

            vec![
                text_column("document_id", &details, |d| d.document_id.as_deref()),
                text_column("revision", &details, |d| d.revision.as_deref()),
                text_column("doc_type", &details, |d| d.doc_type.as_deref()),
                text_column("process_type", &details, |d| d.process_type.as_deref()),
                text_column("created_time", &details, |d| d.created_time.as_deref()),
                text_column("time_series_id", &details, |d| d.time_series_id.as_deref()),
                text_column("business_type", &details, |d| d.business_type.as_deref()),
                psr_type,
                text_column("unit", &details, |d| d.unit.as_deref()),
                text_column("period_start", &details, |d| Some(d.period_start.as_str())),
                text_column("period_end", &details, |d| d.period_end.as_deref()),
                text_column("resolution", &details, |d| Some(d.resolution.as_str())),
                Series::new("position".into(), positions).into(),
                datetime,
                quantity,
            ]
        }
    };

    DataFrame::new(columns)
}

pub fn datetime_column(
    name: &str,
    timestamps: impl Iterator<Item = DateTime<Utc>>,
) -> PolarsResult<Column> {
    let millis: Vec<i64> = timestamps.map(|ts| ts.timestamp_millis()).collect();
    let series = Int64Chunked::from_vec(name.into(), millis)
        .into_datetime(TimeUnit::Milliseconds, Some(TimeZone::UTC))
        .into_series();
    Ok(series.into())
}

fn text_column<'a, F>(name: &str, details: &[Option<&'a RecordDetail>], field: F) -> Column
where
    F: Fn(&'a RecordDetail) -> Option<&'a str>,
{
    let values: Vec<Option<&str>> = details
        .iter()
        .copied()
        .map(|detail| detail.and_then(&field))
        .collect();
    Series::new(name.into(), values).into()
}

pub fn parquet_bytes(df: &DataFrame) -> PolarsResult<Vec<u8>> {
    let mut buffer = Vec::new();
    {
        let mut cursor = Cursor::new(&mut buffer);
        let mut clone = df.clone();
        ParquetWriter::new(&mut cursor)
            .with_compression(ParquetCompression::Zstd(None))
            .with_statistics(StatisticsOptions::default())
            .finish(&mut clone)?;
    }
    Ok(buffer)
}

pub fn csv_bytes(df: &DataFrame) -> PolarsResult<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut clone = df.clone();
    CsvWriter::new(&mut buffer)
        .include_header(true)
        .finish(&mut clone)?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;
    use polars::prelude::{DataType, ParquetReader, SerReader};

    use super::*;

    fn record(label: &str, minute: u32, quantity: f64, detail: Option<RecordDetail>) -> Record {
        Record {
            label: label.to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, minute, 0).unwrap(),
            quantity,
            detail,
        }
    }

    fn detail(position: u32) -> RecordDetail {
        RecordDetail {
            document_id: Some("doc".into()),
            revision: Some("1".into()),
            doc_type: Some("A69".into()),
            process_type: Some("A01".into()),
            created_time: None,
            time_series_id: Some("7".into()),
            business_type: Some("A94".into()),
            unit: Some("MAW".into()),
            period_start: "2024-01-01T00:00Z".into(),
            period_end: Some("2024-01-02T00:00Z".into()),
            resolution: "PT15M".into(),
            position,
        }
    }

    #[test]
    fn minimal_frame_has_label_time_and_quantity() {
        let records = vec![record("B16", 0, 1.0, None), record("B19", 15, 2.5, None)];
        let df = records_to_frame(&records, Detail::Minimal).unwrap();

        assert_eq!(df.get_column_names(), MINIMAL_COLUMNS);
        assert_eq!(df.height(), 2);
        assert_eq!(
            df.column("datetime").unwrap().dtype(),
            &DataType::Datetime(TimeUnit::Milliseconds, Some(TimeZone::UTC))
        );
        assert_eq!(df.column("psr_type").unwrap().str().unwrap().get(1), Some("B19"));
        assert_eq!(df.column("quantity").unwrap().f64().unwrap().get(1), Some(2.5));
    }

    #[test]
    fn full_frame_carries_metadata_columns() {
        let records = vec![
            record("B18", 0, 10.0, Some(detail(1))),
            record("B18", 15, 11.0, Some(detail(2))),
        ];
        let df = records_to_frame(&records, Detail::Full).unwrap();

        assert_eq!(df.get_column_names(), FULL_COLUMNS);
        assert_eq!(df.column("position").unwrap().i64().unwrap().get(1), Some(2));
        assert_eq!(df.column("created_time").unwrap().null_count(), 2);
        assert_eq!(df.column("unit").unwrap().str().unwrap().get(0), Some("MAW"));
    }

    #[test]
    fn empty_records_still_produce_a_schema() {
        let df = records_to_frame(&[], Detail::Full).unwrap();
        assert_eq!(df.height(), 0);
        assert_eq!(df.width(), FULL_COLUMNS.len());
    }

    #[test]
    fn parquet_bytes_read_back() {
        let records = vec![record("B16", 0, 1.0, None), record("B16", 15, 2.0, None)];
        let df = records_to_frame(&records, Detail::Minimal).unwrap();
        let bytes = parquet_bytes(&df).unwrap();

        let restored = ParquetReader::new(Cursor::new(bytes)).finish().unwrap();
        assert_eq!(restored.get_column_names(), MINIMAL_COLUMNS);
        assert_eq!(restored.height(), 2);
        assert_eq!(
            restored.column("datetime").unwrap().dtype(),
            &DataType::Datetime(TimeUnit::Milliseconds, Some(TimeZone::UTC))
        );
        let restored_quantity = restored.column("quantity").unwrap().as_materialized_series();
        let quantity = df.column("quantity").unwrap().as_materialized_series();
        assert!(restored_quantity.equals_missing(quantity));
    }

    #[test]
    fn csv_bytes_start_with_header() {
        let records = vec![record("B16", 0, 1.0, None)];
        let df = records_to_frame(&records, Detail::Minimal).unwrap();
        let text = String::from_utf8(csv_bytes(&df).unwrap()).unwrap();
        assert!(text.starts_with("psr_type,datetime,quantity\n"));
        assert!(text.contains("B16,"));
    }
}
