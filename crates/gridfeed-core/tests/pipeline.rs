use std::collections::HashMap;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use gridfeed_bucket::{BucketStore, MemoryBucketStore};
use gridfeed_core::entsoe::{check_status, Dataset, DocumentSource, EntsoeError, YearWindow};
use gridfeed_core::tabulate::{FULL_COLUMNS, MINIMAL_COLUMNS, PARQUET_CONTENT_TYPE};
use gridfeed_core::{EntsoePipeline, IngestConfig, YearOutcome};
use gridfeed_parser::PointPolicy;
use polars::prelude::{DataFrame, DataType, ParquetReader, SerReader, TimeUnit, TimeZone};
use reqwest::StatusCode;

fn fixture(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../gridfeed-parser/tests/data")
        .join(name);
    std::fs::read_to_string(path).expect("read fixture")
}

/// Serves canned bodies per year; years without an entry fail like an HTTP error.
struct StaticSource {
    bodies: HashMap<i32, String>,
}

impl StaticSource {
    fn new(bodies: impl IntoIterator<Item = (i32, String)>) -> Arc<Self> {
        Arc::new(Self {
            bodies: bodies.into_iter().collect(),
        })
    }
}

#[async_trait]
impl DocumentSource for StaticSource {
    async fn fetch(&self, _dataset: Dataset, window: &YearWindow) -> Result<String, EntsoeError> {
        self.bodies
            .get(&window.year)
            .cloned()
            .ok_or_else(|| EntsoeError::Status {
                status: 503,
                body: format!("no body for {}", window.year),
            })
    }
}

/// Answers every year with the same HTTP status and body, screened the way
/// the live client screens them.
struct HttpAnswer {
    status: StatusCode,
    body: String,
}

#[async_trait]
impl DocumentSource for HttpAnswer {
    async fn fetch(&self, _dataset: Dataset, _window: &YearWindow) -> Result<String, EntsoeError> {
        check_status(self.status, self.body.clone())
    }
}

fn config(years: &[i32]) -> IngestConfig {
    IngestConfig {
        years: years.to_vec(),
        ..IngestConfig::default()
    }
}

fn read_parquet(store: &MemoryBucketStore, key: &str) -> DataFrame {
    let object = store.object(key).expect("artifact uploaded");
    assert_eq!(object.content_type, PARQUET_CONTENT_TYPE);
    ParquetReader::new(Cursor::new(object.bytes.to_vec()))
        .finish()
        .expect("artifact is parquet")
}

#[tokio::test]
async fn publishes_one_artifact_per_year() -> Result<()> {
    let body = fixture("load_generation_A75.xml");
    let source = StaticSource::new([(2015, body.clone()), (2016, body)]);
    let bucket = Arc::new(MemoryBucketStore::new("landing"));
    let pipeline = EntsoePipeline::new(source, bucket.clone(), config(&[2015, 2016]));

    let report = pipeline.run(Dataset::LoadGeneration).await;

    assert!(!report.has_failures());
    assert!(bucket.container_exists(), "container created on first upload");
    assert_eq!(
        bucket.keys(),
        vec![
            "data/entsoe/load_generation/entsoe_data_2015.parquet".to_string(),
            "data/entsoe/load_generation/entsoe_data_2016.parquet".to_string(),
        ]
    );

    let df = read_parquet(&bucket, "data/entsoe/load_generation/entsoe_data_2015.parquet");
    assert_eq!(df.get_column_names(), MINIMAL_COLUMNS);
    assert_eq!(df.height(), 7);
    assert_eq!(
        df.column("datetime")?.dtype(),
        &DataType::Datetime(TimeUnit::Milliseconds, Some(TimeZone::UTC))
    );
    let first = df.column("datetime")?.datetime()?.physical().get(0);
    assert_eq!(first, Some(1_704_063_600_000));
    assert_eq!(report.published_rows(), 14);
    Ok(())
}

#[tokio::test]
async fn wind_solar_artifacts_carry_full_metadata() -> Result<()> {
    let source = StaticSource::new([(2020, fixture("wind_solar_forecast_A69.xml"))]);
    let bucket = Arc::new(MemoryBucketStore::new("landing"));
    let pipeline = EntsoePipeline::new(source, bucket.clone(), config(&[2020]));

    let outcome = pipeline.run_year(Dataset::WindSolarForecast, 2020).await?;

    let key = "data/entsoe/wind_solar_forecast/entsoe_data_ws_2020.parquet";
    assert!(matches!(&outcome, YearOutcome::Published { key: published, rows: 3, .. } if published == key));
    let df = read_parquet(&bucket, key);
    assert_eq!(df.get_column_names(), FULL_COLUMNS);
    assert_eq!(df.column("doc_type")?.str()?.get(0), Some("A69"));
    Ok(())
}

#[tokio::test]
async fn no_data_years_upload_nothing() -> Result<()> {
    let source = StaticSource::new([(2015, fixture("acknowledgement_no_data.xml"))]);
    let bucket = Arc::new(MemoryBucketStore::new("landing"));
    let pipeline = EntsoePipeline::new(source, bucket.clone(), config(&[2015]));

    let report = pipeline.run(Dataset::LoadGeneration).await;

    assert!(!report.has_failures());
    assert!(matches!(report.outcomes[0], YearOutcome::Empty { year: 2015, .. }));
    assert!(bucket.keys().is_empty());
    Ok(())
}

#[tokio::test]
async fn failed_year_does_not_stop_the_run() -> Result<()> {
    let source = StaticSource::new([
        (2015, "<html>gateway timeout</html>".to_string()),
        (2017, fixture("load_generation_A75.xml")),
    ]);
    let bucket = Arc::new(MemoryBucketStore::new("landing"));
    let pipeline = EntsoePipeline::new(source, bucket.clone(), config(&[2015, 2016, 2017]));

    let report = pipeline.run(Dataset::LoadGeneration).await;

    assert_eq!(report.failed_years(), vec![2015, 2016]);
    assert_eq!(report.outcomes.len(), 3);
    assert_eq!(
        bucket.keys(),
        vec!["data/entsoe/load_generation/entsoe_data_2017.parquet".to_string()]
    );
    Ok(())
}

#[tokio::test]
async fn republishing_overwrites_the_artifact() -> Result<()> {
    let bucket = Arc::new(MemoryBucketStore::with_existing_container("landing"));
    let key = "data/entsoe/load_generation/entsoe_data_2018.parquet";
    bucket
        .put_object(key, bytes::Bytes::from_static(b"stale"), "text/plain")
        .await?;

    let source = StaticSource::new([(2018, fixture("load_generation_A75.xml"))]);
    let pipeline = EntsoePipeline::new(source, bucket.clone(), config(&[2018]));
    pipeline.run_year(Dataset::LoadGeneration, 2018).await?;

    let df = read_parquet(&bucket, key);
    assert_eq!(df.height(), 7);
    assert_eq!(bucket.keys().len(), 1);
    Ok(())
}

#[tokio::test]
async fn strict_policy_fails_the_year_on_bad_points() -> Result<()> {
    let body = fixture("missing_psr_and_bad_point.xml");
    let bucket = Arc::new(MemoryBucketStore::new("landing"));

    let lenient = EntsoePipeline::new(
        StaticSource::new([(2019, body.clone())]),
        bucket.clone(),
        config(&[2019]),
    );
    let outcome = lenient.run_year(Dataset::LoadGeneration, 2019).await?;
    assert!(matches!(outcome, YearOutcome::Published { warnings, .. } if warnings > 0));

    let strict = EntsoePipeline::new(
        StaticSource::new([(2019, body)]),
        Arc::new(MemoryBucketStore::new("landing")),
        IngestConfig {
            point_policy: PointPolicy::Strict,
            ..config(&[2019])
        },
    );
    let report = strict.run(Dataset::LoadGeneration).await;
    assert_eq!(report.failed_years(), vec![2019]);
    Ok(())
}

#[tokio::test]
async fn writes_local_copy_when_output_dir_is_set() -> Result<()> {
    let dir = std::env::temp_dir().join(format!("gridfeed-local-copy-{}", std::process::id()));
    let source = StaticSource::new([(2021, fixture("load_generation_A75.xml"))]);
    let bucket = Arc::new(MemoryBucketStore::new("landing"));
    let pipeline = EntsoePipeline::new(
        source,
        bucket.clone(),
        IngestConfig {
            output_dir: Some(dir.clone()),
            ..config(&[2021])
        },
    );

    pipeline.run_year(Dataset::LoadGeneration, 2021).await?;

    let local = std::fs::read(dir.join("entsoe_data_2021.parquet"))?;
    let uploaded = bucket
        .object("data/entsoe/load_generation/entsoe_data_2021.parquet")
        .expect("artifact uploaded");
    assert_eq!(local, uploaded.bytes.to_vec());

    std::fs::remove_dir_all(&dir)?;
    Ok(())
}

#[tokio::test]
async fn bad_request_acknowledgement_is_an_empty_year() -> Result<()> {
    let source = Arc::new(HttpAnswer {
        status: StatusCode::BAD_REQUEST,
        body: fixture("acknowledgement_no_data.xml"),
    });
    let bucket = Arc::new(MemoryBucketStore::new("landing"));
    let pipeline = EntsoePipeline::new(source, bucket.clone(), config(&[2015]));
    assert_eq!(pipeline.config().years, vec![2015]);

    let report = pipeline.run(Dataset::LoadGeneration).await;

    assert!(matches!(report.outcomes[..], [YearOutcome::Empty { year: 2015, .. }]));
    assert!(bucket.keys().is_empty());
    Ok(())
}

#[tokio::test]
async fn gateway_error_fails_the_year_with_status() -> Result<()> {
    let source = Arc::new(HttpAnswer {
        status: StatusCode::BAD_GATEWAY,
        body: "<html>bad gateway</html>".to_string(),
    });
    let bucket = Arc::new(MemoryBucketStore::new("landing"));
    let pipeline = EntsoePipeline::new(source, bucket.clone(), config(&[2016]));

    let report = pipeline.run(Dataset::WindSolarForecast).await;

    match &report.outcomes[..] {
        [YearOutcome::Failed { year: 2016, error }] => assert!(error.contains("502")),
        other => panic!("expected a failed year, got {other:?}"),
    }
    assert!(bucket.keys().is_empty());
    Ok(())
}
