//! CSV loaders for the restroom and monitoring-area datasets.
//!
//! Both files share one shape: a header row naming at least `name`,
//! `latitude` and `longitude` in any order. Sources are local paths or
//! http(s) URLs.

use common::config::DatasetConfig;
use common::{Error, Location, MonitoringArea};
use recommender::Catalog;
use serde::Deserialize;
use tracing::{info, warn};

const NAME: &str = "name";
const LATITUDE: &str = "latitude";
const LONGITUDE: &str = "longitude";

struct Row {
    name: String,
    latitude: f64,
    longitude: f64,
}

/// One CSV record; extra columns are ignored.
#[derive(Debug, Deserialize)]
struct RawRow {
    name: String,
    latitude: String,
    longitude: String,
}

/// Load both datasets and build a catalog with a fresh spatial join.
pub async fn load_catalog(
    client: &reqwest::Client,
    sources: &DatasetConfig,
    coverage_radius_m: f64,
) -> Result<Catalog, Error> {
    let locations = load_locations(client, &sources.locations).await?;
    let areas = load_areas(client, &sources.areas).await?;
    Ok(Catalog::new(locations, areas, coverage_radius_m))
}

pub async fn load_locations(client: &reqwest::Client, source: &str) -> Result<Vec<Location>, Error> {
    let raw = read_source(client, source).await?;
    let rows = parse_rows(&raw, source)?;
    info!("Loaded {} restrooms from {}", rows.len(), source);
    Ok(rows
        .into_iter()
        .map(|r| Location {
            name: r.name,
            latitude: r.latitude,
            longitude: r.longitude,
        })
        .collect())
}

pub async fn load_areas(client: &reqwest::Client, source: &str) -> Result<Vec<MonitoringArea>, Error> {
    let raw = read_source(client, source).await?;
    let rows = parse_rows(&raw, source)?;
    info!("Loaded {} monitoring areas from {}", rows.len(), source);
    Ok(rows
        .into_iter()
        .map(|r| MonitoringArea {
            name: r.name,
            latitude: r.latitude,
            longitude: r.longitude,
        })
        .collect())
}

fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

async fn read_source(client: &reqwest::Client, source: &str) -> Result<String, Error> {
    if !is_url(source) {
        return tokio::fs::read_to_string(source)
            .await
            .map_err(|e| Error::Dataset(format!("{}: {}", source, e)));
    }

    let resp = client
        .get(source)
        .send()
        .await
        .map_err(|e| Error::Dataset(format!("{}: {}", source, e)))?;
    let status = resp.status();
    if !status.is_success() {
        return Err(Error::Dataset(format!("{}: HTTP {}", source, status)));
    }
    resp.text()
        .await
        .map_err(|e| Error::Dataset(format!("{}: {}", source, e)))
}

fn dataset_error(source: &str, e: &csv::Error) -> Error {
    match e.position() {
        Some(pos) => Error::Dataset(format!("{}:{}: {}", source, pos.line(), e)),
        None => Error::Dataset(format!("{}: {}", source, e)),
    }
}

fn parse_coordinate(raw: &str, label: &str, source: &str, line: u64) -> Result<f64, Error> {
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| Error::Dataset(format!("{}:{}: invalid {} '{}'", source, line, label, raw)))
}

fn parse_rows(raw: &str, source: &str) -> Result<Vec<Row>, Error> {
    let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(raw.as_bytes());

    // Header names are matched case-insensitively.
    let headers: csv::StringRecord = rdr
        .headers()
        .map_err(|e| dataset_error(source, &e))?
        .iter()
        .map(|h| h.to_lowercase())
        .collect();
    for wanted in [NAME, LATITUDE, LONGITUDE] {
        if !headers.iter().any(|h| h == wanted) {
            return Err(Error::Dataset(format!("{}: missing '{}' column", source, wanted)));
        }
    }

    let mut rows = Vec::new();
    let mut record = csv::StringRecord::new();
    while rdr.read_record(&mut record).map_err(|e| dataset_error(source, &e))? {
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        let raw: RawRow = record
            .deserialize(Some(&headers))
            .map_err(|e| dataset_error(source, &e))?;

        if raw.name.is_empty() {
            warn!("{}:{}: row without a name skipped", source, line);
            continue;
        }
        rows.push(Row {
            latitude: parse_coordinate(&raw.latitude, LATITUDE, source, line)?,
            longitude: parse_coordinate(&raw.longitude, LONGITUDE, source, line)?,
            name: raw.name,
        });
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn csv_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn path(file: &NamedTempFile) -> String {
        file.path().to_string_lossy().into_owned()
    }

    #[test]
    fn test_quoted_fields_may_span_lines() {
        let rows = parse_rows(
            "name,latitude,longitude\n\"종로구\n공중화장실\",37.5,126.9\n\"say \"\"hi\"\"\",37.6,127.0\n",
            "mem",
        )
        .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "종로구\n공중화장실");
        assert_eq!(rows[0].latitude, 37.5);
        assert_eq!(rows[1].name, "say \"hi\"");
        assert_eq!(rows[1].longitude, 127.0);
    }

    #[test]
    fn test_headers_match_case_insensitively() {
        let rows = parse_rows("Name,LATITUDE,Longitude\na,37.5,126.9\n", "mem").unwrap();
        assert_eq!(rows[0].name, "a");
    }

    #[tokio::test]
    async fn test_header_order_is_free_and_extras_ignored() {
        let file = csv_file(
            "longitude,id,name,latitude\n\
             126.9780,1,시청역,37.5657\n\
             127.0276,2,\"강남역, 2번 출구\",37.4979\n",
        );
        let locations = load_locations(&reqwest::Client::new(), &path(&file)).await.unwrap();

        assert_eq!(locations.len(), 2);
        assert_eq!(locations[0].name, "시청역");
        assert_eq!(locations[0].latitude, 37.5657);
        assert_eq!(locations[0].longitude, 126.9780);
        assert_eq!(locations[1].name, "강남역, 2번 출구");
    }

    #[tokio::test]
    async fn test_bom_and_blank_lines() {
        let file = csv_file("\u{feff}name,latitude,longitude\r\n\r\n광화문,37.5759,126.9769\r\n\n");
        let areas = load_areas(&reqwest::Client::new(), &path(&file)).await.unwrap();

        assert_eq!(areas.len(), 1);
        assert_eq!(areas[0].name, "광화문");
        assert_eq!(areas[0].longitude, 126.9769);
    }

    #[tokio::test]
    async fn test_bad_number_names_the_line() {
        let file = csv_file("name,latitude,longitude\nok,37.5,126.9\nbroken,north,126.9\n");
        let err = load_locations(&reqwest::Client::new(), &path(&file))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Dataset(_)));
        let msg = err.to_string();
        assert!(msg.contains(":3:"), "unexpected message: {msg}");
        assert!(msg.contains("north"));
    }

    #[tokio::test]
    async fn test_missing_column_rejected() {
        let file = csv_file("name,lat,longitude\na,37.5,126.9\n");
        let err = load_areas(&reqwest::Client::new(), &path(&file))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("missing 'latitude' column"));
    }

    #[tokio::test]
    async fn test_missing_file_is_dataset_error() {
        let err = load_locations(&reqwest::Client::new(), "/nonexistent/toilets.csv")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Dataset(_)));
    }

    #[tokio::test]
    async fn test_load_catalog_builds_join() {
        let toilets = csv_file("name,latitude,longitude\nnear,37.5001,126.9\nfar,37.6,127.1\n");
        let areas = csv_file("name,latitude,longitude\nzone,37.5,126.9\n");
        let sources = DatasetConfig {
            locations: path(&toilets),
            areas: path(&areas),
        };

        let catalog = load_catalog(&reqwest::Client::new(), &sources, 1000.0)
            .await
            .unwrap();
        assert_eq!(catalog.locations.len(), 2);
        assert!(catalog.has_area("zone"));
        assert_eq!(catalog.coverage.areas_for(0), &[0]);
        assert!(catalog.coverage.areas_for(1).is_empty());
    }
}
