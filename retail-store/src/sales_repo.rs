//! Historical sales dataset.
//!
//! The CSV is produced by the ingestion job and loaded once at startup. After
//! loading, a [`SalesDataset`] is immutable; the service shares it through a
//! [`DatasetHandle`] whose snapshot is only swapped by an explicit reload.

use chrono::NaiveDate;
use csv::StringRecord;
use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

use retail_shared::{HistoricalObservation, SeriesKey};

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("Failed to open dataset '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Dataset is missing required column '{0}'")]
    MissingColumn(&'static str),
    #[error("Dataset load aborted: {0}")]
    Aborted(String),
}

/// Column name → accepted header spellings.
const COLUMNS: &[(&str, &[&str])] = &[
    ("date", &["date", "ds", "timestamp"]),
    ("product_id", &["product_id", "sku", "item_id"]),
    ("region", &["region", "store_id"]),
    ("channel", &["channel"]),
    ("price", &["price", "price_base"]),
    ("units_sold", &["units_sold", "quantity", "y"]),
    ("promo", &["promo"]),
    ("stock_level", &["stock_level"]),
];

const REQUIRED: &[&str] = &["date", "product_id", "region", "channel", "price", "units_sold"];

/// Immutable sales history grouped by series.
#[derive(Debug, Default)]
pub struct SalesDataset {
    series: BTreeMap<SeriesKey, Vec<HistoricalObservation>>,
    rows: usize,
    skipped: usize,
}

impl SalesDataset {
    /// Group observations by series, each series sorted by date.
    pub fn from_observations(observations: impl IntoIterator<Item = HistoricalObservation>) -> Self {
        let mut series: BTreeMap<SeriesKey, Vec<HistoricalObservation>> = BTreeMap::new();
        let mut rows = 0;
        for obs in observations {
            rows += 1;
            series.entry(obs.key()).or_default().push(obs);
        }
        for history in series.values_mut() {
            history.sort_by_key(|o| o.date);
        }
        Self { series, rows, skipped: 0 }
    }

    pub fn from_csv_path(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| DatasetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(file)
    }

    /// Parse CSV rows; rows that fail to parse or validate are skipped.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DatasetError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = reader.headers()?.clone();
        let columns = resolve_columns(&headers)?;

        let mut observations = Vec::new();
        let mut skipped = 0usize;

        for (idx, result) in reader.records().enumerate() {
            // Header is line 1
            let line = idx + 2;
            let parsed = result
                .map_err(|e| e.to_string())
                .and_then(|record| parse_row(&record, &columns));
            match parsed {
                Ok(obs) => observations.push(obs),
                Err(e) => {
                    skipped += 1;
                    tracing::debug!("Skipping dataset line {}: {}", line, e);
                }
            }
        }

        let mut dataset = Self::from_observations(observations);
        dataset.skipped = skipped;
        if skipped > 0 {
            tracing::warn!("Skipped {} malformed dataset rows", skipped);
        }
        Ok(dataset)
    }

    /// History for one series, oldest first. Empty when unknown.
    pub fn series(&self, key: &SeriesKey) -> &[HistoricalObservation] {
        self.series.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Rows rejected while loading.
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

fn normalize_header(name: &str) -> String {
    name.trim().trim_start_matches('\u{feff}').to_ascii_lowercase()
}

fn resolve_columns(headers: &StringRecord) -> Result<HashMap<&'static str, usize>, DatasetError> {
    let positions: HashMap<String, usize> = headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header(name), idx))
        .collect();

    let mut columns = HashMap::new();
    for (column, aliases) in COLUMNS {
        if let Some(idx) = aliases.iter().find_map(|a| positions.get(*a)) {
            columns.insert(*column, *idx);
        }
    }

    for column in REQUIRED.iter().copied() {
        if !columns.contains_key(column) {
            return Err(DatasetError::MissingColumn(column));
        }
    }
    Ok(columns)
}

fn field<'a>(record: &'a StringRecord, columns: &HashMap<&'static str, usize>, name: &str) -> &'a str {
    columns
        .get(name)
        .and_then(|idx| record.get(*idx))
        .unwrap_or("")
}

fn parse_row(
    record: &StringRecord,
    columns: &HashMap<&'static str, usize>,
) -> Result<HistoricalObservation, String> {
    let text = |name: &str| -> Result<String, String> {
        let value = field(record, columns, name);
        if value.is_empty() {
            Err(format!("missing {name}"))
        } else {
            Ok(value.to_string())
        }
    };
    let number = |name: &str| -> Result<f64, String> {
        let raw = field(record, columns, name);
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| format!("invalid {name} '{raw}'"))
    };

    let date = parse_date(field(record, columns, "date"))?;
    let price = number("price")?;
    if price <= 0.0 {
        return Err(format!("price must be positive, got {price}"));
    }
    let units_sold = number("units_sold")?;
    if units_sold < 0.0 {
        return Err(format!("units_sold must not be negative, got {units_sold}"));
    }

    Ok(HistoricalObservation {
        product_id: text("product_id")?,
        region: text("region")?,
        channel: text("channel")?,
        date,
        price,
        units_sold,
        promo: parse_promo(field(record, columns, "promo"))?,
        stock_level: parse_stock(field(record, columns, "stock_level"))?,
    })
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    // Accept full timestamps by their date prefix
    let prefix = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d").map_err(|_| format!("invalid date '{raw}'"))
}

fn parse_promo(raw: &str) -> Result<Option<bool>, String> {
    match raw.to_ascii_lowercase().as_str() {
        "" => Ok(None),
        "true" | "yes" => Ok(Some(true)),
        "false" | "no" => Ok(Some(false)),
        other => other
            .parse::<f64>()
            .map(|v| Some(v != 0.0))
            .map_err(|_| format!("invalid promo '{raw}'")),
    }
}

fn parse_stock(raw: &str) -> Result<Option<u32>, String> {
    if raw.is_empty() {
        return Ok(None);
    }
    let value: f64 = raw.parse().map_err(|_| format!("invalid stock_level '{raw}'"))?;
    if !value.is_finite() || value < 0.0 || value > u32::MAX as f64 {
        return Err(format!("stock_level out of range '{raw}'"));
    }
    Ok(Some(value.round() as u32))
}

/// Shared, read-only view of the current dataset.
///
/// Readers take a cheap `Arc` snapshot; a reload builds the new dataset
/// before swapping it in, so in-flight requests keep the old one.
#[derive(Clone)]
pub struct DatasetHandle {
    current: Arc<RwLock<Arc<SalesDataset>>>,
}

impl DatasetHandle {
    pub fn new(dataset: SalesDataset) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(dataset))),
        }
    }

    pub async fn snapshot(&self) -> Arc<SalesDataset> {
        self.current.read().await.clone()
    }

    pub async fn replace(&self, dataset: SalesDataset) -> Arc<SalesDataset> {
        let dataset = Arc::new(dataset);
        *self.current.write().await = dataset.clone();
        dataset
    }

    /// Load `path` and swap it in. The previous snapshot stays on failure.
    pub async fn reload(&self, path: impl Into<PathBuf>) -> Result<Arc<SalesDataset>, DatasetError> {
        let path = path.into();
        let dataset = tokio::task::spawn_blocking(move || SalesDataset::from_csv_path(path))
            .await
            .map_err(|e| DatasetError::Aborted(e.to_string()))??;

        tracing::info!(
            "Dataset reloaded: {} rows, {} series, {} skipped",
            dataset.len(),
            dataset.series.len(),
            dataset.skipped()
        );
        Ok(self.replace(dataset).await)
    }
}
