//! Core Time Series Data Structures and Operations
//!
//! This module provides the time series container used by the forecasting and
//! trend modules, the frequency type with pandas-style anchoring, and the
//! coercion of date columns into UTC timestamps.

use crate::column::Column;
use crate::core::error::{Error, Result};
use crate::dataframe::DataFrame;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Time series frequency specification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Frequency {
    /// Secondly data
    Second,
    /// Minutely data
    Minute,
    /// Hourly data
    Hour,
    /// Daily data
    Daily,
    /// Weekly data, anchored on Sundays
    Weekly,
    /// Monthly data, anchored on month ends
    Monthly,
    /// Quarterly data, anchored on calendar quarter ends
    Quarterly,
    /// Yearly data, anchored on December 31st
    Yearly,
}

impl Frequency {
    /// Get frequency name as string
    pub fn name(&self) -> &'static str {
        match self {
            Frequency::Second => "S",
            Frequency::Minute => "T",
            Frequency::Hour => "H",
            Frequency::Daily => "D",
            Frequency::Weekly => "W",
            Frequency::Monthly => "M",
            Frequency::Quarterly => "Q",
            Frequency::Yearly => "Y",
        }
    }

    /// Number of periods in one seasonal cycle
    pub fn seasonal_period(&self) -> usize {
        match self {
            Frequency::Second | Frequency::Minute => 60,
            Frequency::Hour => 24,
            Frequency::Daily => 7,
            Frequency::Weekly => 52,
            Frequency::Monthly => 12,
            Frequency::Quarterly => 4,
            Frequency::Yearly => 1,
        }
    }

    /// First anchor point of this frequency on or after `t`
    pub fn anchor(&self, t: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let date = t.date_naive();
        let anchored = match self {
            Frequency::Second | Frequency::Minute | Frequency::Hour | Frequency::Daily => {
                return Ok(t)
            }
            Frequency::Weekly => {
                let until_sunday = (7 - date.weekday().num_days_from_sunday()) % 7;
                date + Duration::days(until_sunday as i64)
            }
            Frequency::Monthly => month_end(date.year(), date.month())?,
            Frequency::Quarterly => month_end(date.year(), ((date.month() - 1) / 3 + 1) * 3)?,
            Frequency::Yearly => month_end(date.year(), 12)?,
        };
        Ok(NaiveDateTime::new(anchored, t.time()).and_utc())
    }

    /// The anchor point following an already anchored `t`
    pub fn advance(&self, t: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let date = t.date_naive();
        let next = match self {
            Frequency::Second => return Ok(t + Duration::seconds(1)),
            Frequency::Minute => return Ok(t + Duration::minutes(1)),
            Frequency::Hour => return Ok(t + Duration::hours(1)),
            Frequency::Daily => return Ok(t + Duration::days(1)),
            Frequency::Weekly => return Ok(t + Duration::weeks(1)),
            Frequency::Monthly => add_months_to_end(date, 1)?,
            Frequency::Quarterly => add_months_to_end(date, 3)?,
            Frequency::Yearly => add_months_to_end(date, 12)?,
        };
        Ok(NaiveDateTime::new(next, t.time()).and_utc())
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Frequency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "s" | "second" | "secondly" => Ok(Frequency::Second),
            "t" | "min" | "minute" | "minutely" => Ok(Frequency::Minute),
            "h" | "hour" | "hourly" => Ok(Frequency::Hour),
            "d" | "day" | "daily" => Ok(Frequency::Daily),
            "w" | "w-sun" | "week" | "weekly" => Ok(Frequency::Weekly),
            "m" | "me" | "month" | "monthly" => Ok(Frequency::Monthly),
            "q" | "qe" | "q-dec" | "quarter" | "quarterly" => Ok(Frequency::Quarterly),
            "y" | "ye" | "a" | "a-dec" | "year" | "yearly" | "annual" => Ok(Frequency::Yearly),
            other => Err(Error::InvalidInput(format!("Unknown frequency: {}", other))),
        }
    }
}

fn month_end(year: i32, month: u32) -> Result<NaiveDate> {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .ok_or_else(|| Error::InvalidValue(format!("Date out of range: {}-{}", year, month)))
}

fn add_months_to_end(date: NaiveDate, months: u32) -> Result<NaiveDate> {
    let total = date.year() * 12 + date.month0() as i32 + months as i32;
    month_end(total.div_euclid(12), total.rem_euclid(12) as u32 + 1)
}

/// DateTime index for time series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateTimeIndex {
    /// Datetime values, strictly increasing
    pub values: Vec<DateTime<Utc>>,
    /// Frequency (if known)
    pub frequency: Option<Frequency>,
}

impl DateTimeIndex {
    /// Create a new datetime index; the values must be strictly increasing
    pub fn new(values: Vec<DateTime<Utc>>) -> Result<Self> {
        if let Some(pair) = values.windows(2).find(|w| w[1] <= w[0]) {
            return Err(Error::InvalidInput(format!(
                "Timestamps must be strictly increasing ({} followed by {})",
                pair[0], pair[1]
            )));
        }
        let frequency = Self::infer_frequency(&values);
        Ok(Self { values, frequency })
    }

    /// `periods` anchored timestamps starting on or after `start`
    pub fn date_range(start: DateTime<Utc>, periods: usize, frequency: Frequency) -> Result<Self> {
        let mut dates = Vec::with_capacity(periods);
        if periods > 0 {
            let mut current = frequency.anchor(start)?;
            dates.push(current);
            for _ in 1..periods {
                current = frequency.advance(current)?;
                dates.push(current);
            }
        }

        Ok(Self {
            values: dates,
            frequency: Some(frequency),
        })
    }

    /// Infer frequency from datetime values
    fn infer_frequency(values: &[DateTime<Utc>]) -> Option<Frequency> {
        if values.len() < 2 {
            return None;
        }

        let diff = values[1] - values[0];
        if values.windows(2).any(|w| w[1] - w[0] != diff) {
            return None;
        }

        match diff.num_seconds() {
            1 => Some(Frequency::Second),
            60 => Some(Frequency::Minute),
            3600 => Some(Frequency::Hour),
            86400 => Some(Frequency::Daily),
            604800 => Some(Frequency::Weekly),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&DateTime<Utc>> {
        self.values.get(index)
    }

    pub fn start(&self) -> Option<&DateTime<Utc>> {
        self.values.first()
    }

    pub fn end(&self) -> Option<&DateTime<Utc>> {
        self.values.last()
    }
}

/// Main time series data structure: timestamps plus possibly missing values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    /// DateTime index
    pub index: DateTimeIndex,
    /// Values, `None` where the observation is missing
    pub values: Vec<Option<f64>>,
}

impl TimeSeries {
    /// Create a new time series
    pub fn new(index: DateTimeIndex, values: Vec<Option<f64>>) -> Result<Self> {
        if index.len() != values.len() {
            return Err(Error::DimensionMismatch(
                "Index and values must have the same length".to_string(),
            ));
        }
        let values = values
            .into_iter()
            .map(|v| v.filter(|x| x.is_finite()))
            .collect();
        Ok(Self { index, values })
    }

    /// Create from vectors
    pub fn from_vecs(timestamps: Vec<DateTime<Utc>>, values: Vec<f64>) -> Result<Self> {
        Self::new(
            DateTimeIndex::new(timestamps)?,
            values.into_iter().map(Some).collect(),
        )
    }

    /// Build a series from a date column and a numeric value column.
    ///
    /// Dates are coerced to timestamps, rows without a date are dropped and
    /// the rows are sorted by date. Duplicate timestamps are rejected.
    pub fn from_frame(df: &DataFrame, date_column: &str, value_column: &str) -> Result<Self> {
        let dates = coerce_datetimes(df.column(date_column)?)?;
        let values = df.numeric_values(value_column)?;

        let mut rows: Vec<(DateTime<Utc>, Option<f64>)> = dates
            .into_iter()
            .zip(values)
            .filter_map(|(date, value)| date.map(|d| (d, value)))
            .collect();

        let dropped = df.nrows() - rows.len();
        if dropped > 0 {
            log::warn!(
                column = date_column,
                dropped = dropped;
                "rows without a parseable date were dropped"
            );
        }

        rows.sort_by_key(|(date, _)| *date);
        let (timestamps, values): (Vec<_>, Vec<_>) = rows.into_iter().unzip();
        Self::new(DateTimeIndex::new(timestamps)?, values)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Timestamp and value at position `index`
    pub fn get(&self, index: usize) -> Option<(&DateTime<Utc>, Option<f64>)> {
        Some((self.index.get(index)?, *self.values.get(index)?))
    }

    /// Position of the first non-missing value
    pub fn first_valid_index(&self) -> Option<usize> {
        self.values.iter().position(Option::is_some)
    }

    /// Number of missing values
    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_none()).count()
    }

    /// Fill gaps by linear interpolation over positions.
    ///
    /// Gaps between two observations are interpolated, gaps after the last
    /// observation take its value, gaps before the first observation stay
    /// missing.
    pub fn interpolate_linear(&self) -> TimeSeries {
        let mut filled = self.values.clone();
        let mut last_valid: Option<usize> = None;

        for i in 0..filled.len() {
            let Some(current) = self.values[i] else {
                continue;
            };
            if let Some(prev) = last_valid {
                if i - prev > 1 {
                    if let Some(start) = self.values[prev] {
                        let span = (i - prev) as f64;
                        for (step, slot) in filled[prev + 1..i].iter_mut().enumerate() {
                            let w = (step + 1) as f64 / span;
                            *slot = Some(start + (current - start) * w);
                        }
                    }
                }
            }
            last_valid = Some(i);
        }

        if let Some(last) = last_valid {
            let tail_value = self.values[last];
            for slot in filled[last + 1..].iter_mut() {
                *slot = tail_value;
            }
        }

        TimeSeries {
            index: self.index.clone(),
            values: filled,
        }
    }

    /// Values from the first observation onwards; errors if a gap remains
    pub fn modeled_values(&self) -> Result<Vec<f64>> {
        let start = self
            .first_valid_index()
            .ok_or_else(|| Error::InsufficientData("Series has no observations".into()))?;
        self.values[start..]
            .iter()
            .map(|v| {
                v.ok_or_else(|| {
                    Error::InvalidInput("Series has missing values inside the modeled range".into())
                })
            })
            .collect()
    }

    /// Calculate rolling window mean; the first `window - 1` entries are missing
    pub fn rolling_mean(&self, window: usize) -> Result<TimeSeries> {
        if window == 0 || window > self.len() {
            return Err(Error::InvalidInput("Invalid window size".to_string()));
        }

        let mut rolling_values = Vec::with_capacity(self.len());
        for i in 0..self.len() {
            if i + 1 < window {
                rolling_values.push(None);
                continue;
            }
            let window_values: Option<Vec<f64>> =
                self.values[i + 1 - window..=i].iter().copied().collect();
            rolling_values.push(window_values.map(|w| w.iter().sum::<f64>() / window as f64));
        }

        TimeSeries::new(self.index.clone(), rolling_values)
    }
}

/// Convert a date column to UTC timestamps.
///
/// `DateTime` columns pass through; `Int64` columns are read as Unix seconds;
/// `String` columns accept RFC 3339 and common `Y-m-d` style layouts. Missing
/// or empty entries become `None`; an unparseable string is an error.
pub fn coerce_datetimes(column: &Column) -> Result<Vec<Option<DateTime<Utc>>>> {
    match column {
        Column::DateTime(c) => Ok(c.to_options()),
        Column::Int64(c) => c
            .iter()
            .map(|v| match v {
                None => Ok(None),
                Some(&secs) => DateTime::from_timestamp(secs, 0)
                    .map(Some)
                    .ok_or_else(|| {
                        Error::InvalidValue(format!("Timestamp out of range: {}", secs))
                    }),
            })
            .collect(),
        Column::String(c) => c
            .iter()
            .map(|v| match v.map(|s| s.trim()) {
                None | Some("") => Ok(None),
                Some(s) => parse_datetime(s).map(Some),
            })
            .collect(),
        other => Err(Error::InvalidInput(format!(
            "Column of type {:?} cannot be converted to dates",
            other.column_type()
        ))),
    }
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y", "%Y%m%d"];

/// Parse a single date or datetime string as UTC
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt.and_utc());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d.and_time(chrono::NaiveTime::MIN).and_utc());
        }
    }
    // Year-month, e.g. "2024-03"
    if let Ok(d) = NaiveDate::parse_from_str(&format!("{}-01", s), "%Y-%m-%d") {
        return Ok(d.and_time(chrono::NaiveTime::MIN).and_utc());
    }
    Err(Error::InvalidValue(format!("Unparseable date: {}", s)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_frequency_from_str() {
        assert_eq!("M".parse::<Frequency>().unwrap(), Frequency::Monthly);
        assert_eq!("quarterly".parse::<Frequency>().unwrap(), Frequency::Quarterly);
        assert_eq!("A".parse::<Frequency>().unwrap(), Frequency::Yearly);
        assert!("fortnight".parse::<Frequency>().is_err());
    }

    #[test]
    fn test_seasonal_periods() {
        assert_eq!(Frequency::Daily.seasonal_period(), 7);
        assert_eq!(Frequency::Weekly.seasonal_period(), 52);
        assert_eq!(Frequency::Monthly.seasonal_period(), 12);
        assert_eq!(Frequency::Quarterly.seasonal_period(), 4);
        assert_eq!(Frequency::Yearly.seasonal_period(), 1);
        assert_eq!(Frequency::Hour.seasonal_period(), 24);
        assert_eq!(Frequency::Minute.seasonal_period(), 60);
    }

    #[test]
    fn test_monthly_range_anchors_on_month_end() {
        let range = DateTimeIndex::date_range(utc(2024, 1, 2), 3, Frequency::Monthly).unwrap();
        assert_eq!(
            range.values,
            vec![utc(2024, 1, 31), utc(2024, 2, 29), utc(2024, 3, 31)]
        );
    }

    #[test]
    fn test_quarterly_and_yearly_ranges() {
        let q = DateTimeIndex::date_range(utc(2023, 11, 15), 2, Frequency::Quarterly).unwrap();
        assert_eq!(q.values, vec![utc(2023, 12, 31), utc(2024, 3, 31)]);

        let y = DateTimeIndex::date_range(utc(2023, 12, 31), 2, Frequency::Yearly).unwrap();
        assert_eq!(y.values, vec![utc(2023, 12, 31), utc(2024, 12, 31)]);
    }

    #[test]
    fn test_weekly_range_anchors_on_sunday() {
        // 2024-01-03 is a Wednesday
        let w = DateTimeIndex::date_range(utc(2024, 1, 3), 2, Frequency::Weekly).unwrap();
        assert_eq!(w.values, vec![utc(2024, 1, 7), utc(2024, 1, 14)]);
    }

    #[test]
    fn test_index_rejects_duplicates() {
        let err = DateTimeIndex::new(vec![utc(2024, 1, 1), utc(2024, 1, 1)]);
        assert!(matches!(err, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_interpolation_leaves_leading_gap() {
        let ts = TimeSeries::new(
            DateTimeIndex::new((1..=6).map(|d| utc(2024, 1, d)).collect()).unwrap(),
            vec![None, Some(1.0), None, None, Some(4.0), None],
        )
        .unwrap();
        let filled = ts.interpolate_linear();
        assert_eq!(
            filled.values,
            vec![None, Some(1.0), Some(2.0), Some(3.0), Some(4.0), Some(4.0)]
        );
        assert_eq!(filled.first_valid_index(), Some(1));
        assert_eq!(filled.modeled_values().unwrap(), vec![1.0, 2.0, 3.0, 4.0, 4.0]);
    }

    #[test]
    fn test_rolling_mean_warmup() {
        let ts = TimeSeries::from_vecs(
            (1..=4).map(|d| utc(2024, 1, d)).collect(),
            vec![1.0, 2.0, 3.0, 4.0],
        )
        .unwrap();
        let rolled = ts.rolling_mean(2).unwrap();
        assert_eq!(rolled.values, vec![None, Some(1.5), Some(2.5), Some(3.5)]);
    }

    #[test]
    fn test_parse_datetime_layouts() {
        assert_eq!(parse_datetime("2024-03-05").unwrap(), utc(2024, 3, 5));
        assert_eq!(parse_datetime("2024/03/05").unwrap(), utc(2024, 3, 5));
        assert_eq!(parse_datetime("2024-03").unwrap(), utc(2024, 3, 1));
        assert_eq!(
            parse_datetime("2024-03-05T10:00:00Z").unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 5, 10, 0, 0).unwrap()
        );
        assert!(parse_datetime("not a date").is_err());
    }

    #[test]
    fn test_from_frame_sorts_and_drops_missing_dates() {
        let df = DataFrame::from_columns(vec![
            (
                "date",
                Column::from(vec![
                    Some("2024-03-01".to_string()),
                    None,
                    Some("2024-01-01".to_string()),
                ]),
            ),
            ("value", Column::from(vec![3.0, 2.0, 1.0])),
        ])
        .unwrap();
        let ts = TimeSeries::from_frame(&df, "date", "value").unwrap();
        assert_eq!(ts.len(), 2);
        assert_eq!(ts.values, vec![Some(1.0), Some(3.0)]);
        assert_eq!(ts.index.start(), Some(&utc(2024, 1, 1)));
    }
}
