//! Append-only prediction history for one session.

use crate::error::{PredictError, Result};
use crate::resolve::{Prediction, Quality};
use chrono::{DateTime, Utc};
use std::path::Path;

/// One analysed photo. Never modified after it enters a ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRecord {
    pub timestamp: DateTime<Utc>,
    pub label: Quality,
    /// Percentage in [0,100].
    pub confidence: f64,
}

impl PredictionRecord {
    pub fn new(timestamp: DateTime<Utc>, prediction: Prediction) -> Self {
        Self {
            timestamp,
            label: prediction.label,
            confidence: prediction.confidence,
        }
    }

    /// Timestamp as shown in the history table, e.g. `2025-03-01 14:05:09`.
    pub fn display_time(&self) -> String {
        self.timestamp.format("%Y-%m-%d %H:%M:%S").to_string()
    }

    fn validate(&self) -> Result<()> {
        if !self.confidence.is_finite() || !(0.0..=100.0).contains(&self.confidence) {
            return Err(PredictError::MalformedRecord(format!(
                "confidence {} is outside [0, 100]",
                self.confidence
            )));
        }
        Ok(())
    }
}

/// Running totals per label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LabelCounts {
    pub fresh: usize,
    pub rotten: usize,
}

/// Chronological list of predictions. Grows only through [`append`] and
/// empties only through [`clear`].
///
/// [`append`]: HistoryLedger::append
/// [`clear`]: HistoryLedger::clear
#[derive(Debug, Clone, Default)]
pub struct HistoryLedger {
    records: Vec<PredictionRecord>,
}

impl HistoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects the record as a whole if it is malformed; the ledger is left as is.
    pub fn append(&mut self, record: PredictionRecord) -> Result<()> {
        record.validate()?;
        self.records.push(record);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Oldest first.
    pub fn records(&self) -> &[PredictionRecord] {
        &self.records
    }

    /// Entry `i` of each series counts the matching labels among the first `i + 1` records.
    pub fn cumulative_counts(&self) -> (Vec<usize>, Vec<usize>) {
        let mut fresh = Vec::with_capacity(self.records.len());
        let mut rotten = Vec::with_capacity(self.records.len());
        let mut totals = LabelCounts::default();
        for record in &self.records {
            match record.label {
                Quality::Fresh => totals.fresh += 1,
                Quality::Rotten => totals.rotten += 1,
            }
            fresh.push(totals.fresh);
            rotten.push(totals.rotten);
        }
        (fresh, rotten)
    }

    pub fn counts(&self) -> LabelCounts {
        self.records
            .iter()
            .fold(LabelCounts::default(), |mut acc, r| {
                match r.label {
                    Quality::Fresh => acc.fresh += 1,
                    Quality::Rotten => acc.rotten += 1,
                }
                acc
            })
    }

    /// Newest first, at most `n` records.
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &PredictionRecord> + '_ {
        self.records.iter().rev().take(n)
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Writes the history oldest first with headers:
    /// Time (UTC),Result,Confidence (%)
    pub fn export_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut wtr = csv::Writer::from_path(path)?;
        wtr.write_record(["Time (UTC)", "Result", "Confidence (%)"])?;
        for record in &self.records {
            wtr.write_record([
                record.display_time().as_str(),
                record.label.to_string().as_str(),
                format!("{:.2}", record.confidence).as_str(),
            ])?;
        }
        wtr.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(minute: u32, label: Quality, confidence: f64) -> PredictionRecord {
        PredictionRecord {
            timestamp: Utc.with_ymd_and_hms(2025, 3, 1, 14, minute, 9).unwrap(),
            label,
            confidence,
        }
    }

    fn ledger_of(labels: &[Quality]) -> HistoryLedger {
        let mut ledger = HistoryLedger::new();
        for (i, label) in labels.iter().enumerate() {
            ledger.append(record(i as u32, *label, 75.0)).unwrap();
        }
        ledger
    }

    #[test]
    fn cumulative_counts_follow_insertion_order() {
        let ledger = ledger_of(&[Quality::Fresh, Quality::Fresh, Quality::Rotten]);
        assert_eq!(
            ledger.cumulative_counts(),
            (vec![1, 2, 2], vec![0, 0, 1])
        );
        assert_eq!(ledger.counts(), LabelCounts { fresh: 2, rotten: 1 });
    }

    #[test]
    fn cumulative_counts_are_idempotent() {
        let ledger = ledger_of(&[Quality::Rotten, Quality::Fresh]);
        assert_eq!(ledger.cumulative_counts(), ledger.cumulative_counts());
    }

    #[test]
    fn append_bumps_exactly_one_series() {
        let mut ledger = ledger_of(&[Quality::Fresh, Quality::Rotten, Quality::Fresh]);
        for label in [Quality::Rotten, Quality::Fresh, Quality::Fresh, Quality::Rotten] {
            let (f0, r0) = ledger.cumulative_counts();
            ledger.append(record(9, label, 60.0)).unwrap();
            let (f1, r1) = ledger.cumulative_counts();
            assert_eq!(&f1[..f0.len()], &f0[..]);
            assert_eq!(&r1[..r0.len()], &r0[..]);
            let df = f1.last().unwrap() - f0.last().unwrap();
            let dr = r1.last().unwrap() - r0.last().unwrap();
            match label {
                Quality::Fresh => assert_eq!((df, dr), (1, 0)),
                Quality::Rotten => assert_eq!((df, dr), (0, 1)),
            }
        }
    }

    #[test]
    fn recent_is_newest_first_and_truncated() {
        let ledger = ledger_of(&[Quality::Fresh, Quality::Fresh, Quality::Rotten]);
        let recent: Vec<_> = ledger.recent(2).collect();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].label, Quality::Rotten);
        assert_eq!(recent[1].label, Quality::Fresh);
        assert_eq!(recent[1].timestamp.format("%M").to_string(), "01");
        // underlying order untouched
        assert_eq!(ledger.records()[0].label, Quality::Fresh);
        assert_eq!(ledger.recent(20).count(), 3);
    }

    #[test]
    fn clear_is_idempotent() {
        let mut ledger = ledger_of(&[Quality::Fresh, Quality::Rotten]);
        ledger.clear();
        assert_eq!(ledger.cumulative_counts(), (vec![], vec![]));
        ledger.clear();
        assert!(ledger.is_empty());
        assert_eq!(ledger.recent(20).count(), 0);
    }

    #[test]
    fn malformed_record_is_rejected_without_side_effects() {
        let mut ledger = ledger_of(&[Quality::Fresh]);
        for bad in [-0.5, 100.01, f64::NAN] {
            let err = ledger.append(record(5, Quality::Rotten, bad)).unwrap_err();
            assert!(matches!(err, PredictError::MalformedRecord(_)));
        }
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.cumulative_counts(), (vec![1], vec![0]));
    }

    #[test]
    fn boundary_confidences_are_accepted() {
        let mut ledger = HistoryLedger::new();
        ledger.append(record(0, Quality::Fresh, 100.0)).unwrap();
        ledger.append(record(1, Quality::Rotten, 0.0)).unwrap();
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn display_time_uses_table_format() {
        assert_eq!(record(5, Quality::Fresh, 51.0).display_time(), "2025-03-01 14:05:09");
    }

    #[test]
    fn export_csv_writes_expected_headers_and_rows() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("history.csv");
        let mut ledger = HistoryLedger::new();
        ledger.append(record(0, Quality::Fresh, 51.0))?;
        ledger.append(record(1, Quality::Rotten, 87.65))?;
        ledger.export_csv(&path)?;

        let mut rdr = csv::Reader::from_path(&path)?;
        let headers = rdr.headers()?.clone();
        assert_eq!(
            headers.iter().collect::<Vec<_>>(),
            vec!["Time (UTC)", "Result", "Confidence (%)"]
        );
        let rows: Vec<csv::StringRecord> = rdr.records().collect::<Result<_, _>>()?;
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][0], "2025-03-01 14:00:09");
        assert_eq!(&rows[0][1], "Fresh Tomato");
        assert_eq!(&rows[0][2], "51.00");
        assert_eq!(&rows[1][1], "Rotten Tomato");
        assert_eq!(&rows[1][2], "87.65");
        Ok(())
    }
}
