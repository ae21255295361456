use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Half-open stay interval: the start day is occupied, the end day is not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// An empty or inverted range is a caller error, never silently zero days.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, RangeError> {
        if end <= start {
            return Err(RangeError::EmptyRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains_day(&self, day: NaiveDate) -> bool {
        self.start <= day && day < self.end
    }

    /// Calendar-day keys from `start` inclusive to `end` exclusive.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d < end)
    }

    pub fn nights(&self) -> i64 {
        (self.end - self.start).num_days()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RangeError {
    #[error("Invalid date range: end {end} must be after start {start}")]
    EmptyRange { start: NaiveDate, end: NaiveDate },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_rejects_empty_and_inverted_ranges() {
        assert!(DateRange::new(d("2024-06-01"), d("2024-06-01")).is_err());
        assert!(DateRange::new(d("2024-06-05"), d("2024-06-01")).is_err());
    }

    #[test]
    fn test_overlap_arithmetic() {
        let a = DateRange::new(d("2024-06-01"), d("2024-06-05")).unwrap();
        let b = DateRange::new(d("2024-06-04"), d("2024-06-08")).unwrap();
        let c = DateRange::new(d("2024-06-05"), d("2024-06-08")).unwrap();

        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        // Half-open: checkout day equals check-in day means no overlap
        assert!(!a.overlaps(&c));
        assert!(!c.overlaps(&a));
    }

    #[test]
    fn test_days_excludes_end() {
        let range = DateRange::new(d("2024-06-01"), d("2024-06-04")).unwrap();
        let days: Vec<NaiveDate> = range.days().collect();

        assert_eq!(days, vec![d("2024-06-01"), d("2024-06-02"), d("2024-06-03")]);
        assert_eq!(range.nights(), 3);
    }

    #[test]
    fn test_days_is_restartable() {
        let range = DateRange::new(d("2024-06-01"), d("2024-06-03")).unwrap();
        assert_eq!(range.days().count(), 2);
        assert_eq!(range.days().count(), 2);
    }

    #[test]
    fn test_contains_day() {
        let range = DateRange::new(d("2024-06-01"), d("2024-06-03")).unwrap();
        assert!(range.contains_day(d("2024-06-01")));
        assert!(range.contains_day(d("2024-06-02")));
        assert!(!range.contains_day(d("2024-06-03")));
    }
}
