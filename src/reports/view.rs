use chrono::{DateTime, FixedOffset, Offset, Utc};

use super::{FetchResult, Report};

/// A report prepared for display
#[derive(Debug, Clone, PartialEq)]
pub struct ReportCard {
    pub id: String,
    pub title: String,
    pub content: String,
    pub created_at: String,
}

/// Display state of the reports panel
///
/// Selected in priority order: a failure always wins, then the empty state,
/// then one card per report in the order received.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportsView {
    Failed(String),
    Empty,
    Cards(Vec<ReportCard>),
}

impl ReportsView {
    pub fn from_fetch(result: FetchResult, offset: &FixedOffset) -> Self {
        match result {
            FetchResult::Failed(error) => ReportsView::Failed(error),
            FetchResult::Reports(reports) if reports.is_empty() => ReportsView::Empty,
            FetchResult::Reports(reports) => ReportsView::Cards(
                reports
                    .into_iter()
                    .map(|report| ReportCard::new(report, offset))
                    .collect(),
            ),
        }
    }

    pub fn card_count(&self) -> usize {
        match self {
            ReportsView::Cards(cards) => cards.len(),
            _ => 0,
        }
    }
}

impl ReportCard {
    fn new(report: Report, offset: &FixedOffset) -> Self {
        Self {
            id: report.id.to_string(),
            created_at: format_timestamp(&report.created_at, offset),
            title: report.title,
            content: report.content,
        }
    }
}

/// Day-first local date and time, e.g. `2/1/2024, 00:00:00`
pub fn format_timestamp(ts: &DateTime<Utc>, offset: &FixedOffset) -> String {
    ts.with_timezone(offset)
        .format("%-d/%-m/%Y, %H:%M:%S")
        .to_string()
}

/// Offset used for timestamps; out-of-range values fall back to UTC
pub fn display_offset(minutes: i32) -> FixedOffset {
    FixedOffset::east_opt(minutes.saturating_mul(60)).unwrap_or_else(|| Utc.fix())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::memory::report;

    fn utc() -> FixedOffset {
        display_offset(0)
    }

    fn sample() -> Vec<Report> {
        vec![
            report(1, "A", "x", "2024-01-02T00:00:00Z"),
            report(2, "B", "y", "2024-01-01T00:00:00Z"),
        ]
    }

    #[test]
    fn test_cards_in_received_order() {
        let view = ReportsView::from_fetch(FetchResult::Reports(sample()), &utc());
        let ReportsView::Cards(cards) = &view else {
            panic!("expected cards");
        };
        assert_eq!(view.card_count(), 2);
        assert_eq!(cards[0].title, "A");
        assert_eq!(cards[0].content, "x");
        assert_eq!(cards[0].created_at, "2/1/2024, 00:00:00");
        assert_eq!(cards[1].title, "B");
        assert_eq!(cards[1].created_at, "1/1/2024, 00:00:00");
    }

    #[test]
    fn test_empty_collection() {
        let view = ReportsView::from_fetch(FetchResult::Reports(vec![]), &utc());
        assert_eq!(view, ReportsView::Empty);
        assert_eq!(view.card_count(), 0);
    }

    #[test]
    fn test_failure_wins() {
        let view =
            ReportsView::from_fetch(FetchResult::Failed("network timeout".into()), &utc());
        assert_eq!(view, ReportsView::Failed("network timeout".to_string()));
        assert_eq!(view.card_count(), 0);
    }

    #[test]
    fn test_timestamp_respects_offset() {
        let ts = report(1, "A", "x", "2024-01-02T00:30:00Z").created_at;
        assert_eq!(format_timestamp(&ts, &display_offset(-60)), "1/1/2024, 23:30:00");
        assert_eq!(format_timestamp(&ts, &display_offset(120)), "2/1/2024, 02:30:00");
    }

    #[test]
    fn test_display_offset_out_of_range() {
        assert_eq!(display_offset(100_000), utc());
    }
}
