use chrono::{Days, NaiveDate};

/// An inclusive date interval, sized to respect the upstream archive API's
/// maximum range-per-request limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl FetchWindow {
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// Lazy iterator over contiguous, non-overlapping windows of at most
/// `chunk_days` days covering `[start, end]`, in ascending order with the
/// final window clipped to `end`. Empty when `start > end` (already up to
/// date). Recomputed fresh on every construction; no shared state.
#[derive(Debug, Clone)]
pub struct DateWindows {
    next_start: Option<NaiveDate>,
    end: NaiveDate,
    chunk_days: u32,
}

impl DateWindows {
    pub fn new(start: NaiveDate, end: NaiveDate, chunk_days: u32) -> Self {
        Self {
            next_start: if start <= end { Some(start) } else { None },
            end,
            chunk_days: chunk_days.max(1),
        }
    }
}

impl Iterator for DateWindows {
    type Item = FetchWindow;

    fn next(&mut self) -> Option<FetchWindow> {
        let start = self.next_start?;

        let window_end = start
            .checked_add_days(Days::new(u64::from(self.chunk_days) - 1))
            .map_or(self.end, |d| d.min(self.end));

        self.next_start = if window_end < self.end {
            window_end.checked_add_days(Days::new(1))
        } else {
            None
        };

        Some(FetchWindow {
            start,
            end: window_end,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_single_window_clipped_to_end() {
        let windows: Vec<_> = DateWindows::new(date(2026, 1, 10), date(2026, 1, 12), 30).collect();
        assert_eq!(
            windows,
            vec![FetchWindow {
                start: date(2026, 1, 10),
                end: date(2026, 1, 12),
            }]
        );
    }

    #[test]
    fn test_start_after_end_yields_nothing() {
        let windows: Vec<_> = DateWindows::new(date(2026, 1, 13), date(2026, 1, 12), 30).collect();
        assert!(windows.is_empty());
    }

    #[test]
    fn test_exact_multiple_of_chunk() {
        let windows: Vec<_> = DateWindows::new(date(2026, 1, 1), date(2026, 1, 10), 5).collect();
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].start, date(2026, 1, 1));
        assert_eq!(windows[0].end, date(2026, 1, 5));
        assert_eq!(windows[1].start, date(2026, 1, 6));
        assert_eq!(windows[1].end, date(2026, 1, 10));
    }

    #[test]
    fn test_coverage_has_no_gaps_or_overlaps() {
        let start = date(2025, 11, 7);
        let end = date(2026, 2, 3);
        let windows: Vec<_> = DateWindows::new(start, end, 7).collect();

        assert_eq!(windows.first().unwrap().start, start);
        assert_eq!(windows.last().unwrap().end, end);
        for pair in windows.windows(2) {
            assert_eq!(
                pair[0].end.checked_add_days(Days::new(1)).unwrap(),
                pair[1].start
            );
        }
        for w in &windows {
            assert!(w.days() <= 7);
            assert!(w.start <= w.end);
        }

        let covered: i64 = windows.iter().map(|w| w.days()).sum();
        assert_eq!(covered, (end - start).num_days() + 1);
    }

    #[test]
    fn test_single_day_range() {
        let windows: Vec<_> = DateWindows::new(date(2026, 1, 12), date(2026, 1, 12), 30).collect();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].days(), 1);
    }

    #[test]
    fn test_iterator_is_restartable() {
        let make = || DateWindows::new(date(2026, 1, 1), date(2026, 3, 1), 10);
        let first: Vec<_> = make().collect();
        let second: Vec<_> = make().collect();
        assert_eq!(first, second);
    }
}
