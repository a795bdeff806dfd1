//! Calendar grid
//!
//! Maps a month onto the fixed 6 x 7 grid of the reading calendar. Weeks start on Sunday, the
//! displayed month is padded with the trailing days of the previous month and the leading days of
//! the next one.
use crate::database::types::BookRecord;
use chrono::{Datelike as _, Days, Months, NaiveDate};

/// Number of cells in the grid, six full weeks
pub const GRID_CELLS: u64 = 42;

#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarDay {
    pub date: NaiveDate,
    /// Day of the month, 1-based
    pub day: u32,
    pub is_current_month: bool,
    /// Whether any record's reading period contains `date`. Always false for padding cells.
    pub has_reading: bool,
}

/// Builds the 42 cells for the month containing `reference`.
///
/// When the month starts on a Sunday, a full week of the previous month is shown in front of it,
/// so the first row never belongs to the displayed month entirely.
#[inline]
#[must_use]
pub fn calendar_grid(reference: NaiveDate, records: &[BookRecord]) -> Vec<CalendarDay> {
    let first = reference - Days::new(u64::from(reference.day0()));
    let offset = match first.weekday().num_days_from_sunday() {
        0 => 7,
        days => days,
    };
    let grid_start = first - Days::new(u64::from(offset));

    (0..GRID_CELLS)
        .map(|index| {
            let date = grid_start + Days::new(index);
            let is_current_month = date.year() == first.year() && date.month() == first.month();
            CalendarDay {
                date,
                day: date.day(),
                is_current_month,
                has_reading: is_current_month
                    && records.iter().any(|record| record.has_reading_on(date)),
            }
        })
        .collect()
}

/// Moves `date` by whole months, clamping the day to the end of the target month
#[inline]
#[must_use]
pub fn shift_month(date: NaiveDate, months: i32) -> Option<NaiveDate> {
    let delta = Months::new(months.unsigned_abs());
    if months >= 0 {
        date.checked_add_months(delta)
    } else {
        date.checked_sub_months(delta)
    }
}

#[inline]
#[must_use]
pub fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = first.checked_add_months(Months::new(1))?;
    u32::try_from(next.signed_duration_since(first).num_days()).ok()
}

/// Heading of the calendar, e.g. `2024/01`
#[inline]
#[must_use]
pub fn month_label(date: NaiveDate) -> String {
    date.format("%Y/%m").to_string()
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "Tests are predefined and guaranteed to be Some/Ok"
)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn reading(start: NaiveDate, end: Option<NaiveDate>) -> BookRecord {
        let mut record = BookRecord::new(
            "X".to_owned(),
            "alice".to_owned(),
            "Dune".to_owned(),
            None,
            None,
            date(2023, 12, 1),
        );
        record.set_read_period(start, end).unwrap();
        record
    }

    #[test]
    fn every_month_has_42_cells() {
        for year in [2023, 2024, 2100] {
            for month in 1..=12 {
                let grid = calendar_grid(date(year, month, 17), &[]);
                assert_eq!(grid.len(), 42);
                let current = grid.iter().filter(|day| day.is_current_month).count();
                assert_eq!(
                    u32::try_from(current).unwrap(),
                    days_in_month(year, month).unwrap()
                );
                assert!(grid.iter().all(|day| !day.has_reading));
            }
        }
    }

    #[test]
    fn grid_is_padded_on_both_sides() {
        // January 2024 starts on a Monday
        let grid = calendar_grid(date(2024, 1, 20), &[]);
        assert_eq!(grid[0].date, date(2023, 12, 31));
        assert!(!grid[0].is_current_month);
        assert_eq!(grid[1].day, 1);
        assert!(grid[1].is_current_month);
        assert_eq!(grid[31].date, date(2024, 1, 31));
        assert_eq!(grid[32].date, date(2024, 2, 1));
        assert_eq!(grid[41].date, date(2024, 2, 10));
    }

    #[test]
    fn month_starting_on_sunday_shows_full_previous_week() {
        // September 2024 starts on a Sunday
        let grid = calendar_grid(date(2024, 9, 1), &[]);
        let leading: Vec<u32> = grid
            .iter()
            .take_while(|day| !day.is_current_month)
            .map(|day| day.day)
            .collect();
        assert_eq!(leading, vec![25, 26, 27, 28, 29, 30, 31]);
        assert_eq!(grid[7].date, date(2024, 9, 1));
    }

    #[test]
    fn reading_period_marks_inclusive_range() {
        let records = [reading(date(2024, 1, 10), Some(date(2024, 1, 15)))];
        let grid = calendar_grid(date(2024, 1, 1), &records);
        let marked: Vec<u32> = grid
            .iter()
            .filter(|day| day.has_reading)
            .map(|day| day.day)
            .collect();
        assert_eq!(marked, vec![10, 11, 12, 13, 14, 15]);
        assert!(grid
            .iter()
            .filter(|day| day.has_reading)
            .all(|day| day.is_current_month));
    }

    #[test]
    fn open_ended_period_marks_nothing() {
        let records = [reading(date(2024, 1, 10), None)];
        let grid = calendar_grid(date(2024, 1, 1), &records);
        assert!(grid.iter().all(|day| !day.has_reading));
    }

    #[test]
    fn padding_cells_are_never_marked() {
        let records = [
            reading(date(2023, 12, 28), Some(date(2024, 1, 2))),
            reading(date(2024, 1, 28), Some(date(2024, 2, 5))),
        ];
        let grid = calendar_grid(date(2024, 1, 1), &records);
        let marked: Vec<NaiveDate> = grid
            .iter()
            .filter(|day| day.has_reading)
            .map(|day| day.date)
            .collect();
        assert_eq!(
            marked,
            vec![
                date(2024, 1, 1),
                date(2024, 1, 2),
                date(2024, 1, 28),
                date(2024, 1, 29),
                date(2024, 1, 30),
                date(2024, 1, 31),
            ]
        );
        assert!(grid
            .iter()
            .filter(|day| !day.is_current_month)
            .all(|day| !day.has_reading));

        // The same period shows up on the February grid for its February days
        let february = calendar_grid(date(2024, 2, 1), &records);
        let marked: Vec<u32> = february
            .iter()
            .filter(|day| day.has_reading)
            .map(|day| day.day)
            .collect();
        assert_eq!(marked, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn shifting_months() {
        assert_eq!(shift_month(date(2024, 1, 31), 1), Some(date(2024, 2, 29)));
        assert_eq!(shift_month(date(2024, 1, 15), -1), Some(date(2023, 12, 15)));
        assert_eq!(shift_month(date(2024, 3, 31), -13), Some(date(2023, 2, 28)));
        assert_eq!(shift_month(date(2024, 5, 5), 0), Some(date(2024, 5, 5)));
    }

    #[test]
    fn labels_and_month_lengths() {
        assert_eq!(month_label(date(2024, 1, 9)), "2024/01");
        assert_eq!(days_in_month(2024, 2), Some(29));
        assert_eq!(days_in_month(2023, 2), Some(28));
        assert_eq!(days_in_month(2024, 13), None);
    }
}
