use crate::books_api::types::Volume;
use chrono::NaiveDate;
use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};

/// A user's saved book together with their personal annotations. One row of the `books` table,
/// identified by `(book_id, user_id)`.
#[non_exhaustive]
#[derive(Serialize, Debug, Deserialize, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct BookRecord {
    /// The catalog ID of the volume this record was saved from
    pub book_id: String,
    /// The owner of the record
    pub user_id: String,
    pub title: String,
    /// Display string, authors joined with ", "
    pub authors: Option<String>,
    pub thumbnail_url: Option<String>,
    /// A passage that left an impression
    pub impressive_quote: Option<String>,
    /// Why the user picked up the book
    pub motivation: Option<String>,
    /// Impressions after reading
    pub thoughts: Option<String>,
    /// The day the book was added to the list
    pub reg_date: NaiveDate,
    pub read_start_date: Option<NaiveDate>,
    pub read_end_date: Option<NaiveDate>,
}

impl BookRecord {
    /// Creates a record without any annotations or reading period
    #[must_use]
    #[inline]
    pub const fn new(
        book_id: String,
        user_id: String,
        title: String,
        authors: Option<String>,
        thumbnail_url: Option<String>,
        reg_date: NaiveDate,
    ) -> Self {
        Self {
            book_id,
            user_id,
            title,
            authors,
            thumbnail_url,
            impressive_quote: None,
            motivation: None,
            thoughts: None,
            reg_date,
            read_start_date: None,
            read_end_date: None,
        }
    }

    /// Builds the record that gets stored when a search result is saved to the user's list.
    #[must_use]
    #[inline]
    pub fn from_volume(volume: &Volume, user_id: &str, reg_date: NaiveDate) -> Self {
        Self::new(
            volume.id.clone(),
            user_id.to_owned(),
            volume.volume_info.title.clone(),
            volume.authors_display(),
            volume.secure_thumbnail(),
            reg_date,
        )
    }

    /// Whether the reading period contains `date`. Both bounds are required, an open-ended period
    /// never matches.
    #[must_use]
    #[inline]
    pub fn has_reading_on(&self, date: NaiveDate) -> bool {
        match (self.read_start_date, self.read_end_date) {
            (Some(start), Some(end)) => start <= date && date <= end,
            _ => false,
        }
    }

    /// Replaces one of the free-text fields. Blank text clears the field.
    #[inline]
    pub fn apply_text(&mut self, target: EditTarget, text: &str) {
        let value = (!text.trim().is_empty()).then(|| text.to_owned());
        match target {
            EditTarget::ImpressiveQuote => self.impressive_quote = value,
            EditTarget::Motivation => self.motivation = value,
            EditTarget::Thoughts => self.thoughts = value,
        }
    }

    /// Sets the reading period.
    /// # Errors
    /// Fails with `RecordError::InvalidPeriod` if `end` lies before `start`; the record is left
    /// untouched in that case.
    #[inline]
    pub fn set_read_period(
        &mut self,
        start: NaiveDate,
        end: Option<NaiveDate>,
    ) -> Result<(), RecordError> {
        if let Some(end) = end.filter(|end| *end < start) {
            return Err(RecordError::InvalidPeriod { start, end });
        }
        self.read_start_date = Some(start);
        self.read_end_date = end;
        Ok(())
    }

    #[inline]
    pub fn clear_read_period(&mut self) {
        self.read_start_date = None;
        self.read_end_date = None;
    }
}

/// The free-text fields of a record that can be edited individually
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditTarget {
    ImpressiveQuote,
    Motivation,
    Thoughts,
}

impl fmt::Display for EditTarget {
    #[inline]
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match *self {
            Self::ImpressiveQuote => "quote",
            Self::Motivation => "motivation",
            Self::Thoughts => "thoughts",
        };
        formatter.write_str(name)
    }
}

impl FromStr for EditTarget {
    type Err = String;

    #[inline]
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "quote" | "impressive_quote" => Ok(Self::ImpressiveQuote),
            "motivation" | "trigger" => Ok(Self::Motivation),
            "thoughts" => Ok(Self::Thoughts),
            other => Err(format!("unknown field '{other}'")),
        }
    }
}

#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("record not found (book_id={book_id}, user_id={user_id})")]
    NotFound { book_id: String, user_id: String },

    #[error("reading period ends ({end}) before it starts ({start})")]
    InvalidPeriod { start: NaiveDate, end: NaiveDate },

    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "Tests are predefined and guaranteed to be Some/Ok"
)]
mod tests {
    use super::*;
    use crate::books_api::types::parse_volumes;
    use pretty_assertions::assert_eq;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn record() -> BookRecord {
        BookRecord::new(
            "X".to_owned(),
            "user".to_owned(),
            "Dune".to_owned(),
            None,
            None,
            date(2024, 1, 1),
        )
    }

    #[test]
    fn from_volume_leaves_annotations_empty() {
        let body = r#"{"items":[{"id":"X","volumeInfo":{"title":"Dune","authors":["Frank Herbert","Brian Herbert"],
            "imageLinks":{"thumbnail":"http://books.google.com/cover.jpg"}}}]}"#;
        let volumes = parse_volumes(body).unwrap();
        let saved = BookRecord::from_volume(&volumes[0], "user", date(2024, 3, 2));

        let mut expected = record();
        expected.authors = Some("Frank Herbert, Brian Herbert".to_owned());
        expected.thumbnail_url = Some("https://books.google.com/cover.jpg".to_owned());
        expected.reg_date = date(2024, 3, 2);
        assert_eq!(saved, expected);
    }

    #[test]
    fn open_ended_period_never_matches() {
        let mut book = record();
        book.set_read_period(date(2024, 1, 10), None).unwrap();
        assert!(!book.has_reading_on(date(2024, 1, 10)));
        assert!(!book.has_reading_on(date(2024, 6, 1)));
    }

    #[test]
    fn period_bounds_are_inclusive() {
        let mut book = record();
        book.set_read_period(date(2024, 1, 10), Some(date(2024, 1, 15)))
            .unwrap();
        assert!(!book.has_reading_on(date(2024, 1, 9)));
        assert!(book.has_reading_on(date(2024, 1, 10)));
        assert!(book.has_reading_on(date(2024, 1, 15)));
        assert!(!book.has_reading_on(date(2024, 1, 16)));
    }

    #[test]
    fn reversed_period_is_rejected() {
        let mut book = record();
        let result = book.set_read_period(date(2024, 1, 15), Some(date(2024, 1, 10)));
        assert!(matches!(result, Err(RecordError::InvalidPeriod { .. })));
        assert_eq!(book.read_start_date, None);
        assert_eq!(book.read_end_date, None);
    }

    #[test]
    fn blank_text_clears_field() {
        let mut book = record();
        book.apply_text(EditTarget::Motivation, "A friend recommended it");
        assert_eq!(book.motivation.as_deref(), Some("A friend recommended it"));
        book.apply_text(EditTarget::Motivation, "   ");
        assert_eq!(book.motivation, None);
    }

    #[test]
    fn edit_target_names() {
        assert_eq!("trigger".parse::<EditTarget>().unwrap(), EditTarget::Motivation);
        assert_eq!("Quote".parse::<EditTarget>().unwrap(), EditTarget::ImpressiveQuote);
        assert!("title".parse::<EditTarget>().is_err());
        assert_eq!(EditTarget::Thoughts.to_string(), "thoughts");
    }
}
