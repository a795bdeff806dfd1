use crate::database::types::BookRecord;
use core::cmp::Ordering;
use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};

/// Display order of the book list
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortOrder {
    /// Most recently registered first
    #[default]
    NewestFirst,
    OldestFirst,
    TitleAsc,
    TitleDesc,
}

impl fmt::Display for SortOrder {
    #[inline]
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match *self {
            Self::NewestFirst => "newest",
            Self::OldestFirst => "oldest",
            Self::TitleAsc => "title-asc",
            Self::TitleDesc => "title-desc",
        };
        formatter.write_str(name)
    }
}

impl FromStr for SortOrder {
    type Err = String;

    #[inline]
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "newest" => Ok(Self::NewestFirst),
            "oldest" => Ok(Self::OldestFirst),
            "title-asc" | "title" => Ok(Self::TitleAsc),
            "title-desc" => Ok(Self::TitleDesc),
            other => Err(format!(
                "unknown sort order '{other}', expected one of newest, oldest, title-asc, title-desc"
            )),
        }
    }
}

fn compare_titles(first: &BookRecord, second: &BookRecord) -> Ordering {
    first.title.to_lowercase().cmp(&second.title.to_lowercase())
}

/// Sorts the records in place. The sort is stable, records that compare equal keep their order.
#[inline]
pub fn sort_records(records: &mut [BookRecord], order: SortOrder) {
    match order {
        SortOrder::NewestFirst => {
            records.sort_by(|first, second| second.reg_date.cmp(&first.reg_date));
        }
        SortOrder::OldestFirst => {
            records.sort_by(|first, second| first.reg_date.cmp(&second.reg_date));
        }
        SortOrder::TitleAsc => records.sort_by(compare_titles),
        SortOrder::TitleDesc => records.sort_by(|first, second| compare_titles(second, first)),
    }
}

/// Keeps the records whose title or authors contain `query`. Blank queries keep everything.
#[inline]
#[must_use]
pub fn filter_records(records: Vec<BookRecord>, query: &str) -> Vec<BookRecord> {
    if normalize(query).is_empty() {
        return records;
    }
    records
        .into_iter()
        .filter(|record| {
            matches(&record.title, query)
                || record
                    .authors
                    .as_deref()
                    .is_some_and(|authors| matches(authors, query))
        })
        .collect()
}

fn normalize(text: &str) -> String {
    text.chars()
        .filter(|character| character.is_alphanumeric())
        .collect::<String>()
        .to_lowercase()
}

/// Case-insensitive containment check that ignores punctuation and whitespace
#[inline]
#[must_use]
pub fn matches(haystack: &str, needle: &str) -> bool {
    normalize(haystack).contains(&normalize(needle))
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "Tests are predefined and guaranteed to be Some/Ok"
)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn record(book_id: &str, title: &str, authors: Option<&str>, day: u32) -> BookRecord {
        BookRecord::new(
            book_id.to_owned(),
            "alice".to_owned(),
            title.to_owned(),
            authors.map(str::to_owned),
            None,
            NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
        )
    }

    fn ids(records: &[BookRecord]) -> Vec<&str> {
        records.iter().map(|record| record.book_id.as_str()).collect()
    }

    fn library() -> Vec<BookRecord> {
        vec![
            record("a", "Hyperion", Some("Dan Simmons"), 3),
            record("b", "dune", Some("Frank Herbert"), 5),
            record("c", "Neuromancer", Some("William Gibson"), 3),
            record("d", "The Left Hand of Darkness", Some("Ursula K. Le Guin"), 1),
        ]
    }

    #[test]
    fn newest_first_keeps_ties_in_input_order() {
        let mut records = library();
        sort_records(&mut records, SortOrder::NewestFirst);
        assert_eq!(ids(&records), vec!["b", "a", "c", "d"]);

        sort_records(&mut records, SortOrder::OldestFirst);
        assert_eq!(ids(&records), vec!["d", "a", "c", "b"]);
    }

    #[test]
    fn title_orders_are_reverses() {
        let mut ascending = library();
        sort_records(&mut ascending, SortOrder::TitleAsc);
        assert_eq!(ids(&ascending), vec!["b", "a", "c", "d"]);

        let mut descending = library();
        sort_records(&mut descending, SortOrder::TitleDesc);
        ascending.reverse();
        assert_eq!(descending, ascending);
    }

    #[test]
    fn filter_ignores_case_and_punctuation() {
        assert_eq!(ids(&filter_records(library(), "DUNE")), vec!["b"]);
        assert_eq!(ids(&filter_records(library(), "le guin")), vec!["d"]);
        assert_eq!(ids(&filter_records(library(), "ursula k le")), vec!["d"]);
        assert!(filter_records(library(), "Tolkien").is_empty());
    }

    #[test]
    fn blank_filter_keeps_everything() {
        assert_eq!(filter_records(library(), "").len(), 4);
        assert_eq!(filter_records(library(), " .,").len(), 4);
    }

    #[test]
    fn sort_order_names() {
        for order in [
            SortOrder::NewestFirst,
            SortOrder::OldestFirst,
            SortOrder::TitleAsc,
            SortOrder::TitleDesc,
        ] {
            assert_eq!(order.to_string().parse::<SortOrder>().unwrap(), order);
        }
        assert_eq!(SortOrder::default(), SortOrder::NewestFirst);
        assert!("random".parse::<SortOrder>().is_err());
    }
}
