use crate::database::store::{RecordStore, bump_revision};
use crate::database::types::{BookRecord, RecordError};
use core::str::FromStr as _;
use log::info;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::Path;
use tokio::sync::watch;

const SELECT_RECORD: &str = "SELECT
        book_id,
        user_id,
        title,
        authors,
        thumbnail_url,
        impressive_quote,
        motivation,
        thoughts,
        reg_date,
        read_start_date,
        read_end_date
    FROM
        books";

pub struct Db {
    pool: SqlitePool,
    revision: watch::Sender<u64>,
}

impl Db {
    /// Opens (and creates, if necessary) the database file at `path` and applies all pending
    /// migrations.
    /// # Errors
    /// Fails if the file cannot be opened or a migration fails
    #[allow(
        clippy::missing_inline_in_public_items,
        reason = "Called once at start of program"
    )]
    pub async fn init(path: &Path) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::new()
            .create_if_missing(true)
            .filename(path);
        let pool = SqlitePool::connect_with(options).await?;
        sqlx::migrate!().run(&pool).await?;
        info!("Opened record database at {}", path.display());

        Ok(Self::with_pool(pool))
    }

    /// Opens a private in-memory database. The pool is limited to a single connection that is
    /// never recycled, as every SQLite connection would otherwise see its own empty database.
    /// # Errors
    /// Fails if the connection cannot be established or a migration fails
    #[allow(clippy::missing_inline_in_public_items, reason = "Called rarely")]
    pub async fn init_in_memory() -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        sqlx::migrate!().run(&pool).await?;

        Ok(Self::with_pool(pool))
    }

    fn with_pool(pool: SqlitePool) -> Self {
        let (revision, _) = watch::channel(0);
        Self { pool, revision }
    }

    #[allow(
        clippy::missing_inline_in_public_items,
        reason = "Called once at end of program"
    )]
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait::async_trait]
impl RecordStore for Db {
    async fn list_records(&self, user_id: &str) -> Result<Vec<BookRecord>, RecordError> {
        let records: Vec<BookRecord> = sqlx::query_as(&format!(
            "{SELECT_RECORD}
            WHERE
                user_id = ?
            ORDER BY
                reg_date DESC,
                rowid ASC;"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    async fn get_by_id(
        &self,
        book_id: &str,
        user_id: &str,
    ) -> Result<Option<BookRecord>, RecordError> {
        let record: Option<BookRecord> = sqlx::query_as(&format!(
            "{SELECT_RECORD}
            WHERE
                book_id = ?
                AND user_id = ?;"
        ))
        .bind(book_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn insert(&self, record: &BookRecord) -> Result<(), RecordError> {
        sqlx::query(
            r"
            INSERT INTO books (
                book_id,
                user_id,
                title,
                authors,
                thumbnail_url,
                impressive_quote,
                motivation,
                thoughts,
                reg_date,
                read_start_date,
                read_end_date
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(book_id, user_id) DO UPDATE SET
                title = excluded.title,
                authors = excluded.authors,
                thumbnail_url = excluded.thumbnail_url,
                impressive_quote = excluded.impressive_quote,
                motivation = excluded.motivation,
                thoughts = excluded.thoughts,
                reg_date = excluded.reg_date,
                read_start_date = excluded.read_start_date,
                read_end_date = excluded.read_end_date;
        ",
        )
        .bind(&record.book_id)
        .bind(&record.user_id)
        .bind(&record.title)
        .bind(&record.authors)
        .bind(&record.thumbnail_url)
        .bind(&record.impressive_quote)
        .bind(&record.motivation)
        .bind(&record.thoughts)
        .bind(record.reg_date)
        .bind(record.read_start_date)
        .bind(record.read_end_date)
        .execute(&self.pool)
        .await?;

        bump_revision(&self.revision);
        Ok(())
    }

    async fn update(&self, record: &BookRecord) -> Result<(), RecordError> {
        let result = sqlx::query(
            r"
            UPDATE books SET
                title = ?,
                authors = ?,
                thumbnail_url = ?,
                impressive_quote = ?,
                motivation = ?,
                thoughts = ?,
                reg_date = ?,
                read_start_date = ?,
                read_end_date = ?
            WHERE
                book_id = ?
                AND user_id = ?;
        ",
        )
        .bind(&record.title)
        .bind(&record.authors)
        .bind(&record.thumbnail_url)
        .bind(&record.impressive_quote)
        .bind(&record.motivation)
        .bind(&record.thoughts)
        .bind(record.reg_date)
        .bind(record.read_start_date)
        .bind(record.read_end_date)
        .bind(&record.book_id)
        .bind(&record.user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RecordError::NotFound {
                book_id: record.book_id.clone(),
                user_id: record.user_id.clone(),
            });
        }

        bump_revision(&self.revision);
        Ok(())
    }

    async fn delete(&self, record: &BookRecord) -> Result<(), RecordError> {
        sqlx::query("DELETE FROM books WHERE book_id = ? AND user_id = ?;")
            .bind(&record.book_id)
            .bind(&record.user_id)
            .execute(&self.pool)
            .await?;

        bump_revision(&self.revision);
        Ok(())
    }

    fn changes(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }
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

    fn record(book_id: &str, user_id: &str, title: &str, reg_day: u32) -> BookRecord {
        BookRecord::new(
            book_id.to_owned(),
            user_id.to_owned(),
            title.to_owned(),
            Some("Frank Herbert".to_owned()),
            None,
            NaiveDate::from_ymd_opt(2024, 1, reg_day).unwrap(),
        )
    }

    #[tokio::test]
    async fn insert_and_get_by_id() {
        let db = Db::init_in_memory().await.unwrap();
        let mut dune = record("X", "alice", "Dune", 3);
        dune.set_read_period(
            NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 15),
        )
        .unwrap();
        db.insert(&dune).await.unwrap();

        assert_eq!(db.get_by_id("X", "alice").await.unwrap(), Some(dune));
        assert_eq!(db.get_by_id("X", "bob").await.unwrap(), None);
        assert_eq!(db.get_by_id("Y", "alice").await.unwrap(), None);
    }

    #[tokio::test]
    async fn empty_store_lists_nothing() {
        let db = Db::init_in_memory().await.unwrap();
        assert!(db.list_records("alice").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_is_scoped_to_user_and_newest_first() {
        let db = Db::init_in_memory().await.unwrap();
        db.insert(&record("A", "alice", "Emma", 1)).await.unwrap();
        db.insert(&record("B", "alice", "Dune", 5)).await.unwrap();
        db.insert(&record("C", "bob", "Ulysses", 9)).await.unwrap();

        let ids: Vec<String> = db
            .list_records("alice")
            .await
            .unwrap()
            .into_iter()
            .map(|book| book.book_id)
            .collect();
        assert_eq!(ids, vec!["B".to_owned(), "A".to_owned()]);
    }

    #[tokio::test]
    async fn second_insert_replaces_first() {
        let db = Db::init_in_memory().await.unwrap();
        db.insert(&record("X", "alice", "Dune", 1)).await.unwrap();
        db.insert(&record("X", "alice", "Dune Messiah", 2))
            .await
            .unwrap();

        let books = db.list_records("alice").await.unwrap();
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].title, "Dune Messiah");
    }

    #[tokio::test]
    async fn replaced_record_keeps_its_position() {
        let db = Db::init_in_memory().await.unwrap();
        db.insert(&record("A", "alice", "Hyperion", 4)).await.unwrap();
        db.insert(&record("B", "alice", "Neuromancer", 4))
            .await
            .unwrap();
        db.insert(&record("A", "alice", "The Fall of Hyperion", 4))
            .await
            .unwrap();

        let books = db.list_records("alice").await.unwrap();
        let titles: Vec<&str> = books.iter().map(|book| book.title.as_str()).collect();
        assert_eq!(titles, vec!["The Fall of Hyperion", "Neuromancer"]);
    }

    #[tokio::test]
    async fn update_rewrites_annotations() {
        let db = Db::init_in_memory().await.unwrap();
        let mut dune = record("X", "alice", "Dune", 1);
        db.insert(&dune).await.unwrap();

        dune.impressive_quote = Some("Fear is the mind-killer.".to_owned());
        db.update(&dune).await.unwrap();

        let stored = db.get_by_id("X", "alice").await.unwrap().unwrap();
        assert_eq!(
            stored.impressive_quote.as_deref(),
            Some("Fear is the mind-killer.")
        );
    }

    #[tokio::test]
    async fn update_of_missing_record_fails() {
        let db = Db::init_in_memory().await.unwrap();
        let result = db.update(&record("X", "alice", "Dune", 1)).await;
        assert!(matches!(result, Err(RecordError::NotFound { .. })));
    }

    #[tokio::test]
    async fn delete_removes_only_that_users_record() {
        let db = Db::init_in_memory().await.unwrap();
        db.insert(&record("X", "alice", "Dune", 1)).await.unwrap();
        db.insert(&record("X", "bob", "Dune", 1)).await.unwrap();

        db.delete(&record("X", "alice", "Dune", 1)).await.unwrap();
        db.delete(&record("missing", "alice", "Nothing", 1))
            .await
            .unwrap();

        assert!(db.list_records("alice").await.unwrap().is_empty());
        assert_eq!(db.list_records("bob").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn writes_bump_revision() {
        let db = Db::init_in_memory().await.unwrap();
        let changes = db.changes();
        let before = *changes.borrow();
        db.insert(&record("X", "alice", "Dune", 1)).await.unwrap();
        assert_eq!(*changes.borrow(), before + 1);
        assert!(changes.has_changed().unwrap());
    }
}
