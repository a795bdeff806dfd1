use crate::cli::Command;
use crate::errors::Error;
use crate::state::AppState;
use chrono::NaiveDate;
use core::fmt;
use readlog_core::auth::ProviderCredential;
use readlog_core::books_api::types::Volume;
use readlog_core::calendar::month_label;
use readlog_core::database::types::{BookRecord, EditTarget};
use readlog_core::sorting::SortOrder;
use readlog_core::view_state::{
    BookDetailViewState, DeleteStatus, HomeViewState, NOT_SIGNED_IN, ReadingState,
    ReadingViewState, RecordViewState, SaveStatus, SearchViewState,
};
use std::sync::Arc;
use tracing::instrument;

#[allow(
    clippy::print_stdout,
    reason = "The terminal is the user interface of this application"
)]
fn say<T: fmt::Display>(line: T) {
    println!("{line}");
}

/// Runs one parsed command against the application state
pub async fn dispatch(state: &AppState, command: Command) -> Result<(), Error> {
    match command {
        Command::Search { query, show, save } => search(state, &query, show, save).await,
        Command::List { sort, filter } => list(state, sort, filter.as_deref()).await,
        Command::Show { book_id } => show(state, &book_id).await,
        Command::Note {
            book_id,
            target,
            text,
        } => note(state, &book_id, target, &text).await,
        Command::Period {
            book_id,
            start,
            end,
            clear,
        } => period(state, &book_id, start, end, clear).await,
        Command::Delete { book_id } => delete(state, &book_id).await,
        Command::Calendar { month } => calendar(state, month).await,
        Command::SignIn {
            id_token,
            access_token,
        } => {
            let credential = match (id_token, access_token) {
                (Some(token), _) => ProviderCredential::GoogleIdToken(token),
                (None, Some(token)) => ProviderCredential::GoogleAccessToken(token),
                (None, None) => {
                    return Err(Error::Other("A Google credential is required".to_owned()));
                }
            };
            sign_in(state, &credential).await
        }
        Command::SignOut => sign_out(state).await,
        Command::Whoami => {
            whoami(state);
            Ok(())
        }
    }
}

#[instrument(name = "cmd.search", skip(state))]
async fn search(
    state: &AppState,
    query: &str,
    show: Option<usize>,
    save: Option<usize>,
) -> Result<(), Error> {
    let view = SearchViewState::new(Arc::clone(&state.search));
    view.search(query).await;
    let results = view.state().results;
    if results.is_empty() {
        say(format!("No books found for '{query}'"));
        return Ok(());
    }
    for (index, volume) in results.iter().enumerate() {
        say(render_volume(index.saturating_add(1), volume));
    }

    if let Some(position) = show {
        match result_at(&results, position) {
            Some(volume) => say(render_volume_detail(volume)),
            None => say(format!("There is no result number {position}")),
        }
    }

    let Some(position) = save else {
        return Ok(());
    };
    let Some(volume) = result_at(&results, position) else {
        say(format!("There is no result number {position}"));
        return Ok(());
    };
    let detail = BookDetailViewState::new(state.store(), Arc::clone(&state.session));
    detail.save(volume).await;
    match detail.state().save_status {
        Some(SaveStatus::Success) => say(format!("Saved '{}'", volume.volume_info.title)),
        Some(SaveStatus::Error(message)) => say(message),
        None | Some(_) => {}
    }
    detail.clear_save_status();
    Ok(())
}

#[instrument(name = "cmd.list", skip(state))]
async fn list(state: &AppState, sort: SortOrder, filter: Option<&str>) -> Result<(), Error> {
    if state.session.current_user_id().is_none() {
        say(NOT_SIGNED_IN);
        return Ok(());
    }
    let view = HomeViewState::new(state.store(), Arc::clone(&state.session));
    view.set_sort_order(sort);
    if let Some(filter) = filter {
        view.set_filter(filter);
    }
    view.load().await;

    let home = view.state();
    if let Some(error) = home.error {
        say(error);
    } else if home.books.is_empty() {
        say("No books in your list");
    } else {
        for book in &home.books {
            say(render_book_line(book));
        }
    }
    Ok(())
}

#[instrument(name = "cmd.show", skip(state))]
async fn show(state: &AppState, book_id: &str) -> Result<(), Error> {
    let view = RecordViewState::new(state.store(), Arc::clone(&state.session));
    view.load(book_id).await;
    let record = view.state();
    match (record.record, record.status) {
        (Some(book), _) => say(render_record(&book)),
        (None, Some(status)) => say(status),
        (None, None) => {}
    }
    Ok(())
}

#[instrument(name = "cmd.note", skip(state, text))]
async fn note(
    state: &AppState,
    book_id: &str,
    target: EditTarget,
    text: &str,
) -> Result<(), Error> {
    let view = RecordViewState::new(state.store(), Arc::clone(&state.session));
    if !load_record(&view, book_id).await {
        return Ok(());
    }
    view.edit_text(target, text).await;
    report_edit(&view, &format!("Updated {target}"));
    Ok(())
}

#[instrument(name = "cmd.period", skip(state))]
async fn period(
    state: &AppState,
    book_id: &str,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    clear: bool,
) -> Result<(), Error> {
    let view = RecordViewState::new(state.store(), Arc::clone(&state.session));
    if !load_record(&view, book_id).await {
        return Ok(());
    }
    match (clear, start) {
        (true, _) => {
            view.clear_read_period().await;
            report_edit(&view, "Cleared reading period");
        }
        (false, Some(start)) => {
            view.set_read_period(start, end).await;
            report_edit(&view, "Updated reading period");
        }
        (false, None) => say("Either a start date or --clear is required"),
    }
    Ok(())
}

/// Loads the record to edit, printing the reason if there is none
async fn load_record(view: &RecordViewState, book_id: &str) -> bool {
    view.load(book_id).await;
    let record = view.state();
    if record.record.is_none() {
        say(record.status.unwrap_or_else(|| format!("Book {book_id} is not in your list")));
        return false;
    }
    true
}

/// Prints the status of a failed edit, or `success` followed by the stored record
fn report_edit(view: &RecordViewState, success: &str) {
    let record = view.state();
    match (record.status, record.record) {
        (Some(status), _) => say(status),
        (None, Some(book)) => {
            say(success);
            say(render_record(&book));
        }
        (None, None) => {}
    }
}

#[instrument(name = "cmd.delete", skip(state))]
async fn delete(state: &AppState, book_id: &str) -> Result<(), Error> {
    let view = HomeViewState::new(state.store(), Arc::clone(&state.session));
    view.load().await;
    let home = view.state();
    if let Some(error) = home.error {
        say(error);
        return Ok(());
    }
    let Some(book) = home.books.into_iter().find(|book| book.book_id == book_id) else {
        say(format!("Book {book_id} is not in your list"));
        return Ok(());
    };

    view.delete(&book).await;
    match view.state().delete_status {
        Some(DeleteStatus::Success) => say(format!("Deleted '{}'", book.title)),
        Some(DeleteStatus::Error(message)) => say(message),
        None | Some(_) => {}
    }
    view.clear_delete_status();
    Ok(())
}

#[instrument(name = "cmd.calendar", skip(state))]
async fn calendar(state: &AppState, month: Option<NaiveDate>) -> Result<(), Error> {
    let view = ReadingViewState::new(state.store(), Arc::clone(&state.session));
    if let Some(month) = month {
        view.set_current_date(month);
    }
    view.load().await;
    let reading = view.state();
    if let Some(error) = reading.error.as_deref() {
        say(error);
    }
    say(render_calendar(&reading));
    Ok(())
}

#[instrument(name = "cmd.sign_in", skip_all)]
async fn sign_in(state: &AppState, credential: &ProviderCredential) -> Result<(), Error> {
    if let Some(user_id) = state.session.sign_in(credential).await {
        state.persist_session()?;
        say(format!("Signed in as {user_id}"));
    } else if let Some(error) = state.session.state().error {
        say(error);
    }
    Ok(())
}

#[instrument(name = "cmd.sign_out", skip_all)]
async fn sign_out(state: &AppState) -> Result<(), Error> {
    state.session.sign_out().await;
    if let Some(error) = state.session.state().error {
        say(error);
        return Ok(());
    }
    state.persist_session()?;
    say("Signed out");
    Ok(())
}

fn whoami(state: &AppState) {
    let Some(user) = state.session.current_user() else {
        say(NOT_SIGNED_IN);
        return;
    };
    let mut parts = vec![user.user_id];
    parts.extend(user.display_name.map(|name| format!("({name})")));
    parts.extend(user.email.map(|email| format!("<{email}>")));
    say(parts.join(" "));
}

fn render_volume(position: usize, volume: &Volume) -> String {
    let authors = volume
        .authors_display()
        .unwrap_or_else(|| "unknown author".to_owned());
    format!(
        "{position:>2}. {} / {authors} [{}]",
        volume.volume_info.title, volume.id
    )
}

/// Looks up a result by its 1-based position
fn result_at(results: &[Volume], position: usize) -> Option<&Volume> {
    position.checked_sub(1).and_then(|index| results.get(index))
}

/// Everything the catalog knows about a volume, one field per line. Missing fields are left out.
fn render_volume_detail(volume: &Volume) -> String {
    let info = &volume.volume_info;
    let mut lines = vec![format!("{} [{}]", info.title, volume.id)];
    let mut field = |label: &str, value: Option<String>| {
        if let Some(value) = value {
            lines.push(format!("  {label:<11} {value}"));
        }
    };

    field("authors:", volume.authors_display());
    field("publisher:", info.publisher.clone());
    field("published:", info.published_date.clone());
    field("isbn:", volume.isbn().map(str::to_owned));
    field("pages:", info.page_count.map(|pages| pages.to_string()));
    field("print type:", info.print_type.clone());
    field(
        "categories:",
        info.categories
            .as_ref()
            .filter(|categories| !categories.is_empty())
            .map(|categories| categories.join(", ")),
    );
    field(
        "rating:",
        info.average_rating.map(|rating| match info.ratings_count {
            Some(count) => format!("{rating:.1} ({count} ratings)"),
            None => format!("{rating:.1}"),
        }),
    );
    field("language:", info.language.clone());
    if let Some(sale) = volume.sale_info.as_ref() {
        field(
            "format:",
            Some(if sale.is_ebook { "ebook" } else { "print" }.to_owned()),
        );
        field("sale:", sale.saleability.clone());
        field(
            "price:",
            sale.list_price.as_ref().and_then(|price| {
                price.amount.map(|amount| match price.currency_code.as_deref() {
                    Some(currency) => format!("{amount:.2} {currency}"),
                    None => format!("{amount:.2}"),
                })
            }),
        );
        field("buy:", sale.buy_link.clone());
    }
    field("cover:", volume.secure_thumbnail());
    field("about:", info.description.clone());
    lines.join("\n")
}

fn render_book_line(book: &BookRecord) -> String {
    let authors = book.authors.as_deref().unwrap_or("unknown author");
    format!(
        "{}  {} / {authors} [{}]",
        book.reg_date, book.title, book.book_id
    )
}

fn render_record(book: &BookRecord) -> String {
    let field = |value: Option<&str>| value.unwrap_or("-").to_owned();
    let period = match (book.read_start_date, book.read_end_date) {
        (Some(start), Some(end)) => format!("{start} to {end}"),
        (Some(start), None) => format!("since {start}"),
        _ => "-".to_owned(),
    };
    [
        format!("{} [{}]", book.title, book.book_id),
        format!("  authors:    {}", field(book.authors.as_deref())),
        format!("  registered: {}", book.reg_date),
        format!("  read:       {period}"),
        format!("  quote:      {}", field(book.impressive_quote.as_deref())),
        format!("  motivation: {}", field(book.motivation.as_deref())),
        format!("  thoughts:   {}", field(book.thoughts.as_deref())),
    ]
    .join("\n")
}

/// Six week rows under the month heading. Days of other months are parenthesized, days inside a
/// reading period carry a `*`.
fn render_calendar(reading: &ReadingState) -> String {
    let mut output = format!("{}\n Su  Mo  Tu  We  Th  Fr  Sa", month_label(reading.current_date));
    for week in reading.calendar_days.chunks(7) {
        output.push('\n');
        let row: Vec<String> = week
            .iter()
            .map(|day| {
                if day.is_current_month {
                    format!(" {:>2}{}", day.day, if day.has_reading { '*' } else { ' ' })
                } else {
                    format!("({:>2})", day.day)
                }
            })
            .collect();
        output.push_str(row.join("").trim_end());
    }
    output
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "Tests are predefined and guaranteed to be Some/Ok"
)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use readlog_core::auth::Session;
    use readlog_core::database::{InMemoryRecordStore, RecordStore as _};

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn dune() -> BookRecord {
        BookRecord::new(
            "X".to_owned(),
            "alice".to_owned(),
            "Dune".to_owned(),
            Some("Frank Herbert".to_owned()),
            None,
            date(2024, 1, 2),
        )
    }

    #[test]
    fn record_rendering_shows_empty_fields_as_dash() {
        let mut book = dune();
        book.apply_text(EditTarget::Thoughts, "Dense but rewarding");
        book.set_read_period(date(2024, 1, 10), None).unwrap();
        assert_eq!(
            render_record(&book),
            "Dune [X]\n  authors:    Frank Herbert\n  registered: 2024-01-02\n  read:       since 2024-01-10\n  quote:      -\n  motivation: -\n  thoughts:   Dense but rewarding"
        );
        assert_eq!(
            render_book_line(&book),
            "2024-01-02  Dune / Frank Herbert [X]"
        );
    }

    #[test]
    fn volume_rendering() {
        let volume = Volume::new("abc".to_owned(), "Solaris".to_owned());
        assert_eq!(
            render_volume(3, &volume),
            " 3. Solaris / unknown author [abc]"
        );
    }

    #[test]
    fn volume_detail_rendering() {
        let volumes = readlog_core::books_api::types::parse_volumes(
            r#"{"items": [{
                "id": "B1hSG45JCX4C",
                "volumeInfo": {
                    "title": "Dune",
                    "authors": ["Frank Herbert"],
                    "pageCount": 528,
                    "printType": "BOOK",
                    "categories": ["Fiction", "Science Fiction"],
                    "averageRating": 4.5,
                    "ratingsCount": 87,
                    "industryIdentifiers": [{"type": "ISBN_13", "identifier": "9780441013593"}]
                },
                "saleInfo": {
                    "saleability": "FOR_SALE",
                    "isEbook": true,
                    "listPrice": {"amount": 1200.0, "currencyCode": "JPY"},
                    "buyLink": "https://play.google.com/store/books/details?id=B1hSG45JCX4C"
                }
            }]}"#,
        )
        .unwrap();
        assert_eq!(
            render_volume_detail(&volumes[0]),
            [
                "Dune [B1hSG45JCX4C]",
                "  authors:    Frank Herbert",
                "  isbn:       9780441013593",
                "  pages:      528",
                "  print type: BOOK",
                "  categories: Fiction, Science Fiction",
                "  rating:     4.5 (87 ratings)",
                "  format:     ebook",
                "  sale:       FOR_SALE",
                "  price:      1200.00 JPY",
                "  buy:        https://play.google.com/store/books/details?id=B1hSG45JCX4C",
            ]
            .join("\n")
        );

        let bare = Volume::new("abc".to_owned(), "Solaris".to_owned());
        assert_eq!(render_volume_detail(&bare), "Solaris [abc]");
        assert_eq!(result_at(&volumes, 1).map(|volume| volume.id.as_str()), Some("B1hSG45JCX4C"));
        assert!(result_at(&volumes, 0).is_none());
        assert!(result_at(&volumes, 2).is_none());
    }

    #[tokio::test]
    async fn calendar_rendering_marks_reading_days() {
        let store = Arc::new(InMemoryRecordStore::default());
        let mut book = dune();
        book.set_read_period(date(2024, 9, 2), Some(date(2024, 9, 3)))
            .unwrap();
        store.insert(&book).await.unwrap();

        let provider = readlog_core::auth::FirebaseIdentityProvider::new(None)
            .unwrap()
            .with_user(Some(readlog_core::auth::SignedInUser::new(
                "alice".to_owned(),
                None,
                None,
            )));
        let session = Arc::new(Session::new(Arc::new(provider)));
        let view = ReadingViewState::starting_at(store, session, date(2024, 9, 14));
        view.load().await;

        let rendered = render_calendar(&view.state());
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 8);
        assert_eq!(lines[0], "2024/09");
        assert_eq!(lines[2], "(25)(26)(27)(28)(29)(30)(31)");
        assert_eq!(lines[3], "  1   2*  3*  4   5   6   7");
    }
}
