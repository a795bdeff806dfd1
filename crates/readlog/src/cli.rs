use chrono::NaiveDate;
use clap::{ArgGroup, Parser, Subcommand};
use readlog_core::database::types::EditTarget;
use readlog_core::sorting::SortOrder;

#[derive(Debug, Parser)]
#[command(name = "readlog", version, about = "Keep a record of the books you read")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, PartialEq, Eq)]
pub enum Command {
    /// Search the catalog, optionally saving one of the results to your list
    Search {
        query: String,
        /// Position of the result to show in full, starting at 1
        #[arg(long)]
        show: Option<usize>,
        /// Position of the result to save, starting at 1
        #[arg(long)]
        save: Option<usize>,
    },
    /// List your saved books
    List {
        /// newest, oldest, title-asc or title-desc
        #[arg(long, default_value_t = SortOrder::NewestFirst)]
        sort: SortOrder,
        /// Only show books whose title or authors contain this text
        #[arg(long)]
        filter: Option<String>,
    },
    /// Show the record of a saved book
    Show { book_id: String },
    /// Set the quote, motivation or thoughts of a saved book, empty text clears it
    Note {
        book_id: String,
        #[arg(value_name = "quote|motivation|thoughts")]
        target: EditTarget,
        text: String,
    },
    /// Set or clear the reading period of a saved book
    Period {
        book_id: String,
        #[arg(long, required_unless_present = "clear")]
        start: Option<NaiveDate>,
        #[arg(long, requires = "start")]
        end: Option<NaiveDate>,
        #[arg(long, conflicts_with_all = ["start", "end"])]
        clear: bool,
    },
    /// Remove a book from your list
    Delete { book_id: String },
    /// Show the reading calendar of a month
    Calendar {
        /// Month to show as YYYY-MM, defaults to the current month
        #[arg(long, value_parser = parse_month)]
        month: Option<NaiveDate>,
    },
    /// Sign in with a Google credential
    #[command(group(
        ArgGroup::new("credential")
            .required(true)
            .args(["id_token", "access_token"])
    ))]
    SignIn {
        #[arg(long)]
        id_token: Option<String>,
        #[arg(long)]
        access_token: Option<String>,
    },
    SignOut,
    /// Show the signed-in user
    Whoami,
}

/// Parses `YYYY-MM` into the first day of that month
fn parse_month(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(&format!("{value}-01"), "%Y-%m-%d")
        .map_err(|err| format!("expected a month as YYYY-MM: {err}"))
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "Tests are predefined and guaranteed to be Some/Ok"
)]
mod tests {
    use super::*;
    use clap::CommandFactory as _;
    use pretty_assertions::assert_eq;

    fn parse(args: &[&str]) -> Result<Command, clap::Error> {
        Cli::try_parse_from(core::iter::once("readlog").chain(args.iter().copied()))
            .map(|cli| cli.command)
    }

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn search_can_show_and_save_results() {
        assert_eq!(
            parse(&["search", "Dune", "--show", "2", "--save", "1"]).unwrap(),
            Command::Search {
                query: "Dune".to_owned(),
                show: Some(2),
                save: Some(1)
            }
        );
        assert!(parse(&["search", "Dune", "--show", "first"]).is_err());
    }

    #[test]
    fn list_defaults_to_newest_first() {
        assert_eq!(
            parse(&["list"]).unwrap(),
            Command::List {
                sort: SortOrder::NewestFirst,
                filter: None
            }
        );
        assert_eq!(
            parse(&["list", "--sort", "title-desc", "--filter", "dune"]).unwrap(),
            Command::List {
                sort: SortOrder::TitleDesc,
                filter: Some("dune".to_owned())
            }
        );
    }

    #[test]
    fn note_accepts_trigger_alias() {
        assert_eq!(
            parse(&["note", "X", "trigger", "A friend recommended it"]).unwrap(),
            Command::Note {
                book_id: "X".to_owned(),
                target: EditTarget::Motivation,
                text: "A friend recommended it".to_owned()
            }
        );
        assert!(parse(&["note", "X", "title", "Dune"]).is_err());
    }

    #[test]
    fn period_needs_start_or_clear() {
        assert_eq!(
            parse(&["period", "X", "--start", "2024-01-10", "--end", "2024-01-15"]).unwrap(),
            Command::Period {
                book_id: "X".to_owned(),
                start: NaiveDate::from_ymd_opt(2024, 1, 10),
                end: NaiveDate::from_ymd_opt(2024, 1, 15),
                clear: false
            }
        );
        assert!(parse(&["period", "X"]).is_err());
        assert!(parse(&["period", "X", "--end", "2024-01-15"]).is_err());
        assert!(parse(&["period", "X", "--clear", "--start", "2024-01-10"]).is_err());
        assert!(parse(&["period", "X", "--clear"]).is_ok());
    }

    #[test]
    fn calendar_month_parsing() {
        assert_eq!(
            parse(&["calendar", "--month", "2024-02"]).unwrap(),
            Command::Calendar {
                month: NaiveDate::from_ymd_opt(2024, 2, 1)
            }
        );
        assert!(parse(&["calendar", "--month", "2024-13"]).is_err());
    }

    #[test]
    fn sign_in_takes_exactly_one_credential() {
        assert_eq!(
            parse(&["sign-in", "--id-token", "abc"]).unwrap(),
            Command::SignIn {
                id_token: Some("abc".to_owned()),
                access_token: None
            }
        );
        assert!(parse(&["sign-in"]).is_err());
        assert!(parse(&["sign-in", "--id-token", "a", "--access-token", "b"]).is_err());
    }
}
