//! Book search
//!
//! Client for the Google Books volume search together with the wire types of its response. The
//! `BookSearch` trait is the boundary the view-state holders depend on.
pub mod client;
pub mod errors;
pub mod types;

pub use client::{BookSearch, GoogleBooksClient, GoogleBooksConfig};
pub use errors::BooksApiError;
