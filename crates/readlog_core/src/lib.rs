//! `readlog_core`
//!
//! Core library for the platform-independent logic of readlog. The application shell only wires
//! the collaborators defined here (record store, book search, identity provider) into the
//! per-screen view-state holders and renders their state.

pub mod auth;

pub mod books_api;

pub mod calendar;

pub mod database;

pub mod sorting;

pub mod view_state;
