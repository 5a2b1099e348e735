//! Telegram front end of the Clime record store.
//!
//! The binary in `main.rs` wires [`telegram::schema`] to a dispatcher; the
//! offline subcommands live in [`cli`].

pub mod cli;
pub mod telegram;
