#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Shared utilities for sassbase.
//!
//! Pure filesystem helpers with no logging dependencies; the CLI crate owns
//! logging so this crate stays small.

pub mod fs;
