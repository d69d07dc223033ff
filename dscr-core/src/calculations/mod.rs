//! Calculation modules for the DSCR calculator.
//!
//! [`derivation`] keeps dependent input fields consistent after an edit and
//! [`dscr`] turns a consistent field state into a [`DscrResult`].
//!
//! [`DscrResult`]: crate::models::DscrResult

pub mod common;
pub mod derivation;
pub mod dscr;

pub use derivation::{Recompute, recompute};
pub use dscr::{DscrCalculator, monthly_payment};
