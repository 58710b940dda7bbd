//! Non-Compartmental Analysis (NCA) of concentration-time data
//!
//! # Key Parameters
//!
//! | Parameter | Description |
//! |-----------|-------------|
//! | Slope | Terminal rate constant from the best log-linear trailing window |
//! | Lambda points | Number of points in that window |
//! | AUC0-last | Linear trapezoidal area over all valid points |
//! | AUClast-∞ | `C_last / |slope|` |
//! | AUC0-∞ | `AUC0-last + AUClast-∞` |
//! | t½ | `ln(2) / |slope|` |
//! | CL | `Dose / AUC0-∞` |
//!
//! # Terminal phase
//!
//! See [`terminal`]: every trailing window of at least `min_points` points is
//! fitted on `ln(C + ε)` and the window with the maximum R² is kept. Ties go
//! to the smallest window.
//!
//! # Usage
//!
//! ```rust,ignore
//! use pkpd::prelude::*;
//!
//! let table = pkpd::data::parser::read_observations("subjects.csv")?;
//! let output = nca(&table, &NcaOptions::default());
//! for row in &output.results {
//!     println!("{}: t½ = {:.2} h", row.id, row.half_life);
//! }
//! for excluded in &output.unqualified {
//!     println!("{} skipped: {}", excluded.id, excluded.reason);
//! }
//! ```

mod analyze;
pub mod terminal;
mod types;

pub use analyze::{nca, nca_subject};
pub use terminal::{select_terminal_window, TerminalWindow};
pub use types::{NcaOptions, NcaResult};
