//! Recap pages built from normalized league records.
//!
//! Everything in here is a pure transformation; fetching happens in
//! [`crate::managers::recap_service`].

pub mod builder;
pub mod card;
pub mod precision;

pub use builder::{build_week_page, RecapOptions};
pub use card::{Card, Page};
pub use precision::{LeagueKey, PrecisionCache};
