pub mod general;
pub mod league;
pub mod recap;

pub use general::{help, ping};
pub use league::{autopost, configure, debugweek, settings, setup};
pub use recap::weeklyrecap;
