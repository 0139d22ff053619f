//! Discord edge: embeds, components, permission checks and the live
//! navigator binding. Nothing below this module knows about Discord
//! message builders.

pub mod permissions;
pub mod render;
pub mod session;
pub mod sink;

pub use permissions::run_startup_permission_check;
pub use sink::DiscordSink;
