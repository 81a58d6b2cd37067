//! Hospital listings, professional registrations, and the moderation workflow that decides
//! which registrations reach the public directory.

pub mod config;
pub mod directory;
pub mod error;
pub mod telemetry;
