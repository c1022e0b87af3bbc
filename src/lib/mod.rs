//! Manga tracking: talking to MangaDex, finding new chapters and announcing them.

pub mod mangadex;
pub mod notify;
pub mod schedule;
pub mod updates;
