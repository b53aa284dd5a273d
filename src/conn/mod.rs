//! conn — соединение с набором БД и key management surface.
//!
//! Разделение по подмодулям:
//! - core.rs — Connection (connection-мьютекс, список БД, фабрика кодеков,
//!   last_error) + attach/detach БД и страничные passthrough-хелперы.
//! - keys.rs — set_key / change_key / get_key и attachment-протокол.

pub mod core;
pub mod keys;

pub use core::Connection;
