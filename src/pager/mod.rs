//! pager — минимальный хост страничного I/O, в который встраивается кодек.
//!
//! Разделение по подмодулям:
//! - core.rs — структура Pager, open()/in_memory(), геометрия
//!   (page_size/reserve/set_page_size) и регистрация кодека.
//! - io.rs   — read_page / write_page / probe_page с прозрачным
//!   encode-on-write / decode-on-read через зарегистрированный кодек.
//!
//! Контракт (см. conn::keys — attachment protocol):
//! - reserve меняется только через set_page_size до появления страниц;
//! - кодек регистрируется уже под итоговую геометрию (resize вызывается
//!   до первого transform);
//! - кодек освобождается ровно один раз (Drop при замене/закрытии).

pub mod core;
pub mod io;

pub use core::Pager;
