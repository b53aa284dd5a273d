//! codec — pluggable page transform, вызываемый pager'ом на каждом page I/O.
//!
//! Разделение:
//! - mod.rs    — трейт PageCodec (dynamic-dispatch seam), CodecOp, CodecContext,
//!               CodecFactory (конструктор кодека при подаче ключа).
//! - aes_gcm.rs — конкретное семейство: AES-256-GCM, trailer = nonce(12) || tag(16).
//!
//! Контракт (на него опирается pager):
//! - encode/decode тотальны по всем page_no >= 1; внутренний сбой — только
//!   через Result, никогда молчаливой порчей данных.
//! - CodecOp::SizeProbe — единственная операция, где буфер обязан пройти
//!   насквозь без изменений (format-detection probe).
//! - resize вызывается до любого transform на новой геометрии страницы.
//! - Освобождение кодека — Drop; ключевой материал обнуляется ровно один раз.

use anyhow::Result;
use std::path::PathBuf;

pub mod aes_gcm;

/// Операция, в рамках которой pager зовёт кодек.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CodecOp {
    /// Декодирование страницы, прочитанной с диска.
    Read,
    /// Кодирование страницы перед записью в основной файл.
    Write,
    /// Кодирование страницы перед записью в journal. Встроенный pager-хост
    /// journal не ведёт и эмитит только Read/Write/SizeProbe; вариант — для
    /// embedder'ов с собственным journal-путём, кодеки обязаны его принимать.
    WriteJournal,
    /// Проба формата/размера страницы: байты проходят насквозь.
    SizeProbe,
}

/// Контекст, с которым конструируется кодек (снимок состояния pager'а
/// на момент подачи ключа).
#[derive(Clone, Debug)]
pub struct CodecContext {
    /// Путь к backing file базы.
    pub file: PathBuf,
    /// Логическое имя БД внутри соединения ("main", имя attach'а).
    pub name: String,
    /// Текущий размер страницы.
    pub page_size: usize,
    /// Текущее число зарезервированных байт в хвосте страницы.
    pub reserve: usize,
}

/// Транформер страниц, привязанный к одной БД внутри одного соединения.
///
/// Не шарится между соединениями; pager зовёт его только из потока,
/// уже сериализованного connection-мьютексом.
pub trait PageCodec: Send {
    /// Сколько байт кодек требует резервировать в хвосте каждой страницы.
    /// Отрицательное значение — «оставить текущее» (см. consts::KEEP_RESERVE).
    fn reserve(&self) -> i32;

    /// Смена геометрии страниц. Вызывается при регистрации кодека и при
    /// каждом изменении page_size/reserve — до следующего transform.
    /// Сбой здесь не возвращается: он всплывёт на следующем encode/decode.
    fn resize(&mut self, page_size: usize, reserve: usize);

    /// Закодировать страницу перед записью. Возвращает либо внутренний
    /// reuse-буфер той же длины, либо входной срез без изменений
    /// (обязателен для CodecOp::SizeProbe). Вход не модифицируется.
    fn encode<'a>(&'a mut self, page: &'a [u8], page_no: u32, op: CodecOp) -> Result<&'a [u8]>;

    /// Декодировать страницу in-place после чтения с диска.
    fn decode(&mut self, page: &mut [u8], page_no: u32, op: CodecOp) -> Result<()>;

    /// Исходный ключ, которым кодек был инициализирован (интроспекция).
    /// Владение не передаётся.
    fn key(&self) -> &[u8];
}

/// Конструктор кодека: вызывается attachment-протоколом, когда для БД
/// подан ключ.
///
/// - Ok(None) — «шифрование не требуется» (например, пустой ключ);
///   это не ошибка, кодек не регистрируется.
/// - Err(_) — инициализация не удалась; частично построенное состояние
///   разрушается Drop'ом ровно один раз, attach прерывается.
pub trait CodecFactory: Send + Sync {
    fn make(&self, ctx: &CodecContext, key: &[u8]) -> Result<Option<Box<dyn PageCodec>>>;
}
