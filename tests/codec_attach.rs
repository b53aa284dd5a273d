use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;

use PageSeal::{CodecContext, CodecFactory, CodecOp, Connection, PageCodec, SealConfig};

/// Тестовый XOR-кодек, запрашивающий reserve=32 (негативно для крипто,
/// достаточно для проверки attachment-протокола).
struct XorCodec {
    key: Vec<u8>,
    buf: Vec<u8>,
    page_size: usize,
    reserve: usize,
}

impl PageCodec for XorCodec {
    fn reserve(&self) -> i32 {
        32
    }

    fn resize(&mut self, page_size: usize, reserve: usize) {
        self.page_size = page_size;
        self.reserve = reserve;
        self.buf.resize(page_size, 0);
    }

    fn encode<'a>(&'a mut self, page: &'a [u8], _page_no: u32, op: CodecOp) -> Result<&'a [u8]> {
        if op == CodecOp::SizeProbe {
            return Ok(page);
        }
        self.buf.copy_from_slice(page);
        let body = self.page_size - self.reserve;
        for i in 0..body {
            self.buf[i] ^= self.key[i % self.key.len()];
        }
        Ok(&self.buf[..])
    }

    fn decode(&mut self, page: &mut [u8], _page_no: u32, op: CodecOp) -> Result<()> {
        if op == CodecOp::SizeProbe {
            return Ok(());
        }
        let body = self.page_size - self.reserve;
        for i in 0..body {
            page[i] ^= self.key[i % self.key.len()];
        }
        Ok(())
    }

    fn key(&self) -> &[u8] {
        &self.key
    }
}

struct XorFactory;

impl CodecFactory for XorFactory {
    fn make(&self, ctx: &CodecContext, key: &[u8]) -> Result<Option<Box<dyn PageCodec>>> {
        if key.is_empty() {
            return Ok(None);
        }
        Ok(Some(Box::new(XorCodec {
            key: key.to_vec(),
            buf: vec![0u8; ctx.page_size],
            page_size: ctx.page_size,
            reserve: ctx.reserve,
        })))
    }
}

/// Свежая файловая БД без ключа, кодек просит reserve=32 при текущем 0:
/// attach успешен, reserve согласован, page_size не изменился.
#[test]
fn attach_negotiates_reserve_on_fresh_db() -> Result<()> {
    init_logs();
    let path = unique_path("attach-fresh");
    let conn = Connection::open(&path, SealConfig::default())?;
    conn.set_codec_factory(Arc::new(XorFactory))?;

    assert_eq!(conn.reserve_bytes(None)?, 0);
    conn.set_key(None, b"secret")?;

    assert!(conn.has_codec(None)?);
    assert_eq!(conn.reserve_bytes(None)?, 32);
    assert_eq!(conn.page_size(None)?, 4096);
    assert_eq!(conn.usable_size(None)?, 4096 - 32);
    assert!(conn.last_error().is_none());
    Ok(())
}

/// Memory-resident БД: set_key успешен, но кодек не регистрируется и
/// геометрия не трогается.
#[test]
fn memory_database_is_a_noop() -> Result<()> {
    init_logs();
    let conn = Connection::open_in_memory(SealConfig::default())?;
    conn.set_codec_factory(Arc::new(XorFactory))?;

    // main открыт как ":memory:"
    conn.set_key(None, b"secret")?;
    assert!(!conn.has_codec(None)?);
    assert_eq!(conn.reserve_bytes(None)?, 0);

    // Присоединённая in-memory БД (в том числе под буквальным именем ":memory:")
    conn.attach_in_memory(":memory:")?;
    conn.set_key(Some(":memory:"), b"secret")?;
    assert!(!conn.has_codec(Some(":memory:"))?);
    Ok(())
}

/// Неизвестное имя БД: ошибка с сообщением, кодек не строится.
#[test]
fn unknown_database_name_is_an_error() -> Result<()> {
    init_logs();
    let path = unique_path("attach-unknown");
    let conn = Connection::open(&path, SealConfig::default())?;
    conn.set_codec_factory(Arc::new(XorFactory))?;

    let err = conn.set_key(Some("nonexistent"), b"k").unwrap_err();
    assert!(
        err.to_string().contains("unknown database nonexistent"),
        "unexpected error: {}",
        err
    );
    assert!(conn
        .last_error()
        .unwrap()
        .contains("unknown database nonexistent"));
    assert!(!conn.has_codec(None)?);
    Ok(())
}

/// Пустой ключ — сентинел «без шифрования»: успех, кодек не привязан.
#[test]
fn empty_key_attaches_nothing() -> Result<()> {
    init_logs();
    let path = unique_path("attach-empty-key");
    let conn = Connection::open(&path, SealConfig::default())?;
    conn.set_codec_factory(Arc::new(XorFactory))?;

    conn.set_key(None, b"")?;
    assert!(!conn.has_codec(None)?);
    assert_eq!(conn.reserve_bytes(None)?, 0);
    Ok(())
}

/// Без зарегистрированной фабрики set_key — успех без кодека.
#[test]
fn without_factory_nothing_is_attached() -> Result<()> {
    init_logs();
    let path = unique_path("attach-no-factory");
    let conn = Connection::open(&path, SealConfig::default())?;
    conn.set_key(None, b"secret")?;
    assert!(!conn.has_codec(None)?);
    Ok(())
}

/// Повторный set_key — свежий attach: кодек заменяется, get_key отдаёт
/// новый ключ.
#[test]
fn second_set_key_replaces_codec() -> Result<()> {
    init_logs();
    let path = unique_path("attach-replace");
    let conn = Connection::open(&path, SealConfig::default())?;
    conn.set_codec_factory(Arc::new(XorFactory))?;

    conn.set_key(None, b"first")?;
    assert_eq!(conn.get_key(None)?.unwrap().as_slice(), b"first");

    conn.set_key(None, b"second")?;
    assert_eq!(conn.get_key(None)?.unwrap().as_slice(), b"second");
    Ok(())
}

/// detach БД освобождает её кодек вместе с pager'ом; имя перестаёт
/// разрешаться.
#[test]
fn detach_drops_codec_with_database() -> Result<()> {
    init_logs();
    let path_main = unique_path("attach-detach-main");
    let path_aux = unique_path("attach-detach-aux");
    let conn = Connection::open(&path_main, SealConfig::default())?;
    conn.set_codec_factory(Arc::new(XorFactory))?;

    conn.attach_database("aux", &path_aux)?;
    conn.set_key(Some("aux"), b"aux-key")?;
    assert!(conn.has_codec(Some("aux"))?);

    conn.detach_database("aux")?;
    let err = conn.set_key(Some("aux"), b"aux-key").unwrap_err();
    assert!(err.to_string().contains("unknown database aux"));
    Ok(())
}

/// get_key без кодека — None.
#[test]
fn get_key_without_codec_is_none() -> Result<()> {
    init_logs();
    let path = unique_path("attach-get-key-none");
    let conn = Connection::open(&path, SealConfig::default())?;
    assert!(conn.get_key(None)?.is_none());
    Ok(())
}

// ---------- helpers ----------

/// Логи в тестах: env_logger в test-режиме (RUST_LOG=debug чтобы видеть
/// attach/геометрию). Повторный вызов — no-op.
fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn unique_path(prefix: &str) -> PathBuf {
    let pid = std::process::id();
    let t = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("pageseal-{}-{}-{}.db", prefix, pid, t))
}
