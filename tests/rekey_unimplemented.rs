use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;

use PageSeal::{AesGcmFactory, Connection, SealConfig};

/// change_key всегда возвращает "rekey is not implemented" — в том числе
/// для БД без привязанного кодека.
#[test]
fn change_key_fails_on_unattached_database() -> Result<()> {
    let path = unique_path("rekey-unattached");
    let conn = Connection::open(&path, SealConfig::default())?;

    let err = conn.change_key(None, b"new-key").unwrap_err();
    assert_eq!(err.to_string(), "rekey is not implemented");
    assert_eq!(conn.last_error().unwrap(), "rekey is not implemented");
    assert!(!conn.has_codec(None)?);
    Ok(())
}

/// change_key не трогает состояние уже привязанного кодека.
#[test]
fn change_key_never_mutates_codec_state() -> Result<()> {
    let path = unique_path("rekey-attached");
    let conn = Connection::open(&path, SealConfig::default())?;
    conn.set_codec_factory(Arc::new(AesGcmFactory))?;
    conn.set_key(None, b"original-key")?;

    let err = conn.change_key(None, b"new-key").unwrap_err();
    assert_eq!(err.to_string(), "rekey is not implemented");

    // Кодек на месте, ключ прежний.
    assert!(conn.has_codec(None)?);
    assert_eq!(conn.get_key(None)?.unwrap().as_slice(), b"original-key");
    Ok(())
}

// ---------- helpers ----------

fn unique_path(prefix: &str) -> PathBuf {
    let pid = std::process::id();
    let t = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("pageseal-{}-{}-{}.db", prefix, pid, t))
}
