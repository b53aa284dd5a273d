//! crypto — ключевой материал и его источники.
//!
//! Цели:
//! - KeyBytes: owned-буфер ключа с гарантированным обнулением в Drop (zeroize).
//! - key_from_env(): ключ из ENV (HEX или BASE64), как внешний источник
//!   для Key Management Surface.
//!
//! Примечания:
//! - Длина ключа здесь не нормируется: caller-ключ произвольной длины,
//!   конкретное семейство шифра само решает, как его растянуть (см. codec::aes_gcm).
//! - Пустой ключ — валидный сентинел «шифрование не требуется».
//!
//! Использование:
//!   let key = key_from_env()?;          // PS_KEY_HEX / PS_KEY_BASE64
//!   conn.set_key(None, &key)?;

use anyhow::{anyhow, Result};
use base64::Engine;
use std::ops::Deref;
use zeroize::Zeroize;

/// Owned ключевой материал. Обнуляется при уничтожении.
pub struct KeyBytes(Vec<u8>);

impl KeyBytes {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// Безопасное обнуление: при уничтожении структуры стираем секрет из памяти.
impl Drop for KeyBytes {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl Deref for KeyBytes {
    type Target = [u8];
    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl Clone for KeyBytes {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

// Не печатаем сами байты ключа.
impl std::fmt::Debug for KeyBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KeyBytes(<{} bytes>)", self.0.len())
    }
}

/// Ключ из переменных окружения:
/// - PS_KEY_HEX     — ключ в hex.
/// - PS_KEY_BASE64  — альтернативно, ключ в base64.
pub fn key_from_env() -> Result<KeyBytes> {
    if let Ok(hex) = std::env::var("PS_KEY_HEX") {
        return Ok(KeyBytes::new(decode_hex_trimmed(&hex)?));
    }
    if let Ok(b64) = std::env::var("PS_KEY_BASE64") {
        return Ok(KeyBytes::new(decode_base64_trimmed(&b64)?));
    }
    Err(anyhow!("key_from_env: set PS_KEY_HEX or PS_KEY_BASE64"))
}

// ---------------------- helpers ----------------------

pub fn decode_hex_trimmed(s: &str) -> Result<Vec<u8>> {
    let s = s.trim();
    if s.len() % 2 != 0 {
        return Err(anyhow!("hex key must have even length"));
    }
    let mut out = Vec::with_capacity(s.len() / 2);
    let bytes = s.as_bytes();
    for i in (0..bytes.len()).step_by(2) {
        let h = (bytes[i] as char)
            .to_digit(16)
            .ok_or_else(|| anyhow!("invalid hex at pos {}", i))?;
        let l = (bytes[i + 1] as char)
            .to_digit(16)
            .ok_or_else(|| anyhow!("invalid hex at pos {}", i + 1))?;
        out.push(((h << 4) | l) as u8);
    }
    Ok(out)
}

pub fn decode_base64_trimmed(s: &str) -> Result<Vec<u8>> {
    let s = s.trim();
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(s.as_bytes())
        .map_err(|e| anyhow!("base64 decode: {}", e))?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_roundtrip() {
        let v = decode_hex_trimmed(" 00ff10AB ").unwrap();
        assert_eq!(v, vec![0x00, 0xff, 0x10, 0xab]);
    }

    #[test]
    fn hex_rejects_odd_and_garbage() {
        assert!(decode_hex_trimmed("abc").is_err());
        assert!(decode_hex_trimmed("zz").is_err());
    }

    #[test]
    fn base64_decodes() {
        let v = decode_base64_trimmed("c2VjcmV0").unwrap();
        assert_eq!(v, b"secret");
    }

    #[test]
    fn key_from_env_reads_hex() {
        std::env::set_var("PS_KEY_HEX", "deadbeef");
        let k = key_from_env().unwrap();
        assert_eq!(k.as_slice(), &[0xde, 0xad, 0xbe, 0xef]);
        std::env::remove_var("PS_KEY_HEX");
    }

    #[test]
    fn key_bytes_debug_is_redacted() {
        let k = KeyBytes::from_slice(b"secret");
        let s = format!("{:?}", k);
        assert!(!s.contains("secret"));
        assert!(s.contains("6 bytes"));
    }
}
