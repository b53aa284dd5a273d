//! codec/aes_gcm — семейство AES-256-GCM.
//!
//! Формат страницы:
//! - body = page[0 .. page_size - 28] — шифруется;
//! - trailer = nonce(12) || tag(16) — зарезервированный хвост страницы.
//!
//! Детали:
//! - nonce — свежий случайный на каждую запись (OsRng);
//! - AAD = "PSGCM001" || page_no (BE) — подмена страницы местами ломает тег;
//! - caller-ключ произвольной ненулевой длины растягивается в 32-байтный
//!   ключ шифра через SHA-256; исходный ключ хранится для key()
//!   и обнуляется в Drop.
//!
//! Примечание: SHA-256-растяжка — не password-KDF. Для парольных ключей
//! подавайте уже выведенный ключ (hex/base64, см. crypto::key_from_env).

use anyhow::{anyhow, Result};
use byteorder::{BigEndian, ByteOrder};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use aes_gcm::{
    aead::{AeadInPlace, KeyInit},
    Aes256Gcm, Nonce, Tag,
};

use super::{CodecContext, CodecFactory, CodecOp, PageCodec};
use crate::crypto::KeyBytes;

pub const GCM_NONCE_LEN: usize = 12;
pub const GCM_TAG_LEN: usize = 16;
/// Сколько байт семейство требует в хвосте каждой страницы.
pub const GCM_RESERVE: usize = GCM_NONCE_LEN + GCM_TAG_LEN;

/// Магия для AAD (версионируемая).
const AAD_MAGIC: &[u8; 8] = b"PSGCM001";

#[inline]
fn build_aad(page_no: u32) -> [u8; 12] {
    let mut aad = [0u8; 12];
    aad[0..8].copy_from_slice(AAD_MAGIC);
    BigEndian::write_u32(&mut aad[8..12], page_no);
    aad
}

pub struct AesGcmCodec {
    // Исходный caller-ключ (для key()); обнуляется в Drop.
    key: KeyBytes,
    cipher: Aes256Gcm,
    // Reuse-буфер encode размером в страницу.
    buf: Vec<u8>,
    page_size: usize,
    reserve: usize,
}

impl AesGcmCodec {
    /// Построить кодек под текущую геометрию страниц.
    /// Пустой ключ здесь — ошибка; сентинел «без шифрования» обрабатывает
    /// фабрика (Ok(None)).
    pub fn new(key: &[u8], page_size: usize, reserve: usize) -> Result<Self> {
        if key.is_empty() {
            return Err(anyhow!("AES-GCM codec requires a non-empty key"));
        }

        // SHA-256 растяжка caller-ключа в 32 байта. finalize_into пишет
        // digest сразу в dk — производный ключ не живёт нигде, кроме
        // обнуляемого буфера.
        let mut dk = [0u8; 32];
        let mut hasher = Sha256::new();
        hasher.update(key);
        hasher.finalize_into((&mut dk).into());
        let cipher = Aes256Gcm::new_from_slice(&dk)
            .map_err(|e| anyhow!("aes-gcm cipher init failed: {}", e))?;
        dk.zeroize();

        Ok(Self {
            key: KeyBytes::from_slice(key),
            cipher,
            buf: vec![0u8; page_size],
            page_size,
            reserve,
        })
    }

    /// Геометрия, с которой transform готов работать. Несовпадение —
    /// следствие пропущенного/неудачного resize, всплывает здесь.
    fn check_geometry(&self, page_len: usize) -> Result<()> {
        if page_len != self.page_size {
            return Err(anyhow!(
                "page buffer size {} != page_size {}",
                page_len,
                self.page_size
            ));
        }
        if self.reserve != GCM_RESERVE {
            return Err(anyhow!(
                "reserve {} does not match AES-GCM requirement {}",
                self.reserve,
                GCM_RESERVE
            ));
        }
        Ok(())
    }
}

impl PageCodec for AesGcmCodec {
    fn reserve(&self) -> i32 {
        GCM_RESERVE as i32
    }

    fn resize(&mut self, page_size: usize, reserve: usize) {
        self.page_size = page_size;
        self.reserve = reserve;
        self.buf.resize(page_size, 0);
        if reserve != GCM_RESERVE {
            log::warn!(
                "aes-gcm codec resized with reserve {} (need {}); transforms will fail",
                reserve,
                GCM_RESERVE
            );
        }
    }

    fn encode<'a>(&'a mut self, page: &'a [u8], page_no: u32, op: CodecOp) -> Result<&'a [u8]> {
        // Проба формата: байты проходят насквозь.
        if op == CodecOp::SizeProbe {
            return Ok(page);
        }
        if page_no == 0 {
            return Err(anyhow!("page numbers start at 1"));
        }
        self.check_geometry(page.len())?;

        let body = self.page_size - self.reserve;
        self.buf[..body].copy_from_slice(&page[..body]);

        let mut nonce = [0u8; GCM_NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);

        let aad = build_aad(page_no);
        let tag = self
            .cipher
            .encrypt_in_place_detached(Nonce::from_slice(&nonce), &aad, &mut self.buf[..body])
            .map_err(|e| anyhow!("page {} AEAD encode failed: {}", page_no, e))?;

        self.buf[body..body + GCM_NONCE_LEN].copy_from_slice(&nonce);
        self.buf[body + GCM_NONCE_LEN..].copy_from_slice(tag.as_slice());
        Ok(&self.buf[..])
    }

    fn decode(&mut self, page: &mut [u8], page_no: u32, op: CodecOp) -> Result<()> {
        if op == CodecOp::SizeProbe {
            return Ok(());
        }
        if page_no == 0 {
            return Err(anyhow!("page numbers start at 1"));
        }
        self.check_geometry(page.len())?;

        let body = self.page_size - self.reserve;
        let (data, trailer) = page.split_at_mut(body);
        let nonce = Nonce::from_slice(&trailer[..GCM_NONCE_LEN]);
        let tag = Tag::from_slice(&trailer[GCM_NONCE_LEN..]);

        let aad = build_aad(page_no);
        self.cipher
            .decrypt_in_place_detached(nonce, &aad, data, tag)
            .map_err(|_| {
                anyhow!(
                    "page {} AEAD decode failed (wrong key or corrupted page)",
                    page_no
                )
            })?;
        Ok(())
    }

    fn key(&self) -> &[u8] {
        self.key.as_slice()
    }
}

/// Фабрика семейства AES-256-GCM. Пустой ключ — «шифрование не требуется».
#[derive(Clone, Copy, Debug, Default)]
pub struct AesGcmFactory;

impl CodecFactory for AesGcmFactory {
    fn make(&self, ctx: &CodecContext, key: &[u8]) -> Result<Option<Box<dyn PageCodec>>> {
        if key.is_empty() {
            return Ok(None);
        }
        let codec = AesGcmCodec::new(key, ctx.page_size, ctx.reserve)?;
        Ok(Some(Box::new(codec)))
    }
}
