#![allow(non_snake_case)]

// Базовые модули
pub mod consts;
pub mod config;

// Ключевой материал (zeroize, ENV-источники)
pub mod crypto;

// Codec-слой: трейт + семейство AES-256-GCM
pub mod codec; // src/codec/{mod,aes_gcm}.rs

// Минимальный pager-хост (файловый и in-memory)
pub mod pager; // src/pager/{mod,core,io}.rs

// Connection + key management surface
pub mod conn; // src/conn/{mod,core,keys}.rs

// Удобные реэкспорты
pub use conn::Connection;
pub use codec::{CodecContext, CodecFactory, CodecOp, PageCodec};
pub use codec::aes_gcm::{AesGcmCodec, AesGcmFactory};
pub use config::SealConfig;
pub use crypto::{key_from_env, KeyBytes};
pub use pager::Pager;
