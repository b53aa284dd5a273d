//! pager/core — ядро Pager: структура, open()/in_memory(), геометрия и кодек.

use anyhow::{anyhow, Context, Result};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use crate::codec::PageCodec;
use crate::config::SealConfig;
use crate::consts::{MAX_PAGE_SIZE, MIN_PAGE_SIZE, MIN_USABLE_BYTES};

/// Низкоуровневый страничный хост одной БД.
///
/// Не thread-safe сам по себе: внешняя сериализация — ответственность
/// владельца (connection-мьютекс, см. conn).
pub struct Pager {
    pub(crate) path: PathBuf,
    // None — memory-resident база (без backing file).
    pub(crate) file: Option<File>,
    // Страницы in-memory базы (используется только при file == None).
    pub(crate) mem: Option<Vec<u8>>,

    pub(crate) page_size: usize,
    pub(crate) reserve: usize,
    // Число логически аллоцированных страниц (максимальный записанный page_no).
    pub(crate) n_pages: u64,

    // fsync данных после записи страницы.
    pub(crate) data_fsync: bool,

    // Активный кодек этой БД (замена — через set_codec, старый дропается).
    pub(crate) codec: Option<Box<dyn PageCodec>>,
}

/// page_size: степень двойки в [512 .. 65536].
pub fn validate_page_size(page_size: u32) -> Result<()> {
    if page_size < MIN_PAGE_SIZE
        || page_size > MAX_PAGE_SIZE
        || (page_size & (page_size - 1)) != 0
    {
        return Err(anyhow!(
            "page_size must be a power of two in [{} .. {}], got {}",
            MIN_PAGE_SIZE,
            MAX_PAGE_SIZE,
            page_size
        ));
    }
    Ok(())
}

/// reserve не должен съедать полезные байты ниже минимума.
fn validate_reserve(page_size: u32, reserve: u32) -> Result<()> {
    if reserve + MIN_USABLE_BYTES > page_size {
        return Err(anyhow!(
            "reserve {} leaves fewer than {} usable bytes per {}-byte page",
            reserve,
            MIN_USABLE_BYTES,
            page_size
        ));
    }
    Ok(())
}

impl Pager {
    /// Открыть (или создать) файловую БД.
    pub fn open(path: &Path, cfg: &SealConfig) -> Result<Self> {
        validate_page_size(cfg.page_size)?;
        validate_reserve(cfg.page_size, cfg.reserve)?;

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(path)
            .with_context(|| format!("open database file {}", path.display()))?;

        let len = file.metadata()?.len();
        let ps = cfg.page_size as u64;
        if len % ps != 0 {
            return Err(anyhow!(
                "file size {} is not a multiple of page size {}",
                len,
                ps
            ));
        }

        Ok(Self {
            path: path.to_path_buf(),
            file: Some(file),
            mem: None,
            page_size: cfg.page_size as usize,
            reserve: cfg.reserve as usize,
            n_pages: len / ps,
            data_fsync: cfg.data_fsync,
            codec: None,
        })
    }

    /// Memory-resident база: страницы в Vec, backing file отсутствует.
    pub fn in_memory(cfg: &SealConfig) -> Result<Self> {
        validate_page_size(cfg.page_size)?;
        validate_reserve(cfg.page_size, cfg.reserve)?;
        Ok(Self {
            path: PathBuf::from(crate::consts::MEMORY_PATH),
            file: None,
            mem: Some(Vec::new()),
            page_size: cfg.page_size as usize,
            reserve: cfg.reserve as usize,
            n_pages: 0,
            data_fsync: false,
            codec: None,
        })
    }

    // ----- геометрия -----

    #[inline]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Текущее число зарезервированных байт в хвосте каждой страницы.
    #[inline]
    pub fn reserve(&self) -> usize {
        self.reserve
    }

    /// Байты страницы, видимые слою выше (page_size - reserve).
    #[inline]
    pub fn usable_size(&self) -> usize {
        self.page_size - self.reserve
    }

    #[inline]
    pub fn n_pages(&self) -> u64 {
        self.n_pages
    }

    #[inline]
    pub fn is_memory(&self) -> bool {
        self.file.is_none()
    }

    pub fn file_path(&self) -> &Path {
        &self.path
    }

    /// Сменить геометрию страниц. Отрицательные значения — «оставить текущее»
    /// (consts::KEEP_PAGE_SIZE / KEEP_RESERVE).
    ///
    /// Правила:
    /// - после появления страниц геометрия фиксирована: смена отклоняется;
    /// - при активном кодеке вызывается его resize — до следующего transform.
    pub fn set_page_size(&mut self, size_or_keep: i32, reserve_or_keep: i32) -> Result<()> {
        let new_ps = if size_or_keep < 0 {
            self.page_size
        } else {
            validate_page_size(size_or_keep as u32)?;
            size_or_keep as usize
        };
        let new_res = if reserve_or_keep < 0 {
            self.reserve
        } else {
            reserve_or_keep as usize
        };
        validate_reserve(new_ps as u32, new_res as u32)?;

        if new_ps == self.page_size && new_res == self.reserve {
            return Ok(());
        }
        if self.n_pages > 0 {
            return Err(anyhow!(
                "cannot change page geometry: database already contains {} pages",
                self.n_pages
            ));
        }

        log::debug!(
            "page geometry change: {}+{} -> {}+{} ({})",
            self.page_size,
            self.reserve,
            new_ps,
            new_res,
            self.path.display()
        );
        self.page_size = new_ps;
        self.reserve = new_res;
        if let Some(c) = self.codec.as_mut() {
            c.resize(new_ps, new_res);
        }
        Ok(())
    }

    // ----- кодек -----

    /// Зарегистрировать кодек как активный для этой БД. Прежний кодек
    /// дропается (его ключ обнуляется в Drop). resize вызывается до
    /// первого transform на текущей геометрии.
    pub fn set_codec(&mut self, mut codec: Box<dyn PageCodec>) {
        codec.resize(self.page_size, self.reserve);
        self.codec = Some(codec);
        log::debug!(
            "codec registered for {} (page_size={}, reserve={})",
            self.path.display(),
            self.page_size,
            self.reserve
        );
    }

    #[inline]
    pub fn has_codec(&self) -> bool {
        self.codec.is_some()
    }

    /// Ключ активного кодека (интроспекция); None — кодек не привязан.
    pub fn codec_key(&self) -> Option<&[u8]> {
        self.codec.as_ref().map(|c| c.key())
    }

}
