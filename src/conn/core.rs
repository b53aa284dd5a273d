//! conn/core — ядро Connection.
//!
//! Модель:
//! - Connection владеет Mutex<ConnCore>; все публичные входы берут мьютекс
//!   scoped-guard'ом (освобождение гарантировано на любом пути выхода).
//! - ConnCore: упорядоченный список БД (индекс 0 — "main"), фабрика кодеков,
//!   last_error (человекочитаемое сообщение последней ошибки key-surface).
//! - Каждая БД владеет своим Pager; кодек живёт внутри pager'а и дропается
//!   при замене/detach/закрытии соединения.

use anyhow::{anyhow, Context, Result};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::codec::CodecFactory;
use crate::config::SealConfig;
use crate::consts::{MAIN_DB, MEMORY_PATH};
use crate::pager::Pager;

pub(crate) struct Database {
    pub name: String,
    pub pager: Pager,
}

pub(crate) struct ConnCore {
    pub dbs: Vec<Database>,
    pub factory: Option<Arc<dyn CodecFactory>>,
    pub last_error: Option<String>,
    pub cfg: SealConfig,
}

impl ConnCore {
    /// Индекс БД по логическому имени.
    pub fn find_db(&self, name: &str) -> Option<usize> {
        self.dbs.iter().position(|d| d.name == name)
    }

    /// None => main (индекс 0); неизвестное имя — ошибка конфигурации.
    pub fn resolve_db(&self, name: Option<&str>) -> Result<usize> {
        match name {
            None => Ok(0),
            Some(n) => self
                .find_db(n)
                .ok_or_else(|| anyhow!("unknown database {}", n)),
        }
    }
}

/// Соединение: одна main-БД плюс присоединённые (attach) БД.
pub struct Connection {
    pub(crate) inner: Mutex<ConnCore>,
}

impl Connection {
    /// Открыть соединение с файловой main-БД.
    /// Путь ":memory:" даёт memory-resident main.
    pub fn open(path: &Path, cfg: SealConfig) -> Result<Self> {
        let pager = if path.to_str() == Some(MEMORY_PATH) {
            Pager::in_memory(&cfg)?
        } else {
            Pager::open(path, &cfg).context("open main database")?
        };
        Ok(Self {
            inner: Mutex::new(ConnCore {
                dbs: vec![Database {
                    name: MAIN_DB.to_string(),
                    pager,
                }],
                factory: None,
                last_error: None,
                cfg,
            }),
        })
    }

    /// Открыть соединение с memory-resident main-БД.
    pub fn open_in_memory(cfg: SealConfig) -> Result<Self> {
        Self::open(Path::new(MEMORY_PATH), cfg)
    }

    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, ConnCore>> {
        self.inner
            .lock()
            .map_err(|_| anyhow!("connection mutex poisoned"))
    }

    /// Зарегистрировать фабрику кодеков. Без фабрики set_key с непустым
    /// ключом ничего не привязывает (шифрование недоступно).
    pub fn set_codec_factory(&self, factory: Arc<dyn CodecFactory>) -> Result<()> {
        let mut core = self.lock()?;
        core.factory = Some(factory);
        Ok(())
    }

    /// Присоединить файловую БД под логическим именем.
    pub fn attach_database(&self, name: &str, path: &Path) -> Result<()> {
        let mut core = self.lock()?;
        if core.find_db(name).is_some() {
            return Err(anyhow!("database {} is already attached", name));
        }
        let pager = if path.to_str() == Some(MEMORY_PATH) {
            Pager::in_memory(&core.cfg)?
        } else {
            Pager::open(path, &core.cfg)
                .with_context(|| format!("attach database {}", name))?
        };
        core.dbs.push(Database {
            name: name.to_string(),
            pager,
        });
        Ok(())
    }

    /// Присоединить memory-resident БД под логическим именем.
    pub fn attach_in_memory(&self, name: &str) -> Result<()> {
        self.attach_database(name, Path::new(MEMORY_PATH))
    }

    /// Отсоединить БД. Кодек (если был) дропается, ключ обнуляется.
    pub fn detach_database(&self, name: &str) -> Result<()> {
        let mut core = self.lock()?;
        if name == MAIN_DB {
            return Err(anyhow!("cannot detach main database"));
        }
        let idx = core
            .find_db(name)
            .ok_or_else(|| anyhow!("unknown database {}", name))?;
        core.dbs.remove(idx);
        Ok(())
    }

    /// Сообщение последней ошибки key-surface (аналог error slot хоста).
    pub fn last_error(&self) -> Option<String> {
        self.lock().ok().and_then(|c| c.last_error.clone())
    }

    // ----- интроспекция геометрии / кодека (None => main) -----

    pub fn page_size(&self, db: Option<&str>) -> Result<usize> {
        let core = self.lock()?;
        let idb = core.resolve_db(db)?;
        Ok(core.dbs[idb].pager.page_size())
    }

    pub fn reserve_bytes(&self, db: Option<&str>) -> Result<usize> {
        let core = self.lock()?;
        let idb = core.resolve_db(db)?;
        Ok(core.dbs[idb].pager.reserve())
    }

    /// Байты страницы, видимые слою выше (page_size - reserve).
    pub fn usable_size(&self, db: Option<&str>) -> Result<usize> {
        let core = self.lock()?;
        let idb = core.resolve_db(db)?;
        Ok(core.dbs[idb].pager.usable_size())
    }

    pub fn has_codec(&self, db: Option<&str>) -> Result<bool> {
        let core = self.lock()?;
        let idb = core.resolve_db(db)?;
        Ok(core.dbs[idb].pager.has_codec())
    }

    // ----- страничные passthrough-хелперы (для embedder'а и тестов) -----

    /// Записать страницу указанной БД (полный буфер в page_size байт).
    pub fn write_page(&self, db: Option<&str>, page_no: u32, buf: &[u8]) -> Result<()> {
        let mut core = self.lock()?;
        let idb = core.resolve_db(db)?;
        core.dbs[idb].pager.write_page(page_no, buf)
    }

    /// Прочитать страницу указанной БД.
    pub fn read_page(&self, db: Option<&str>, page_no: u32, buf: &mut [u8]) -> Result<()> {
        let mut core = self.lock()?;
        let idb = core.resolve_db(db)?;
        core.dbs[idb].pager.read_page(page_no, buf)
    }

    /// Прочитать страницу без декодирования (SizeProbe passthrough).
    pub fn probe_page(&self, db: Option<&str>, page_no: u32, buf: &mut [u8]) -> Result<()> {
        let mut core = self.lock()?;
        let idb = core.resolve_db(db)?;
        core.dbs[idb].pager.probe_page(page_no, buf)
    }
}
