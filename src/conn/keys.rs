//! conn/keys — key management surface + attachment-протокол.
//!
//! Протокол привязки кодека (на каждый set_key):
//! 1. Разрешить имя БД (None => main); неизвестное имя — ошибка,
//!    кодек не строится.
//! 2. Memory-resident БД — no-op с успехом: без backing file шифрование
//!    бессмысленно, кодек не регистрируется.
//! 3. Снять с pager'а снимок (path, имя, page_size, reserve) и отдать
//!    фабрике вместе с ключом.
//! 4. Фабрика вернула None — «шифрование не требуется», ничего не меняем.
//!    Err — частичное состояние дропается ровно один раз, attach прерван.
//! 5. Кодек запросил иной reserve — согласовать геометрию через
//!    set_page_size(KEEP_PAGE_SIZE, want); отказ pager'а (например, в файле
//!    уже есть страницы) — дроп кодека и ошибка pager'а наружу.
//! 6. Регистрация кодека в pager'е (замена прежнего — это свежий attach,
//!    не rekey).
//!
//! Известное ограничение: повторный set_key с новым ключом НЕ перешифровывает
//! уже записанные страницы — они остаются под старым ключом (или открытыми).
//! Настоящий rekey — отдельная нереализованная операция: change_key всегда
//! возвращает "rekey is not implemented".

use anyhow::{anyhow, Result};

use crate::consts::KEEP_PAGE_SIZE;
use crate::codec::CodecContext;
use crate::crypto::KeyBytes;

use super::core::{ConnCore, Connection};

impl Connection {
    /// Подать ключ для БД (None => main) и привязать кодек.
    /// Выполняется целиком под connection-мьютексом; ошибка дополнительно
    /// записывается в last_error соединения.
    pub fn set_key(&self, db: Option<&str>, key: &[u8]) -> Result<()> {
        let mut core = self.lock()?;
        let res = attach_codec(&mut core, db, key);
        match &res {
            Ok(()) => core.last_error = None,
            Err(e) => core.last_error = Some(e.to_string()),
        }
        res
    }

    /// Сменить ключ уже зашифрованной БД in-place. Не реализовано:
    /// стабильная точка входа с типизированным отказом, состояние кодеков
    /// не трогается.
    pub fn change_key(&self, _db: Option<&str>, _key: &[u8]) -> Result<()> {
        let mut core = self.lock()?;
        let err = anyhow!("rekey is not implemented");
        core.last_error = Some(err.to_string());
        Err(err)
    }

    /// Ключ активного кодека БД (None => main). Возвращает owned-копию,
    /// обнуляемую в Drop: отдавать заимствование из-под мьютекса нельзя.
    /// None — кодек не привязан.
    pub fn get_key(&self, db: Option<&str>) -> Result<Option<KeyBytes>> {
        let core = self.lock()?;
        let idb = core.resolve_db(db)?;
        Ok(core.dbs[idb].pager.codec_key().map(KeyBytes::from_slice))
    }
}

/// Тело attachment-протокола. Вызывается только под connection-мьютексом.
fn attach_codec(core: &mut ConnCore, db: Option<&str>, key: &[u8]) -> Result<()> {
    // 1. Разрешение имени.
    let idb = core.resolve_db(db)?;

    // 2. Memory-resident: designed exception, не ошибка.
    if core.dbs[idb].pager.is_memory() {
        log::debug!(
            "set_key on memory-resident database '{}': no-op",
            core.dbs[idb].name
        );
        return Ok(());
    }

    // Без фабрики привязывать нечего.
    let Some(factory) = core.factory.clone() else {
        log::debug!("set_key without a codec factory: no codec attached");
        return Ok(());
    };

    // 3. Снимок текущей геометрии.
    let db_ref = &mut core.dbs[idb];
    let ctx = CodecContext {
        file: db_ref.pager.file_path().to_path_buf(),
        name: db_ref.name.clone(),
        page_size: db_ref.pager.page_size(),
        reserve: db_ref.pager.reserve(),
    };

    // 4. Инициализация кодека. Err: частичное состояние уже дропнуто
    // внутри фабрики (ровно один раз), пробрасываем ошибку.
    let Some(codec) = factory.make(&ctx, key)? else {
        // «Шифрование не требуется» — кодек не регистрируется.
        return Ok(());
    };

    // 5. Согласование reserve. Отказ pager'а — дроп кодека, его ошибка наружу.
    let want = codec.reserve();
    if want >= 0 && want as usize != ctx.reserve {
        if let Err(e) = db_ref.pager.set_page_size(KEEP_PAGE_SIZE, want) {
            drop(codec); // ключ обнуляется здесь, ровно один раз
            return Err(e);
        }
    }

    // 6. Регистрация (замена прежнего кодека = свежий attach).
    db_ref.pager.set_codec(codec);
    log::debug!(
        "codec attached to '{}' (reserve={})",
        db_ref.name,
        db_ref.pager.reserve()
    );
    Ok(())
}
