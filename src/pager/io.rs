//! pager/io — страничный I/O с прозрачным кодеком:
//! - write_page: encode-on-write (кодек получает plaintext, на диск уходит
//!   transform-выход той же длины);
//! - read_page: чтение + decode-on-read in-place;
//! - probe_page: чтение с CodecOp::SizeProbe — байты проходят насквозь
//!   (format detection до согласования геометрии).
//!
//! Нумерация страниц с 1. Чтение неаллоцированной страницы — ошибка.

use anyhow::{anyhow, Result};
use std::io::{Read, Seek, SeekFrom, Write};

use crate::codec::CodecOp;

use super::core::Pager;

impl Pager {
    #[inline]
    fn page_offset(&self, page_no: u32) -> u64 {
        (page_no as u64 - 1) * self.page_size as u64
    }

    fn check_page_args(&self, page_no: u32, buf_len: usize) -> Result<()> {
        if page_no == 0 {
            return Err(anyhow!("page numbers start at 1"));
        }
        if buf_len != self.page_size {
            return Err(anyhow!(
                "buffer size {} != page_size {}",
                buf_len,
                self.page_size
            ));
        }
        Ok(())
    }

    /// Записать страницу (полный буфер, включая зарезервированный хвост).
    /// При активном кодеке на диск уходит закодированная копия; входной
    /// буфер не модифицируется.
    pub fn write_page(&mut self, page_no: u32, buf: &[u8]) -> Result<()> {
        self.check_page_args(page_no, buf.len())?;

        let out: &[u8] = match self.codec.as_mut() {
            Some(c) => c.encode(buf, page_no, CodecOp::Write)?,
            None => buf,
        };

        let off = (page_no as u64 - 1) * self.page_size as u64;
        if let Some(mem) = self.mem.as_mut() {
            let need = off as usize + out.len();
            if mem.len() < need {
                mem.resize(need, 0);
            }
            mem[off as usize..need].copy_from_slice(out);
        } else {
            let f = self
                .file
                .as_mut()
                .ok_or_else(|| anyhow!("pager has no backing file"))?;
            f.seek(SeekFrom::Start(off))?;
            f.write_all(out)?;
            if self.data_fsync {
                let _ = f.sync_all();
            }
        }

        if page_no as u64 > self.n_pages {
            self.n_pages = page_no as u64;
        }
        Ok(())
    }

    /// Прочитать страницу в буфер и декодировать in-place.
    pub fn read_page(&mut self, page_no: u32, buf: &mut [u8]) -> Result<()> {
        self.read_page_op(page_no, buf, CodecOp::Read)
    }

    /// Прочитать страницу без декодирования полезной нагрузки:
    /// кодек вызывается с CodecOp::SizeProbe и обязан пропустить байты
    /// насквозь. Используется для проб формата существующего файла.
    pub fn probe_page(&mut self, page_no: u32, buf: &mut [u8]) -> Result<()> {
        self.read_page_op(page_no, buf, CodecOp::SizeProbe)
    }

    fn read_page_op(&mut self, page_no: u32, buf: &mut [u8], op: CodecOp) -> Result<()> {
        self.check_page_args(page_no, buf.len())?;

        if page_no as u64 > self.n_pages {
            return Err(anyhow!(
                "page {} not allocated (n_pages={})",
                page_no,
                self.n_pages
            ));
        }

        let off = self.page_offset(page_no);
        if let Some(mem) = self.mem.as_ref() {
            let start = off as usize;
            buf.copy_from_slice(&mem[start..start + self.page_size]);
        } else {
            let f = self
                .file
                .as_mut()
                .ok_or_else(|| anyhow!("pager has no backing file"))?;
            f.seek(SeekFrom::Start(off))?;
            f.read_exact(buf)?;
        }

        if let Some(c) = self.codec.as_mut() {
            c.decode(buf, page_no, op)?;
        }
        Ok(())
    }
}
