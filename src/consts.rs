//! Общие константы слоя (геометрия страниц, сентинелы, имена БД).

// -------- Databases --------
pub const MAIN_DB: &str = "main";
// Путь-сентинел для БД без backing file.
pub const MEMORY_PATH: &str = ":memory:";

// -------- Page geometry --------
pub const DEFAULT_PAGE_SIZE: u32 = 4096;
pub const MIN_PAGE_SIZE: u32 = 512;
pub const MAX_PAGE_SIZE: u32 = 65536;

// Каждая страница обязана оставлять B-tree-слою минимум 480 полезных байт,
// т.е. reserve <= page_size - 480.
pub const MIN_USABLE_BYTES: u32 = 480;

// -------- set_page_size sentinels --------
// Отрицательное значение = «оставить текущее».
pub const KEEP_PAGE_SIZE: i32 = -1;
pub const KEEP_RESERVE: i32 = -1;
