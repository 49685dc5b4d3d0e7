pub mod mmap;

pub use self::mmap::MmapFileHandler;
