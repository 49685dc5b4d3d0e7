// storage/mod.rs
//
// Single-file index layout (little-endian):
//
//   header (72 bytes) | string table | bucket sections... | directory
//
// The header points at the directory, the directory points at every other
// section and carries their CRC32s.

pub mod metrics;
pub mod format;
pub mod strings;
pub mod bucket;
pub mod writer;
pub mod reader;

pub use self::writer::Writer;
pub use self::reader::Reader;
pub use self::metrics::{QueryMetrics, QueryMetricsStats};
pub use self::format::{FORMAT_VERSION, HEADER_LEN};
