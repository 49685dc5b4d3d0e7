pub mod generator;
pub mod types;

pub use self::generator::NGramGenerator;
pub use self::types::{NGram, MARKER_UNIT, key_width};
