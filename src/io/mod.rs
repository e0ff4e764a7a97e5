//! Types and methods for reading and parsing input and writing output.

pub mod file;
pub mod listing;
pub mod tsv;

pub use file::{decode_line, get_base_extension, read_decoded_line, InputFile, OutputFile};
pub use listing::{DirectoryListing, FileListing};
pub use tsv::{TsvConfig, GFF_TSV, TABLE_TSV};
