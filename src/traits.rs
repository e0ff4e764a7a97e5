//! Traits used by the PIMMS library.
//!

use std::path::PathBuf;

use crate::{data::DatumType, error::PimmsError, io::tsv::TsvConfig};

/// Defines how to serialize something to TSV.
pub trait TsvSerialize {
    // Serialize something to a TSV [`String`].
    fn to_tsv(&self, config: &TsvConfig) -> String;
}

/// The [`TsvWriter`] trait defines how a whole table-like object is written
/// out as TSV, to a file or to standard output.
pub trait TsvWriter {
    /// Output the TSV version of this object. If `output` is `None`,
    /// standard output is used.
    fn to_tsv(&self, output: Option<impl Into<PathBuf>>) -> Result<(), PimmsError>;
}

/// Conversion of native values into the [`DatumType`] cell type.
pub trait IntoDatumType {
    fn into_data_type(self) -> DatumType;
}
