use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// Defines the interface for reading volumetric snapshot file formats.
///
/// Implementors handle format-specific parsing. Reading is driven by a
/// format-specific options value (for example a header dialect) rather than by
/// sniffing the input, so callers always state which variant they expect.
pub trait SnapshotFile {
    /// Format-specific knobs that select how the input is interpreted.
    type Options;

    /// The parsed, not yet post-processed, content of one file.
    type Output;

    /// The error type for read operations.
    type Error: Error + From<io::Error>;

    /// Reads one snapshot from a buffered reader.
    ///
    /// # Arguments
    ///
    /// * `reader` - The buffered reader to read from.
    /// * `options` - Format options selecting the dialect and strictness.
    ///
    /// # Errors
    ///
    /// Returns an error at the first structural deviation from the format or when
    /// the underlying reader fails.
    fn read_from(
        reader: &mut impl BufRead,
        options: &Self::Options,
    ) -> Result<Self::Output, Self::Error>;

    /// Reads one snapshot from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or parsing fails.
    fn read_from_path<P: AsRef<Path>>(
        path: P,
        options: &Self::Options,
    ) -> Result<Self::Output, Self::Error> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader, options)
    }
}
