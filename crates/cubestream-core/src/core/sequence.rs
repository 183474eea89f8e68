use std::path::{Path, PathBuf};

/// Cyclic snapshot index over `first_index..last_index_exclusive`.
///
/// Pure arithmetic: the sequencer never touches the file system and never fails.
/// An empty range (`first >= last`) is clamped to the single index `first`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequencer {
    first_index: u64,
    last_index_exclusive: u64,
    current_index: u64,
}

impl Sequencer {
    pub fn new(first_index: u64, last_index_exclusive: u64) -> Self {
        Self {
            first_index,
            last_index_exclusive: last_index_exclusive.max(first_index.saturating_add(1)),
            current_index: first_index,
        }
    }

    pub fn first_index(&self) -> u64 {
        self.first_index
    }

    pub fn last_index_exclusive(&self) -> u64 {
        self.last_index_exclusive
    }

    /// The index the next call to [`Sequencer::next`] returns.
    pub fn current_index(&self) -> u64 {
        self.current_index
    }

    pub fn contains(&self, index: u64) -> bool {
        (self.first_index..self.last_index_exclusive).contains(&index)
    }

    /// Returns the current index and advances, wrapping at the end of the range.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> u64 {
        let index = self.current_index;
        self.current_index += 1;
        if self.current_index == self.last_index_exclusive {
            self.current_index = self.first_index;
        }
        index
    }
}

/// Formats snapshot indices into `<base_dir>/<prefix><zero-padded index>.<extension>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotPathPattern {
    pub base_dir: PathBuf,
    pub prefix: String,
    pub extension: String,
    pub digit_width: usize,
}

impl SnapshotPathPattern {
    pub fn new(
        base_dir: impl Into<PathBuf>,
        prefix: impl Into<String>,
        extension: impl Into<String>,
        digit_width: usize,
    ) -> Self {
        Self {
            base_dir: base_dir.into(),
            prefix: prefix.into(),
            extension: extension.into(),
            digit_width,
        }
    }

    pub fn file_name(&self, index: u64) -> String {
        let mut name = format!("{}{:0width$}", self.prefix, index, width = self.digit_width);
        if !self.extension.is_empty() {
            name.push('.');
            name.push_str(&self.extension);
        }
        name
    }

    pub fn path_for(&self, index: u64) -> PathBuf {
        self.base_dir.join(self.file_name(index))
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}
