use crate::core::io::traits::SnapshotFile;
use nalgebra::{Point3, Vector3};
use serde::Deserialize;
use std::io::{self, BufRead};
use thiserror::Error;

/// Bohr radii per Ångström.
pub const BOHR_PER_ANGSTROM: f64 = 1.0 / 0.529_177_210_903;

/// Header layout variants of the cube format.
///
/// The two dialects differ only in the order of the fields on the origin line and
/// on the atom records:
///
/// | Record | `Standard`                         | `AlternateOriginOrder`    |
/// |--------|------------------------------------|---------------------------|
/// | line 3 | `natoms ox oy oz [nval]`           | `ox oy oz natoms`         |
/// | atoms  | `Z charge x y z`                   | `Z x y z [charge]`        |
///
/// In `Standard`, a negative atom count announces one data-set identifier line
/// after the atom records. `AlternateOriginOrder` has no such convention and
/// rejects negative counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Dialect {
    #[default]
    Standard,
    #[serde(alias = "qe")]
    AlternateOriginOrder,
}

/// What to do with non-zero off-diagonal components of a grid axis vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkewPolicy {
    /// Reject skewed cells with [`CubeError::UnsupportedFeature`].
    #[default]
    Strict,
    /// Keep only the diagonal component of every axis vector.
    IgnoreOffDiagonal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CubeReadOptions {
    pub dialect: Dialect,
    pub skew_policy: SkewPolicy,
}

impl CubeReadOptions {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            ..Default::default()
        }
    }

    pub fn with_skew_policy(mut self, policy: SkewPolicy) -> Self {
        self.skew_policy = policy;
        self
    }
}

/// The raw content of one cube file, in Bohr.
#[derive(Debug, Clone, PartialEq)]
pub struct CubeData {
    pub comments: [String; 2],
    pub origin: Point3<f64>,
    pub grid_dimensions: [usize; 3],
    pub grid_spacings: Vector3<f64>,
    pub atomic_numbers: Vec<u32>,
    pub atomic_positions: Vec<Point3<f64>>,
    /// Voxel values in file order.
    pub density: Vec<f64>,
}

#[derive(Debug, Error)]
pub enum CubeError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Malformed cube file on line {line}: {kind}")]
    Malformed { line: usize, kind: MalformedKind },
    #[error("Grid declares {expected} voxels but the file contains {found} values")]
    GridSizeMismatch { expected: usize, found: usize },
    #[error("Unsupported cube feature: {0}")]
    UnsupportedFeature(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MalformedKind {
    #[error("file ended before the {expected}")]
    MissingLine { expected: &'static str },
    #[error("{record} needs at least {expected} fields, found {found}")]
    TooFewFields {
        record: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("invalid integer for {field} (value: '{value}')")]
    InvalidInt { field: &'static str, value: String },
    #[error("invalid number for {field} (value: '{value}')")]
    InvalidFloat { field: &'static str, value: String },
    #[error("atom count must not be negative in this dialect (value: {0})")]
    NegativeAtomCount(i64),
    #[error("grid dimension along axis {axis} must not be zero")]
    ZeroGridDimension { axis: usize },
    #[error("grid spacing along axis {axis} must be positive (value: {value})")]
    NonPositiveSpacing { axis: usize, value: String },
    #[error("numeric record is not valid UTF-8")]
    InvalidEncoding,
}

const AXIS_RECORDS: [&str; 3] = ["first grid axis line", "second grid axis line", "third grid axis line"];

struct LineCursor<'a, R: BufRead> {
    reader: &'a mut R,
    buf: Vec<u8>,
    line_num: usize,
}

impl<'a, R: BufRead> LineCursor<'a, R> {
    fn new(reader: &'a mut R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            line_num: 0,
        }
    }

    /// Loads the next line into `buf` without its terminator. `false` at end of input.
    fn advance(&mut self) -> Result<bool, CubeError> {
        self.buf.clear();
        if self.reader.read_until(b'\n', &mut self.buf)? == 0 {
            return Ok(false);
        }
        self.line_num += 1;
        if self.buf.last() == Some(&b'\n') {
            self.buf.pop();
            if self.buf.last() == Some(&b'\r') {
                self.buf.pop();
            }
        }
        Ok(true)
    }

    fn missing(&self, expected: &'static str) -> CubeError {
        CubeError::Malformed {
            line: self.line_num + 1,
            kind: MalformedKind::MissingLine { expected },
        }
    }

    /// Free-text line; bytes that are not UTF-8 are replaced rather than rejected.
    fn next_text(&mut self, expected: &'static str) -> Result<String, CubeError> {
        if !self.advance()? {
            return Err(self.missing(expected));
        }
        Ok(String::from_utf8_lossy(&self.buf).into_owned())
    }

    fn next_record(&mut self) -> Result<Option<(usize, &str)>, CubeError> {
        if !self.advance()? {
            return Ok(None);
        }
        let line_num = self.line_num;
        std::str::from_utf8(&self.buf)
            .map(|text| Some((line_num, text)))
            .map_err(|_| CubeError::Malformed {
                line: line_num,
                kind: MalformedKind::InvalidEncoding,
            })
    }

    fn next_line(&mut self, expected: &'static str) -> Result<(usize, &str), CubeError> {
        let line_num = self.line_num;
        match self.next_record()? {
            Some(record) => Ok(record),
            None => Err(CubeError::Malformed {
                line: line_num + 1,
                kind: MalformedKind::MissingLine { expected },
            }),
        }
    }
}

/// Upper bound on header-driven preallocation. Counts come from untrusted input,
/// so buffers beyond this grow with the data actually read.
const PREALLOCATION_LIMIT: usize = 1 << 20;

fn fields<'l>(
    line: &'l str,
    line_num: usize,
    record: &'static str,
    expected: usize,
) -> Result<Vec<&'l str>, CubeError> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < expected {
        return Err(CubeError::Malformed {
            line: line_num,
            kind: MalformedKind::TooFewFields {
                record,
                expected,
                found: parts.len(),
            },
        });
    }
    Ok(parts)
}

fn parse_int(value: &str, line_num: usize, field: &'static str) -> Result<i64, CubeError> {
    value.parse().map_err(|_| CubeError::Malformed {
        line: line_num,
        kind: MalformedKind::InvalidInt {
            field,
            value: value.into(),
        },
    })
}

fn parse_float(value: &str, line_num: usize, field: &'static str) -> Result<f64, CubeError> {
    value.parse().map_err(|_| CubeError::Malformed {
        line: line_num,
        kind: MalformedKind::InvalidFloat {
            field,
            value: value.into(),
        },
    })
}

fn parse_point(values: &[&str], line_num: usize, field: &'static str) -> Result<Point3<f64>, CubeError> {
    Ok(Point3::new(
        parse_float(values[0], line_num, field)?,
        parse_float(values[1], line_num, field)?,
        parse_float(values[2], line_num, field)?,
    ))
}

struct OriginRecord {
    atom_count: usize,
    has_dataset_ids: bool,
    origin: Point3<f64>,
}

fn parse_origin_line(line: &str, line_num: usize, dialect: Dialect) -> Result<OriginRecord, CubeError> {
    let parts = fields(line, line_num, "origin line", 4)?;
    match dialect {
        Dialect::Standard => {
            let count = parse_int(parts[0], line_num, "atom count")?;
            let origin = parse_point(&parts[1..4], line_num, "origin")?;
            if let Some(nval) = parts.get(4) {
                let nval = parse_int(nval, line_num, "values per voxel")?;
                if nval != 1 {
                    return Err(CubeError::UnsupportedFeature(format!(
                        "{} values per voxel (only scalar grids are supported)",
                        nval
                    )));
                }
            }
            Ok(OriginRecord {
                atom_count: count.unsigned_abs() as usize,
                has_dataset_ids: count < 0,
                origin,
            })
        }
        Dialect::AlternateOriginOrder => {
            let origin = parse_point(&parts[0..3], line_num, "origin")?;
            let count = parse_int(parts[3], line_num, "atom count")?;
            if count < 0 {
                return Err(CubeError::Malformed {
                    line: line_num,
                    kind: MalformedKind::NegativeAtomCount(count),
                });
            }
            Ok(OriginRecord {
                atom_count: count as usize,
                has_dataset_ids: false,
                origin,
            })
        }
    }
}

fn parse_axis_line(
    line: &str,
    line_num: usize,
    axis: usize,
    skew_policy: SkewPolicy,
) -> Result<(usize, f64), CubeError> {
    let parts = fields(line, line_num, AXIS_RECORDS[axis], 4)?;
    let count = parse_int(parts[0], line_num, "grid dimension")?;
    if count == 0 {
        return Err(CubeError::Malformed {
            line: line_num,
            kind: MalformedKind::ZeroGridDimension { axis },
        });
    }
    let vector = parse_point(&parts[1..4], line_num, "axis vector")?.coords;

    if skew_policy == SkewPolicy::Strict
        && (0..3).any(|component| component != axis && vector[component] != 0.0)
    {
        return Err(CubeError::UnsupportedFeature(format!(
            "skewed grid axis {} ({} {} {})",
            axis, vector.x, vector.y, vector.z
        )));
    }

    // A negative voxel count marks the axis vector as Ångström.
    let spacing = if count < 0 {
        vector[axis] * BOHR_PER_ANGSTROM
    } else {
        vector[axis]
    };
    if !(spacing > 0.0) || !spacing.is_finite() {
        return Err(CubeError::Malformed {
            line: line_num,
            kind: MalformedKind::NonPositiveSpacing {
                axis,
                value: parts[axis + 1].into(),
            },
        });
    }
    Ok((count.unsigned_abs() as usize, spacing))
}

fn parse_atom_line(line: &str, line_num: usize, dialect: Dialect) -> Result<(u32, Point3<f64>), CubeError> {
    let (parts, coords) = match dialect {
        Dialect::Standard => {
            let parts = fields(line, line_num, "atom record", 5)?;
            (parts, 2..5)
        }
        Dialect::AlternateOriginOrder => {
            let parts = fields(line, line_num, "atom record", 4)?;
            (parts, 1..4)
        }
    };
    let atomic_number = parse_int(parts[0], line_num, "atomic number")?;
    let atomic_number = u32::try_from(atomic_number).map_err(|_| CubeError::Malformed {
        line: line_num,
        kind: MalformedKind::InvalidInt {
            field: "atomic number",
            value: parts[0].into(),
        },
    })?;
    let position = parse_point(&parts[coords], line_num, "atom position")?;
    Ok((atomic_number, position))
}

pub struct CubeFile;

impl SnapshotFile for CubeFile {
    type Options = CubeReadOptions;
    type Output = CubeData;
    type Error = CubeError;

    fn read_from(reader: &mut impl BufRead, options: &Self::Options) -> Result<CubeData, CubeError> {
        let mut cursor = LineCursor::new(reader);

        let title = cursor.next_text("first comment line")?;
        let description = cursor.next_text("second comment line")?;

        let (line_num, line) = cursor.next_line("origin line")?;
        let header = parse_origin_line(line, line_num, options.dialect)?;

        let mut grid_dimensions = [0usize; 3];
        let mut grid_spacings = Vector3::zeros();
        for axis in 0..3 {
            let (line_num, line) = cursor.next_line(AXIS_RECORDS[axis])?;
            let (count, spacing) = parse_axis_line(line, line_num, axis, options.skew_policy)?;
            grid_dimensions[axis] = count;
            grid_spacings[axis] = spacing;
        }

        let atom_capacity = header.atom_count.min(PREALLOCATION_LIMIT);
        let mut atomic_numbers = Vec::with_capacity(atom_capacity);
        let mut atomic_positions = Vec::with_capacity(atom_capacity);
        for _ in 0..header.atom_count {
            let (line_num, line) = cursor.next_line("declared atom records ended")?;
            let (atomic_number, position) = parse_atom_line(line, line_num, options.dialect)?;
            atomic_numbers.push(atomic_number);
            atomic_positions.push(position);
        }
        if header.has_dataset_ids {
            cursor.next_text("data-set identifier line")?;
        }

        let expected = grid_dimensions
            .iter()
            .try_fold(1usize, |acc, &n| acc.checked_mul(n))
            .ok_or_else(|| {
                CubeError::UnsupportedFeature(format!(
                    "grid {:?} is too large to address",
                    grid_dimensions
                ))
            })?;

        let mut density = Vec::with_capacity(expected.min(PREALLOCATION_LIMIT));
        while let Some((line_num, line)) = cursor.next_record()? {
            for token in line.split_whitespace() {
                density.push(parse_float(token, line_num, "density value")?);
            }
        }
        if density.len() != expected {
            return Err(CubeError::GridSizeMismatch {
                expected,
                found: density.len(),
            });
        }

        Ok(CubeData {
            comments: [title, description],
            origin: header.origin,
            grid_dimensions,
            grid_spacings,
            atomic_numbers,
            atomic_positions,
            density,
        })
    }
}
