//! Scanned height surfaces
//!
//! A [`HeightSurface`] stores the corrected height samples gathered by a
//! raster scan. Points are kept in two representations:
//! - `raw`: serpentine capture order, exactly as the machine visited them
//! - `sorted`: row-major order (rows by increasing Y, columns by increasing X)
//!
//! Capture indices address `raw`. `sorted` only exists after
//! [`HeightSurface::sort_points`] and is what bilinear interpolation reads.

use crate::error::SurfaceError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Hard ceiling on the number of cells a single surface may hold
pub const MAX_SURFACE_SAMPLES: usize = 1_000_000;

/// One surface sample in machine coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SurfacePoint {
    /// X coordinate
    pub x: f32,
    /// Y coordinate
    pub y: f32,
    /// Corrected height
    pub z: f32,
}

impl SurfacePoint {
    /// Create a new point
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Grid of scanned height samples
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeightSurface {
    raw: Vec<SurfacePoint>,
    sorted: Option<Vec<SurfacePoint>>,
    rows: usize,
    cols: usize,
}

impl HeightSurface {
    /// Create an empty surface
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a zero-height grid in serpentine capture order
    ///
    /// Even rows run left to right starting at `left_offset`, odd rows run
    /// right to left. The raster program visits cells in the same order.
    pub fn create_zero_surface(
        width: u32,
        height: u32,
        step: u32,
        left_offset: u32,
    ) -> Result<Self, SurfaceError> {
        let (rows, cols) = Self::grid_shape(width, height, step, left_offset)?;
        let total = rows * cols;
        if total > MAX_SURFACE_SAMPLES {
            return Err(SurfaceError::InvalidGrid(format!(
                "{} samples exceeds the limit of {}",
                total, MAX_SURFACE_SAMPLES
            )));
        }

        let mut raw = Vec::with_capacity(total);
        for row in 0..rows {
            let y = (step as usize * row) as f32;
            for j in 0..cols {
                let col = if row % 2 == 0 { j } else { cols - 1 - j };
                let x = (step as usize * col + left_offset as usize) as f32;
                raw.push(SurfacePoint::new(x, y, 0.0));
            }
        }

        Ok(Self {
            raw,
            sorted: None,
            rows,
            cols,
        })
    }

    /// Rows and columns of the grid a scan request would allocate
    ///
    /// Fails when the parameters are unusable or the cell count does not
    /// fit in `usize`.
    pub fn grid_shape(
        width: u32,
        height: u32,
        step: u32,
        left_offset: u32,
    ) -> Result<(usize, usize), SurfaceError> {
        if step == 0 {
            return Err(SurfaceError::InvalidGrid("step must be > 0".to_string()));
        }
        if left_offset > width {
            return Err(SurfaceError::InvalidGrid(format!(
                "left offset {} exceeds width {}",
                left_offset, width
            )));
        }

        let too_large = || {
            SurfaceError::InvalidGrid(format!(
                "{}x{} grid at step {} is too large",
                width, height, step
            ))
        };
        let rows = usize::try_from(height / step)
            .ok()
            .and_then(|r| r.checked_add(1))
            .ok_or_else(too_large)?;
        let cols = usize::try_from((width - left_offset) / step)
            .ok()
            .and_then(|c| c.checked_add(1))
            .ok_or_else(too_large)?;
        rows.checked_mul(cols).ok_or_else(too_large)?;
        Ok((rows, cols))
    }

    /// Number of samples a scan request would capture
    pub fn sample_count(
        width: u32,
        height: u32,
        step: u32,
        left_offset: u32,
    ) -> Result<usize, SurfaceError> {
        let (rows, cols) = Self::grid_shape(width, height, step, left_offset)?;
        Ok(rows * cols)
    }

    /// Rebuild a surface from a capture-order point list and sort it
    ///
    /// The column count is the length of the leading run of points sharing
    /// the first point's Y. The list must form a complete grid with rows in
    /// increasing Y, visited in serpentine order.
    pub fn from_capture_points(points: Vec<SurfacePoint>) -> Result<Self, SurfaceError> {
        let Some(first) = points.first() else {
            return Err(SurfaceError::Empty);
        };

        let cols = points.iter().take_while(|p| p.y == first.y).count();
        if cols == 0 {
            return Err(SurfaceError::InvalidGrid("first point has no valid Y".to_string()));
        }
        if points.len() % cols != 0 {
            return Err(SurfaceError::InvalidGrid(format!(
                "{} points do not fill rows of {}",
                points.len(),
                cols
            )));
        }
        let rows = points.len() / cols;

        for (row, chunk) in points.chunks(cols).enumerate() {
            if chunk.iter().any(|p| p.y != chunk[0].y) {
                return Err(SurfaceError::InvalidGrid(format!(
                    "row {} mixes Y coordinates",
                    row
                )));
            }
        }

        let row_ys: Vec<f32> = points.chunks(cols).map(|row| row[0].y).collect();
        if let Some(row) = row_ys.windows(2).position(|w| w[1] <= w[0]) {
            return Err(SurfaceError::InvalidGrid(format!(
                "row {} Y {} does not ascend after {}",
                row + 1,
                row_ys[row + 1],
                row_ys[row]
            )));
        }

        let mut surface = Self {
            raw: points,
            sorted: None,
            rows,
            cols,
        };
        surface.sort_points();

        let sorted = surface.sorted()?;
        for (row, chunk) in sorted.chunks(cols).enumerate() {
            if chunk.windows(2).any(|w| w[1].x <= w[0].x) {
                return Err(SurfaceError::InvalidGrid(format!(
                    "row {} is not in serpentine X order",
                    row
                )));
            }
        }
        Ok(surface)
    }

    /// Overwrite the height of the cell at capture index `index`
    ///
    /// The cell keeps its grid X/Y. Returns false when `index` is out of
    /// bounds. Invalidates the sorted representation.
    pub fn update_point(&mut self, index: usize, point: SurfacePoint) -> bool {
        match self.raw.get_mut(index) {
            Some(cell) => {
                cell.z = point.z;
                self.sorted = None;
                true
            }
            None => false,
        }
    }

    /// Derive the row-major representation from capture order
    pub fn sort_points(&mut self) {
        if self.raw.is_empty() {
            return;
        }

        let cols = self.cols;
        let mut sorted = Vec::with_capacity(self.raw.len());
        for (row, chunk) in self.raw.chunks(cols).enumerate() {
            if row % 2 == 0 {
                sorted.extend_from_slice(chunk);
            } else {
                sorted.extend(chunk.iter().rev().copied());
            }
        }
        self.sorted = Some(sorted);
    }

    /// Bilinear interpolation of the height at `(x, y)`
    pub fn interpolate(&self, x: f32, y: f32) -> Result<f32, SurfaceError> {
        let sorted = self.sorted()?;
        let out_of_range = || SurfaceError::OutOfRange { x, y };

        let row_ys: Vec<f32> = sorted.chunks(self.cols).map(|row| row[0].y).collect();
        let (r0, r1, ty) = bracket(&row_ys, y).ok_or_else(out_of_range)?;

        let row_at = |r: usize| &sorted[r * self.cols..(r + 1) * self.cols];
        let z0 = interpolate_row(row_at(r0), x).ok_or_else(out_of_range)?;
        let z1 = interpolate_row(row_at(r1), x).ok_or_else(out_of_range)?;

        Ok(z0 + ty * (z1 - z0))
    }

    /// Row-major points, available after sorting
    pub fn sorted(&self) -> Result<&[SurfacePoint], SurfaceError> {
        self.sorted.as_deref().ok_or(SurfaceError::NotSorted)
    }

    /// Points in capture order
    pub fn points(&self) -> &[SurfacePoint] {
        &self.raw
    }

    /// Point at capture index
    pub fn point(&self, index: usize) -> Option<&SurfacePoint> {
        self.raw.get(index)
    }

    /// True once the row-major representation is current
    pub fn is_sorted(&self) -> bool {
        self.sorted.is_some()
    }

    /// Number of grid rows
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of grid columns
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Number of points
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    /// True when the surface holds no points
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Drop both representations
    pub fn clear(&mut self) {
        self.raw.clear();
        self.sorted = None;
        self.rows = 0;
        self.cols = 0;
    }

    /// Serialize the capture-order point list as JSON
    pub fn to_json(&self) -> Result<String, SurfaceError> {
        Ok(serde_json::to_string(&self.raw)?)
    }

    /// Parse a capture-order point list and sort it
    pub fn from_json(content: &str) -> Result<Self, SurfaceError> {
        let points: Vec<SurfacePoint> = serde_json::from_str(content)?;
        Self::from_capture_points(points)
    }

    /// Save the surface to a JSON file
    ///
    /// Writes a sibling temporary file first and renames it over `path`.
    pub fn save_to_file(&self, path: &Path) -> Result<(), SurfaceError> {
        let content = self.to_json()?;
        let tmp = tmp_path(path);
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, path)?;
        tracing::debug!("Saved {} surface points to {}", self.raw.len(), path.display());
        Ok(())
    }

    /// Load a surface from a JSON file; the result is already sorted
    pub fn load_from_file(path: &Path) -> Result<Self, SurfaceError> {
        let content = std::fs::read_to_string(path)?;
        let surface = Self::from_json(&content)?;
        tracing::debug!(
            "Loaded {}x{} surface from {}",
            surface.rows,
            surface.cols,
            path.display()
        );
        Ok(surface)
    }
}

/// Find the pair of axis samples surrounding `v`
///
/// Returns the two indices and the interpolation weight of the second.
/// Both ends of every bracket are inclusive.
fn bracket(axis: &[f32], v: f32) -> Option<(usize, usize, f32)> {
    match axis {
        [] => None,
        [only] => (v == *only).then_some((0, 0, 0.0)),
        _ => axis
            .windows(2)
            .position(|w| v >= w[0] && v <= w[1])
            .map(|i| {
                let span = axis[i + 1] - axis[i];
                let t = if span != 0.0 { (v - axis[i]) / span } else { 0.0 };
                (i, i + 1, t)
            }),
    }
}

fn interpolate_row(row: &[SurfacePoint], x: f32) -> Option<f32> {
    let xs: Vec<f32> = row.iter().map(|p| p.x).collect();
    let (c0, c1, t) = bracket(&xs, x)?;
    Some(row[c0].z + t * (row[c1].z - row[c0].z))
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Persistence seam for scanned surfaces
pub trait SurfaceStore: Send {
    /// Persist a surface
    fn save(&mut self, surface: &HeightSurface) -> Result<(), SurfaceError>;

    /// Load the last persisted surface
    fn load(&mut self) -> Result<HeightSurface, SurfaceError>;
}

/// Surface store backed by one JSON file per machine
#[derive(Debug, Clone)]
pub struct JsonSurfaceStore {
    path: PathBuf,
}

impl JsonSurfaceStore {
    /// Create a store bound to `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// File backing this store
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SurfaceStore for JsonSurfaceStore {
    fn save(&mut self, surface: &HeightSurface) -> Result<(), SurfaceError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        surface.save_to_file(&self.path)
    }

    fn load(&mut self) -> Result<HeightSurface, SurfaceError> {
        HeightSurface::load_from_file(&self.path)
    }
}
