/// Scene driver: the list of grid cells to extrude, and its defaults
use std::num::NonZeroUsize;

use crate::error::{GeometryError, Result};
use crate::geometry::{Face, GridCell};
use crate::grid::Grid;
use crate::projection::{Voxel, VoxelProjector};
use crate::transform::{AffineTransform, Epsilon};

/// Session defaults for a scene
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneConfig {
    pub grid_size: u32,
    pub transform: AffineTransform,
    pub default_height: f64,
    /// Pixels of vertical lift per unit of voxel height
    pub height_scale: f64,
    pub epsilon: Epsilon,
}

impl SceneConfig {
    /// An isometric-looking transform that fits a `grid_size` grid into a
    /// `width × height` pixel area.
    ///
    /// Grid `+x` runs right and up the screen, grid `+y` runs right and down,
    /// so each cell's left and right faces point at the viewer.
    pub fn fitted(width: u32, height: u32, grid_size: u32, max_height: f64) -> Self {
        let n = grid_size.max(1) as f64;
        let (w, h) = (width as f64, height as f64);
        // Horizontal extent is 2·s·n; vertical is s·n plus the tallest lift.
        let s = ((w - 2.0) / (2.0 * n))
            .min((h - 2.0) / (n + 0.5 * max_height))
            .max(0.5);
        let height_scale = s / 2.0;
        let left = (w - 2.0 * s * n) / 2.0;
        let mid = (h + max_height * height_scale) / 2.0;

        Self {
            grid_size,
            transform: AffineTransform::new(s, s, -s / 2.0, s / 2.0, left, mid),
            default_height: 1.0,
            height_scale,
            epsilon: Epsilon::Auto,
        }
    }

    pub fn grid(&self) -> Grid {
        Grid::new(self.grid_size)
    }

    /// A projector for `transform` using this config's height scale
    pub fn projector(&self, transform: AffineTransform) -> Result<VoxelProjector> {
        VoxelProjector::new(transform).with_height_scale(self.height_scale)
    }
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            grid_size: 10,
            transform: AffineTransform::new(20.0, 5.0, 0.0, -10.0, 200.0, 300.0),
            default_height: 1.0,
            height_scale: 1.0,
            epsilon: Epsilon::Auto,
        }
    }
}

/// An ordered list of cells with heights, projected on demand
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    cells: Vec<(GridCell, f64)>,
}

impl Scene {
    pub fn new() -> Self {
        Self { cells: Vec::new() }
    }

    /// Every cell of `grid` at the same height
    pub fn from_grid(grid: &Grid, height: f64) -> Result<Self> {
        Self::from_grid_with(grid, |_, _| height)
    }

    /// Every cell of `grid`, with heights chosen per cell index
    pub fn from_grid_with(grid: &Grid, height_of: impl Fn(u32, u32) -> f64) -> Result<Self> {
        let mut scene = Self::new();
        for (x, y, cell) in grid.cells() {
            scene.push(cell, height_of(x, y))?;
        }
        Ok(scene)
    }

    pub fn push(&mut self, cell: GridCell, height: f64) -> Result<()> {
        if !(height.is_finite() && height >= 0.0) {
            return Err(GeometryError::InvalidHeight(height));
        }
        self.cells.push((cell, height));
        Ok(())
    }

    pub fn cells(&self) -> &[(GridCell, f64)] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Smallest square grid size whose extent covers every cell corner
    pub fn grid_extent(&self) -> u32 {
        let far = self
            .cells
            .iter()
            .flat_map(|(cell, _)| cell.corners().iter())
            .map(|p| p.x.max(p.y))
            .fold(0.0, f64::max);
        far.ceil().clamp(1.0, u32::MAX as f64) as u32
    }

    /// Tallest cell height, or 0 for an empty scene
    pub fn max_height(&self) -> f64 {
        self.cells.iter().map(|(_, h)| *h).fold(0.0, f64::max)
    }

    /// Project every cell, ordered far to near for overdrawing renderers
    pub fn project(&self, projector: &VoxelProjector) -> Result<Vec<Voxel>> {
        let mut voxels = projector.project_all(&self.cells)?;
        sort_far_to_near(&mut voxels);
        Ok(voxels)
    }

    /// As [`Scene::project`], spread across `workers` threads
    pub fn project_parallel(
        &self,
        projector: &VoxelProjector,
        workers: NonZeroUsize,
    ) -> Result<Vec<Voxel>> {
        let mut voxels = projector.project_parallel(&self.cells, workers)?;
        sort_far_to_near(&mut voxels);
        Ok(voxels)
    }

    /// All faces in draw order
    pub fn faces(&self, projector: &VoxelProjector) -> Result<Vec<Face>> {
        Ok(self
            .project(projector)?
            .iter()
            .flat_map(|voxel| voxel.faces().map(|face| *face))
            .collect())
    }
}

fn sort_far_to_near(voxels: &mut [Voxel]) {
    voxels.sort_by(|a, b| a.base_depth().total_cmp(&b.base_depth()));
}
