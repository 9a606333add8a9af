/// Voxel extrusion: grid cells to shaded pixel-space faces
use std::num::NonZeroUsize;
use std::thread;

use crate::error::{GeometryError, Result};
use crate::geometry::{Face, GridCell, Point, Shade};
use crate::transform::AffineTransform;

/// The three visible faces of one extruded grid cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Voxel {
    pub top: Face,
    pub left: Face,
    pub right: Face,
    /// Pixel-space base corners `P0..P3`
    pub base: [Point; 4],
}

impl Voxel {
    /// Faces in painter's order: sides first, top last
    pub fn faces(&self) -> [&Face; 3] {
        [&self.left, &self.right, &self.top]
    }

    /// Largest pixel-space y of the base, i.e. how close the voxel sits to the viewer
    pub fn base_depth(&self) -> f64 {
        self.base.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max)
    }
}

/// Projects grid cells through a fixed transform.
///
/// The projector trusts its transform: validating `Δ` is the caller's job.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoxelProjector {
    transform: AffineTransform,
    height_scale: f64,
}

impl VoxelProjector {
    pub fn new(transform: AffineTransform) -> Self {
        Self {
            transform,
            height_scale: 1.0,
        }
    }

    /// Pixels of vertical offset per unit of height (default 1)
    pub fn with_height_scale(mut self, height_scale: f64) -> Result<Self> {
        if !(height_scale.is_finite() && height_scale >= 0.0) {
            return Err(GeometryError::InvalidHeightScale(height_scale));
        }
        self.height_scale = height_scale;
        Ok(self)
    }

    pub fn transform(&self) -> &AffineTransform {
        &self.transform
    }

    pub fn height_scale(&self) -> f64 {
        self.height_scale
    }

    /// Extrude `cell` by `height` and return its top, left and right faces.
    pub fn project(&self, cell: &GridCell, height: f64) -> Result<Voxel> {
        if !(height.is_finite() && height >= 0.0) {
            return Err(GeometryError::InvalidHeight(height));
        }

        let base = cell.corners().map(|p| self.transform.apply_to_point(&p));
        // Pixel y grows downward, so raising a point subtracts from y.
        let lift = height * self.height_scale;
        let top = base.map(|p| Point::new(p.x, p.y - lift));

        log::trace!("projected cell {:?} at height {} to {:?}", cell.corners(), height, top);

        Ok(Voxel {
            top: Face::new(top, Shade::Top),
            left: Face::new([base[0], base[1], top[1], top[0]], Shade::Left),
            right: Face::new([base[1], base[2], top[2], top[1]], Shade::Right),
            base,
        })
    }

    /// Project a batch of cells in order
    pub fn project_all(&self, cells: &[(GridCell, f64)]) -> Result<Vec<Voxel>> {
        cells
            .iter()
            .map(|(cell, height)| self.project(cell, *height))
            .collect()
    }

    /// Project a batch across up to `workers` scoped threads, keeping input order.
    pub fn project_parallel(
        &self,
        cells: &[(GridCell, f64)],
        workers: NonZeroUsize,
    ) -> Result<Vec<Voxel>> {
        if cells.is_empty() {
            return Ok(Vec::new());
        }

        let chunk_size = cells.len().div_ceil(workers.get());
        thread::scope(|scope| -> Result<Vec<Voxel>> {
            let handles: Vec<_> = cells
                .chunks(chunk_size)
                .map(|chunk| scope.spawn(move || self.project_all(chunk)))
                .collect();

            let mut voxels = Vec::with_capacity(cells.len());
            for handle in handles {
                let chunk = handle
                    .join()
                    .unwrap_or_else(|payload| std::panic::resume_unwind(payload))?;
                voxels.extend(chunk);
            }
            Ok(voxels)
        })
    }
}
