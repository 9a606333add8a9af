/// Isogrid Core Library - grid/pixel transforms and voxel projection
///
/// This library provides the pure geometry for mapping an authoring grid
/// into window pixels: invertible affine transforms, a pan/zoom/rotate
/// editing session, and extrusion of grid cells into shaded voxel faces.

pub mod editor;
pub mod error;
pub mod geometry;
pub mod grid;
pub mod projection;
pub mod scene;
pub mod script;
pub mod transform;

// Re-export commonly used types
pub use editor::{DrainReport, Edit, EditQueue, EditSender, EditTotals, SharedEditor, TransformEditor};
pub use error::{GeometryError, Result};
pub use geometry::{Face, GridCell, LineSeg, Point, Shade, Vector};
pub use grid::{Grid, HitTester};
pub use projection::{Voxel, VoxelProjector};
pub use scene::{Scene, SceneConfig};
pub use script::{load_scene, parse_script, Command, ScriptError, Statement, MAX_GRID_SIZE};
pub use transform::{AffineTransform, Epsilon};
