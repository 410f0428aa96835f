//! Scanline polygon fill engine.
//!
//! Converts flattened path geometry (figures made of straight segments)
//! into per-pixel fill coverage for an arbitrary row range:
//!
//!    path  = RawPath( RawFigure( vertices ) )
//!    table = EdgeTable::build( path, rounding unit )
//!    fill_path_solid / fill_path_aa
//!      context.move_next_row()
//!        active.enter() / active.leave()
//!      context.scan_current_row()
//!        active.scan_line()  -- sorted span boundaries per fill rule
//!      sink.solid_scanline() / sink.coverage_scanline()
//!
//! Two fill rules (Alternate even-odd and NonZero winding) and two
//! precisions (1-bit Solid, f32 16x16-subpixel AntiAliasing). Coverage
//! is handed to a sink per finished row; blending, quantization and
//! bitmap I/O live outside this crate.

pub mod path;
pub mod edge;
pub mod active;
pub mod buffer;
pub mod scanner;
pub mod fill;

pub use crate::path::*;
pub use crate::edge::*;
pub use crate::active::*;
pub use crate::buffer::*;
pub use crate::scanner::*;
pub use crate::fill::*;

/// Subpixel rows swept per pixel row in AntiAliasing mode.
pub const SUBPIXEL_COUNT: u32 = 16;
/// Height of one subpixel row.
pub const SUBPIXEL_SIZE: f32 = 1.0 / SUBPIXEL_COUNT as f32;

/// Vertex-Y rounding unit for Solid scanning.
pub const SOLID_ROUNDING_UNIT: f32 = 0.25;
/// Vertex-Y rounding unit for AntiAliasing scanning.
pub const AA_ROUNDING_UNIT: f32 = SUBPIXEL_SIZE;

/// Tie-breaking offset applied to NonZero sort keys. Must stay below
/// every rounding unit so it can never reorder distinct intersections.
pub const SORT_STABILIZER_DELTA: f64 = 1.0 / 512.0;
