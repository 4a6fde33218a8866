//! Terminal-facing edge of the kernel.
//!
//! - **keymapper**: crossterm key events to kernel `Key` values
//! - **surface**: terminal commands to crossterm output (or a recorder)

pub mod keymapper;
pub mod surface;

pub use keymapper::KeyMapper;
pub use surface::{CrosstermSurface, RecordingSurface, Surface, SurfaceAdapter};
