//! Image warping
//!
//! Georeferencing and reprojection of whole rasters: the image
//! transformer chaining pixel georeferencing with a reference change,
//! output grid suggestion, the resampling engine and the processes that
//! drive them from files.

mod engine;
mod history;
mod parameters;
mod process;
mod resample;
mod suggest;
mod transformer;

pub use self::engine::{warp, WarpOptions, DEFAULT_CHUNK_LINES};
pub use self::history::{keys, ProcessHistory, GEOREFERENCE_PROCESS, PROCESS_HISTORY, REPROJECTION_PROCESS};
pub use self::parameters::ReprojectionParameters;
pub use self::process::{GeoreferenceProcess, Process, ReprojectionProcess};
pub use self::resample::{bilinear, nearest, ResamplingMethod};
pub use self::suggest::{covering_count, suggest_output, SuggestedOutput, RETRY_RATIOS};
pub use self::transformer::{ImageTransformer, PixelGeoreference};
