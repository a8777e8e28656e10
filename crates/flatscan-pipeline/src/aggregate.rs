//! Image-level reduction of panel verdicts.

use crate::types::{ImageVerdict, PipelineError};

/// Reduce panel flatness flags to one image verdict.
///
/// The image is flat only if every panel is flat. Panel size and count do
/// not matter.
///
/// # Errors
///
/// Returns [`PipelineError::NoPanelsDetected`] for an empty sequence.
pub fn aggregate(panels: impl IntoIterator<Item = bool>) -> Result<ImageVerdict, PipelineError> {
    let mut seen = false;
    for flat in panels {
        seen = true;
        if !flat {
            return Ok(ImageVerdict::NotFlat);
        }
    }
    if seen {
        Ok(ImageVerdict::Flat)
    } else {
        Err(PipelineError::NoPanelsDetected)
    }
}
