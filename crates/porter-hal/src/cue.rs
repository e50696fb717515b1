//! Audio cue output.

use porter_types::{Cue, PorterError};

/// Something that can play a [`Cue`] (the brick speaker, a log line, …).
pub trait CuePlayer: Send {
    /// Play `cue`, blocking until it has finished.
    ///
    /// # Errors
    ///
    /// Returns [`PorterError::HardwareFault`] if the cue cannot be played.
    fn play(&mut self, cue: Cue) -> Result<(), PorterError>;
}
