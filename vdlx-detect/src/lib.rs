pub mod confidence_blink;
pub mod gap_blink;
pub mod peak;

pub use confidence_blink::{Blink, ConfidenceBlinkConfig, ConfidenceBlinkDetector};
pub use gap_blink::{GapBlinkConfig, GapBlinkDetector, GazeDataMiss};
pub use peak::{Peak, PeakConfig, PeakDetector, PeakDirection};
