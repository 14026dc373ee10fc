pub mod bids;
pub mod processor;
pub mod summary;
pub mod trial;

pub use bids::{Bid, TemporalBids};
pub use processor::{Processor, ProcessorOptions};
pub use summary::{Summary, SummaryFormat};
pub use trial::{Trial, match_trials};
