pub mod collector;
pub mod rater;

pub use collector::{Collected, CollectionReport, CommitCollector};
pub use rater::{top_rated, BatchOutcome, CommitRater, RatingReport};
