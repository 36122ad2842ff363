pub mod geometry;
pub mod landmark;
pub mod normalize;
pub mod source;

pub use geometry::{angle, cosine_similarity, distance, weighted_distance};
pub use landmark::{average_visibility, Landmark, LandmarkIndex, Pose};
pub use normalize::{NormalizedVector, Normalizer};
pub use source::{LandmarkDetector, VideoSource};
