// External prediction service adapter
pub mod prediction_client;

// Estimation with external-then-local fallback
pub mod spoilage;

pub use prediction_client::{HttpPredictionClient, PredictionBackend};
pub use spoilage::{PredictionServiceStatus, SpoilageService};
