pub mod elasticity;
pub mod models;
pub mod pricing;
pub mod rationale;

pub use elasticity::{estimate_price_elasticity, ElasticityEstimate, EstimationFailure};
pub use models::{PricingRecommendation, PricingRequest};
pub use pricing::{DemandSource, PriceOptimizer, PriceRegime, PricingPolicy};
pub use rationale::Rationale;
