pub mod classifier_trait;
pub mod logistic;
pub mod pipeline;

pub use classifier_trait::ProbabilisticClassifier;
pub use logistic::{LogisticParams, LogisticRegressionModel};
pub use pipeline::HeartRiskPipeline;
