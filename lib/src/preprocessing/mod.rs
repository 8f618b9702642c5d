//! Table preprocessing for the booking dataset.
//!
//! Transformers follow the same fit/apply split as the models in this crate:
//!
//! - [`Transformer`]: unfitted settings, learns from a table
//! - [`FittedTransformer`]: learned state, transforms tables and serializes
//!
//! # Available steps
//!
//! - [`CategoryEncoder`]: categorical values → integer codes
//! - [`SkewCorrector`]: `ln(1 + x)` on columns above a skewness threshold
//! - [`Smote`]: synthetic minority oversampling of the training split
//! - [`FeatureSelector`]: keep the features with the largest boosted-tree gain
//!
//! [`DataProcessor`] chains them into the preprocessing stage.

pub mod encoding;
pub mod feature_selection;
pub mod processor;
pub mod skew;
pub mod smote;
pub mod traits;

pub use encoding::{
    CategoryEncoder, CategoryEncoderParams, CategoryMappings, FittedCategoryEncoder,
};
pub use feature_selection::{FeatureSelector, FittedFeatureSelector};
pub use processor::{DataProcessor, CATEGORY_ENCODER_FILE, CATEGORY_MAPPINGS_FILE};
pub use skew::{skewness, FittedSkewCorrector, SkewCorrector};
pub use smote::{class_counts, Smote};
pub use traits::{FittedTransformer, Transformer};
