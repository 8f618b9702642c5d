//! Categorical column encoding.
//!
//! [`CategoryEncoder`] maps every distinct value of a categorical column to an
//! integer code. Codes follow the sorted order of the distinct values:
//! numerically for columns that hold numbers, lexicographically otherwise.
//!
//! ```ignore
//! // meal: ["Meal Plan 2", "Not Selected", "Meal Plan 1"]
//! // codes: [1, 2, 0]
//! ```

mod category;

pub use category::{CategoryEncoder, CategoryEncoderParams, CategoryMappings, FittedCategoryEncoder};
