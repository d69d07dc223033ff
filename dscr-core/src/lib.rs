pub mod calculations;
pub mod defaults;
pub mod models;
pub mod session;
pub mod url_codec;

pub use calculations::{DscrCalculator, Recompute, recompute};
pub use defaults::{DefaultsProvider, DefaultsSource, ProviderError, ProviderRegistry};
pub use models::*;
pub use session::{FieldEdit, FieldEditError, Session};
