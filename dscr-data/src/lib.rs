pub mod loader;
pub mod provider;

pub use loader::{MessageRuleLoader, MessageRuleLoaderError, MessageRuleRecord};
pub use provider::{FileDefaultsProvider, FileProviderFactory};
