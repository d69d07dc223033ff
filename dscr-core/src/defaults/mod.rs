//! Startup defaults: rate/percent defaults and DSCR message rules.
//!
//! Providers are selected through a [`ProviderRegistry`] keyed by backend
//! name; [`load_defaults`] turns any provider failure into the fixed
//! fallback constants.

pub mod factory;
pub mod provider;

pub use factory::{BuiltinProviderFactory, DefaultsSource, ProviderFactory, ProviderRegistry};
pub use provider::{
    BuiltinDefaultsProvider, DefaultsProvider, Loaded, LoadedDefaults, ProviderError, RateDefaults,
    load_defaults,
};
