use anyhow::Context;
use dscr_core::defaults::{BuiltinProviderFactory, DefaultsSource, ProviderRegistry};
use dscr_core::{FieldEdit, FieldEditError, Session};
use dscr_data::FileProviderFactory;
use tracing::{debug, info};

/// Registry with every defaults backend the binary knows about.
pub fn build_registry() -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();
    registry.register(Box::new(BuiltinProviderFactory));
    registry.register(Box::new(FileProviderFactory));
    registry
}

/// Splits a `key=value` argument. Used as a clap value parser.
pub fn parse_assignment(arg: &str) -> Result<(String, String), String> {
    let (key, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{arg}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing field name in '{arg}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

/// Inputs for one calculator session.
#[derive(Debug, Clone, Default)]
pub struct SessionRequest {
    /// Shareable-link query (or whole link) to import after the defaults.
    pub query: Option<String>,
    /// Field edits applied in order after the import.
    pub edits: Vec<(String, String)>,
}

/// Parses every edit before any is applied, so a bad key leaves no
/// half-edited session behind.
pub fn parse_edits(edits: &[(String, String)]) -> Result<Vec<FieldEdit>, FieldEditError> {
    edits
        .iter()
        .map(|(key, value)| FieldEdit::parse(key, value))
        .collect()
}

/// Creates the configured provider, initializes a session and applies the
/// requested edits.
pub async fn prepare_session(
    registry: &ProviderRegistry,
    source: &DefaultsSource,
    request: &SessionRequest,
) -> anyhow::Result<Session> {
    let edits = parse_edits(&request.edits).context("invalid --set argument")?;

    debug!(backend = %source.backend, location = %source.location, "creating defaults provider");
    let provider = registry
        .create(source)
        .await
        .with_context(|| format!("cannot use defaults backend '{}'", source.backend))?;

    let mut session = Session::initialize(provider.as_ref(), request.query.as_deref()).await;
    for edit in edits {
        session.apply(edit);
    }
    info!(edits = request.edits.len(), "session ready");
    Ok(session)
}
