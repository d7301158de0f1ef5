pub mod dispatch;

use crate::config::ModelRule;

/// Maps Front model identifiers to upstream model identifiers through an
/// ordered prefix table. The first matching prefix wins; no match resolves
/// to the input itself.
#[derive(Debug, Clone, Default)]
pub struct ModelResolver {
    rules: Vec<ModelRule>,
}

impl ModelResolver {
    #[must_use]
    pub fn new(rules: Vec<ModelRule>) -> Self {
        Self { rules }
    }

    #[must_use]
    pub fn resolve<'a>(&'a self, model: &'a str) -> &'a str {
        self.rules
            .iter()
            .find(|rule| model.starts_with(rule.prefix.as_str()))
            .map_or(model, |rule| rule.target.as_str())
    }

    #[must_use]
    pub fn rules(&self) -> &[ModelRule] {
        &self.rules
    }
}
