// src/action/owner.rs

use std::fmt;

/// Provenance of an action: the rule instance that declared it.
///
/// Only used for attribution in logs and reports; no execution behaviour
/// depends on its contents.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActionOwner {
    label: String,
    location: Option<String>,
    configuration: Option<String>,
}

impl ActionOwner {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            location: None,
            configuration: None,
        }
    }

    /// Where the rule was declared, e.g. `Genspawn.toml:12`.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Name of the configuration the rule was analysed in.
    pub fn with_configuration(mut self, configuration: impl Into<String>) -> Self {
        self.configuration = Some(configuration.into());
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn configuration(&self) -> Option<&str> {
        self.configuration.as_deref()
    }
}

impl fmt::Display for ActionOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)?;
        if let Some(cfg) = &self.configuration {
            write!(f, " ({cfg})")?;
        }
        Ok(())
    }
}
