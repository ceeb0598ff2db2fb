use crate::ConfigError;

/// Case-insensitive name filter applied to top-level categories
///
/// A category is retained when its name contains the filter text, ignoring
/// case. Surrounding whitespace in the filter is ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryFilter {
    needle: String,
    original: String,
}

impl CategoryFilter {
    /// Parses the positional command-line filter
    ///
    /// # Errors
    ///
    /// * `ConfigError::InvalidFilter` - the filter is blank or contains
    ///   control characters
    ///
    /// # Example
    ///
    /// ```
    /// use catalog_mapper::config::CategoryFilter;
    ///
    /// let filter = CategoryFilter::parse("Shoes").unwrap();
    /// assert!(filter.matches("Running SHOES"));
    /// assert!(!filter.matches("Bags"));
    /// assert!(CategoryFilter::parse("   ").is_err());
    /// ```
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let trimmed = raw.trim();

        if trimmed.is_empty() {
            return Err(ConfigError::InvalidFilter(
                "category filter cannot be blank".to_string(),
            ));
        }

        if trimmed.chars().any(char::is_control) {
            return Err(ConfigError::InvalidFilter(format!(
                "category filter contains control characters: {:?}",
                raw
            )));
        }

        Ok(Self {
            needle: trimmed.to_lowercase(),
            original: trimmed.to_string(),
        })
    }

    /// Returns true if the category name passes the filter
    pub fn matches(&self, name: &str) -> bool {
        name.to_lowercase().contains(&self.needle)
    }

    /// The filter as the user typed it (trimmed)
    pub fn as_str(&self) -> &str {
        &self.original
    }
}
