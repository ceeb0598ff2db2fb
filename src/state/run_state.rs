use std::fmt;

/// Stage of a run at which a branch degraded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunStage {
    /// Fetching the base URL to pick seed products
    Seeds,
    /// Fetching a seed product page for category hints
    SeedProduct,
    /// Fetching a category listing page for subcategories
    CategoryPage,
    /// Paging through a leaf's product listing
    Listing,
    /// Resolving the category tree before harvesting
    Tree,
}

impl RunStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStage::Seeds => "seeds",
            RunStage::SeedProduct => "seed-product",
            RunStage::CategoryPage => "category-page",
            RunStage::Listing => "listing",
            RunStage::Tree => "tree",
        }
    }
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A degraded branch of a run: a skipped seed, category or leaf tail
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunWarning {
    pub stage: RunStage,
    pub url: String,
    pub message: String,
}

impl RunWarning {
    pub fn new(stage: RunStage, url: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            stage,
            url: url.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for RunWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.stage, self.url, self.message)
    }
}

/// How a run that reached the flush ended
///
/// Fatal runs never produce a status; they surface as a `CatalogError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    CompletedWithWarnings,
}

impl RunStatus {
    pub fn from_warnings(warnings: &[RunWarning]) -> Self {
        if warnings.is_empty() {
            RunStatus::Completed
        } else {
            RunStatus::CompletedWithWarnings
        }
    }

    /// Process exit code for this status
    pub fn exit_code(&self) -> u8 {
        match self {
            RunStatus::Completed => 0,
            RunStatus::CompletedWithWarnings => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Completed => "completed",
            RunStatus::CompletedWithWarnings => "completed_with_warnings",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_warnings() {
        assert_eq!(RunStatus::from_warnings(&[]), RunStatus::Completed);

        let warnings = vec![RunWarning::new(
            RunStage::Listing,
            "https://shop.example/product-category/bags/page/2/",
            "HTTP 503",
        )];
        assert_eq!(
            RunStatus::from_warnings(&warnings),
            RunStatus::CompletedWithWarnings
        );
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(RunStatus::Completed.exit_code(), 0);
        assert_eq!(RunStatus::CompletedWithWarnings.exit_code(), 2);
    }

    #[test]
    fn test_warning_display() {
        let warning =
            RunWarning::new(RunStage::CategoryPage, "https://shop.example/c/", "timed out");
        assert_eq!(warning.to_string(), "[category-page] https://shop.example/c/: timed out");
    }
}
