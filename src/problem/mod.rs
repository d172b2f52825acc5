//! Problem catalog provider
//!
//! The catalog of selectable problem identifiers is supplied by the external
//! problem-content collaborator at startup and treated as a static read-only
//! list. Selection is independent per call: nothing prevents the same
//! problem from being chosen for consecutive sessions.

use crate::error::{DuelError, Result};
use crate::types::ProblemId;
use rand::seq::SliceRandom;

/// Trait for supplying problem identifiers to new sessions
pub trait ProblemProvider: Send + Sync {
    /// Pick one problem id uniformly at random from the catalog
    fn select(&self) -> ProblemId;

    /// All selectable problem ids
    fn catalog(&self) -> &[ProblemId];
}

/// Static problem catalog backed by the configured identifier list
#[derive(Debug, Clone)]
pub struct StaticProblemCatalog {
    problems: Vec<ProblemId>,
}

impl StaticProblemCatalog {
    /// Create a catalog from the configured problem list.
    /// A non-empty catalog is a startup precondition.
    pub fn new(problems: Vec<ProblemId>) -> Result<Self> {
        if problems.is_empty() {
            return Err(DuelError::ConfigurationError {
                message: "Problem catalog cannot be empty".to_string(),
            }
            .into());
        }
        Ok(Self { problems })
    }
}

impl ProblemProvider for StaticProblemCatalog {
    fn select(&self) -> ProblemId {
        // Catalog is validated non-empty at construction.
        self.problems
            .choose(&mut rand::thread_rng())
            .cloned()
            .unwrap_or_else(|| self.problems[0].clone())
    }

    fn catalog(&self) -> &[ProblemId] {
        &self.problems
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_catalog() -> StaticProblemCatalog {
        StaticProblemCatalog::new(vec![
            "two-sum".to_string(),
            "valid-parens".to_string(),
            "merge-intervals".to_string(),
        ])
        .unwrap()
    }

    #[test]
    fn test_select_returns_catalog_member() {
        let catalog = test_catalog();
        for _ in 0..50 {
            let problem = catalog.select();
            assert!(catalog.catalog().contains(&problem));
        }
    }

    #[test]
    fn test_empty_catalog_rejected() {
        assert!(StaticProblemCatalog::new(vec![]).is_err());
    }

    #[test]
    fn test_single_problem_catalog() {
        let catalog = StaticProblemCatalog::new(vec!["two-sum".to_string()]).unwrap();
        assert_eq!(catalog.select(), "two-sum");
    }
}
