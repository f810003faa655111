//! Source priority for a resolution request.

use heatcheck_core::ScannedCode;

/// One source attempt in a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Scan cache lookup keyed by the original code.
    Cache,
    /// Barcode registry title, then a marketplace search for that title.
    RegistryThenMarketplace,
    /// Marketplace search with the code itself as the query.
    Marketplace,
}

/// Ordered sources to try; the first success wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionPlan {
    steps: Vec<Step>,
}

impl ResolutionPlan {
    /// Cheapest first: the cache always leads, the registry is only tried for
    /// barcode-shaped codes, and the marketplace search comes last.
    #[must_use]
    pub fn for_code(code: &ScannedCode) -> Self {
        let steps = if code.is_barcode() {
            vec![Step::Cache, Step::RegistryThenMarketplace, Step::Marketplace]
        } else {
            vec![Step::Cache, Step::Marketplace]
        };
        Self { steps }
    }

    /// Steps in priority order.
    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_barcode_plan() {
        let code = ScannedCode::parse("012345678905").unwrap();
        assert_eq!(
            ResolutionPlan::for_code(&code).steps(),
            &[Step::Cache, Step::RegistryThenMarketplace, Step::Marketplace]
        );
    }

    #[test]
    fn test_free_text_plan_skips_registry() {
        let code = ScannedCode::parse("DH6927-111").unwrap();
        assert_eq!(
            ResolutionPlan::for_code(&code).steps(),
            &[Step::Cache, Step::Marketplace]
        );
    }

    #[test]
    fn test_short_digit_run_is_free_text() {
        let code = ScannedCode::parse("555088").unwrap();
        assert!(!ResolutionPlan::for_code(&code)
            .steps()
            .contains(&Step::RegistryThenMarketplace));
    }
}
