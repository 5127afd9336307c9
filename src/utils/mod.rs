use crate::models::TeamResult;

/// Convert a most-recent-first result list to a form string (e.g., "WLWDW")
pub fn results_to_form(results: &[TeamResult]) -> String {
    results.iter().map(|r| r.letter()).collect()
}

/// Convert probability to fair decimal odds, floored at 1.01 and rounded to cents
pub fn probability_to_odds(probability: f64) -> f64 {
    let odd = (1.0 / probability.max(1e-6)).max(1.01);
    round2(odd)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Format a probability as a percentage with one decimal
pub fn format_percent(probability: f64) -> String {
    format!("{:.1}%", probability * 100.0)
}

/// Format signed money amounts, e.g. "+12.50" / "-10.00"
pub fn format_money(amount: f64) -> String {
    format!("{:+.2}", amount)
}

/// Simple hash function for generating consistent pseudo-random values
pub fn simple_hash(input: &str) -> u64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    input.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_results_to_form() {
        let results = [TeamResult::Win, TeamResult::Loss, TeamResult::Draw];
        assert_eq!(results_to_form(&results), "WLD");
        assert_eq!(results_to_form(&[]), "");
    }

    #[test]
    fn test_probability_to_odds() {
        assert_eq!(probability_to_odds(0.5), 2.0);
        assert_eq!(probability_to_odds(0.3), 3.33);
        assert_eq!(probability_to_odds(1.0), 1.01);
        assert!(probability_to_odds(0.0) > 100.0);
    }

    #[test]
    fn test_formatting() {
        assert_eq!(format_percent(0.4567), "45.7%");
        assert_eq!(format_money(0.8), "+0.80");
        assert_eq!(format_money(-10.0), "-10.00");
    }

    #[test]
    fn test_simple_hash_is_stable() {
        assert_eq!(simple_hash("flamengo"), simple_hash("flamengo"));
        assert_ne!(simple_hash("flamengo"), simple_hash("palmeiras"));
    }
}
