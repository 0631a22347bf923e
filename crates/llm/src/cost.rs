//! Static cost table and token estimates.

use crate::types::ProviderId;

/// USD per million tokens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProviderCost {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

pub fn provider_cost(provider: ProviderId) -> ProviderCost {
    let (input, output) = match provider {
        ProviderId::OpenAi => (0.05, 0.4),
        ProviderId::Google => (0.075, 0.3),
        ProviderId::Minimax => (0.3, 1.2),
        ProviderId::NvidiaKimi => (0.2, 0.8),
    };
    ProviderCost {
        input_per_million: input,
        output_per_million: output,
    }
}

/// Static ranking input: cheaper providers rank lower.
pub fn base_cost_rank(provider: ProviderId) -> f64 {
    let cost = provider_cost(provider);
    cost.input_per_million + cost.output_per_million
}

/// Roughly four characters per token, never less than one token.
pub fn estimate_tokens(text: &str) -> u64 {
    let chars = text.chars().count() as u64;
    chars.div_ceil(4).max(1)
}

/// Round to `places` decimal places.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Estimated spend for one call, rounded to 8 decimals.
pub fn estimate_cost_usd(provider: ProviderId, input_tokens: u64, output_tokens: u64) -> f64 {
    let cost = provider_cost(provider);
    let raw = (input_tokens as f64 / 1_000_000.0) * cost.input_per_million
        + (output_tokens as f64 / 1_000_000.0) * cost.output_per_million;
    round_to(raw, 8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_estimate() {
        assert_eq!(estimate_tokens(""), 1);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
    }

    #[test]
    fn test_rank_orders_cheapest_first() {
        let mut ids = ProviderId::ALL.to_vec();
        ids.sort_by(|a, b| base_cost_rank(*a).total_cmp(&base_cost_rank(*b)));
        assert_eq!(
            ids,
            vec![
                ProviderId::Google,
                ProviderId::OpenAi,
                ProviderId::NvidiaKimi,
                ProviderId::Minimax
            ]
        );
    }

    #[test]
    fn test_cost_estimate() {
        let cost = estimate_cost_usd(ProviderId::OpenAi, 1_000_000, 1_000_000);
        assert!((cost - 0.45).abs() < 1e-9);
        assert_eq!(estimate_cost_usd(ProviderId::Google, 0, 0), 0.0);
        assert_eq!(round_to(0.123456789, 8), 0.12345679);
    }
}
