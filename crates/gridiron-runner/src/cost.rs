//! Per-expert LLM cost tracking.
//!
//! Token spend is money; the tracker accumulates it per expert in
//! [`Decimal`] so operational reports never suffer float drift. Prices
//! are per million tokens, set from the provider's published rates.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use gridiron_types::ExpertId;

/// Tokens per pricing unit (prices are per million tokens).
const PRICING_UNIT: u64 = 1_000_000;

/// Accumulates LLM spend per expert.
#[derive(Debug, Clone)]
pub struct CostTracker {
    /// Price per million input tokens.
    input_price: Decimal,
    /// Price per million output tokens.
    output_price: Decimal,
    /// Accumulated spend per expert.
    spend: BTreeMap<ExpertId, Decimal>,
}

impl CostTracker {
    /// Tracker with the given per-million-token prices.
    pub const fn new(input_price: Decimal, output_price: Decimal) -> Self {
        Self {
            input_price,
            output_price,
            spend: BTreeMap::new(),
        }
    }

    /// Record one call's token usage for an expert.
    pub fn record(&mut self, expert_id: ExpertId, input_tokens: u64, output_tokens: u64) {
        let cost = Self::call_cost(self.input_price, input_tokens)
            .checked_add(Self::call_cost(self.output_price, output_tokens))
            .unwrap_or(Decimal::ZERO);

        let entry = self.spend.entry(expert_id).or_insert(Decimal::ZERO);
        *entry = entry.checked_add(cost).unwrap_or(*entry);
    }

    /// Accumulated spend for one expert.
    pub fn spend_for(&self, expert_id: ExpertId) -> Decimal {
        self.spend.get(&expert_id).copied().unwrap_or(Decimal::ZERO)
    }

    /// Total spend across all experts.
    pub fn total_spend(&self) -> Decimal {
        self.spend
            .values()
            .fold(Decimal::ZERO, |acc, v| acc.checked_add(*v).unwrap_or(acc))
    }

    fn call_cost(price_per_million: Decimal, tokens: u64) -> Decimal {
        Decimal::from(tokens)
            .checked_mul(price_per_million)
            .and_then(|c| c.checked_div(Decimal::from(PRICING_UNIT)))
            .unwrap_or(Decimal::ZERO)
    }
}
