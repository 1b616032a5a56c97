/// Accumulated token usage for one pipeline stage (spec §4.5 "Cache
/// metrics"). `total_input_tokens` includes the cached portion.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheMetrics {
    pub total_input_tokens: u64,
    pub cached_tokens: u64,
    pub output_tokens: u64,
}

impl CacheMetrics {
    pub fn accumulate(&mut self, tokens_input: u32, tokens_output: u32, tokens_cached: u32) {
        self.total_input_tokens += tokens_input as u64;
        self.output_tokens += tokens_output as u64;
        self.cached_tokens += tokens_cached as u64;
    }

    pub fn cache_hit_rate(&self) -> f64 {
        if self.total_input_tokens == 0 {
            0.0
        } else {
            self.cached_tokens as f64 / self.total_input_tokens as f64
        }
    }

    /// Estimated cost saving in the provider's currency, given its uncached
    /// and cached per-million-token input rates (spec §6
    /// `taste_filter`-adjacent cost config).
    pub fn estimated_cost_saving(&self, uncached_rate_per_million: f64, cached_rate_per_million: f64) -> f64 {
        let cached = self.cached_tokens as f64;
        let full_price = cached * uncached_rate_per_million / 1_000_000.0;
        let discounted_price = cached * cached_rate_per_million / 1_000_000.0;
        (full_price - discounted_price).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_rate_and_savings_are_computed_from_accumulated_tokens() {
        let mut metrics = CacheMetrics::default();
        metrics.accumulate(1000, 200, 800);
        assert!((metrics.cache_hit_rate() - 0.8).abs() < 1e-9);
        let saving = metrics.estimated_cost_saving(3.0, 0.3);
        assert!(saving > 0.0);
    }

    #[test]
    fn empty_metrics_have_zero_hit_rate() {
        let metrics = CacheMetrics::default();
        assert_eq!(metrics.cache_hit_rate(), 0.0);
    }
}
