//! State Representation
//!
//! Builds the flat state vector consumed by the actor and critic.
//! Layout is fixed: KOL text features first, market features in their
//! source mapping's iteration order, last known position as the final
//! element. The evaluators are position-sensitive over this layout, so
//! segment order must never be permuted.

use serde_json::Value;

/// Ordered name -> value mapping of market features.
///
/// `HashMap` would lose the source ordering, which is part of the state
/// contract, so features are kept as insertion-ordered pairs. JSON
/// objects deserialize in file order (`serde_json` with `preserve_order`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarketFeatures(Vec<(String, f64)>);

impl MarketFeatures {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a feature, keeping insertion order.
    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        self.0.push((name.into(), value));
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Values in insertion order.
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.0.iter().map(|(_, v)| *v)
    }

    /// Build from a JSON object, keeping key order. Non-numeric values
    /// are skipped.
    pub fn from_json_object(map: &serde_json::Map<String, Value>) -> Self {
        let mut features = Self::new();
        for (name, value) in map {
            if let Some(v) = value.as_f64() {
                features.insert(name.clone(), v);
            }
        }
        features
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for MarketFeatures {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(n, v)| (n.into(), v)).collect())
    }
}

/// Concatenates heterogeneous feature groups into one flat state vector.
#[derive(Debug, Clone, Copy, Default)]
pub struct StateBuilder;

impl StateBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Assemble `[kol..., market..., last_position]`.
    ///
    /// Output length is always `kol.len() + market.len() + 1`; empty
    /// inputs degrade to shorter vectors, never fail.
    pub fn build(
        &self,
        market_features: &MarketFeatures,
        kol_features: &[f64],
        last_position: f64,
    ) -> Vec<f64> {
        let mut state = Vec::with_capacity(kol_features.len() + market_features.len() + 1);
        state.extend_from_slice(kol_features);
        state.extend(market_features.values());
        state.push(last_position);
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_order_is_kol_market_position() {
        let market: MarketFeatures =
            [("price", 10.0), ("volume", 2.0)].into_iter().collect();
        let state = StateBuilder::new().build(&market, &[0.5], 0.1);
        assert_eq!(state, vec![0.5, 10.0, 2.0, 0.1]);
    }

    #[test]
    fn length_identity_holds_for_empty_inputs() {
        let builder = StateBuilder::new();
        assert_eq!(builder.build(&MarketFeatures::new(), &[], 0.0), vec![0.0]);

        let market: MarketFeatures = [("x", 1.0)].into_iter().collect();
        assert_eq!(builder.build(&market, &[], -0.3).len(), 2);

        let state = builder.build(&MarketFeatures::new(), &[1.0, 2.0, 3.0], 0.5);
        assert_eq!(state.len(), 4);
    }

    #[test]
    fn market_insertion_order_is_preserved() {
        let mut market = MarketFeatures::new();
        market.insert("zeta", 1.0);
        market.insert("alpha", 2.0);
        let state = StateBuilder::new().build(&market, &[], 0.0);
        assert_eq!(state, vec![1.0, 2.0, 0.0]);
    }

    #[test]
    fn json_object_keeps_file_order_and_skips_non_numeric() {
        let value: serde_json::Value =
            serde_json::from_str(r#"{"volume": 2.0, "note": "n/a", "price": 10.0}"#).unwrap();
        let market = MarketFeatures::from_json_object(value.as_object().unwrap());
        let values: Vec<f64> = market.values().collect();
        assert_eq!(values, vec![2.0, 10.0]);
    }
}
