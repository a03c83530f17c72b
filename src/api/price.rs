//! Price payload normalisation.
//!
//! The simulator and its upstream feeds report prices in several shapes: a
//! bare number, a numeric string, or an object wrapping either under `price`
//! (sometimes twice, `{"price": {"price": 3500.0}}`). They are all parsed
//! into [`PricePayload`] here and reduced to one `f64`.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Nesting deeper than this is treated as malformed.
const MAX_DEPTH: usize = 4;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PricePayload {
    Number(f64),
    Text(String),
    Wrapped { price: Box<PricePayload> },
}

impl PricePayload {
    pub fn normalize(&self) -> Result<f64> {
        let mut current = self;
        for _ in 0..=MAX_DEPTH {
            let value = match current {
                PricePayload::Wrapped { price } => {
                    current = price;
                    continue;
                }
                PricePayload::Number(n) => *n,
                PricePayload::Text(s) => s
                    .trim()
                    .parse::<f64>()
                    .map_err(|_| anyhow!("price is not numeric: {:?}", s))?,
            };
            if !value.is_finite() || value <= 0.0 {
                return Err(anyhow!("price out of range: {}", value));
            }
            return Ok(value);
        }
        Err(anyhow!("price nested deeper than {} levels", MAX_DEPTH))
    }
}

/// Normalise an arbitrary JSON value into a price.
pub fn parse_price(value: &Value) -> Result<f64> {
    let payload: PricePayload = serde_json::from_value(value.clone())
        .map_err(|e| anyhow!("unrecognised price payload {}: {}", value, e))?;
    payload.normalize()
}

/// `deserialize_with` adapter for required price fields.
pub fn de_price<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let payload = PricePayload::deserialize(deserializer)?;
    payload.normalize().map_err(serde::de::Error::custom)
}

/// `deserialize_with` adapter for optional price fields; `null` maps to `None`.
pub fn de_opt_price<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let payload = Option::<PricePayload>::deserialize(deserializer)?;
    payload
        .map(|p| p.normalize())
        .transpose()
        .map_err(serde::de::Error::custom)
}
