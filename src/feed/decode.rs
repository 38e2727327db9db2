use serde_json::Value;

use crate::error::FeedError;

/// Pull the trade price out of one aggTrade payload, e.g.
/// `{"e":"aggTrade","s":"BTCUSDT","p":"64321.50","q":"0.01",...}`.
///
/// `"p"` is normally a decimal string; a bare JSON number is accepted too.
pub fn decode_price(raw: &str) -> Result<f64, FeedError> {
    let v: Value =
        serde_json::from_str(raw).map_err(|e| FeedError::Decode(format!("not json: {e}")))?;

    let price = match v.get("p") {
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| FeedError::Decode(format!("price {s:?}: {e}")))?,
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| FeedError::Decode(format!("price {n} out of range")))?,
        Some(other) => return Err(FeedError::Decode(format!("price has wrong type: {other}"))),
        None => return Err(FeedError::Decode("no price field \"p\"".to_string())),
    };

    if !price.is_finite() || price < 0.0 {
        return Err(FeedError::Decode(format!("price {price} out of domain")));
    }
    Ok(price)
}
