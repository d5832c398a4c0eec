use crate::error::{DeskError, Result};

/// Quote currencies recognized when splitting a concatenated symbol token,
/// longest first so "BTCUSDT" resolves to USDT rather than USD.
const QUOTE_SUFFIXES: &[&str] = &[
    "USDT", "USDC", "BUSD", "TUSD", "USD", "EUR", "GBP", "BTC", "ETH", "BNB",
];

/// Split an internal symbol token into (base, quote). Accepts either the
/// slash form ("BTC/USDT") or the concatenated form ("BTCUSDT").
pub fn split_symbol(raw: &str) -> Result<(String, String)> {
    let token = raw.trim().to_ascii_uppercase();
    if let Some((base, quote)) = token.split_once('/') {
        if base.is_empty() || quote.is_empty() {
            return Err(DeskError::Validation(format!("malformed symbol '{raw}'")));
        }
        return Ok((base.to_string(), quote.to_string()));
    }
    for quote in QUOTE_SUFFIXES {
        if token.len() > quote.len() && token.ends_with(quote) {
            let base = &token[..token.len() - quote.len()];
            return Ok((base.to_string(), quote.to_string()));
        }
    }
    Err(DeskError::Validation(format!(
        "cannot split symbol '{raw}' into base/quote"
    )))
}

/// Translate an internal symbol token into the venue's wire symbol.
pub fn format_symbol(venue: &str, raw: &str) -> Result<String> {
    let (base, quote) = split_symbol(raw)?;
    Ok(format_pair(venue, &base, &quote))
}

/// Format an explicit base/quote pair for a venue. Unknown venues get the
/// ccxt-style "BASE/QUOTE" form.
pub fn format_pair(venue: &str, base: &str, quote: &str) -> String {
    let base = base.to_ascii_uppercase();
    let quote = quote.to_ascii_uppercase();
    match venue.to_ascii_lowercase().as_str() {
        "binance" | "bybit" => format!("{base}{quote}"),
        "coinbase" | "kucoin" => format!("{base}-{quote}"),
        _ => format!("{base}/{quote}"),
    }
}
