use std::borrow::Cow;

/// Provider identifier - mostly static constants ("FMP", "FINNHUB")
pub type ProviderId = Cow<'static, str>;
