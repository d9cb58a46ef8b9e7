use std::time::Duration;

/// Quotes older than this are refetched.
pub const QUOTE_FRESHNESS: Duration = Duration::from_secs(300);

/// Fundamentals older than this are refetched.
pub const FUNDAMENTALS_FRESHNESS: Duration = Duration::from_secs(86_400);

/// Memoized search results live this long.
pub const SEARCH_FRESHNESS: Duration = Duration::from_secs(3_600);

/// Longest accepted ticker after normalization
pub const MAX_SYMBOL_LEN: usize = 20;

/// Default look-back for company news when no start date is given
pub const DEFAULT_NEWS_LOOKBACK_DAYS: i64 = 7;

/// Page size for company news when the caller does not say
pub const DEFAULT_NEWS_LIMIT: usize = 20;

/// Symbols resolved at once by a multi-symbol news lookup
pub const NEWS_LOOKUP_CONCURRENCY: usize = 5;

/// Concurrent per-symbol lookups in a non-forced batch
pub const QUOTE_LOOKUP_CONCURRENCY: usize = 5;

/// Symbols shown when the caller has no watchlist of its own.
pub const POPULAR_SYMBOLS: [(&str, &str); 10] = [
    ("AAPL", "Apple Inc."),
    ("MSFT", "Microsoft Corporation"),
    ("GOOGL", "Alphabet Inc."),
    ("AMZN", "Amazon.com, Inc."),
    ("TSLA", "Tesla, Inc."),
    ("META", "Meta Platforms, Inc."),
    ("NVDA", "NVIDIA Corporation"),
    ("NFLX", "Netflix, Inc."),
    ("JPM", "JPMorgan Chase & Co."),
    ("V", "Visa Inc."),
];
