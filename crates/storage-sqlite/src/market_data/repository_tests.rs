//! Repository tests against a temporary SQLite file.

#[cfg(test)]
mod tests {
    use crate::db::{create_pool, init, run_migrations, spawn_writer};
    use crate::market_data::MarketCacheRepository;
    use chrono::{Duration, NaiveDate, TimeZone, Utc};
    use marketfeed_core::market_data::{CurrentRecordStore, NewsStore, PriceBarStore};
    use marketfeed_market_data::{Fundamentals, NewsItem, PriceBar, Quote};
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    fn repository() -> (TempDir, MarketCacheRepository) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("marketfeed.db");
        let path = init(path.to_str().unwrap()).unwrap();
        let pool = create_pool(&path).unwrap();
        run_migrations(&pool).unwrap();
        let writer = spawn_writer((*pool).clone());
        (dir, MarketCacheRepository::new(pool, writer))
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn bar(symbol: &str, date: NaiveDate, close: rust_decimal::Decimal) -> PriceBar {
        PriceBar {
            symbol: symbol.to_string(),
            date,
            open: close,
            high: close,
            low: close,
            close,
            volume: Some(52_000_000),
            source: "FMP".to_string(),
            fetched_at: Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(),
        }
    }

    fn news(symbol: &str, url: &str, hour: u32, headline: &str) -> NewsItem {
        NewsItem {
            symbol: symbol.to_string(),
            published_at: Utc.with_ymd_and_hms(2024, 1, 10, hour, 0, 0).unwrap(),
            headline: headline.to_string(),
            summary: String::new(),
            source: "Reuters".to_string(),
            url: url.to_string(),
            image: None,
            fetched_at: Utc.with_ymd_and_hms(2024, 1, 10, 23, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_current_record_upsert_replaces_previous() {
        let (_dir, repo) = repository();
        let first = Quote::new("AAPL", dec!(180.25), "FMP");
        let second = Quote::new("AAPL", dec!(182.5), "FMP").with_fetched_at(Utc::now() + Duration::seconds(1));

        CurrentRecordStore::<Quote>::upsert_current(&repo, "AAPL", &first).await.unwrap();
        CurrentRecordStore::<Quote>::upsert_current(&repo, "AAPL", &second).await.unwrap();

        let stored: Option<Quote> = repo.find_current("AAPL").unwrap();
        assert_eq!(stored.unwrap().price, dec!(182.5));
    }

    #[tokio::test]
    async fn test_current_records_are_separated_by_kind() {
        let (_dir, repo) = repository();
        let quote = Quote::new("MSFT", dec!(410), "FMP");
        CurrentRecordStore::<Quote>::upsert_current(&repo, "MSFT", &quote).await.unwrap();

        let fundamentals: Option<Fundamentals> = repo.find_current("MSFT").unwrap();
        assert!(fundamentals.is_none());

        let missing: Option<Quote> = repo.find_current("GOOGL").unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_price_bars_range_and_dedupe() {
        let (_dir, repo) = repository();
        let bars = vec![
            bar("AAPL", day(3), dec!(184.25)),
            bar("AAPL", day(2), dec!(185.64)),
            bar("AAPL", day(5), dec!(181.18)),
            bar("MSFT", day(2), dec!(370.87)),
        ];
        assert_eq!(repo.insert_many(&bars).await.unwrap(), 4);
        // same key again replaces, not duplicates
        repo.insert_many(&[bar("AAPL", day(2), dec!(185.5))]).await.unwrap();

        let stored = repo.find_range("AAPL", day(2), day(4)).unwrap();

        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].date, day(2));
        assert_eq!(stored[0].close, dec!(185.5));
        assert_eq!(stored[1].date, day(3));
        assert_eq!(stored[1].volume, Some(52_000_000));
    }

    #[tokio::test]
    async fn test_insert_many_handles_more_rows_than_one_statement() {
        let (_dir, repo) = repository();
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let bars: Vec<PriceBar> = (0..400)
            .map(|i| bar("SPY", start + Duration::days(i), dec!(300)))
            .collect();

        assert_eq!(repo.insert_many(&bars).await.unwrap(), 400);
        assert_eq!(
            repo.find_range("SPY", start, start + Duration::days(399))
                .unwrap()
                .len(),
            400
        );
    }

    #[tokio::test]
    async fn test_news_newest_first_and_deduped_by_url() {
        let (_dir, repo) = repository();
        let items = vec![
            news("AAPL", "https://example.com/1", 9, "Morning"),
            news("AAPL", "https://example.com/2", 15, "Afternoon"),
            news("TSLA", "https://example.com/3", 12, "Other"),
        ];
        repo.insert_news(&items).await.unwrap();
        repo.insert_news(&[news("AAPL", "https://example.com/1", 9, "Morning, updated")])
            .await
            .unwrap();

        let from = Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2024, 1, 10, 23, 59, 59).unwrap();
        let stored = repo.find_news("AAPL", from, to).unwrap();

        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].headline, "Afternoon");
        assert_eq!(stored[1].headline, "Morning, updated");

        let outside = repo
            .find_news("AAPL", from + Duration::days(1), to + Duration::days(1))
            .unwrap();
        assert!(outside.is_empty());
    }

    #[tokio::test]
    async fn test_empty_inserts_are_noops() {
        let (_dir, repo) = repository();
        assert_eq!(repo.insert_many(&[]).await.unwrap(), 0);
        assert_eq!(repo.insert_news(&[]).await.unwrap(), 0);
    }
}
