// src/services/market_data.rs
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime};
use log::{error, info, warn};
use reqwest::Client;
use serde::Deserialize;

use crate::error::{AnalysisError, Result};
use crate::models::{PricePoint, PriceSeries};

/// Anything that can produce a daily close series for a ticker over
/// `[start, end)`.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn daily_closes(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> Result<PriceSeries>;
}

const YAHOO_CHART_BASE: &str = "https://query1.finance.yahoo.com";

pub struct YahooChartSource {
    client: Client,
    base_url: String,
    use_adjusted_close: bool,
}

impl YahooChartSource {
    pub fn new(use_adjusted_close: bool) -> Result<Self> {
        let client = Client::builder()
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| AnalysisError::fetch("yahoo", e))?;

        Ok(YahooChartSource {
            client,
            base_url: YAHOO_CHART_BASE.to_string(),
            use_adjusted_close,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn chart_url(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> String {
        format!(
            "{}/v8/finance/chart/{}?period1={}&period2={}&interval=1d&events=history&includeAdjustedClose=true",
            self.base_url.trim_end_matches('/'),
            encode_symbol(ticker),
            unix_midnight(start),
            unix_midnight(end),
        )
    }
}

#[async_trait]
impl PriceSource for YahooChartSource {
    async fn daily_closes(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> Result<PriceSeries> {
        let url = self.chart_url(ticker, start, end);
        info!("Fetching daily history for {} from URL: {}", ticker, url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AnalysisError::fetch(ticker, e))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| AnalysisError::fetch(ticker, e))?;

        if !status.is_success() {
            // Yahoo still sends its error envelope on 4xx; prefer its description.
            let reason = provider_error(&body).unwrap_or_else(|| format!("HTTP {}", status));
            error!("Yahoo returned {} for {}: {}", status, ticker, reason);
            return Err(AnalysisError::fetch(ticker, reason));
        }

        let series = parse_chart_response(ticker, &body, self.use_adjusted_close)?;
        info!("Fetched {} daily closes for {}", series.points.len(), ticker);
        Ok(series)
    }
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteBlock>,
    #[serde(default)]
    adjclose: Vec<AdjCloseBlock>,
}

#[derive(Debug, Deserialize)]
struct QuoteBlock {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseBlock {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}

fn provider_error(body: &str) -> Option<String> {
    let envelope: ChartEnvelope = serde_json::from_str(body).ok()?;
    envelope
        .chart
        .error
        .map(|e| format!("{}: {}", e.code, e.description))
}

/// Decode a v8 chart payload into a close series. Null closes are skipped.
pub fn parse_chart_response(ticker: &str, body: &str, use_adjusted_close: bool) -> Result<PriceSeries> {
    let envelope: ChartEnvelope =
        serde_json::from_str(body).map_err(|e| AnalysisError::fetch(ticker, format!("malformed response: {}", e)))?;

    if let Some(err) = envelope.chart.error {
        return Err(AnalysisError::fetch(ticker, format!("{}: {}", err.code, err.description)));
    }

    let result = envelope
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| AnalysisError::fetch(ticker, "response contained no chart result"))?;

    let adjusted = result
        .indicators
        .adjclose
        .into_iter()
        .next()
        .map(|block| block.adjclose)
        .filter(|values| !values.is_empty());
    let raw = result.indicators.quote.into_iter().next().map(|block| block.close);

    let closes = match (use_adjusted_close, adjusted, raw) {
        (true, Some(adj), _) => adj,
        (true, None, Some(raw)) => {
            warn!("No adjusted closes for {}, falling back to raw closes", ticker);
            raw
        }
        (false, _, Some(raw)) => raw,
        (_, Some(adj), None) => adj,
        (_, None, None) => Vec::new(),
    };

    if closes.len() != result.timestamp.len() && !result.timestamp.is_empty() {
        warn!(
            "{}: {} timestamps but {} closes; extra entries ignored",
            ticker,
            result.timestamp.len(),
            closes.len()
        );
    }

    let offset = result.meta.gmtoffset;
    let mut skipped = 0usize;
    let points: Vec<PricePoint> = result
        .timestamp
        .iter()
        .zip(closes)
        .filter_map(|(ts, close)| {
            let date = DateTime::from_timestamp(ts + offset, 0)?.date_naive();
            match close {
                Some(close) if close.is_finite() => Some(PricePoint { date, close }),
                _ => {
                    skipped += 1;
                    None
                }
            }
        })
        .collect();

    if skipped > 0 {
        warn!("Skipped {} days without a close for {}", skipped, ticker);
    }

    Ok(PriceSeries::new(ticker, points))
}

fn encode_symbol(ticker: &str) -> String {
    ticker.replace('^', "%5E")
}

fn unix_midnight(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "chart": {
            "result": [{
                "meta": {"symbol": "META", "currency": "USD", "gmtoffset": -18000},
                "timestamp": [1356964200, 1357050600, 1357137000],
                "indicators": {
                    "quote": [{"close": [26.62, null, 28.0], "open": [27.4, 27.1, 27.9]}],
                    "adjclose": [{"adjclose": [26.5, null, 27.9]}]
                }
            }],
            "error": null
        }
    }"#;

    #[test]
    fn decodes_adjusted_closes_in_exchange_time() {
        let series = parse_chart_response("META", SAMPLE, true).unwrap();
        assert_eq!(series.ticker, "META");
        assert_eq!(series.points.len(), 2);
        // 1356964200 is 2012-12-31 14:30 UTC, i.e. 09:30 New York.
        assert_eq!(series.points[0].date, NaiveDate::from_ymd_opt(2012, 12, 31).unwrap());
        assert_eq!(series.points[0].close, 26.5);
        assert_eq!(series.points[1].date, NaiveDate::from_ymd_opt(2013, 1, 2).unwrap());
        assert_eq!(series.points[1].close, 27.9);
    }

    #[test]
    fn raw_closes_when_not_adjusted() {
        let series = parse_chart_response("META", SAMPLE, false).unwrap();
        let closes: Vec<f64> = series.points.iter().map(|p| p.close).collect();
        assert_eq!(closes, vec![26.62, 28.0]);
    }

    #[test]
    fn provider_error_becomes_fetch_error() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        let err = parse_chart_response("NOPE", body, true).unwrap_err();
        match err {
            AnalysisError::Fetch { ticker, reason } => {
                assert_eq!(ticker, "NOPE");
                assert!(reason.contains("symbol may be delisted"));
            }
            other => panic!("expected Fetch, got {:?}", other),
        }
        assert!(provider_error(body).unwrap().starts_with("Not Found"));
    }

    #[test]
    fn empty_range_is_an_empty_series() {
        let body = r#"{"chart":{"result":[{"meta":{"gmtoffset":-18000},"indicators":{"quote":[{}],"adjclose":[{}]}}],"error":null}}"#;
        let series = parse_chart_response("^GSPC", body, true).unwrap();
        assert!(series.is_empty());
    }

    #[test]
    fn garbage_body_is_a_fetch_error() {
        let err = parse_chart_response("META", "<html>rate limited</html>", true).unwrap_err();
        assert!(matches!(err, AnalysisError::Fetch { .. }));
    }

    #[test]
    fn url_encodes_index_symbols() {
        let source = YahooChartSource::new(true).unwrap().with_base_url("http://localhost:9/");
        let url = source.chart_url(
            "^GSPC",
            NaiveDate::from_ymd_opt(2010, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
        );
        assert_eq!(
            url,
            "http://localhost:9/v8/finance/chart/%5EGSPC?period1=1262304000&period2=1672531200&interval=1d&events=history&includeAdjustedClose=true"
        );
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn fetches_live_index_history() {
        let source = YahooChartSource::new(true).unwrap();
        let series = source
            .daily_closes(
                "^GSPC",
                NaiveDate::from_ymd_opt(2022, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2022, 2, 1).unwrap(),
            )
            .await
            .unwrap();
        assert!(!series.is_empty());
    }
}
