//! Yahoo Finance chart API 일봉 제공자.
//!
//! `v8/finance/chart/{symbol}` 엔드포인트를 직접 호출하고 응답을 [`RawBar`]로 정규화합니다.
//!
//! # 심볼 형식
//!
//! 정규 심볼에는 시장 접미사가 붙어서 요청됩니다:
//! - "PETR4" → "PETR4.SA"
//! - 이미 접미사가 있는 별칭("BRDT3.SA")은 그대로 사용
//!
//! # 응답 정규화
//!
//! - 타임스탬프는 거래소 시간대의 거래일로 변환
//! - 값이 모두 비어 있는 행(휴장일)은 제외
//! - 타임스탬프와 가격 배열 길이가 다르면 `Empty`로 취급 (재시도 대상)

use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use chrono_tz::Tz;
use quotesync_core::{provider_symbol, FetchWindow, RawBar};
use serde::Deserialize;
use tracing::debug;

use crate::identity::IdentityPool;
use crate::source::{FetchedSeries, QuoteSource};
use crate::FetchError;

/// Yahoo chart API 응답.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    meta: Option<ChartMeta>,
    timestamp: Option<Vec<i64>>,
    indicators: Option<Indicators>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    long_name: Option<String>,
    short_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteData>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteData {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    // 일부 응답은 거래량을 실수로 내려줌
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

/// Yahoo 제공자 설정.
#[derive(Debug, Clone)]
pub struct YahooConfig {
    /// API 기본 URL (테스트에서는 목 서버 주소)
    pub base_url: String,
    /// 정규 심볼에 붙일 시장 접미사
    pub symbol_suffix: String,
    /// 거래일 계산용 거래소 시간대
    pub timezone: Tz,
    /// 요청 타임아웃
    pub timeout: Duration,
    /// 호스트당 유휴 연결 수 (0이면 요청마다 새 연결)
    pub pool_idle_per_host: usize,
}

impl Default for YahooConfig {
    fn default() -> Self {
        Self {
            base_url: "https://query1.finance.yahoo.com".to_string(),
            symbol_suffix: ".SA".to_string(),
            timezone: chrono_tz::America::Sao_Paulo,
            timeout: Duration::from_secs(30),
            pool_idle_per_host: 0,
        }
    }
}

/// Yahoo Finance chart API 클라이언트.
pub struct YahooChartClient {
    client: reqwest::Client,
    config: YahooConfig,
    identities: IdentityPool,
}

impl YahooChartClient {
    /// 새 클라이언트 생성.
    pub fn new(config: YahooConfig) -> Result<Self, FetchError> {
        Self::with_identities(config, IdentityPool::browsers())
    }

    /// 식별자 풀을 지정해 클라이언트를 생성합니다.
    pub fn with_identities(config: YahooConfig, identities: IdentityPool) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            // 식별자와 함께 연결도 요청마다 새로 맺음
            .pool_max_idle_per_host(config.pool_idle_per_host)
            .build()
            .map_err(|e| FetchError::Network(format!("HTTP 클라이언트 생성 실패: {}", e)))?;

        Ok(Self {
            client,
            config,
            identities,
        })
    }

    pub fn config(&self) -> &YahooConfig {
        &self.config
    }

    fn chart_url(&self, provider_symbol: &str) -> String {
        format!(
            "{}/v8/finance/chart/{}",
            self.config.base_url.trim_end_matches('/'),
            provider_symbol
        )
    }
}

#[async_trait]
impl QuoteSource for YahooChartClient {
    fn name(&self) -> &str {
        "yahoo"
    }

    async fn fetch(&self, window: &FetchWindow) -> Result<FetchedSeries, FetchError> {
        if window.symbol.trim().is_empty() {
            return Err(FetchError::InvalidSymbol(window.symbol.clone()));
        }
        if window.is_empty() {
            return Ok(FetchedSeries {
                symbol: window.symbol.clone(),
                ..Default::default()
            });
        }

        let yahoo_symbol = provider_symbol(&window.symbol, &self.config.symbol_suffix);
        let identity = self.identities.next();

        debug!(
            symbol = %yahoo_symbol,
            start = %window.start,
            period1 = window.period1(),
            period2 = window.period2(),
            "Yahoo chart 요청"
        );

        let response = self
            .client
            .get(self.chart_url(&yahoo_symbol))
            .query(&[
                ("period1", window.period1().to_string()),
                ("period2", window.period2().to_string()),
                ("interval", "1d".to_string()),
                ("events", "history".to_string()),
                ("includeAdjustedClose", "true".to_string()),
            ])
            .header(reqwest::header::USER_AGENT, &identity.user_agent)
            .header(
                reqwest::header::ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header(reqwest::header::ACCEPT_LANGUAGE, &identity.accept_language)
            .header(reqwest::header::REFERER, "https://finance.yahoo.com")
            .header(reqwest::header::DNT, "1")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Network(format!(
                "{}: HTTP {}",
                yahoo_symbol, status
            )));
        }

        let body = response.text().await?;
        let mut series = parse_chart(&yahoo_symbol, &body, self.config.timezone)?;
        series.symbol = window.symbol.clone();

        debug!(symbol = %yahoo_symbol, bars = series.bars.len(), "Yahoo chart 수신");
        Ok(series)
    }
}

/// chart API 응답 본문을 일봉 묶음으로 변환합니다.
pub fn parse_chart(symbol: &str, body: &str, tz: Tz) -> Result<FetchedSeries, FetchError> {
    let response: ChartResponse = serde_json::from_str(body)?;

    if let Some(err) = response.chart.error {
        return Err(FetchError::Protocol(format!(
            "{}: {} {}",
            symbol,
            err.code,
            err.description.unwrap_or_default()
        )));
    }

    let data = response
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| FetchError::Empty(format!("{}: 결과 없음", symbol)))?;

    let display_name = data
        .meta
        .and_then(|m| m.long_name.or(m.short_name))
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty());

    let timestamps = data
        .timestamp
        .ok_or_else(|| FetchError::Empty(format!("{}: 타임스탬프 없음", symbol)))?;

    let quote = data
        .indicators
        .and_then(|ind| ind.quote.into_iter().next())
        .ok_or_else(|| FetchError::Empty(format!("{}: 시세 배열 없음", symbol)))?;

    let n = timestamps.len();
    let aligned = [
        quote.open.len(),
        quote.high.len(),
        quote.low.len(),
        quote.close.len(),
        quote.volume.len(),
    ]
    .iter()
    .all(|&len| len == n);
    if !aligned {
        return Err(FetchError::Empty(format!(
            "{}: 타임스탬프와 시세 배열 길이 불일치",
            symbol
        )));
    }

    let mut bars = Vec::with_capacity(n);
    for (i, &ts) in timestamps.iter().enumerate() {
        let date = DateTime::from_timestamp(ts, 0)
            .map(|dt| dt.with_timezone(&tz).date_naive())
            .ok_or_else(|| FetchError::Protocol(format!("{}: 잘못된 타임스탬프 {}", symbol, ts)))?;

        let bar = RawBar {
            date,
            open: quote.open[i],
            high: quote.high[i],
            low: quote.low[i],
            close: quote.close[i],
            volume: quote.volume[i]
                .filter(|v| v.is_finite() && *v >= 0.0)
                .map(|v| v.round() as i64),
        };
        if bar.is_blank() {
            continue;
        }
        bars.push(bar);
    }

    if bars.is_empty() {
        return Err(FetchError::Empty(format!("{}: 일봉 없음", symbol)));
    }
    bars.sort_by_key(|b| b.date);

    Ok(FetchedSeries {
        symbol: symbol.to_string(),
        display_name,
        bars,
    })
}
