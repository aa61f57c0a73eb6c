//! 일봉 데이터 타입과 저장 전 유효성 필터.
//!
//! - `RawBar` - 제공자 응답을 정규화한 한 줄 (값 누락 가능)
//! - `PriceBar` - 유효성 검사를 통과해 저장 가능한 일봉

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// 가격 저장 소수 자릿수.
pub const PRICE_SCALE: u32 = 6;

/// 제공자 응답에서 정규화된 일봉 한 줄.
///
/// 제공자는 값이 비어 있는 행을 자주 내려주므로 모든 값이 `Option`입니다.
/// 저장 여부는 [`PriceBar::from_raw`]가 결정합니다.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawBar {
    /// 거래일 (거래소 시간대 기준)
    pub date: NaiveDate,
    /// 시가
    pub open: Option<f64>,
    /// 고가
    pub high: Option<f64>,
    /// 저가
    pub low: Option<f64>,
    /// 종가
    pub close: Option<f64>,
    /// 거래량
    pub volume: Option<i64>,
}

impl RawBar {
    /// 모든 값이 채워진 원시 일봉을 생성합니다.
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: i64) -> Self {
        Self {
            date,
            open: Some(open),
            high: Some(high),
            low: Some(low),
            close: Some(close),
            volume: Some(volume),
        }
    }

    /// 다섯 값이 모두 비어 있는 행인지 확인합니다 (휴장일 등).
    pub fn is_blank(&self) -> bool {
        self.open.is_none()
            && self.high.is_none()
            && self.low.is_none()
            && self.close.is_none()
            && self.volume.is_none()
    }
}

/// 저장 가능한 일봉.
///
/// `min_price`/`max_price`는 항상 `low`/`high`의 복사본입니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBar {
    /// 거래일
    pub date: NaiveDate,
    /// 시가
    pub open: Decimal,
    /// 고가
    pub high: Decimal,
    /// 저가
    pub low: Decimal,
    /// 종가
    pub close: Decimal,
    /// 거래량
    pub volume: i64,
    /// 최저가 (= low)
    pub min_price: Decimal,
    /// 최고가 (= high)
    pub max_price: Decimal,
}

impl PriceBar {
    /// 원시 일봉을 검증해 저장 가능한 일봉으로 변환합니다.
    ///
    /// 다섯 값이 모두 있고, 거래량 > 0, 네 가격 모두 > 0 이어야 합니다.
    /// 조건을 만족하지 않으면 `None`을 반환합니다.
    pub fn from_raw(raw: &RawBar) -> Option<Self> {
        let volume = raw.volume.filter(|v| *v > 0)?;
        let open = positive_price(raw.open)?;
        let high = positive_price(raw.high)?;
        let low = positive_price(raw.low)?;
        let close = positive_price(raw.close)?;

        Some(Self {
            date: raw.date,
            open,
            high,
            low,
            close,
            volume,
            min_price: low,
            max_price: high,
        })
    }
}

/// 유효한 일봉만 골라 날짜순으로 반환합니다.
///
/// 같은 날짜가 여러 번 나오면 마지막 행이 남습니다.
pub fn valid_bars(raw: &[RawBar]) -> Vec<PriceBar> {
    let mut by_date: BTreeMap<NaiveDate, PriceBar> = BTreeMap::new();
    for bar in raw.iter().filter_map(PriceBar::from_raw) {
        by_date.insert(bar.date, bar);
    }
    by_date.into_values().collect()
}

fn positive_price(value: Option<f64>) -> Option<Decimal> {
    let price = value.filter(|v| v.is_finite() && *v > 0.0)?;
    let exact = match Decimal::from_f64(price) {
        Some(d) => d,
        // Decimal 정밀도보다 작은 양수
        None if price < 1.0 => Decimal::ZERO,
        None => return None,
    };

    // 양수 가격이 0으로 내려가지 않도록 0에서 먼 쪽으로 반올림
    let rounded = exact.round_dp_with_strategy(PRICE_SCALE, RoundingStrategy::AwayFromZero);
    Some(rounded.max(Decimal::new(1, PRICE_SCALE)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn test_from_raw_copies_low_high_into_min_max() {
        let bar = PriceBar::from_raw(&RawBar::new(day(1), 10.5, 11.25, 10.0, 11.0, 1200)).unwrap();
        assert_eq!(bar.min_price, dec!(10.0));
        assert_eq!(bar.max_price, dec!(11.25));
        assert_eq!(bar.min_price, bar.low);
        assert_eq!(bar.max_price, bar.high);
        assert_eq!(bar.volume, 1200);
    }

    #[test]
    fn test_from_raw_rejects_invalid_rows() {
        // 거래량 0
        assert!(PriceBar::from_raw(&RawBar::new(day(1), 1.0, 1.0, 1.0, 1.0, 0)).is_none());
        // 가격 0 또는 음수
        assert!(PriceBar::from_raw(&RawBar::new(day(1), 0.0, 1.0, 1.0, 1.0, 10)).is_none());
        assert!(PriceBar::from_raw(&RawBar::new(day(1), 1.0, 1.0, -1.0, 1.0, 10)).is_none());
        // NaN
        assert!(PriceBar::from_raw(&RawBar::new(day(1), 1.0, f64::NAN, 1.0, 1.0, 10)).is_none());
        // 값 누락
        let mut missing = RawBar::new(day(1), 1.0, 1.0, 1.0, 1.0, 10);
        missing.close = None;
        assert!(PriceBar::from_raw(&missing).is_none());
    }

    #[test]
    fn test_from_raw_keeps_sub_scale_prices() {
        let bar = PriceBar::from_raw(&RawBar::new(day(1), 4e-7, 4e-7, 4e-7, 4e-7, 10)).unwrap();
        assert_eq!(bar.low, dec!(0.000001));
        assert!(bar.open > Decimal::ZERO);

        let bar = PriceBar::from_raw(&RawBar::new(day(1), 1e-30, 2.0, 1e-30, 1.5, 10)).unwrap();
        assert_eq!(bar.open, dec!(0.000001));
        assert_eq!(bar.min_price, bar.low);
    }

    #[test]
    fn test_valid_bars_keeps_only_valid_subset() {
        let raw = vec![
            RawBar::new(day(1), 10.0, 11.0, 9.0, 10.5, 100),
            RawBar::new(day(2), 10.0, 11.0, 9.0, 10.5, 0),
            RawBar::new(day(3), 10.0, 11.0, 0.0, 10.5, 100),
            RawBar::new(day(4), 10.0, 11.0, 9.0, 10.5, 300),
        ];
        let valid = valid_bars(&raw);
        assert_eq!(valid.len(), 2);
        assert_eq!(valid[0].date, day(1));
        assert_eq!(valid[1].date, day(4));
    }

    #[test]
    fn test_valid_bars_collapses_duplicate_dates() {
        let raw = vec![
            RawBar::new(day(5), 10.0, 11.0, 9.0, 10.5, 100),
            RawBar::new(day(5), 10.0, 12.0, 9.0, 11.5, 200),
        ];
        let valid = valid_bars(&raw);
        assert_eq!(valid.len(), 1);
        assert_eq!(valid[0].close, dec!(11.5));
        assert_eq!(valid[0].volume, 200);
    }

    #[test]
    fn test_blank_row_detection() {
        let blank = RawBar {
            date: day(1),
            open: None,
            high: None,
            low: None,
            close: None,
            volume: None,
        };
        assert!(blank.is_blank());
        assert!(!RawBar::new(day(1), 1.0, 1.0, 1.0, 1.0, 1).is_blank());
    }

    fn price() -> impl Strategy<Value = Option<f64>> {
        prop_oneof![
            Just(None),
            Just(Some(0.0)),
            (-50.0f64..-0.01).prop_map(Some),
            (0.01f64..500.0).prop_map(Some),
            (1e-12f64..1e-5).prop_map(Some),
        ]
    }

    fn volume() -> impl Strategy<Value = Option<i64>> {
        prop_oneof![Just(None), Just(Some(0)), (-10i64..0).prop_map(Some), (1i64..1_000_000).prop_map(Some)]
    }

    proptest! {
        #[test]
        fn prop_valid_bars_match_invariant(
            rows in prop::collection::vec((price(), price(), price(), price(), volume()), 0..40)
        ) {
            let raw: Vec<RawBar> = rows
                .iter()
                .enumerate()
                .map(|(i, (o, h, l, c, v))| RawBar {
                    date: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap() + chrono::Duration::days(i as i64),
                    open: *o,
                    high: *h,
                    low: *l,
                    close: *c,
                    volume: *v,
                })
                .collect();

            let expected = raw
                .iter()
                .filter(|r| {
                    let prices = [r.open, r.high, r.low, r.close];
                    prices.iter().all(|p| matches!(p, Some(x) if x.is_finite() && *x > 0.0))
                        && matches!(r.volume, Some(v) if v > 0)
                })
                .count();

            let valid = valid_bars(&raw);
            prop_assert_eq!(valid.len(), expected);
            for bar in &valid {
                prop_assert!(bar.volume > 0);
                prop_assert!(bar.open > Decimal::ZERO && bar.close > Decimal::ZERO);
                prop_assert!(bar.high > Decimal::ZERO && bar.low > Decimal::ZERO);
                prop_assert_eq!(bar.min_price, bar.low);
                prop_assert_eq!(bar.max_price, bar.high);
            }
        }
    }
}
