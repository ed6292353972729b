//! 엔진 설정.

use chrono::Duration;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// 결정 엔진 설정.
///
/// 모든 필드에 serde 기본값이 있어 부분 TOML로도 로드할 수 있습니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// 진입당 리스크 비율 (%)
    #[serde(default = "default_risk_percent")]
    pub risk_percent: Decimal,

    /// 증축 시 리스크 축소 배율
    #[serde(default = "default_add_risk_factor")]
    pub add_risk_factor: Decimal,

    /// 보상:위험 배율
    #[serde(default = "default_rr_ratio")]
    pub rr_ratio: Decimal,

    /// 손절 ATR 배율 (스윙 폴백용)
    #[serde(default = "default_atr_multiplier")]
    pub atr_multiplier: Decimal,

    /// 일일 최대 거래 횟수
    #[serde(default = "default_max_daily_trades")]
    pub max_daily_trades: u32,

    /// 심볼당 최소 청산 간격 (초)
    #[serde(default = "default_min_close_interval_secs")]
    pub min_close_interval_secs: i64,

    /// 점진 청산에서 수익으로 인정하는 최소 손익
    #[serde(default = "default_min_fold_profit")]
    pub min_fold_profit: Decimal,

    /// 최대 허용 드로다운 (%)
    #[serde(default = "default_max_drawdown_percent")]
    pub max_drawdown_percent: Decimal,

    /// 증거금 안전 버퍼 (0.1 ~ 1.0)
    #[serde(default = "default_margin_safety_buffer")]
    pub margin_safety_buffer: Decimal,

    /// 심볼당 최대 포지션 수 (None이면 잔고 구간 권장값 사용)
    #[serde(default)]
    pub max_positions_per_symbol: Option<u32>,
}

fn default_risk_percent() -> Decimal {
    dec!(1.0)
}
fn default_add_risk_factor() -> Decimal {
    dec!(0.5)
}
fn default_rr_ratio() -> Decimal {
    dec!(2.0)
}
fn default_atr_multiplier() -> Decimal {
    dec!(1.5)
}
fn default_max_daily_trades() -> u32 {
    10
}
fn default_min_close_interval_secs() -> i64 {
    300
}
fn default_min_fold_profit() -> Decimal {
    dec!(0.01)
}
fn default_max_drawdown_percent() -> Decimal {
    dec!(20)
}
fn default_margin_safety_buffer() -> Decimal {
    dec!(0.5)
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            risk_percent: default_risk_percent(),
            add_risk_factor: default_add_risk_factor(),
            rr_ratio: default_rr_ratio(),
            atr_multiplier: default_atr_multiplier(),
            max_daily_trades: default_max_daily_trades(),
            min_close_interval_secs: default_min_close_interval_secs(),
            min_fold_profit: default_min_fold_profit(),
            max_drawdown_percent: default_max_drawdown_percent(),
            margin_safety_buffer: default_margin_safety_buffer(),
            max_positions_per_symbol: None,
        }
    }
}

impl EngineConfig {
    /// TOML 문자열에서 설정을 로드합니다. 빠진 필드는 기본값을 씁니다.
    pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    /// 최소 청산 간격을 `Duration`으로 반환합니다.
    pub fn min_close_interval(&self) -> Duration {
        Duration::seconds(self.min_close_interval_secs)
    }
}
