//! 심볼 명세.
//!
//! 시세 제공자가 내려주는 심볼별 거래 제약(호가 단위, 랏 범위,
//! 증거금 단가, 스탑 레벨)을 플랫폼 중립 형식으로 표현합니다.
//! 의사결정 코어는 이 스냅샷만 보고 가격 정규화와 랏 정렬을 수행합니다.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// =============================================================================
// 심볼 분류
// =============================================================================

/// 심볼 자산군 분류.
///
/// 스탑 버퍼와 허용 스탑 거리 밴드가 자산군별로 다르게 적용됩니다.
/// 귀금속과 암호화폐는 변동성이 커서 외환보다 넓은 밴드를 사용합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolClass {
    /// 외환 (예: EURUSD)
    Forex,
    /// 귀금속 (예: XAUUSD)
    Metal,
    /// 암호화폐 (예: BTCUSD)
    Crypto,
    /// 지수 (예: US500)
    Index,
}

impl SymbolClass {
    /// 심볼 이름 접두사로 자산군을 추정합니다.
    ///
    /// 제공자가 분류를 내려주지 않는 경우의 폴백입니다.
    pub fn infer(symbol: &str) -> Self {
        let upper = symbol.to_ascii_uppercase();
        if upper.starts_with("XAU") || upper.starts_with("XAG") {
            SymbolClass::Metal
        } else if upper.starts_with("BTC") || upper.starts_with("ETH") {
            SymbolClass::Crypto
        } else if upper.starts_with("US") || upper.starts_with("DE") || upper.starts_with("JP") {
            SymbolClass::Index
        } else {
            SymbolClass::Forex
        }
    }
}

// =============================================================================
// 심볼 명세
// =============================================================================

/// 심볼별 거래 명세 스냅샷.
///
/// 시세 제공자로부터 조회하며, 의사결정 사이클 동안만 유효한
/// 읽기 전용 데이터입니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolSpec {
    /// 심볼 이름 (예: "EURUSD")
    pub name: String,
    /// 자산군 분류
    pub class: SymbolClass,
    /// 소수점 자릿수
    pub digits: u32,
    /// 최소 가격 단위 (point)
    pub point: Decimal,
    /// 호가 틱 크기
    pub tick_size: Decimal,
    /// 1랏 계약 크기
    pub contract_size: Decimal,
    /// 최소 주문 랏
    pub volume_min: Decimal,
    /// 최대 주문 랏
    pub volume_max: Decimal,
    /// 랏 단위 스텝
    pub volume_step: Decimal,
    /// 1랏당 필요 증거금
    pub margin_per_lot: Decimal,
    /// 스탑 주문 최소 거리 (point 수)
    pub stops_level: u32,
    /// 주문 수정 금지 거리 (point 수)
    pub freeze_level: u32,
    /// 거래 허용 여부
    pub trade_allowed: bool,
}

impl SymbolSpec {
    /// 핍 크기를 반환합니다.
    ///
    /// 3/5자리 호가 심볼은 `point × 10`, 그 외에는 `point`를 핍으로 봅니다.
    pub fn pip(&self) -> Decimal {
        if self.digits == 3 || self.digits == 5 {
            self.point * Decimal::from(10)
        } else {
            self.point
        }
    }

    /// 가격을 틱 크기에 맞춰 정규화합니다.
    pub fn normalize_price(&self, price: Decimal) -> Decimal {
        if self.tick_size <= Decimal::ZERO {
            return price.round_dp(self.digits);
        }
        let ticks = (price / self.tick_size).round();
        (ticks * self.tick_size).round_dp(self.digits)
    }

    /// 스탑 최소 거리를 가격 단위로 반환합니다.
    pub fn stops_distance(&self) -> Decimal {
        self.point * Decimal::from(self.stops_level)
    }
}
