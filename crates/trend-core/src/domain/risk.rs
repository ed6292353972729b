//! 리스크 수준 분류.

use serde::{Deserialize, Serialize};

/// 계좌 리스크 수준.
///
/// 드로다운 비율을 기준으로 분류하며, `High` 이상에서는
/// 포트폴리오 축소(청산) 권고가 우선됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    /// 최대 허용 드로다운 도달
    Critical,
    /// 드로다운 75% 이상
    High,
    /// 드로다운 50% 이상
    Moderate,
    /// 드로다운 25% 이상
    Low,
    /// 정상 범위
    Optimal,
}

impl RiskLevel {
    /// 위험 축소가 필요한 수준인지 확인합니다.
    pub fn needs_derisk(&self) -> bool {
        matches!(self, RiskLevel::Critical | RiskLevel::High)
    }
}

/// 시장 상태 리스크 분류.
///
/// 변동성(ATR), 추세 강도(ADX), 과매수/과매도(RSI)의 가산 점수로
/// 산출됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketRisk {
    /// 고위험 (점수 4 이상)
    High,
    /// 중간 (점수 2 이상)
    Moderate,
    /// 저위험 (점수 0 이상)
    Low,
    /// 최적 (음수 점수)
    Optimal,
}
