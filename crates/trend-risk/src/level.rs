//! 리스크 수준 분류.
//!
//! 계좌 드로다운과 시장 지표 스냅샷을 정성적 리스크 등급으로
//! 변환합니다.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::debug;
use trend_core::{MarketRisk, RiskLevel};

/// 계좌 리스크 수준을 계산합니다.
///
/// `drawdown% = (balance − equity) / balance × 100`을 최대 허용
/// 드로다운의 100/75/50/25% 임계값과 비교합니다. 잔고가 0 이하이면
/// 보수적으로 `Critical`을 반환합니다.
pub fn account_risk_level(
    balance: Decimal,
    equity: Decimal,
    max_drawdown_percent: Decimal,
) -> RiskLevel {
    if balance <= Decimal::ZERO {
        return RiskLevel::Critical;
    }

    let drawdown = (balance - equity) / balance * dec!(100);
    let level = if drawdown >= max_drawdown_percent {
        RiskLevel::Critical
    } else if drawdown >= max_drawdown_percent * dec!(0.75) {
        RiskLevel::High
    } else if drawdown >= max_drawdown_percent * dec!(0.5) {
        RiskLevel::Moderate
    } else if drawdown >= max_drawdown_percent * dec!(0.25) {
        RiskLevel::Low
    } else {
        RiskLevel::Optimal
    };

    debug!(%drawdown, ?level, "계좌 리스크 수준");
    level
}

/// 시장 리스크 점수를 계산합니다.
///
/// 세 요소의 가산 점수를 등급으로 매핑합니다:
///
/// - 변동성: ATR/가격 비율이 2% 이상 +3, 1% 이상 +2, 0.5% 이상 +1
/// - 추세 강도: ADX 20 미만(방향성 없음) +2, 40 이상(뚜렷한 추세) −1
/// - 과매수/과매도: RSI 70/30 바깥 +2, 60/40 바깥 +1, 중립 구간 −1
///
/// 등급: 점수 4 이상 `High`, 2 이상 `Moderate`, 0 이상 `Low`,
/// 음수 `Optimal`.
pub fn market_risk_score(atr_ratio: Decimal, adx: f64, rsi: f64) -> MarketRisk {
    let mut score: i32 = 0;

    // 변동성
    if atr_ratio >= dec!(0.02) {
        score += 3;
    } else if atr_ratio >= dec!(0.01) {
        score += 2;
    } else if atr_ratio >= dec!(0.005) {
        score += 1;
    }

    // 추세 강도
    if adx < 20.0 {
        score += 2;
    } else if adx >= 40.0 {
        score -= 1;
    }

    // 과매수/과매도
    if !(30.0..=70.0).contains(&rsi) {
        score += 2;
    } else if !(40.0..=60.0).contains(&rsi) {
        score += 1;
    } else {
        score -= 1;
    }

    if score >= 4 {
        MarketRisk::High
    } else if score >= 2 {
        MarketRisk::Moderate
    } else if score >= 0 {
        MarketRisk::Low
    } else {
        MarketRisk::Optimal
    }
}

/// 잔고 구간별 권장 포지션 한도를 반환합니다.
///
/// `(전체 최대, 심볼당 최대)` 쌍이며 잔고에 대해 단조 증가합니다.
pub fn recommended_position_limits(balance: Decimal) -> (u32, u32) {
    if balance < dec!(100) {
        (2, 1)
    } else if balance < dec!(500) {
        (4, 2)
    } else if balance < dec!(1000) {
        (6, 2)
    } else if balance < dec!(2500) {
        (8, 3)
    } else if balance < dec!(5000) {
        (10, 3)
    } else if balance < dec!(10000) {
        (15, 4)
    } else {
        (20, 4)
    }
}
