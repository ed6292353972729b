//! 포지션 사이징.
//!
//! 잔고에서 감내할 손실 금액을 정하고, 스탑 거리로 나눠 랏을 구한 뒤
//! 심볼 랏 제약에 정렬합니다.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::debug;
use trend_core::SymbolSpec;

/// 랏을 심볼 제약에 정렬합니다.
///
/// `[volume_min, volume_max]`로 클램프한 뒤 `volume_step`의 배수로
/// 반올림합니다. 결과는 항상 범위 안의 스텝 배수입니다.
pub fn adjust_lot_to_constraints(lot: Decimal, spec: &SymbolSpec) -> Decimal {
    let clamped = lot.clamp(spec.volume_min, spec.volume_max);
    if spec.volume_step <= Decimal::ZERO {
        return clamped;
    }
    let steps = (clamped / spec.volume_step).round();
    (steps * spec.volume_step).clamp(spec.volume_min, spec.volume_max)
}

/// 리스크 비율 기반 포지션 크기를 계산합니다.
///
/// `lots = (balance × risk% / 100) / (|entry − stop| × contract_size)`
/// 를 계산한 뒤 랏 제약에 정렬합니다.
///
/// 스탑 거리가 0 이하이면 사이징이 불가능하므로 0으로 닫습니다
/// (제약 정렬을 거치지 않으므로 최소 랏으로 끌어올려지지 않습니다).
pub fn position_size(
    balance: Decimal,
    risk_percent: Decimal,
    entry_price: Decimal,
    stop_loss: Decimal,
    spec: &SymbolSpec,
) -> Decimal {
    let risk_distance = (entry_price - stop_loss).abs();
    if risk_distance <= Decimal::ZERO || balance <= Decimal::ZERO || risk_percent <= Decimal::ZERO
    {
        return Decimal::ZERO;
    }

    let value_per_lot = risk_distance * spec.contract_size;
    if value_per_lot <= Decimal::ZERO {
        return Decimal::ZERO;
    }

    let risk_amount = balance * risk_percent / dec!(100);
    let raw = risk_amount / value_per_lot;
    let adjusted = adjust_lot_to_constraints(raw, spec);

    debug!(
        symbol = %spec.name,
        raw = %raw,
        adjusted = %adjusted,
        "포지션 사이징"
    );
    adjusted
}

/// 신호 신뢰도로 스케일한 포지션 크기를 계산합니다.
///
/// 리스크 비율에 신뢰도(0.0 ~ 1.0)를 곱하되, 기본 비율의 25% 아래로는
/// 줄이지 않습니다. 신뢰도가 범위를 벗어나면 클램프합니다.
pub fn position_size_with_confidence(
    balance: Decimal,
    base_risk_percent: Decimal,
    confidence: f64,
    entry_price: Decimal,
    stop_loss: Decimal,
    spec: &SymbolSpec,
) -> Decimal {
    let confidence = Decimal::from_f64(confidence.clamp(0.0, 1.0)).unwrap_or(Decimal::ONE);
    let floor = base_risk_percent * dec!(0.25);
    let effective = (base_risk_percent * confidence).max(floor);
    position_size(balance, effective, entry_price, stop_loss, spec)
}
