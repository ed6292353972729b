//! 스탑 기하.
//!
//! 손절은 스윙 구조를 우선하고 ATR 폴백을 사용합니다. 산출된 거리는
//! 자산군별 허용 밴드로 클램프한 뒤 틱 크기로 정규화합니다.
//! 트레일링은 유리한 방향으로만 이동하며 절대 후퇴하지 않습니다.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use trend_core::{Side, SymbolClass, SymbolSpec, Timeframe};

// =============================================================================
// 자산군별 상수
// =============================================================================

/// 스윙 포인트에 더하는 자산군별 버퍼 (point 수).
///
/// 귀금속·암호화폐는 스탑 헌팅 구간이 넓어 큰 버퍼를 사용합니다.
/// 외환 기본값은 10 point입니다.
fn class_buffer(spec: &SymbolSpec) -> Decimal {
    let points = match spec.class {
        SymbolClass::Forex => dec!(10),
        SymbolClass::Index => dec!(50),
        SymbolClass::Metal => dec!(300),
        SymbolClass::Crypto => dec!(5000),
    };
    points * spec.point
}

/// 자산군별 허용 스탑 거리 밴드 (핍 수).
fn class_band(class: SymbolClass) -> (Decimal, Decimal) {
    match class {
        SymbolClass::Forex => (dec!(10), dec!(100)),
        SymbolClass::Index => (dec!(50), dec!(1000)),
        SymbolClass::Metal => (dec!(500), dec!(5000)),
        SymbolClass::Crypto => (dec!(1000), dec!(30000)),
    }
}

// =============================================================================
// 손절가
// =============================================================================

/// 손절가를 계산합니다.
///
/// 적격 스윙 포인트(매수면 진입가 아래의 스윙 로우, 매도면 위의
/// 스윙 하이)가 있으면 거기에 자산군 버퍼를 더해 사용하고, 없으면
/// `entry ∓ atr × multiplier`로 폴백합니다. 결과 거리는 자산군 밴드
/// (H1 이상 타임프레임에서는 ×1.5 확대)로 클램프한 뒤 정규화합니다.
pub fn stop_loss(
    spec: &SymbolSpec,
    side: Side,
    entry_price: Decimal,
    atr: Decimal,
    swing_point: Option<Decimal>,
    atr_multiplier: Decimal,
    timeframe: Timeframe,
) -> Decimal {
    let buffer = class_buffer(spec);

    // 스윙 포인트는 진입가의 올바른 쪽에 있을 때만 적격
    let raw = match (side, swing_point) {
        (Side::Buy, Some(swing)) if swing < entry_price => swing - buffer,
        (Side::Sell, Some(swing)) if swing > entry_price => swing + buffer,
        (Side::Buy, _) => entry_price - atr * atr_multiplier,
        (Side::Sell, _) => entry_price + atr * atr_multiplier,
    };

    // 거리를 자산군 밴드로 클램프
    let (min_pips, max_pips) = class_band(spec.class);
    let scale = if timeframe.is_higher_timeframe() {
        dec!(1.5)
    } else {
        Decimal::ONE
    };
    let pip = spec.pip();
    let min_distance = min_pips * pip * scale;
    let max_distance = max_pips * pip * scale;

    let distance = (entry_price - raw).abs().clamp(min_distance, max_distance);
    let clamped = match side {
        Side::Buy => entry_price - distance,
        Side::Sell => entry_price + distance,
    };
    spec.normalize_price(clamped)
}

// =============================================================================
// 익절가
// =============================================================================

/// 익절가를 계산합니다.
///
/// `reward = |entry − stop| × rr_ratio`. 스탑 거리가 1 point 미만으로
/// 퇴화한 경우 리스크를 200 point로 바닥 처리한 뒤 배율을 적용합니다
/// (바닥 처리된 리스크로 재계산해도 같은 결과가 나옵니다).
pub fn take_profit(
    spec: &SymbolSpec,
    side: Side,
    entry_price: Decimal,
    stop_loss: Decimal,
    rr_ratio: Decimal,
) -> Decimal {
    let mut risk = (entry_price - stop_loss).abs();
    if risk < spec.point {
        risk = spec.point * dec!(200);
    }

    let reward = risk * rr_ratio;
    let tp = match side {
        Side::Buy => entry_price + reward,
        Side::Sell => entry_price - reward,
    };
    spec.normalize_price(tp)
}

/// 신호 신뢰도로 R:R 배율을 스케일한 익절가를 계산합니다.
///
/// 신뢰도 0.0은 기본 배율의 0.5배, 1.0은 1.5배를 적용합니다.
pub fn take_profit_with_confidence(
    spec: &SymbolSpec,
    side: Side,
    entry_price: Decimal,
    stop_loss: Decimal,
    base_rr: Decimal,
    confidence: f64,
) -> Decimal {
    let confidence = rust_decimal::prelude::FromPrimitive::from_f64(confidence.clamp(0.0, 1.0))
        .unwrap_or(Decimal::ONE);
    let factor = dec!(0.5) + confidence;
    take_profit(spec, side, entry_price, stop_loss, base_rr * factor)
}

// =============================================================================
// 트레일링 스탑
// =============================================================================

/// 트레일링 스탑 후보를 계산합니다.
///
/// 최신 스윙 구조에 `max(0.5 × ATR, 10 × point)` 버퍼를 더해 후보를
/// 만들고, 다음을 모두 만족할 때만 `Some(새 스탑)`을 반환합니다:
///
/// 1. 진입 이후 가격이 유리한 방향으로 `1.5 × ATR` 이상 이동
/// 2. 후보가 현재 스탑보다 엄격히 유리
/// 3. 후보가 현재가와 진입가의 올바른 쪽에 위치
///
/// 조건 미달이면 `None`을 반환하며, 호출자는 기존 스탑을 유지합니다.
/// 트레일링은 절대 후퇴하지 않습니다.
pub fn trailing_stop(
    spec: &SymbolSpec,
    side: Side,
    entry_price: Decimal,
    current_price: Decimal,
    current_stop: Option<Decimal>,
    atr: Decimal,
    swing_point: Option<Decimal>,
) -> Option<Decimal> {
    // 1. 최소 이동 조건
    let favorable_move = match side {
        Side::Buy => current_price - entry_price,
        Side::Sell => entry_price - current_price,
    };
    if favorable_move < atr * dec!(1.5) {
        return None;
    }

    // 스윙 구조가 없으면 후보를 만들 수 없음
    let swing = swing_point?;
    let buffer = (atr * dec!(0.5)).max(spec.point * dec!(10));
    let candidate = spec.normalize_price(match side {
        Side::Buy => swing - buffer,
        Side::Sell => swing + buffer,
    });

    // 2. 현재 스탑보다 엄격히 유리한지
    let improves = match (side, current_stop) {
        (Side::Buy, Some(stop)) => candidate > stop,
        (Side::Sell, Some(stop)) => candidate < stop,
        (_, None) => true,
    };
    if !improves {
        return None;
    }

    // 3. 현재가·진입가의 올바른 쪽인지
    let well_placed = match side {
        Side::Buy => candidate < current_price && candidate > entry_price,
        Side::Sell => candidate > current_price && candidate < entry_price,
    };
    if !well_placed {
        return None;
    }

    Some(candidate)
}
