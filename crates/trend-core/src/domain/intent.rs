//! 주문 의도와 진입 신호.
//!
//! `TradeIntent`는 결정 엔진 또는 수동 호출자가 생성하여
//! 실행 게이트가 정확히 한 번 소비하는 엔티티입니다. 영속화하지 않습니다.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Side;

// =============================================================================
// 의도 사유
// =============================================================================

/// 주문 의도가 만들어진 사유.
///
/// 리스크 게이트는 사유별로 허용 여부를 달리 판단할 수 있습니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentReason {
    /// 추세 확인에 의한 신규 진입
    TrendEntry,
    /// 기존 포지션 증축
    TrendAdd,
    /// 반대 방향 전환 진입
    Reversal,
    /// 수동 주문
    Manual,
}

impl std::fmt::Display for IntentReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IntentReason::TrendEntry => write!(f, "TREND_ENTRY"),
            IntentReason::TrendAdd => write!(f, "TREND_ADD"),
            IntentReason::Reversal => write!(f, "REVERSAL"),
            IntentReason::Manual => write!(f, "MANUAL"),
        }
    }
}

// =============================================================================
// 진입 신호
// =============================================================================

/// 외부 신호 생성기가 만든 진입 신호.
///
/// 게이트는 신호를 *권고*로만 취급합니다. 신호 가격이 현재 시장가에서
/// 심볼 스탑 거리 이내일 때만 채택하고, 그렇지 않으면 폐기하고
/// 실시간 시장가를 사용합니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntrySignal {
    /// 제안 진입가
    pub entry_price: Decimal,
    /// 제안 손절가
    pub stop_loss: Option<Decimal>,
    /// 제안 익절가
    pub take_profit: Option<Decimal>,
    /// 신호 유효 플래그
    pub valid: bool,
    /// 신호 만료 시각
    pub expires_at: DateTime<Utc>,
}

impl EntrySignal {
    /// 주어진 시각 기준으로 아직 사용 가능한 신호인지 확인합니다.
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.valid && self.expires_at > now
    }
}

// =============================================================================
// 주문 의도
// =============================================================================

/// 검증·실행 게이트가 소비하는 주문 의도.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeIntent {
    /// 고유 의도 ID
    pub id: Uuid,
    /// 심볼
    pub symbol: String,
    /// 방향
    pub side: Side,
    /// 요청 랏
    pub lot: Decimal,
    /// 손절가 (신호가 채택되면 신호 값으로 대체될 수 있음)
    pub stop_loss: Option<Decimal>,
    /// 익절가
    pub take_profit: Option<Decimal>,
    /// 의도 사유
    pub reason: IntentReason,
    /// 원천 진입 신호 (선택)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signal: Option<EntrySignal>,
}

impl TradeIntent {
    /// 새 주문 의도를 생성합니다.
    pub fn new(symbol: impl Into<String>, side: Side, lot: Decimal, reason: IntentReason) -> Self {
        Self {
            id: Uuid::new_v4(),
            symbol: symbol.into(),
            side,
            lot,
            stop_loss: None,
            take_profit: None,
            reason,
            signal: None,
        }
    }

    /// 손절/익절 가격을 설정합니다.
    pub fn with_stops(mut self, stop_loss: Option<Decimal>, take_profit: Option<Decimal>) -> Self {
        self.stop_loss = stop_loss;
        self.take_profit = take_profit;
        self
    }

    /// 원천 신호를 첨부합니다.
    pub fn with_signal(mut self, signal: EntrySignal) -> Self {
        self.signal = Some(signal);
        self
    }

    /// 손절·익절이 모두 설정되어 있는지 확인합니다.
    pub fn has_stops(&self) -> bool {
        self.stop_loss.is_some() && self.take_profit.is_some()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn test_intent_creation() {
        let intent = TradeIntent::new("EURUSD", Side::Buy, dec!(0.1), IntentReason::TrendEntry)
            .with_stops(Some(dec!(1.0950)), Some(dec!(1.1100)));

        assert_eq!(intent.symbol, "EURUSD");
        assert!(intent.has_stops());
        assert!(intent.signal.is_none());
    }

    #[test]
    fn test_signal_expiry() {
        let now = Utc::now();
        let signal = EntrySignal {
            entry_price: dec!(1.1000),
            stop_loss: None,
            take_profit: None,
            valid: true,
            expires_at: now + Duration::minutes(5),
        };
        assert!(signal.is_usable(now));
        assert!(!signal.is_usable(now + Duration::minutes(6)));

        let invalidated = EntrySignal {
            valid: false,
            ..signal
        };
        assert!(!invalidated.is_usable(now));
    }
}
