//! 포지션 읽기 스냅샷.
//!
//! 포지션의 소유자는 외부 브로커 원장입니다. 코어는 열거 시점마다
//! 새로 조회한 스냅샷만 보유하며, 사이클을 넘겨 캐시하지 않습니다.
//! 변경은 오직 실행 게이트웨이(open/close)를 통해서만 일어납니다.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// =============================================================================
// 방향
// =============================================================================

/// 포지션/주문 방향.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// 매수 (롱)
    Buy,
    /// 매도 (숏)
    Sell,
}

impl Side {
    /// 반대 방향을 반환합니다.
    pub fn opposite(&self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

// =============================================================================
// 포지션
// =============================================================================

/// 열려 있는 포지션의 읽기 스냅샷.
///
/// 스냅샷 시점 이후 포지션이 스탑으로 청산되었을 수 있으므로,
/// 티켓 기반 청산 시도는 항상 실패를 감내해야 합니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    /// 브로커가 부여한 티켓 (불투명 식별자)
    pub ticket: u64,
    /// 심볼
    pub symbol: String,
    /// 방향
    pub side: Side,
    /// 랏 수량
    pub volume: Decimal,
    /// 진입 가격
    pub open_price: Decimal,
    /// 진입 시각
    pub open_time: DateTime<Utc>,
    /// 현재 평가 손익
    pub profit: Decimal,
    /// 손절가 (미설정이면 None)
    pub stop_loss: Option<Decimal>,
    /// 익절가 (미설정이면 None)
    pub take_profit: Option<Decimal>,
}

impl Position {
    /// 손실 포지션인지 확인합니다 (profit이 엄격히 음수).
    pub fn is_losing(&self) -> bool {
        self.profit < Decimal::ZERO
    }

    /// 수익 포지션인지 확인합니다.
    pub fn is_winning(&self) -> bool {
        self.profit > Decimal::ZERO
    }
}
