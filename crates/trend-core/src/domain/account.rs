//! 계좌 스냅샷과 프로세스 전역 리스크 상태.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// =============================================================================
// 계좌 스냅샷
// =============================================================================

/// 계좌 상태의 시점 스냅샷.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSnapshot {
    /// 잔고
    pub balance: Decimal,
    /// 평가 자산 (잔고 + 미실현 손익)
    pub equity: Decimal,
    /// 사용 가능 증거금
    pub free_margin: Decimal,
}

// =============================================================================
// 계좌 리스크 상태
// =============================================================================

/// 프로세스 전역 가변 리스크 상태.
///
/// 시작 시 한 번 초기화되고, 성공한 거래/청산마다 갱신되며,
/// 거래일마다 외부에서 `reset_daily()`로 초기화됩니다.
/// 사이클은 한 번에 하나만 실행되므로 별도 동기화가 필요 없습니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountRiskState {
    /// 증거금 안전 버퍼 (0.1 ~ 1.0으로 클램프)
    margin_safety_buffer: Decimal,
    /// 당일 거래 횟수 (단조 증가, 일일 리셋)
    daily_trade_count: u32,
    /// 심볼별 마지막 청산 시각
    last_close: HashMap<String, DateTime<Utc>>,
}

/// 버퍼를 허용 범위 [0.1, 1.0]으로 클램프합니다.
fn clamp_buffer(buffer: Decimal) -> Decimal {
    buffer.clamp(Decimal::new(1, 1), Decimal::ONE)
}

impl AccountRiskState {
    /// 새 리스크 상태를 생성합니다. 버퍼는 즉시 클램프됩니다.
    pub fn new(margin_safety_buffer: Decimal) -> Self {
        Self {
            margin_safety_buffer: clamp_buffer(margin_safety_buffer),
            daily_trade_count: 0,
            last_close: HashMap::new(),
        }
    }

    /// 현재 증거금 안전 버퍼.
    pub fn margin_safety_buffer(&self) -> Decimal {
        self.margin_safety_buffer
    }

    /// 증거금 안전 버퍼를 변경합니다. 범위를 벗어나면 클램프됩니다.
    pub fn set_margin_safety_buffer(&mut self, buffer: Decimal) {
        self.margin_safety_buffer = clamp_buffer(buffer);
    }

    /// 당일 거래 횟수.
    pub fn daily_trade_count(&self) -> u32 {
        self.daily_trade_count
    }

    /// 성공한 진입을 기록합니다. 호출마다 1씩 증가합니다.
    pub fn record_trade(&mut self) {
        self.daily_trade_count = self.daily_trade_count.saturating_add(1);
    }

    /// 심볼의 청산 시각을 기록합니다.
    pub fn record_close(&mut self, symbol: &str, at: DateTime<Utc>) {
        self.last_close.insert(symbol.to_string(), at);
    }

    /// 최소 청산 간격이 지났는지 확인합니다.
    ///
    /// 연속 청산(folding) 남발을 막기 위한 심볼 단위 스로틀입니다.
    pub fn can_close(&self, symbol: &str, now: DateTime<Utc>, min_interval: Duration) -> bool {
        match self.last_close.get(symbol) {
            Some(last) => now - *last >= min_interval,
            None => true,
        }
    }

    /// 일일 카운터를 초기화합니다. 거래일 전환 시 외부에서 호출합니다.
    pub fn reset_daily(&mut self) {
        self.daily_trade_count = 0;
    }
}

impl Default for AccountRiskState {
    fn default() -> Self {
        // 기본 버퍼 0.5: 사용 가능 증거금의 절반까지만 신규 진입에 허용
        Self::new(Decimal::new(5, 1))
    }
}
