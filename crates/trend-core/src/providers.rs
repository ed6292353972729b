//! 협력자 trait 추상화.
//!
//! 시세·계좌·주문 라우팅·포지션 원장·리스크 매니저를 플랫폼 중립
//! 인터페이스로 정의합니다. 의사결정 코어는 이 trait들만 의존하며,
//! 실제 구현(브로커 브리지)은 바깥 crate가 담당합니다.
//!
//! # 설계 원칙
//!
//! - **좁은 인터페이스**: 코어가 실제로 소비하는 조회/명령만 노출
//! - **스냅샷 계약**: 모든 조회는 시점 스냅샷이며 캐시 계약이 없음
//! - **선택적 협력자**: 리스크 게이트·옵저버 부재 시 보수적 로컬 검증으로 강등

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{AccountSnapshot, IntentReason, Position, RiskLevel, Side, SymbolSpec};

// =============================================================================
// 시세 타입
// =============================================================================

/// 호가 시점 스냅샷.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    /// 매수 호가
    pub bid: Decimal,
    /// 매도 호가
    pub ask: Decimal,
    /// 호가 시각
    pub time: DateTime<Utc>,
}

impl Quote {
    /// 스프레드 (ask - bid).
    pub fn spread(&self) -> Decimal {
        self.ask - self.bid
    }

    /// 방향에 해당하는 체결 기준가.
    ///
    /// 매수는 ask, 매도는 bid로 체결됩니다.
    pub fn entry_price(&self, side: Side) -> Decimal {
        match side {
            Side::Buy => self.ask,
            Side::Sell => self.bid,
        }
    }
}

// =============================================================================
// 주문 요청/응답 타입
// =============================================================================

/// 게이트웨이 주문 요청.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    /// 심볼
    pub symbol: String,
    /// 방향
    pub side: Side,
    /// 랏
    pub lot: Decimal,
    /// 희망 체결가 (None이면 시장가)
    pub price: Option<Decimal>,
    /// 손절가
    pub stop_loss: Option<Decimal>,
    /// 익절가
    pub take_profit: Option<Decimal>,
    /// 주문 태그 (의도 사유 등)
    pub tag: String,
}

/// 주문 체결 영수증.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderReceipt {
    /// 브로커 티켓
    pub ticket: u64,
    /// 실제 체결 가격 (요청가와 다를 수 있음)
    pub executed_price: Decimal,
    /// 체결 시각
    pub executed_at: DateTime<Utc>,
}

/// 청산 영수증.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloseReceipt {
    /// 청산된 티켓
    pub ticket: u64,
    /// 청산 가격
    pub closed_price: Decimal,
    /// 청산 시각
    pub closed_at: DateTime<Utc>,
}

// =============================================================================
// 에러 타입
// =============================================================================

/// 조회 협력자 에러.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// 연결 실패
    #[error("연결 실패: {0}")]
    Connection(String),

    /// 심볼을 찾을 수 없음
    #[error("알 수 없는 심볼: {0}")]
    UnknownSymbol(String),

    /// 시세 없음
    #[error("시세 없음: {0}")]
    NoQuote(String),

    /// 기타 에러
    #[error("조회 실패: {0}")]
    Other(String),
}

/// 실행 게이트웨이 에러.
///
/// 게이트웨이가 돌려준 숫자 코드를 사람이 읽을 수 있는 설명으로
/// 매핑합니다. 코어는 재시도하지 않으며, 복구 가능 여부는
/// 호출자에게 분류 정보로만 제공됩니다.
#[derive(Debug, Clone, Error)]
pub enum ExecError {
    /// 게이트웨이가 코드와 함께 주문을 거부
    #[error("게이트웨이 거부 (code {code}): {description}")]
    Rejected {
        /// 게이트웨이 에러 코드
        code: u32,
        /// 매핑된 설명
        description: String,
    },

    /// 전송 계층 실패 (코드 없음)
    #[error("게이트웨이 전송 실패: {0}")]
    Transport(String),
}

impl ExecError {
    /// 게이트웨이 코드로부터 에러를 생성하고 설명을 매핑합니다.
    pub fn from_code(code: u32) -> Self {
        ExecError::Rejected {
            code,
            description: describe_code(code).to_string(),
        }
    }

    /// 참조가 이미 소멸한(청산 완료 등) 경우인지 확인합니다.
    ///
    /// 스냅샷과 청산 시도 사이에 포지션이 사라진 경우로,
    /// 에러가 아니라 건너뛰기로 처리해야 합니다.
    pub fn is_stale(&self) -> bool {
        matches!(self, ExecError::Rejected { code: 10036, .. })
    }

    /// 재시도로 복구 가능한 일시적 거부인지 확인합니다.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ExecError::Rejected {
                code: 10004 | 10020 | 10021 | 10031,
                ..
            }
        )
    }
}

/// 게이트웨이 에러 코드 설명 테이블.
pub fn describe_code(code: u32) -> &'static str {
    match code {
        10004 => "리쿼트 발생",
        10006 => "주문 거부",
        10013 => "잘못된 주문 요청",
        10014 => "잘못된 주문 수량",
        10015 => "잘못된 주문 가격",
        10016 => "잘못된 스탑 가격",
        10017 => "해당 심볼 거래 비활성화",
        10018 => "시장 폐장",
        10019 => "증거금 부족",
        10020 => "가격 변동으로 처리 불가",
        10021 => "호가 없음",
        10027 => "자동매매 비활성화",
        10031 => "서버 연결 없음",
        10036 => "포지션이 이미 청산됨",
        _ => "알 수 없는 게이트웨이 에러",
    }
}

// =============================================================================
// 조회 협력자 trait
// =============================================================================

/// 시세 데이터 제공자.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// 현재 호가 조회.
    async fn get_quote(&self, symbol: &str) -> Result<Quote, ProviderError>;

    /// 심볼 명세 조회.
    async fn symbol_spec(&self, symbol: &str) -> Result<SymbolSpec, ProviderError>;
}

/// 계좌 상태 제공자.
#[async_trait]
pub trait AccountProvider: Send + Sync {
    /// 잔고/평가자산/가용 증거금 스냅샷 조회.
    async fn snapshot(&self) -> Result<AccountSnapshot, ProviderError>;
}

/// 포지션 원장.
///
/// 호출마다 새로 열거합니다. 캐시 계약이 없으므로 반환된 스냅샷은
/// 다음 호출 시점에 이미 무효할 수 있습니다.
#[async_trait]
pub trait PositionLedger: Send + Sync {
    /// 열린 포지션 열거. `symbol`이 Some이면 해당 심볼만.
    async fn fetch_positions(&self, symbol: Option<&str>) -> Result<Vec<Position>, ProviderError>;
}

// =============================================================================
// 실행 게이트웨이 trait
// =============================================================================

/// 주문 실행 게이트웨이.
///
/// 호출은 동기·블로킹 의미론입니다. 코어는 결정당 한 번만 시도하며
/// 실패 시 재시도 없이 보고하고 다음 심볼로 넘어갑니다.
#[async_trait]
pub trait ExecutionGateway: Send + Sync {
    /// 신규 주문 제출.
    async fn open(&self, request: &OrderRequest) -> Result<OrderReceipt, ExecError>;

    /// 티켓 청산.
    async fn close(&self, ticket: u64) -> Result<CloseReceipt, ExecError>;
}

// =============================================================================
// 리스크 게이트 trait (선택적 협력자)
// =============================================================================

/// 리스크 매니저 협력자.
///
/// 부재 시 모든 호출 지점은 로컬 검증(증거금/랏)으로 강등되며,
/// 절대 하드 실패가 되지 않습니다.
#[async_trait]
pub trait RiskGate: Send + Sync {
    /// 이 심볼/사유의 신규 거래 허용 여부.
    async fn allow_new_trade(&self, symbol: &str, reason: IntentReason) -> bool;

    /// 노출 한도 확인.
    async fn check_exposure_limits(&self, symbol: &str, lot: Decimal) -> bool;

    /// 증거금 충분성 확인.
    async fn is_margin_sufficient(&self, symbol: &str, lot: Decimal) -> bool;

    /// 스탑 배치 유효성 확인 (정보성: 실패해도 차단하지 않음).
    async fn validate_stop_placement(
        &self,
        symbol: &str,
        side: Side,
        entry: Decimal,
        stop_loss: Decimal,
    ) -> bool;

    /// 권장 손절가 (선택).
    async fn optimal_stop_loss(&self, symbol: &str, side: Side, entry: Decimal)
        -> Option<Decimal>;

    /// 권장 익절가 (선택).
    async fn optimal_take_profit(
        &self,
        symbol: &str,
        side: Side,
        entry: Decimal,
        stop_loss: Decimal,
    ) -> Option<Decimal>;

    /// 체결 후 성과 지표 갱신. 실제 체결가를 전달해야 합니다.
    async fn update_performance_metrics(
        &self,
        symbol: &str,
        side: Side,
        lot: Decimal,
        executed_price: Decimal,
    );

    /// 현재 계좌 리스크 수준.
    async fn risk_level(&self) -> RiskLevel;

    /// 신규 거래 전면 허용 여부 (드로다운 한도 등).
    async fn can_open_new_trades(&self) -> bool;

    /// 변동성 수용 가능 여부 (사전 검증용).
    async fn volatility_acceptable(&self, _symbol: &str) -> bool {
        true
    }

    /// 스프레드 수용 가능 여부 (사전 검증용).
    async fn spread_acceptable(&self, _symbol: &str) -> bool {
        true
    }

    /// 리스크 조정 주문 크기. 기본 구현은 입력을 그대로 반환합니다.
    async fn risk_adjusted_size(&self, _symbol: &str, base_lot: Decimal) -> Decimal {
        base_lot
    }

    /// 수익 확보 루틴 (트레일링과 별개의 수익 잠금).
    async fn secure_profit(&self) {}

    /// 보유 포지션 트레일링 스탑 일괄 갱신.
    async fn update_trailing_stops(&self) {}

    /// 수익 확인 후 본전 이동.
    async fn move_to_breakeven(&self, _symbol: &str) -> bool {
        false
    }
}

// =============================================================================
// 보조 협력자 trait
// =============================================================================

/// 뉴스 블랙아웃 캘린더.
///
/// 고위험 뉴스 구간에는 신규 진입이 차단됩니다.
#[async_trait]
pub trait BlackoutCalendar: Send + Sync {
    /// 주어진 시각에 심볼이 블랙아웃 구간인지 확인.
    async fn is_blackout(&self, symbol: &str, at: DateTime<Utc>) -> bool;
}

/// 관찰 노트 심각도.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteSeverity {
    /// 정보
    Info,
    /// 경고
    Warning,
    /// 치명
    Critical,
}

/// 의사결정 관찰자.
///
/// 결정별 구조화 컨텍스트를 수신하는 순수 옵저버입니다.
/// 제어 흐름에 절대 영향을 주지 않습니다.
pub trait DecisionObserver: Send + Sync {
    /// 심각도 태그가 붙은 노트를 기록합니다.
    fn note(&self, severity: NoteSeverity, message: &str, context: &[(&str, String)]);
}

// =============================================================================
// 테스트
// =============================================================================

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::domain::SymbolClass;

    /// 테스트용 고정 시세 제공자.
    struct FixedMarket {
        bid: Decimal,
        ask: Decimal,
    }

    #[async_trait]
    impl MarketDataProvider for FixedMarket {
        async fn get_quote(&self, _symbol: &str) -> Result<Quote, ProviderError> {
            Ok(Quote {
                bid: self.bid,
                ask: self.ask,
                time: Utc::now(),
            })
        }

        async fn symbol_spec(&self, symbol: &str) -> Result<SymbolSpec, ProviderError> {
            if symbol != "EURUSD" {
                return Err(ProviderError::UnknownSymbol(symbol.to_string()));
            }
            Ok(SymbolSpec {
                name: symbol.to_string(),
                class: SymbolClass::Forex,
                digits: 5,
                point: dec!(0.00001),
                tick_size: dec!(0.00001),
                contract_size: dec!(100000),
                volume_min: dec!(0.01),
                volume_max: dec!(100),
                volume_step: dec!(0.01),
                margin_per_lot: dec!(1000),
                stops_level: 10,
                freeze_level: 5,
                trade_allowed: true,
            })
        }
    }

    #[tokio::test]
    async fn test_fixed_market_provider() {
        let market = FixedMarket {
            bid: dec!(1.10000),
            ask: dec!(1.10010),
        };

        let quote = market.get_quote("EURUSD").await.unwrap();
        assert_eq!(quote.spread(), dec!(0.0001));
        assert_eq!(quote.entry_price(Side::Buy), dec!(1.10010));
        assert_eq!(quote.entry_price(Side::Sell), dec!(1.10000));

        let result = market.symbol_spec("GBPUSD").await;
        assert!(matches!(result, Err(ProviderError::UnknownSymbol(_))));
    }

    #[test]
    fn test_exec_error_mapping() {
        let err = ExecError::from_code(10019);
        assert!(err.to_string().contains("증거금 부족"));
        assert!(!err.is_stale());
        assert!(!err.is_recoverable());

        assert!(ExecError::from_code(10036).is_stale());
        assert!(ExecError::from_code(10004).is_recoverable());
        assert!(ExecError::from_code(10031).is_recoverable());
    }
}
