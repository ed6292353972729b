//! 검증·실행 에러 분류.
//!
//! 검증 실패는 부수효과 없이 사유와 함께 반환되고, 실행 실패는
//! 게이트웨이 코드 매핑과 함께 반환됩니다. 어느 쪽도 패닉하지
//! 않으며, 심볼 사이클은 항상 완주합니다.

use rust_decimal::Decimal;
use thiserror::Error;
use trend_core::{ExecError, IntentReason, ProviderError};

/// 실행 게이트 에러.
///
/// 파이프라인의 어느 단계가 의도를 거부했는지 사유를 보존합니다.
/// 실행 단계 이전의 실패는 어떤 상태도 변경하지 않습니다.
#[derive(Debug, Clone, Error)]
pub enum GateError {
    /// 심볼 자체가 거래 불가
    #[error("거래 불가 심볼: {symbol}")]
    SymbolNotTradeable {
        /// 대상 심볼
        symbol: String,
    },

    /// 리스크 게이트가 이 사유의 거래를 거부
    #[error("리스크 게이트 거부: {symbol} ({reason})")]
    TradeNotAllowed {
        /// 대상 심볼
        symbol: String,
        /// 의도 사유
        reason: IntentReason,
    },

    /// 노출 한도 초과
    #[error("노출 한도 초과: {symbol}")]
    ExposureLimit {
        /// 대상 심볼
        symbol: String,
    },

    /// 리스크 게이트 증거금 판정 실패
    #[error("리스크 게이트 증거금 부족 판정: {symbol}")]
    RiskGateMargin {
        /// 대상 심볼
        symbol: String,
    },

    /// 로컬 증거금 재확인 실패
    #[error("증거금 부족: 필요 {required}, 가용 {available}")]
    InsufficientMargin {
        /// 필요 증거금
        required: Decimal,
        /// 버퍼 적용 후 가용 증거금
        available: Decimal,
    },

    /// 캡/정렬 이후 주문 수량이 소멸
    #[error("유효하지 않은 주문 수량: {lot}")]
    LotTooSmall {
        /// 정렬 후 랏
        lot: Decimal,
    },

    /// 조회 협력자 실패
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// 게이트웨이 주문 거부
    #[error(transparent)]
    Execution(#[from] ExecError),
}

/// 청산 에러.
#[derive(Debug, Clone, Error)]
pub enum CloseError {
    /// 원장 열거 실패
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// 게이트웨이 청산 거부 (소멸 참조 제외)
    #[error("청산 실패 (티켓 {ticket}): {source}")]
    Gateway {
        /// 대상 티켓
        ticket: u64,
        /// 게이트웨이 에러
        source: ExecError,
    },
}
