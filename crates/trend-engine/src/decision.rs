//! 추세 행동 상태 기계.
//!
//! 세 계층 갭 분류(`TierSnapshot`)를 행동 하나로 변환하는 순수
//! 함수와, 차단 조건을 독립적으로 적용하는 접근 게이트를 정의합니다.
//!
//! 규칙 요약:
//! - 외곽이 `Thinking`(레인지)이면 신규 진입은 전면 금지, 위험 축소만 허용
//! - 외곽·중간·내곽이 모두 확인되면 내곽 방향으로 진입/증축
//! - 부분 확인에서는 내곽 `Folding` → 손실 축소, 중간 `Holding` →
//!   점진 청산, 중간 `Closing` → 전량 청산(폴딩 우선)
//! - 그 외에는 대기

use serde::{Deserialize, Serialize};

use trend_core::{GapPhase, Side, TierSnapshot};

// =============================================================================
// 행동 어휘
// =============================================================================

/// 결정 엔진이 사이클마다 내놓는 행동.
///
/// `*Blocked`는 차단 조건으로 성장 행동이 무효화된 경우입니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendAction {
    /// 대기
    Wait,
    /// 신규 매수 진입
    Buy,
    /// 신규 매도 진입
    Sell,
    /// 기존 포지션 증축
    Adding(Side),
    /// 손실 포지션 하나 축소
    CloseLosers,
    /// 점진 청산 (작은 수익부터)
    CloseSlowly,
    /// 전량 청산 (폴딩 우선)
    CloseAll,
    /// 차단된 매수
    BuyBlocked,
    /// 차단된 매도
    SellBlocked,
    /// 차단된 증축
    AddingBlocked,
}

impl TrendAction {
    /// 위험 축소 행동인지 확인합니다. 차단 조건의 영향을 받지 않습니다.
    pub fn is_risk_reducing(&self) -> bool {
        matches!(
            self,
            TrendAction::CloseLosers | TrendAction::CloseSlowly | TrendAction::CloseAll
        )
    }

    /// 성장(진입/증축) 행동인지 확인합니다.
    pub fn is_growth(&self) -> bool {
        matches!(
            self,
            TrendAction::Buy | TrendAction::Sell | TrendAction::Adding(_)
        )
    }
}

// =============================================================================
// 추세 결정
// =============================================================================

/// 계층 스냅샷을 행동으로 변환합니다.
pub fn decide(tiers: &TierSnapshot) -> TrendAction {
    // 레인지 시장: 내곽 폴딩이 중간 계층 상태와 무관하게 우선
    if tiers.outer == GapPhase::Thinking {
        if tiers.inner == GapPhase::Folding {
            return TrendAction::CloseLosers;
        }
        if matches!(tiers.mid, GapPhase::Holding | GapPhase::Closing) {
            return TrendAction::CloseSlowly;
        }
        return TrendAction::Wait;
    }

    // 전체 확인: 외곽 + 중간 + 내곽(방향 보유)
    if tiers.outer.confirms_outer() && tiers.mid.confirms_mid() && tiers.inner.confirms_inner() {
        if let Some(side) = tiers.inner.direction() {
            if tiers.mid == GapPhase::Adding {
                return TrendAction::Adding(side);
            }
            return match side {
                Side::Buy => TrendAction::Buy,
                Side::Sell => TrendAction::Sell,
            };
        }
        // 내곽이 Clear면 방향 정보가 없으므로 진입하지 않음
    }

    // 부분 확인: 위험 축소 행동만
    if tiers.inner == GapPhase::Folding {
        return TrendAction::CloseLosers;
    }
    if tiers.mid == GapPhase::Holding {
        return TrendAction::CloseSlowly;
    }
    if tiers.mid == GapPhase::Closing {
        return TrendAction::CloseAll;
    }

    TrendAction::Wait
}

// =============================================================================
// 접근 수준 게이트
// =============================================================================

/// 차단 조건 평가 결과.
///
/// 추세 행동과 독립적으로 평가됩니다.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AccessState {
    /// 심볼 포지션 수가 한도에 도달
    pub symbol_at_limit: bool,
    /// 일일 거래 한도 도달
    pub daily_limit_reached: bool,
    /// 뉴스 블랙아웃 구간
    pub blackout: bool,
    /// 리스크 게이트가 신규 거래를 잠금
    pub risk_locked: bool,
}

impl AccessState {
    /// 하나라도 차단 조건이 걸려 있는지.
    pub fn blocked(&self) -> bool {
        self.symbol_at_limit || self.daily_limit_reached || self.blackout || self.risk_locked
    }

    /// 모든 조건이 걸린 보수적 차단 상태.
    ///
    /// 접근 평가 자체가 실패했을 때의 폴백입니다.
    pub fn fully_blocked() -> Self {
        Self {
            symbol_at_limit: true,
            daily_limit_reached: true,
            blackout: true,
            risk_locked: true,
        }
    }
}

/// 차단 조건을 행동에 적용합니다.
///
/// 성장 행동은 `*Blocked`로 바뀌고, 위험 축소 행동은 그대로
/// 통과합니다. 리스크 관리는 거래 한도에 의해 차단되지 않습니다.
pub fn gate_access(action: TrendAction, access: &AccessState) -> TrendAction {
    if !access.blocked() {
        return action;
    }
    match action {
        TrendAction::Buy => TrendAction::BuyBlocked,
        TrendAction::Sell => TrendAction::SellBlocked,
        TrendAction::Adding(_) => TrendAction::AddingBlocked,
        other => other,
    }
}
