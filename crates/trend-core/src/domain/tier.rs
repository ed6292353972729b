//! 이동평균 갭 계층 분류.
//!
//! 외부 지표 계층이 심볼마다 외곽/중간/내곽 세 계층의 이동평균 갭을
//! 분류해 내려보냅니다. 결정 엔진은 이 어휘만 소비하며, 갭 계산
//! 자체는 범위 밖입니다.

use serde::{Deserialize, Serialize};

use super::Side;

// =============================================================================
// 갭 단계
// =============================================================================

/// 한 계층의 갭 상태 분류.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapPhase {
    /// 횡보 판단 중 (레인지 시장)
    Thinking,
    /// 방향이 선명함
    Clear,
    /// 추세 확정
    TrendConfirmed,
    /// 추세 반전
    Reversed,
    /// 보유 유지
    Holding,
    /// 청산 진행
    Closing,
    /// 손실 축소 (폴딩)
    Folding,
    /// 매수 방향
    Buying,
    /// 매도 방향
    Selling,
    /// 증축 방향
    Adding,
}

impl GapPhase {
    /// 이 단계가 내포하는 매매 방향.
    ///
    /// 방향 정보가 없는 단계는 `None`을 반환합니다.
    pub fn direction(&self) -> Option<Side> {
        match self {
            GapPhase::Buying => Some(Side::Buy),
            GapPhase::Selling => Some(Side::Sell),
            _ => None,
        }
    }

    /// 외곽 계층 기준으로 추세 방향을 확인해 주는 단계인지.
    pub fn confirms_outer(&self) -> bool {
        matches!(
            self,
            GapPhase::Clear | GapPhase::TrendConfirmed | GapPhase::Reversed
        )
    }

    /// 중간 계층 기준으로 추세를 확인해 주는 단계인지.
    pub fn confirms_mid(&self) -> bool {
        matches!(self, GapPhase::Clear | GapPhase::Adding)
    }

    /// 내곽 계층 기준으로 진입을 확인해 주는 단계인지.
    pub fn confirms_inner(&self) -> bool {
        matches!(self, GapPhase::Clear | GapPhase::Buying | GapPhase::Selling)
    }
}

// =============================================================================
// 계층 스냅샷
// =============================================================================

/// 심볼 하나의 세 계층 갭 분류 스냅샷.
///
/// 관례상 외곽은 장기(예: 50/200), 중간은 중기(예: 20/50),
/// 내곽은 단기(예: 5/20) 이동평균 쌍에 대응합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierSnapshot {
    /// 외곽 계층 (장기 구조)
    pub outer: GapPhase,
    /// 중간 계층
    pub mid: GapPhase,
    /// 내곽 계층 (단기 트리거)
    pub inner: GapPhase,
}

impl TierSnapshot {
    /// 새 계층 스냅샷을 생성합니다.
    pub fn new(outer: GapPhase, mid: GapPhase, inner: GapPhase) -> Self {
        Self { outer, mid, inner }
    }
}
