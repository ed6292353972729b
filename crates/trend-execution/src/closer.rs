//! 포지션 청산 선택기.
//!
//! 살아있는 포지션 원장을 호출마다 새로 열거하고, 선택 정책에 따라
//! 포지션 하나를 골라 청산합니다. 모든 전략은 "한 번 스캔, 최량 추적,
//! 티켓으로 청산, 결과 보고" 패턴을 공유합니다.
//!
//! 열거 순서는 플랫폼에 의존하지 않도록 티켓 오름차순으로 고정하며,
//! 동률은 먼저 등장한(티켓이 작은) 포지션이 이깁니다.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use trend_core::{
    DecisionObserver, ExecutionGateway, NoteSeverity, Position, PositionLedger, RiskGate, Side,
};

use crate::error::CloseError;

// =============================================================================
// 우선순위와 결과 타입
// =============================================================================

/// 청산 우선순위 정책.
///
/// 상태가 없으며 호출마다 선택합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClosePriority {
    /// 손익 절대값이 가장 작은 포지션
    SmallestAbsProfit,
    /// 가장 큰 손실
    BiggestLoss,
    /// 가장 작은 손실 (0에 가장 가까운 음수)
    SmallestLoss,
    /// 가장 오래된 포지션
    Oldest,
    /// 가장 최근 포지션
    Newest,
}

/// 단건 청산 결과.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloseOutcome {
    /// 청산된 티켓
    pub ticket: u64,
    /// 심볼
    pub symbol: String,
    /// 청산 시점 스냅샷의 손익
    pub profit: Decimal,
    /// 청산 가격
    pub closed_price: Decimal,
}

/// 일괄 청산 집계.
///
/// 개별 청산 실패를 지나쳐 계속 진행하고 성공/실패/건너뜀을
/// 집계합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BulkCloseReport {
    /// 시도한 포지션 수
    pub attempted: usize,
    /// 청산 성공 수
    pub closed: usize,
    /// 청산 실패 수 (소멸 참조 제외)
    pub failed: usize,
    /// 소멸 참조로 건너뛴 수
    pub skipped_stale: usize,
    /// 청산된 포지션들의 스냅샷 손익 합
    pub profit: Decimal,
    /// 손실 포지션 폴딩만 수행했는지 (전량 청산 유보)
    pub folded_only: bool,
}

// =============================================================================
// 청산 선택기
// =============================================================================

/// 포지션 청산 선택기.
pub struct PositionCloser {
    ledger: Arc<dyn PositionLedger>,
    gateway: Arc<dyn ExecutionGateway>,
    risk_gate: Option<Arc<dyn RiskGate>>,
    observer: Option<Arc<dyn DecisionObserver>>,
}

impl PositionCloser {
    /// 새 선택기를 생성합니다.
    pub fn new(ledger: Arc<dyn PositionLedger>, gateway: Arc<dyn ExecutionGateway>) -> Self {
        Self {
            ledger,
            gateway,
            risk_gate: None,
            observer: None,
        }
    }

    /// 리스크 게이트 협력자를 연결합니다.
    pub fn with_risk_gate(mut self, risk_gate: Arc<dyn RiskGate>) -> Self {
        self.risk_gate = Some(risk_gate);
        self
    }

    /// 의사결정 옵저버를 연결합니다.
    pub fn with_observer(mut self, observer: Arc<dyn DecisionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// 원장을 새로 열거하고 티켓 오름차순으로 정렬합니다.
    ///
    /// 정렬은 동률 처리를 결정적으로 만들기 위한 것입니다.
    async fn snapshot_sorted(&self, symbol: Option<&str>) -> Result<Vec<Position>, CloseError> {
        let mut positions = self.ledger.fetch_positions(symbol).await?;
        positions.sort_by_key(|p| p.ticket);
        Ok(positions)
    }

    /// 티켓 하나를 청산합니다.
    ///
    /// 소멸 참조(스냅샷 이후 이미 청산됨)는 에러가 아니라 `None`으로
    /// 처리합니다.
    async fn close_position(
        &self,
        position: &Position,
    ) -> Result<Option<CloseOutcome>, CloseError> {
        match self.gateway.close(position.ticket).await {
            Ok(receipt) => {
                let outcome = CloseOutcome {
                    ticket: position.ticket,
                    symbol: position.symbol.clone(),
                    profit: position.profit,
                    closed_price: receipt.closed_price,
                };
                info!(
                    ticket = outcome.ticket,
                    symbol = %outcome.symbol,
                    profit = %outcome.profit,
                    "포지션 청산"
                );
                if let Some(observer) = &self.observer {
                    observer.note(
                        NoteSeverity::Info,
                        "포지션 청산",
                        &[
                            ("symbol", outcome.symbol.clone()),
                            ("profit", outcome.profit.to_string()),
                        ],
                    );
                }
                Ok(Some(outcome))
            }
            Err(err) if err.is_stale() => {
                warn!(ticket = position.ticket, "소멸 참조 건너뜀");
                Ok(None)
            }
            Err(err) => Err(CloseError::Gateway {
                ticket: position.ticket,
                source: err,
            }),
        }
    }

    // =========================================================================
    // 선택 전략
    // =========================================================================

    /// 손익 절대값이 가장 작은 포지션을 청산합니다.
    ///
    /// 후보가 없으면 `Ok(None)`.
    pub async fn close_smallest_abs_profit(
        &self,
        symbol: Option<&str>,
    ) -> Result<Option<CloseOutcome>, CloseError> {
        let positions = self.snapshot_sorted(symbol).await?;
        let best = positions
            .iter()
            .reduce(|best, p| {
                if p.profit.abs() < best.profit.abs() {
                    p
                } else {
                    best
                }
            });
        match best {
            Some(position) => self.close_position(position).await,
            None => Ok(None),
        }
    }

    /// 가장 큰 손실 포지션을 청산합니다.
    ///
    /// 손실 포지션이 없으면 `Ok(None)`.
    pub async fn close_biggest_loss(
        &self,
        symbol: Option<&str>,
    ) -> Result<Option<CloseOutcome>, CloseError> {
        let positions = self.snapshot_sorted(symbol).await?;
        let best = positions
            .iter()
            .filter(|p| p.is_losing())
            .reduce(|best, p| if p.profit < best.profit { p } else { best });
        match best {
            Some(position) => self.close_position(position).await,
            None => Ok(None),
        }
    }

    /// 가장 작은 손실(0에 가장 가까운 음수) 포지션을 청산합니다.
    ///
    /// 손실 판정은 엄격한 음수 기준입니다. 손익이 정확히 0인 포지션은
    /// 손실로 간주되지 않으므로 절대 선택되지 않습니다.
    pub async fn close_smallest_loss(
        &self,
        symbol: Option<&str>,
    ) -> Result<Option<CloseOutcome>, CloseError> {
        let positions = self.snapshot_sorted(symbol).await?;
        let best = positions
            .iter()
            .filter(|p| p.is_losing())
            .reduce(|best, p| if p.profit > best.profit { p } else { best });
        match best {
            Some(position) => self.close_position(position).await,
            None => Ok(None),
        }
    }

    /// 최소 수익 이상인 포지션 중 수익이 가장 작은 것을 청산합니다.
    ///
    /// 적격 수익 포지션이 없으면 가장 작은 손실 전략으로 위임합니다.
    pub async fn close_smallest_win_first(
        &self,
        symbol: Option<&str>,
        min_profit: Decimal,
    ) -> Result<Option<CloseOutcome>, CloseError> {
        let positions = self.snapshot_sorted(symbol).await?;
        let best = positions
            .iter()
            .filter(|p| p.profit >= min_profit)
            .reduce(|best, p| if p.profit < best.profit { p } else { best });
        match best {
            Some(position) => self.close_position(position).await,
            None => self.close_smallest_loss(symbol).await,
        }
    }

    /// 가장 오래된 포지션을 청산합니다.
    pub async fn close_oldest(
        &self,
        symbol: Option<&str>,
    ) -> Result<Option<CloseOutcome>, CloseError> {
        let positions = self.snapshot_sorted(symbol).await?;
        let best = positions
            .iter()
            .reduce(|best, p| if p.open_time < best.open_time { p } else { best });
        match best {
            Some(position) => self.close_position(position).await,
            None => Ok(None),
        }
    }

    /// 가장 최근 포지션을 청산합니다.
    pub async fn close_newest(
        &self,
        symbol: Option<&str>,
    ) -> Result<Option<CloseOutcome>, CloseError> {
        let positions = self.snapshot_sorted(symbol).await?;
        let best = positions
            .iter()
            .reduce(|best, p| if p.open_time > best.open_time { p } else { best });
        match best {
            Some(position) => self.close_position(position).await,
            None => Ok(None),
        }
    }

    /// 우선순위 정책을 해당 전략으로 디스패치합니다.
    pub async fn smart_close(
        &self,
        priority: ClosePriority,
        symbol: Option<&str>,
    ) -> Result<Option<CloseOutcome>, CloseError> {
        match priority {
            ClosePriority::SmallestAbsProfit => self.close_smallest_abs_profit(symbol).await,
            ClosePriority::BiggestLoss => self.close_biggest_loss(symbol).await,
            ClosePriority::SmallestLoss => self.close_smallest_loss(symbol).await,
            ClosePriority::Oldest => self.close_oldest(symbol).await,
            ClosePriority::Newest => self.close_newest(symbol).await,
        }
    }

    /// 현재 상태에 맞는 폴딩 우선순위를 권고합니다.
    ///
    /// - 리스크 게이트가 `High`/`Critical`이면 노출 축소(`BiggestLoss`)
    /// - 총 손익이 0 이상이면 자본 보존(`SmallestAbsProfit`)
    /// - 손실 포지션이 있으면 점진 회복(`SmallestLoss`)
    /// - 그 외 `BiggestLoss`
    pub async fn folding_recommendation(
        &self,
        symbol: Option<&str>,
    ) -> Result<ClosePriority, CloseError> {
        if let Some(risk_gate) = &self.risk_gate {
            if risk_gate.risk_level().await.needs_derisk() {
                return Ok(ClosePriority::BiggestLoss);
            }
        }

        let positions = self.snapshot_sorted(symbol).await?;
        let total: Decimal = positions.iter().map(|p| p.profit).sum();
        if total >= Decimal::ZERO {
            Ok(ClosePriority::SmallestAbsProfit)
        } else if positions.iter().any(|p| p.is_losing()) {
            Ok(ClosePriority::SmallestLoss)
        } else {
            Ok(ClosePriority::BiggestLoss)
        }
    }

    // =========================================================================
    // 일괄 청산
    // =========================================================================

    /// 전량 청산 (폴딩 우선).
    ///
    /// 손실 포지션이 있으면 이번 사이클에는 가장 큰 손실 하나만
    /// 폴딩하고 전량 청산을 다음 사이클로 미룹니다. 손실 포지션이
    /// 없을 때만 모든 포지션을 청산하며, 개별 실패를 지나쳐 집계를
    /// 계속합니다.
    pub async fn close_all(&self, symbol: Option<&str>) -> Result<BulkCloseReport, CloseError> {
        let positions = self.snapshot_sorted(symbol).await?;
        let mut report = BulkCloseReport::default();
        if positions.is_empty() {
            return Ok(report);
        }

        // 폴딩 우선: 손실이 남아 있으면 하나만 접고 유보
        if positions.iter().any(|p| p.is_losing()) {
            report.folded_only = true;
            report.attempted = 1;
            match self.close_biggest_loss(symbol).await {
                Ok(Some(outcome)) => {
                    report.closed = 1;
                    report.profit = outcome.profit;
                }
                Ok(None) => report.skipped_stale = 1,
                Err(err) => {
                    warn!(%err, "폴딩 실패");
                    report.failed = 1;
                }
            }
            return Ok(report);
        }

        for position in &positions {
            report.attempted += 1;
            match self.close_position(position).await {
                Ok(Some(outcome)) => {
                    report.closed += 1;
                    report.profit += outcome.profit;
                }
                Ok(None) => report.skipped_stale += 1,
                Err(err) => {
                    warn!(%err, ticket = position.ticket, "일괄 청산 중 개별 실패");
                    report.failed += 1;
                }
            }
        }

        info!(
            closed = report.closed,
            failed = report.failed,
            skipped = report.skipped_stale,
            profit = %report.profit,
            "일괄 청산 완료"
        );
        Ok(report)
    }

    /// 특정 방향의 포지션을 모두 청산합니다.
    ///
    /// 차단 상태에서의 방향 전환(반대편 청산)에 사용합니다.
    pub async fn close_side(
        &self,
        symbol: &str,
        side: Side,
    ) -> Result<BulkCloseReport, CloseError> {
        let positions = self.snapshot_sorted(Some(symbol)).await?;
        let mut report = BulkCloseReport::default();

        for position in positions.iter().filter(|p| p.side == side) {
            report.attempted += 1;
            match self.close_position(position).await {
                Ok(Some(outcome)) => {
                    report.closed += 1;
                    report.profit += outcome.profit;
                }
                Ok(None) => report.skipped_stale += 1,
                Err(err) => {
                    warn!(%err, ticket = position.ticket, "반대편 청산 중 개별 실패");
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }

    // =========================================================================
    // 조회 헬퍼
    // =========================================================================

    /// 열린 포지션 수를 반환합니다.
    pub async fn position_count(&self, symbol: Option<&str>) -> Result<usize, CloseError> {
        Ok(self.ledger.fetch_positions(symbol).await?.len())
    }

    /// 특정 방향의 열린 포지션 수를 반환합니다.
    pub async fn position_count_by_side(
        &self,
        symbol: &str,
        side: Side,
    ) -> Result<usize, CloseError> {
        Ok(self
            .ledger
            .fetch_positions(Some(symbol))
            .await?
            .iter()
            .filter(|p| p.side == side)
            .count())
    }

    /// 열린 포지션들의 손익 합을 반환합니다.
    pub async fn total_profit(&self, symbol: Option<&str>) -> Result<Decimal, CloseError> {
        Ok(self
            .ledger
            .fetch_positions(symbol)
            .await?
            .iter()
            .map(|p| p.profit)
            .sum())
    }
}

// =============================================================================
// 테스트
// =============================================================================

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal_macros::dec;

    use trend_core::{CloseReceipt, ExecError, OrderReceipt, OrderRequest, ProviderError};

    use super::*;

    /// 고정 스냅샷을 돌려주는 테스트용 원장.
    ///
    /// 의도적으로 정렬하지 않은 순서를 반환해 선택기의 정렬을 검증합니다.
    struct MockLedger {
        positions: Vec<Position>,
    }

    #[async_trait]
    impl PositionLedger for MockLedger {
        async fn fetch_positions(
            &self,
            symbol: Option<&str>,
        ) -> Result<Vec<Position>, ProviderError> {
            Ok(self
                .positions
                .iter()
                .filter(|p| symbol.map_or(true, |s| p.symbol == s))
                .cloned()
                .collect())
        }
    }

    /// 청산 호출을 기록하는 테스트용 게이트웨이.
    struct MockGateway {
        closed: Mutex<Vec<u64>>,
        /// 티켓별 강제 실패 코드
        fail_codes: HashMap<u64, u32>,
    }

    impl MockGateway {
        fn new() -> Self {
            Self {
                closed: Mutex::new(vec![]),
                fail_codes: HashMap::new(),
            }
        }

        fn failing(fail_codes: HashMap<u64, u32>) -> Self {
            Self {
                closed: Mutex::new(vec![]),
                fail_codes,
            }
        }

        fn closed_tickets(&self) -> Vec<u64> {
            self.closed.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ExecutionGateway for MockGateway {
        async fn open(&self, _request: &OrderRequest) -> Result<OrderReceipt, ExecError> {
            unreachable!("청산 테스트에서는 호출되지 않음")
        }

        async fn close(&self, ticket: u64) -> Result<CloseReceipt, ExecError> {
            if let Some(code) = self.fail_codes.get(&ticket) {
                return Err(ExecError::from_code(*code));
            }
            self.closed.lock().unwrap().push(ticket);
            Ok(CloseReceipt {
                ticket,
                closed_price: dec!(1.1000),
                closed_at: Utc::now(),
            })
        }
    }

    fn position(ticket: u64, profit: Decimal, minutes_ago: i64) -> Position {
        let base = Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap();
        Position {
            ticket,
            symbol: "EURUSD".to_string(),
            side: Side::Buy,
            volume: dec!(0.1),
            open_price: dec!(1.1000),
            open_time: base - Duration::minutes(minutes_ago),
            profit,
            stop_loss: None,
            take_profit: None,
        }
    }

    fn closer_with(positions: Vec<Position>, gateway: Arc<MockGateway>) -> PositionCloser {
        PositionCloser::new(Arc::new(MockLedger { positions }), gateway)
    }

    #[tokio::test]
    async fn test_smallest_abs_profit_selection() {
        let gateway = Arc::new(MockGateway::new());
        let closer = closer_with(
            vec![
                position(1, dec!(5), 30),
                position(2, dec!(-3), 20),
                position(3, dec!(1), 10),
            ],
            gateway.clone(),
        );

        let outcome = closer.close_smallest_abs_profit(None).await.unwrap().unwrap();
        assert_eq!(outcome.ticket, 3);
        assert_eq!(outcome.profit, dec!(1));
    }

    #[tokio::test]
    async fn test_biggest_loss_selection() {
        let gateway = Arc::new(MockGateway::new());
        let closer = closer_with(
            vec![
                position(1, dec!(5), 30),
                position(2, dec!(-30), 20),
                position(3, dec!(-3), 10),
            ],
            gateway,
        );

        let outcome = closer.close_biggest_loss(None).await.unwrap().unwrap();
        assert_eq!(outcome.ticket, 2);
        assert_eq!(outcome.profit, dec!(-30));
    }

    #[tokio::test]
    async fn test_biggest_loss_reports_failure_when_all_winning() {
        let gateway = Arc::new(MockGateway::new());
        let closer = closer_with(
            vec![position(1, dec!(5), 30), position(2, dec!(3), 20)],
            gateway.clone(),
        );

        let outcome = closer.close_biggest_loss(None).await.unwrap();
        assert!(outcome.is_none());
        assert!(gateway.closed_tickets().is_empty());
    }

    #[tokio::test]
    async fn test_smallest_loss_never_selects_zero_profit() {
        let gateway = Arc::new(MockGateway::new());
        // 손익 0 포지션은 손실로 간주되지 않음
        let closer = closer_with(
            vec![position(1, Decimal::ZERO, 30), position(2, dec!(-5), 20)],
            gateway,
        );

        let outcome = closer.close_smallest_loss(None).await.unwrap().unwrap();
        assert_eq!(outcome.ticket, 2);

        let gateway = Arc::new(MockGateway::new());
        let closer = closer_with(vec![position(1, Decimal::ZERO, 30)], gateway);
        assert!(closer.close_smallest_loss(None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_smallest_win_delegates_to_smallest_loss() {
        let gateway = Arc::new(MockGateway::new());
        // 수익 포지션 없음 → 가장 작은 손실(-2)로 위임
        let closer = closer_with(
            vec![position(1, dec!(-10), 30), position(2, dec!(-2), 20)],
            gateway,
        );

        let outcome = closer
            .close_smallest_win_first(None, dec!(0.01))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(outcome.ticket, 2);
        assert_eq!(outcome.profit, dec!(-2));
    }

    #[tokio::test]
    async fn test_smallest_win_prefers_winner() {
        let gateway = Arc::new(MockGateway::new());
        let closer = closer_with(
            vec![
                position(1, dec!(-10), 30),
                position(2, dec!(8), 20),
                position(3, dec!(2), 10),
            ],
            gateway,
        );

        let outcome = closer
            .close_smallest_win_first(None, dec!(0.01))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(outcome.ticket, 3);
    }

    #[tokio::test]
    async fn test_oldest_and_newest() {
        let gateway = Arc::new(MockGateway::new());
        let positions = vec![
            position(1, dec!(1), 60),
            position(2, dec!(2), 120),
            position(3, dec!(3), 10),
        ];
        let closer = closer_with(positions.clone(), gateway);
        let outcome = closer.close_oldest(None).await.unwrap().unwrap();
        assert_eq!(outcome.ticket, 2);

        let gateway = Arc::new(MockGateway::new());
        let closer = closer_with(positions, gateway);
        let outcome = closer.close_newest(None).await.unwrap().unwrap();
        assert_eq!(outcome.ticket, 3);
    }

    #[tokio::test]
    async fn test_tie_break_is_deterministic_by_ticket() {
        let gateway = Arc::new(MockGateway::new());
        // 원장이 역순으로 돌려줘도 동률이면 티켓이 작은 쪽이 이김
        let closer = closer_with(
            vec![position(7, dec!(1), 30), position(2, dec!(1), 20)],
            gateway,
        );

        let outcome = closer.close_smallest_abs_profit(None).await.unwrap().unwrap();
        assert_eq!(outcome.ticket, 2);
    }

    #[tokio::test]
    async fn test_close_all_folds_first_when_loser_exists() {
        let gateway = Arc::new(MockGateway::new());
        let closer = closer_with(
            vec![
                position(1, dec!(5), 30),
                position(2, dec!(-30), 20),
                position(3, dec!(3), 10),
            ],
            gateway.clone(),
        );

        let report = closer.close_all(None).await.unwrap();
        assert!(report.folded_only);
        assert_eq!(report.closed, 1);
        // 가장 큰 손실만 접고 나머지는 유지
        assert_eq!(gateway.closed_tickets(), vec![2]);
    }

    #[tokio::test]
    async fn test_close_all_closes_everything_without_losers() {
        let gateway = Arc::new(MockGateway::new());
        let closer = closer_with(
            vec![position(1, dec!(5), 30), position(2, dec!(3), 20)],
            gateway.clone(),
        );

        let report = closer.close_all(None).await.unwrap();
        assert!(!report.folded_only);
        assert_eq!(report.closed, 2);
        assert_eq!(report.profit, dec!(8));
        assert_eq!(gateway.closed_tickets(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_close_all_continues_past_individual_failures() {
        let mut fail_codes = HashMap::new();
        fail_codes.insert(2u64, 10006u32); // 주문 거부
        let gateway = Arc::new(MockGateway::failing(fail_codes));
        let closer = closer_with(
            vec![
                position(1, dec!(5), 30),
                position(2, dec!(3), 20),
                position(3, dec!(1), 10),
            ],
            gateway.clone(),
        );

        let report = closer.close_all(None).await.unwrap();
        assert_eq!(report.closed, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(gateway.closed_tickets(), vec![1, 3]);
    }

    #[tokio::test]
    async fn test_stale_reference_is_skip_not_error() {
        let mut fail_codes = HashMap::new();
        fail_codes.insert(1u64, 10036u32); // 이미 청산됨
        let gateway = Arc::new(MockGateway::failing(fail_codes));
        let closer = closer_with(vec![position(1, dec!(-5), 30)], gateway);

        // 소멸 참조는 에러가 아니라 None
        let outcome = closer.close_biggest_loss(None).await.unwrap();
        assert!(outcome.is_none());
    }

    #[tokio::test]
    async fn test_close_side_only_touches_matching_side() {
        let gateway = Arc::new(MockGateway::new());
        let mut sell = position(2, dec!(-1), 20);
        sell.side = Side::Sell;
        let closer = closer_with(vec![position(1, dec!(1), 30), sell], gateway.clone());

        let report = closer.close_side("EURUSD", Side::Buy).await.unwrap();
        assert_eq!(report.closed, 1);
        assert_eq!(gateway.closed_tickets(), vec![1]);
    }

    #[tokio::test]
    async fn test_folding_recommendation_ordering() {
        let gateway = Arc::new(MockGateway::new());
        // 총 손익 +3 ≥ 0 → 자본 보존
        let closer = closer_with(
            vec![position(1, dec!(5), 30), position(2, dec!(-2), 20)],
            gateway,
        );
        assert_eq!(
            closer.folding_recommendation(None).await.unwrap(),
            ClosePriority::SmallestAbsProfit
        );

        let gateway = Arc::new(MockGateway::new());
        // 총 손익 음수 + 손실 존재 → 점진 회복
        let closer = closer_with(
            vec![position(1, dec!(2), 30), position(2, dec!(-9), 20)],
            gateway,
        );
        assert_eq!(
            closer.folding_recommendation(None).await.unwrap(),
            ClosePriority::SmallestLoss
        );
    }

    #[tokio::test]
    async fn test_smart_close_dispatch() {
        let gateway = Arc::new(MockGateway::new());
        let closer = closer_with(
            vec![position(1, dec!(5), 30), position(2, dec!(-3), 20)],
            gateway,
        );

        let outcome = closer
            .smart_close(ClosePriority::BiggestLoss, None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(outcome.ticket, 2);
    }

    #[tokio::test]
    async fn test_count_and_total_profit() {
        let gateway = Arc::new(MockGateway::new());
        let closer = closer_with(
            vec![position(1, dec!(5), 30), position(2, dec!(-3), 20)],
            gateway,
        );

        assert_eq!(closer.position_count(None).await.unwrap(), 2);
        assert_eq!(closer.total_profit(None).await.unwrap(), dec!(2));
        assert_eq!(
            closer
                .position_count_by_side("EURUSD", Side::Buy)
                .await
                .unwrap(),
            2
        );
    }
}
