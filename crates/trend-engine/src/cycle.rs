//! 심볼당 의사결정 사이클.
//!
//! 외부 스케줄러가 틱/타이머 이벤트마다 심볼 하나에 대해 한 번
//! 호출합니다. 사이클은 협력자 조회 → 추세 결정 → 접근 게이트 →
//! 진입/청산 라우팅 → 유지보수 순서로 진행하며, 어떤 단일 실패도
//! 사이클을 중단시키지 않습니다. 실패는 보고되고 다음 심볼로
//! 넘어갑니다.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use trend_core::{
    AccountProvider, AccountRiskState, BlackoutCalendar, DecisionObserver, ExecutionGateway,
    IntentReason, MarketDataProvider, NoteSeverity, OrderReceipt, PositionLedger, RiskGate,
    RiskLevel, Side, TierSnapshot, TradeIntent, Timeframe,
};
use trend_execution::{CloseError, PositionCloser, TradeGate};
use trend_risk::{account_risk_level, position_size, recommended_position_limits, stop_loss, take_profit};

use crate::config::EngineConfig;
use crate::decision::{decide, gate_access, AccessState, TrendAction};

// =============================================================================
// 입출력 타입
// =============================================================================

/// 사이클 입력으로 들어오는 시장 구조 스냅샷.
///
/// 스윙 포인트와 ATR 계산은 외부 지표 계층의 몫입니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketStructure {
    /// 현재 ATR
    pub atr: Decimal,
    /// 최근 스윙 하이 (숏 스탑 기준)
    pub swing_high: Option<Decimal>,
    /// 최근 스윙 로우 (롱 스탑 기준)
    pub swing_low: Option<Decimal>,
    /// 분석 타임프레임
    pub timeframe: Timeframe,
}

/// 사이클 실행 보고.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleReport {
    /// 접근 게이트 적용 후의 최종 행동
    pub action: TrendAction,
    /// 이번 사이클에 체결된 주문 (있다면)
    pub opened: Option<OrderReceipt>,
    /// 이번 사이클에 청산된 포지션 수
    pub closed: usize,
    /// 청산 간격 스로틀로 유보되었는지
    pub throttled: bool,
}

impl CycleReport {
    fn new(action: TrendAction) -> Self {
        Self {
            action,
            opened: None,
            closed: 0,
            throttled: false,
        }
    }
}

// =============================================================================
// 사이클 오케스트레이터
// =============================================================================

/// 의사결정 사이클 오케스트레이터.
///
/// 게이트·청산 선택기·리스크 상태를 소유하며, 단일 스레드 협조
/// 방식으로 동작합니다. 동시에 두 사이클이 실행되지 않으므로
/// 내부 동기화가 없습니다.
pub struct DecisionCycle {
    config: EngineConfig,
    account: Arc<dyn AccountProvider>,
    risk_gate: Option<Arc<dyn RiskGate>>,
    blackout: Option<Arc<dyn BlackoutCalendar>>,
    observer: Option<Arc<dyn DecisionObserver>>,
    market: Arc<dyn MarketDataProvider>,
    gate: TradeGate,
    closer: PositionCloser,
    state: AccountRiskState,
}

impl DecisionCycle {
    /// 새 사이클 오케스트레이터를 생성합니다.
    pub fn new(
        config: EngineConfig,
        market: Arc<dyn MarketDataProvider>,
        account: Arc<dyn AccountProvider>,
        gateway: Arc<dyn ExecutionGateway>,
        ledger: Arc<dyn PositionLedger>,
    ) -> Self {
        let gate = TradeGate::new(market.clone(), account.clone(), gateway.clone());
        let closer = PositionCloser::new(ledger, gateway);
        let state = AccountRiskState::new(config.margin_safety_buffer);
        Self {
            config,
            account,
            risk_gate: None,
            blackout: None,
            observer: None,
            market,
            gate,
            closer,
            state,
        }
    }

    /// 리스크 게이트 협력자를 연결합니다.
    pub fn with_risk_gate(mut self, risk_gate: Arc<dyn RiskGate>) -> Self {
        self.gate = self.gate.with_risk_gate(risk_gate.clone());
        self.closer = self.closer.with_risk_gate(risk_gate.clone());
        self.risk_gate = Some(risk_gate);
        self
    }

    /// 뉴스 블랙아웃 캘린더를 연결합니다.
    pub fn with_blackout(mut self, blackout: Arc<dyn BlackoutCalendar>) -> Self {
        self.blackout = Some(blackout);
        self
    }

    /// 의사결정 옵저버를 연결합니다.
    pub fn with_observer(mut self, observer: Arc<dyn DecisionObserver>) -> Self {
        self.gate = self.gate.with_observer(observer.clone());
        self.closer = self.closer.with_observer(observer.clone());
        self.observer = Some(observer);
        self
    }

    /// 현재 리스크 상태 (읽기).
    pub fn state(&self) -> &AccountRiskState {
        &self.state
    }

    /// 현재 리스크 상태 (쓰기). 일일 리셋 등 외부 수명주기용.
    pub fn state_mut(&mut self) -> &mut AccountRiskState {
        &mut self.state
    }

    /// 심볼 하나의 의사결정 사이클을 실행합니다.
    ///
    /// 어떤 실패도 전파하지 않습니다. 실패는 로그와 보고서로 남고
    /// 사이클은 항상 완주합니다.
    pub async fn run(
        &mut self,
        symbol: &str,
        tiers: TierSnapshot,
        structure: &MarketStructure,
        now: DateTime<Utc>,
    ) -> CycleReport {
        let trend = decide(&tiers);

        // 접근 평가 실패는 보수적 전면 차단으로 강등
        let access = match self.evaluate_access(symbol, now).await {
            Ok(access) => access,
            Err(err) => {
                warn!(%symbol, %err, "접근 평가 실패, 보수적 차단 적용");
                AccessState::fully_blocked()
            }
        };
        let action = gate_access(trend, &access);
        debug!(%symbol, ?trend, ?action, "사이클 결정");

        let mut report = CycleReport::new(action);
        match action {
            TrendAction::Wait => {}
            TrendAction::Buy => {
                self.enter(symbol, Side::Buy, IntentReason::TrendEntry, structure, &mut report)
                    .await;
            }
            TrendAction::Sell => {
                self.enter(symbol, Side::Sell, IntentReason::TrendEntry, structure, &mut report)
                    .await;
            }
            TrendAction::Adding(side) => {
                self.enter(symbol, side, IntentReason::TrendAdd, structure, &mut report)
                    .await;
            }
            TrendAction::CloseLosers => {
                self.unwind_losers(symbol, now, &mut report).await;
            }
            TrendAction::CloseSlowly => {
                self.unwind_slowly(symbol, now, &mut report).await;
            }
            TrendAction::CloseAll => {
                self.unwind_all(symbol, now, &mut report).await;
            }
            TrendAction::BuyBlocked => {
                self.reverse_if_opposite(symbol, Side::Buy, now, &mut report)
                    .await;
            }
            TrendAction::SellBlocked => {
                self.reverse_if_opposite(symbol, Side::Sell, now, &mut report)
                    .await;
            }
            TrendAction::AddingBlocked => {}
        }

        self.maintenance(symbol).await;
        report
    }

    // =========================================================================
    // 접근 평가
    // =========================================================================

    /// 차단 조건을 평가합니다.
    async fn evaluate_access(
        &self,
        symbol: &str,
        now: DateTime<Utc>,
    ) -> Result<AccessState, CloseError> {
        let count = self.closer.position_count(Some(symbol)).await?;
        let limit = match self.config.max_positions_per_symbol {
            Some(limit) => limit,
            None => {
                let snapshot = self
                    .account
                    .snapshot()
                    .await
                    .map_err(CloseError::Provider)?;
                recommended_position_limits(snapshot.balance).1
            }
        };

        let blackout = match &self.blackout {
            Some(calendar) => calendar.is_blackout(symbol, now).await,
            None => false,
        };
        let risk_locked = match &self.risk_gate {
            Some(risk_gate) => !risk_gate.can_open_new_trades().await,
            None => false,
        };

        Ok(AccessState {
            symbol_at_limit: count >= limit as usize,
            daily_limit_reached: self.state.daily_trade_count() >= self.config.max_daily_trades,
            blackout,
            risk_locked,
        })
    }

    // =========================================================================
    // 진입
    // =========================================================================

    /// 진입/증축 의도를 만들어 게이트에 넘깁니다.
    async fn enter(
        &mut self,
        symbol: &str,
        side: Side,
        reason: IntentReason,
        structure: &MarketStructure,
        report: &mut CycleReport,
    ) {
        let (spec, quote) = match (
            self.market.symbol_spec(symbol).await,
            self.market.get_quote(symbol).await,
        ) {
            (Ok(spec), Ok(quote)) => (spec, quote),
            (Err(err), _) | (_, Err(err)) => {
                warn!(%symbol, %err, "시세 조회 실패, 진입 유보");
                return;
            }
        };
        let snapshot = match self.account.snapshot().await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(%symbol, %err, "계좌 조회 실패, 진입 유보");
                return;
            }
        };

        // 로컬 드로다운 검사: 리스크 게이트 부재 시의 보수적 방어선
        let risk =
            account_risk_level(snapshot.balance, snapshot.equity, self.config.max_drawdown_percent);
        if risk == RiskLevel::Critical {
            warn!(%symbol, "드로다운 한도 도달, 진입 유보");
            if let Some(observer) = &self.observer {
                observer.note(
                    NoteSeverity::Critical,
                    "드로다운 한도로 진입 유보",
                    &[("symbol", symbol.to_string())],
                );
            }
            return;
        }

        let entry = quote.entry_price(side);
        let swing = match side {
            Side::Buy => structure.swing_low,
            Side::Sell => structure.swing_high,
        };
        let sl = stop_loss(
            &spec,
            side,
            entry,
            structure.atr,
            swing,
            self.config.atr_multiplier,
            structure.timeframe,
        );
        let tp = take_profit(&spec, side, entry, sl, self.config.rr_ratio);

        let risk_percent = if reason == IntentReason::TrendAdd {
            self.config.risk_percent * self.config.add_risk_factor
        } else {
            self.config.risk_percent
        };
        let mut lot = position_size(snapshot.balance, risk_percent, entry, sl, &spec);
        if let Some(risk_gate) = &self.risk_gate {
            lot = risk_gate.risk_adjusted_size(symbol, lot).await;
        }
        if lot <= Decimal::ZERO {
            warn!(%symbol, "사이징 결과 0랏, 진입 유보");
            return;
        }

        let intent =
            TradeIntent::new(symbol, side, lot, reason).with_stops(Some(sl), Some(tp));
        match self.gate.execute(&intent, &mut self.state).await {
            Ok(receipt) => {
                info!(%symbol, %side, ticket = receipt.ticket, "진입 완료");
                report.opened = Some(receipt);
            }
            Err(err) => {
                warn!(%symbol, %side, %err, "진입 거부");
            }
        }
    }

    // =========================================================================
    // 청산 경로
    // =========================================================================

    /// 청산 간격 스로틀을 확인합니다.
    fn throttled(&self, symbol: &str, now: DateTime<Utc>, report: &mut CycleReport) -> bool {
        if !self
            .state
            .can_close(symbol, now, self.config.min_close_interval())
        {
            debug!(%symbol, "청산 간격 미충족, 유보");
            report.throttled = true;
            return true;
        }
        false
    }

    /// 가장 큰 손실 하나를 접습니다.
    async fn unwind_losers(
        &mut self,
        symbol: &str,
        now: DateTime<Utc>,
        report: &mut CycleReport,
    ) {
        if self.throttled(symbol, now, report) {
            return;
        }
        match self.closer.close_biggest_loss(Some(symbol)).await {
            Ok(Some(_)) => {
                report.closed = 1;
                self.state.record_close(symbol, now);
            }
            Ok(None) => debug!(%symbol, "접을 손실 포지션 없음"),
            Err(err) => warn!(%symbol, %err, "손실 축소 실패"),
        }
    }

    /// 작은 수익부터 점진적으로 청산합니다.
    async fn unwind_slowly(
        &mut self,
        symbol: &str,
        now: DateTime<Utc>,
        report: &mut CycleReport,
    ) {
        if self.throttled(symbol, now, report) {
            return;
        }
        match self
            .closer
            .close_smallest_win_first(Some(symbol), self.config.min_fold_profit)
            .await
        {
            Ok(Some(_)) => {
                report.closed = 1;
                self.state.record_close(symbol, now);
            }
            Ok(None) => debug!(%symbol, "점진 청산 대상 없음"),
            Err(err) => warn!(%symbol, %err, "점진 청산 실패"),
        }
    }

    /// 전량 청산 (폴딩 우선 의미론).
    async fn unwind_all(&mut self, symbol: &str, now: DateTime<Utc>, report: &mut CycleReport) {
        if self.throttled(symbol, now, report) {
            return;
        }
        match self.closer.close_all(Some(symbol)).await {
            Ok(bulk) => {
                report.closed = bulk.closed;
                if bulk.closed > 0 {
                    self.state.record_close(symbol, now);
                }
            }
            Err(err) => warn!(%symbol, %err, "전량 청산 실패"),
        }
    }

    /// 차단 상태에서의 방향 전환.
    ///
    /// 진입이 차단되었더라도 반대편 포지션이 있으면 그쪽을 청산해
    /// 방향 전환을 허용합니다. 위험 축소이므로 차단 대상이 아닙니다.
    async fn reverse_if_opposite(
        &mut self,
        symbol: &str,
        blocked_side: Side,
        now: DateTime<Utc>,
        report: &mut CycleReport,
    ) {
        let opposite = blocked_side.opposite();
        let count = match self.closer.position_count_by_side(symbol, opposite).await {
            Ok(count) => count,
            Err(err) => {
                warn!(%symbol, %err, "반대편 조회 실패");
                return;
            }
        };
        if count == 0 {
            return;
        }

        info!(%symbol, %blocked_side, "차단 중 방향 전환: 반대편 청산");
        match self.closer.close_side(symbol, opposite).await {
            Ok(bulk) => {
                report.closed = bulk.closed;
                if bulk.closed > 0 {
                    self.state.record_close(symbol, now);
                }
            }
            Err(err) => warn!(%symbol, %err, "반대편 청산 실패"),
        }
    }

    // =========================================================================
    // 유지보수
    // =========================================================================

    /// 리스크 게이트 위임 유지보수 루틴.
    async fn maintenance(&self, symbol: &str) {
        if let Some(risk_gate) = &self.risk_gate {
            risk_gate.update_trailing_stops().await;
            risk_gate.secure_profit().await;
            risk_gate.move_to_breakeven(symbol).await;
        }
    }
}
