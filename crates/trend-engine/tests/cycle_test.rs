//! 의사결정 사이클 통합 테스트.
//!
//! 모의 협력자(시세·계좌·게이트웨이·원장)로 사이클 전체를 구동해
//! 진입 라우팅, 차단 중 방향 전환, 폴딩 우선 청산, 청산 스로틀을
//! 검증합니다.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use trend_core::{
    AccountProvider, AccountSnapshot, BlackoutCalendar, CloseReceipt, ExecError,
    ExecutionGateway, MarketDataProvider, OrderReceipt, OrderRequest, Position, PositionLedger,
    ProviderError, Quote, GapPhase, Side, SymbolClass, SymbolSpec, TierSnapshot, Timeframe,
};
use trend_engine::{CycleReport, DecisionCycle, EngineConfig, MarketStructure, TrendAction};

// ============================================================================
// 모의 협력자
// ============================================================================

struct MockMarket;

#[async_trait]
impl MarketDataProvider for MockMarket {
    async fn get_quote(&self, _symbol: &str) -> Result<Quote, ProviderError> {
        Ok(Quote {
            bid: dec!(1.10000),
            ask: dec!(1.10010),
            time: Utc::now(),
        })
    }

    async fn symbol_spec(&self, symbol: &str) -> Result<SymbolSpec, ProviderError> {
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

struct MockAccount {
    fail: bool,
}

#[async_trait]
impl AccountProvider for MockAccount {
    async fn snapshot(&self) -> Result<AccountSnapshot, ProviderError> {
        if self.fail {
            return Err(ProviderError::Connection("모의 연결 실패".to_string()));
        }
        Ok(AccountSnapshot {
            balance: dec!(10000),
            equity: dec!(10000),
            free_margin: dec!(10000),
        })
    }
}

#[derive(Default)]
struct MockGateway {
    opens: Mutex<Vec<OrderRequest>>,
    closes: Mutex<Vec<u64>>,
}

impl MockGateway {
    fn opened(&self) -> Vec<OrderRequest> {
        self.opens.lock().unwrap().clone()
    }

    fn closed(&self) -> Vec<u64> {
        self.closes.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExecutionGateway for MockGateway {
    async fn open(&self, request: &OrderRequest) -> Result<OrderReceipt, ExecError> {
        let mut opens = self.opens.lock().unwrap();
        opens.push(request.clone());
        Ok(OrderReceipt {
            ticket: 500 + opens.len() as u64,
            executed_price: request.price.unwrap_or(dec!(1.10010)),
            executed_at: Utc::now(),
        })
    }

    async fn close(&self, ticket: u64) -> Result<CloseReceipt, ExecError> {
        self.closes.lock().unwrap().push(ticket);
        Ok(CloseReceipt {
            ticket,
            closed_price: dec!(1.1000),
            closed_at: Utc::now(),
        })
    }
}

struct MockLedger {
    positions: Vec<Position>,
}

#[async_trait]
impl PositionLedger for MockLedger {
    async fn fetch_positions(&self, symbol: Option<&str>) -> Result<Vec<Position>, ProviderError> {
        Ok(self
            .positions
            .iter()
            .filter(|p| symbol.map_or(true, |s| p.symbol == s))
            .cloned()
            .collect())
    }
}

struct AlwaysBlackout;

#[async_trait]
impl BlackoutCalendar for AlwaysBlackout {
    async fn is_blackout(&self, _symbol: &str, _at: chrono::DateTime<Utc>) -> bool {
        true
    }
}

// ============================================================================
// 헬퍼
// ============================================================================

fn position(ticket: u64, side: Side, profit: Decimal) -> Position {
    Position {
        ticket,
        symbol: "EURUSD".to_string(),
        side,
        volume: dec!(0.1),
        open_price: dec!(1.1000),
        open_time: Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap(),
        profit,
        stop_loss: None,
        take_profit: None,
    }
}

fn structure() -> MarketStructure {
    MarketStructure {
        atr: dec!(0.0010),
        swing_high: None,
        swing_low: None,
        timeframe: Timeframe::M15,
    }
}

fn cycle_with(
    config: EngineConfig,
    gateway: Arc<MockGateway>,
    positions: Vec<Position>,
) -> DecisionCycle {
    DecisionCycle::new(
        config,
        Arc::new(MockMarket),
        Arc::new(MockAccount { fail: false }),
        gateway,
        Arc::new(MockLedger { positions }),
    )
}

async fn run(
    cycle: &mut DecisionCycle,
    outer: GapPhase,
    mid: GapPhase,
    inner: GapPhase,
) -> CycleReport {
    cycle
        .run(
            "EURUSD",
            TierSnapshot::new(outer, mid, inner),
            &structure(),
            Utc::now(),
        )
        .await
}

// ============================================================================
// 진입
// ============================================================================

#[tokio::test]
async fn full_confirmation_opens_position() {
    let gateway = Arc::new(MockGateway::default());
    let mut cycle = cycle_with(EngineConfig::default(), gateway.clone(), vec![]);

    let report = run(&mut cycle, GapPhase::Clear, GapPhase::Clear, GapPhase::Buying).await;

    assert_eq!(report.action, TrendAction::Buy);
    assert!(report.opened.is_some());
    assert_eq!(cycle.state().daily_trade_count(), 1);

    let opens = gateway.opened();
    assert_eq!(opens.len(), 1);
    assert_eq!(opens[0].side, Side::Buy);
    // ATR 폴백 손절: 1.10010 − 0.0015 = 1.09860
    assert_eq!(opens[0].stop_loss, Some(dec!(1.09860)));
    assert!(opens[0].take_profit.is_some());
}

#[tokio::test]
async fn adding_uses_reduced_risk() {
    let gateway = Arc::new(MockGateway::default());
    let mut cycle = cycle_with(EngineConfig::default(), gateway.clone(), vec![]);

    let entry = run(&mut cycle, GapPhase::Clear, GapPhase::Clear, GapPhase::Buying).await;
    let add = run(&mut cycle, GapPhase::Clear, GapPhase::Adding, GapPhase::Buying).await;

    assert_eq!(entry.action, TrendAction::Buy);
    assert_eq!(add.action, TrendAction::Adding(Side::Buy));

    let opens = gateway.opened();
    assert_eq!(opens.len(), 2);
    // 증축은 절반 리스크로 사이징
    assert!(opens[1].lot < opens[0].lot);
}

// ============================================================================
// 차단
// ============================================================================

#[tokio::test]
async fn blocked_entry_with_opposite_exposure_closes_opposite_side() {
    let gateway = Arc::new(MockGateway::default());
    let config = EngineConfig {
        max_daily_trades: 0, // 일일 한도 즉시 도달
        ..Default::default()
    };
    let mut cycle = cycle_with(
        config,
        gateway.clone(),
        vec![position(11, Side::Buy, dec!(4))],
    );

    // 세 계층 모두 매도 확인 + 기존 매수 포지션 → 반대편 청산
    let report = run(
        &mut cycle,
        GapPhase::Clear,
        GapPhase::Clear,
        GapPhase::Selling,
    )
    .await;

    assert_eq!(report.action, TrendAction::SellBlocked);
    assert!(report.opened.is_none());
    assert_eq!(report.closed, 1);
    assert_eq!(gateway.closed(), vec![11]);
}

#[tokio::test]
async fn blocked_entry_without_opposite_is_noop() {
    let gateway = Arc::new(MockGateway::default());
    let config = EngineConfig {
        max_daily_trades: 0,
        ..Default::default()
    };
    let mut cycle = cycle_with(config, gateway.clone(), vec![]);

    let report = run(&mut cycle, GapPhase::Clear, GapPhase::Clear, GapPhase::Buying).await;

    assert_eq!(report.action, TrendAction::BuyBlocked);
    assert!(report.opened.is_none());
    assert_eq!(report.closed, 0);
    assert!(gateway.opened().is_empty());
}

#[tokio::test]
async fn blackout_blocks_fresh_entry() {
    let gateway = Arc::new(MockGateway::default());
    let mut cycle = cycle_with(EngineConfig::default(), gateway.clone(), vec![])
        .with_blackout(Arc::new(AlwaysBlackout));

    let report = run(&mut cycle, GapPhase::Clear, GapPhase::Clear, GapPhase::Buying).await;

    assert_eq!(report.action, TrendAction::BuyBlocked);
    assert!(gateway.opened().is_empty());
}

#[tokio::test]
async fn access_failure_degrades_to_conservative_block() {
    let gateway = Arc::new(MockGateway::default());
    let mut cycle = DecisionCycle::new(
        EngineConfig::default(),
        Arc::new(MockMarket),
        Arc::new(MockAccount { fail: true }),
        gateway.clone(),
        Arc::new(MockLedger { positions: vec![] }),
    );

    // 계좌 조회 실패 → 접근 평가 실패 → 진입 차단, 패닉 없음
    let report = run(&mut cycle, GapPhase::Clear, GapPhase::Clear, GapPhase::Buying).await;
    assert_eq!(report.action, TrendAction::BuyBlocked);
    assert!(gateway.opened().is_empty());
}

// ============================================================================
// 청산 경로
// ============================================================================

#[tokio::test]
async fn ranging_folding_closes_biggest_loser() {
    let gateway = Arc::new(MockGateway::default());
    let mut cycle = cycle_with(
        EngineConfig::default(),
        gateway.clone(),
        vec![
            position(1, Side::Buy, dec!(5)),
            position(2, Side::Buy, dec!(-30)),
            position(3, Side::Buy, dec!(-3)),
        ],
    );

    let report = run(
        &mut cycle,
        GapPhase::Thinking,
        GapPhase::Clear,
        GapPhase::Folding,
    )
    .await;

    assert_eq!(report.action, TrendAction::CloseLosers);
    assert_eq!(report.closed, 1);
    assert_eq!(gateway.closed(), vec![2]);
}

#[tokio::test]
async fn close_all_folds_one_loser_and_defers() {
    let gateway = Arc::new(MockGateway::default());
    let mut cycle = cycle_with(
        EngineConfig::default(),
        gateway.clone(),
        vec![
            position(1, Side::Buy, dec!(5)),
            position(2, Side::Buy, dec!(-8)),
        ],
    );

    // 중간 계층 Closing → 전량 청산, 단 손실이 있으면 하나만 접음
    let report = run(
        &mut cycle,
        GapPhase::Clear,
        GapPhase::Closing,
        GapPhase::Clear,
    )
    .await;

    assert_eq!(report.action, TrendAction::CloseAll);
    assert_eq!(report.closed, 1);
    assert_eq!(gateway.closed(), vec![2]);
}

#[tokio::test]
async fn close_interval_throttles_successive_folds() {
    let gateway = Arc::new(MockGateway::default());
    let mut cycle = cycle_with(
        EngineConfig::default(),
        gateway.clone(),
        vec![position(1, Side::Buy, dec!(-10))],
    );
    let now = Utc::now();
    let tiers = TierSnapshot::new(GapPhase::Thinking, GapPhase::Clear, GapPhase::Folding);

    let first = cycle.run("EURUSD", tiers, &structure(), now).await;
    assert_eq!(first.closed, 1);
    assert!(!first.throttled);

    // 간격(기본 300초) 안의 재시도는 유보
    let second = cycle
        .run("EURUSD", tiers, &structure(), now + Duration::seconds(60))
        .await;
    assert_eq!(second.closed, 0);
    assert!(second.throttled);

    // 간격이 지나면 다시 허용
    let third = cycle
        .run("EURUSD", tiers, &structure(), now + Duration::seconds(301))
        .await;
    assert_eq!(third.closed, 1);
    assert!(!third.throttled);
}

#[tokio::test]
async fn wait_leaves_everything_untouched() {
    let gateway = Arc::new(MockGateway::default());
    let mut cycle = cycle_with(
        EngineConfig::default(),
        gateway.clone(),
        vec![position(1, Side::Buy, dec!(5))],
    );

    let report = run(
        &mut cycle,
        GapPhase::Holding,
        GapPhase::Thinking,
        GapPhase::Clear,
    )
    .await;

    assert_eq!(report.action, TrendAction::Wait);
    assert!(report.opened.is_none());
    assert_eq!(report.closed, 0);
    assert!(gateway.opened().is_empty());
    assert!(gateway.closed().is_empty());
}
