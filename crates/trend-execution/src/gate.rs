//! 주문 검증·실행 게이트.
//!
//! 주문 의도 하나를 고정 순서 파이프라인으로 검증한 뒤 실행합니다.
//! 어느 단계든 실패하면 사유를 담아 즉시 중단하며, 실행 단계 이전에는
//! 어떤 부수효과도 남기지 않습니다.
//!
//! # 파이프라인
//!
//! 1. 신호 정합: 유효한 신호가 슬리피지 허용 범위 안이면 채택, 아니면 시장가
//! 2. 리스크 게이트 (협력자가 있을 때만): 허용, 노출, 증거금, 스탑(정보성) 순
//! 3. 랏 상한: `가용 증거금 × 안전 버퍼 / 랏당 증거금`으로 캡
//! 4. 증거금 재확인: 축소된 랏 기준 재검증
//! 5. 랏 스텝 정렬
//! 6. 게이트웨이 실행: 실패 시 코드 매핑 후 중단, 카운터 불변
//! 7. 사후 처리: 일일 카운터 증가, 실제 체결가로 성과 지표 갱신

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use trend_core::{
    AccountProvider, AccountRiskState, DecisionObserver, ExecutionGateway, MarketDataProvider,
    NoteSeverity, OrderReceipt, OrderRequest, RiskGate, TradeIntent,
};
use trend_risk::adjust_lot_to_constraints;

use crate::error::GateError;

// =============================================================================
// 사전 검증 결과
// =============================================================================

/// 사전 검증(pre-flight) 결과.
///
/// 실행 없이 통과/실패와 메시지만 반환합니다. 부수효과가 없습니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    /// 검증 통과 여부
    pub is_valid: bool,
    /// 검증 메시지 (경고 포함)
    pub messages: Vec<String>,
}

impl ValidationReport {
    /// 통과 결과를 생성합니다.
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            messages: vec![],
        }
    }

    /// 실패 결과를 생성합니다.
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            messages: vec![reason.into()],
        }
    }

    /// 메시지를 추가합니다.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.messages.push(message.into());
        self
    }
}

// =============================================================================
// 실행 게이트
// =============================================================================

/// 주문 검증·실행 게이트.
///
/// 협력자 trait만 의존하며, 리스크 게이트와 옵저버는 선택적입니다.
/// 리스크 게이트가 없으면 로컬 증거금/랏 검증으로 강등됩니다.
pub struct TradeGate {
    market: Arc<dyn MarketDataProvider>,
    account: Arc<dyn AccountProvider>,
    gateway: Arc<dyn ExecutionGateway>,
    risk_gate: Option<Arc<dyn RiskGate>>,
    observer: Option<Arc<dyn DecisionObserver>>,
}

impl TradeGate {
    /// 새 게이트를 생성합니다.
    pub fn new(
        market: Arc<dyn MarketDataProvider>,
        account: Arc<dyn AccountProvider>,
        gateway: Arc<dyn ExecutionGateway>,
    ) -> Self {
        Self {
            market,
            account,
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

    /// 주문 의도를 검증하고 실행합니다.
    ///
    /// 성공 시 일일 거래 카운터를 증가시키고 체결 영수증을 반환합니다.
    /// 실패 시 카운터를 포함한 어떤 상태도 변경하지 않습니다.
    pub async fn execute(
        &self,
        intent: &TradeIntent,
        state: &mut AccountRiskState,
    ) -> Result<OrderReceipt, GateError> {
        let spec = self.market.symbol_spec(&intent.symbol).await?;
        if !spec.trade_allowed {
            return Err(GateError::SymbolNotTradeable {
                symbol: intent.symbol.clone(),
            });
        }
        let quote = self.market.get_quote(&intent.symbol).await?;
        let market_price = quote.entry_price(intent.side);

        // 1. 신호 정합: 신호가 유효하고 시장가에서 스탑 거리 이내면 채택
        let tolerance = spec.stops_distance();
        let (entry_price, stop_loss, take_profit, signal_adopted) = match &intent.signal {
            Some(signal)
                if signal.is_usable(quote.time)
                    && (signal.entry_price - market_price).abs() <= tolerance =>
            {
                (
                    signal.entry_price,
                    signal.stop_loss.or(intent.stop_loss),
                    signal.take_profit.or(intent.take_profit),
                    true,
                )
            }
            Some(_) => {
                debug!(symbol = %intent.symbol, "신호 폐기: 만료 또는 슬리피지 초과");
                (market_price, intent.stop_loss, intent.take_profit, false)
            }
            None => (market_price, intent.stop_loss, intent.take_profit, false),
        };

        // 2. 리스크 게이트 (협력자가 있을 때만)
        if let Some(risk_gate) = &self.risk_gate {
            if !risk_gate
                .allow_new_trade(&intent.symbol, intent.reason)
                .await
            {
                return Err(GateError::TradeNotAllowed {
                    symbol: intent.symbol.clone(),
                    reason: intent.reason,
                });
            }
            if !risk_gate
                .check_exposure_limits(&intent.symbol, intent.lot)
                .await
            {
                return Err(GateError::ExposureLimit {
                    symbol: intent.symbol.clone(),
                });
            }
            if !risk_gate
                .is_margin_sufficient(&intent.symbol, intent.lot)
                .await
            {
                return Err(GateError::RiskGateMargin {
                    symbol: intent.symbol.clone(),
                });
            }
            // 스탑 배치 검증은 정보성: 실패해도 차단하지 않음
            if let Some(sl) = stop_loss {
                if !risk_gate
                    .validate_stop_placement(&intent.symbol, intent.side, entry_price, sl)
                    .await
                {
                    warn!(symbol = %intent.symbol, %sl, "스탑 배치 경고 (차단하지 않음)");
                }
            }
        }

        // 3. 랏 상한: 가용 증거금 × 안전 버퍼 기준
        let account = self.account.snapshot().await?;
        let usable_margin = account.free_margin * state.margin_safety_buffer();
        let mut lot = intent.lot;
        if spec.margin_per_lot > Decimal::ZERO {
            let max_safe = (usable_margin / spec.margin_per_lot)
                .clamp(spec.volume_min, spec.volume_max);
            if lot > max_safe {
                debug!(symbol = %intent.symbol, requested = %lot, capped = %max_safe, "랏 축소");
                lot = max_safe;
            }
        }

        // 4. 증거금 재확인 (축소된 랏 기준)
        let required = lot * spec.margin_per_lot;
        if required > usable_margin {
            return Err(GateError::InsufficientMargin {
                required,
                available: usable_margin,
            });
        }

        // 5. 랏 스텝 정렬
        lot = adjust_lot_to_constraints(lot, &spec);
        if lot <= Decimal::ZERO {
            return Err(GateError::LotTooSmall { lot });
        }

        // 6. 실행
        let request = OrderRequest {
            symbol: intent.symbol.clone(),
            side: intent.side,
            lot,
            price: signal_adopted.then_some(entry_price),
            stop_loss,
            take_profit,
            tag: intent.reason.to_string(),
        };
        let receipt = self.gateway.open(&request).await?;

        // 7. 사후 처리: 성공했을 때만 카운터와 지표를 갱신
        state.record_trade();
        if let Some(risk_gate) = &self.risk_gate {
            risk_gate
                .update_performance_metrics(
                    &intent.symbol,
                    intent.side,
                    lot,
                    receipt.executed_price,
                )
                .await;
        }

        // 기대 대비 실현 리스크 괴리 기록
        if let Some(sl) = stop_loss {
            let expected_risk = (entry_price - sl).abs();
            let realized_risk = (receipt.executed_price - sl).abs();
            if let Some(observer) = &self.observer {
                observer.note(
                    NoteSeverity::Info,
                    "주문 체결",
                    &[
                        ("symbol", intent.symbol.clone()),
                        ("expected_risk", expected_risk.to_string()),
                        ("realized_risk", realized_risk.to_string()),
                    ],
                );
            }
        }

        info!(
            symbol = %intent.symbol,
            side = %intent.side,
            %lot,
            ticket = receipt.ticket,
            executed = %receipt.executed_price,
            "주문 실행 완료"
        );
        Ok(receipt)
    }

    /// 실행 없는 사전 검증.
    ///
    /// 거래 가능성, 수량, 스탑 유무(경고만), 리스크 게이트의
    /// 변동성/스프레드 수용, 증거금을 확인합니다. 부수효과가 없습니다.
    pub async fn validate(
        &self,
        intent: &TradeIntent,
        state: &AccountRiskState,
    ) -> Result<ValidationReport, GateError> {
        let spec = self.market.symbol_spec(&intent.symbol).await?;
        if !spec.trade_allowed {
            return Ok(ValidationReport::invalid(format!(
                "거래 불가 심볼: {}",
                intent.symbol
            )));
        }

        if intent.lot <= Decimal::ZERO {
            return Ok(ValidationReport::invalid(format!(
                "주문 수량이 0 이하: {}",
                intent.lot
            )));
        }

        let mut report = ValidationReport::valid();
        if !intent.has_stops() {
            // 스탑 부재는 경고일 뿐 차단하지 않음
            report = report.with_message("손절/익절 미설정".to_string());
        }

        if let Some(risk_gate) = &self.risk_gate {
            if !risk_gate.volatility_acceptable(&intent.symbol).await {
                return Ok(ValidationReport::invalid("변동성 수용 불가".to_string()));
            }
            if !risk_gate.spread_acceptable(&intent.symbol).await {
                return Ok(ValidationReport::invalid("스프레드 수용 불가".to_string()));
            }
        }

        let account = self.account.snapshot().await?;
        let usable_margin = account.free_margin * state.margin_safety_buffer();
        let required = intent.lot * spec.margin_per_lot;
        if required > usable_margin {
            return Ok(ValidationReport::invalid(format!(
                "증거금 부족: 필요 {required}, 가용 {usable_margin}"
            )));
        }

        Ok(report)
    }
}

// =============================================================================
// 테스트
// =============================================================================
