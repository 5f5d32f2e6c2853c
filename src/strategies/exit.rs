//! Exit policy: take-profit / stop-loss evaluation for open positions

use crate::types::Position;
use rust_decimal::Decimal;

/// Result of evaluating a position against the current price
#[derive(Debug, Clone, PartialEq)]
pub enum ExitDecision {
    Hold { change_pct: Option<Decimal> },
    TakeProfit { change_pct: Decimal },
    StopLoss { change_pct: Decimal },
}

/// Both thresholds are inclusive: a change exactly at the threshold sells.
pub fn evaluate_exit(position: &Position, current_price: Decimal) -> ExitDecision {
    let Some(change_pct) = position.change_pct(current_price) else {
        return ExitDecision::Hold { change_pct: None };
    };

    if change_pct >= position.take_profit_pct {
        ExitDecision::TakeProfit { change_pct }
    } else if change_pct <= -position.stop_loss_pct {
        ExitDecision::StopLoss { change_pct }
    } else {
        ExitDecision::Hold {
            change_pct: Some(change_pct),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::U256;
    use rust_decimal_macros::dec;

    fn position(entry: Decimal) -> Position {
        Position {
            token: "0xabc".to_string(),
            symbol: "TKN".to_string(),
            decimals: 18,
            quantity: U256::from(1u64),
            entry_price_usd: entry,
            take_profit_pct: dec!(30),
            stop_loss_pct: dec!(20),
            bought_at_ms: 0,
        }
    }

    #[test]
    fn test_take_profit_boundary() {
        let p = position(dec!(1));
        assert_eq!(
            evaluate_exit(&p, dec!(1.30)),
            ExitDecision::TakeProfit { change_pct: dec!(30) }
        );
        assert_eq!(
            evaluate_exit(&p, dec!(1.2999)),
            ExitDecision::Hold { change_pct: Some(dec!(29.99)) }
        );
    }

    #[test]
    fn test_stop_loss_boundary() {
        let p = position(dec!(1));
        assert_eq!(
            evaluate_exit(&p, dec!(0.80)),
            ExitDecision::StopLoss { change_pct: dec!(-20) }
        );
        assert_eq!(
            evaluate_exit(&p, dec!(0.8001)),
            ExitDecision::Hold { change_pct: Some(dec!(-19.99)) }
        );
    }

    #[test]
    fn test_thresholds_come_from_the_position() {
        let mut p = position(dec!(2));
        p.take_profit_pct = dec!(50);
        assert!(matches!(evaluate_exit(&p, dec!(2.6)), ExitDecision::Hold { .. }));
        assert!(matches!(evaluate_exit(&p, dec!(3)), ExitDecision::TakeProfit { .. }));
    }

    #[test]
    fn test_overflowing_move_takes_profit() {
        let p = position(dec!(0.00000000000000000001));
        assert_eq!(
            evaluate_exit(&p, dec!(10000000)),
            ExitDecision::TakeProfit { change_pct: Decimal::MAX }
        );
    }

    #[test]
    fn test_zero_entry_price_holds() {
        let p = position(Decimal::ZERO);
        assert_eq!(evaluate_exit(&p, dec!(5)), ExitDecision::Hold { change_pct: None });
    }
}
