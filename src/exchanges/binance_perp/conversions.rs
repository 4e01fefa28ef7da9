use crate::core::types::{
    conversion::{string_to_decimal, string_to_price, string_to_quantity, string_to_symbol},
    Balance, Position, PositionSide, Quantity, Trade, TradeSide,
};
use crate::exchanges::binance_perp::types::{
    BinancePerpBalance, BinancePerpPosition, BinancePerpUserTrade,
};
use rust_decimal::Decimal;

/// Convert Binance Perpetual balance to core Balance type
pub fn convert_binance_perp_balance(binance_balance: &BinancePerpBalance) -> Balance {
    let free = string_to_quantity(&binance_balance.available_balance);
    let total = string_to_quantity(&binance_balance.balance);
    let locked = Quantity::new((total.value() - free.value()).max(Decimal::ZERO));

    Balance {
        asset: binance_balance.asset.clone(),
        free,
        locked,
    }
}

/// Convert Binance Perpetual position to core Position type
pub fn convert_binance_perp_position(binance_position: &BinancePerpPosition) -> Position {
    let position_amount = string_to_quantity(&binance_position.position_amt);
    let position_side = match position_amount.value().cmp(&Decimal::ZERO) {
        std::cmp::Ordering::Greater => PositionSide::Long,
        std::cmp::Ordering::Less => PositionSide::Short,
        std::cmp::Ordering::Equal => PositionSide::Both,
    };
    let liquidation_price = string_to_price(&binance_position.liquidation_price);

    Position {
        symbol: string_to_symbol(&binance_position.symbol),
        position_side,
        entry_price: string_to_price(&binance_position.entry_price),
        position_amount,
        unrealized_pnl: string_to_decimal(&binance_position.unrealized_profit),
        // The exchange reports "0" when there is no liquidation price
        liquidation_price: (!liquidation_price.value().is_zero()).then_some(liquidation_price),
        leverage: string_to_decimal(&binance_position.leverage),
    }
}

/// Convert Binance Perpetual account fill to core Trade type
pub fn convert_binance_perp_user_trade(binance_trade: &BinancePerpUserTrade) -> Trade {
    Trade {
        symbol: string_to_symbol(&binance_trade.symbol),
        id: binance_trade.id,
        order_id: binance_trade.order_id,
        side: if binance_trade.side.eq_ignore_ascii_case("SELL") {
            TradeSide::Sell
        } else {
            TradeSide::Buy
        },
        price: string_to_price(&binance_trade.price),
        quantity: string_to_quantity(&binance_trade.qty),
        commission: string_to_decimal(&binance_trade.commission),
        commission_asset: binance_trade.commission_asset.clone(),
        realized_pnl: string_to_decimal(&binance_trade.realized_pnl),
        is_maker: binance_trade.maker,
        time: binance_trade.time,
    }
}
