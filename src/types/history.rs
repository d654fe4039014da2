use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeType {
    #[serde(alias = "BUY", alias = "Buy")]
    Buy,
    #[serde(alias = "SELL", alias = "Sell")]
    Sell,
}

impl fmt::Display for TradeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeType::Buy => f.pad("buy"),
            TradeType::Sell => f.pad("sell"),
        }
    }
}

/// Either the server's bot name or, when absent, its id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BotRef {
    Id(u64),
    Name(String),
}

impl fmt::Display for BotRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BotRef::Id(id) => write!(f, "{}", id),
            BotRef::Name(name) => write!(f, "{}", name),
        }
    }
}

/// One executed trade. Only `id` and `type` are required; a row with
/// missing fields still decodes so one sparse entry cannot blank the table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: u64,
    #[serde(default, alias = "timestamp")]
    pub time: String,
    #[serde(rename = "type", alias = "side")]
    pub trade_type: TradeType,
    #[serde(default, alias = "quantity", skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_id: Option<u64>,
}

impl Trade {
    pub fn bot(&self) -> Option<BotRef> {
        match (&self.bot_name, self.bot_id) {
            (Some(name), _) if !name.is_empty() => Some(BotRef::Name(name.clone())),
            (_, Some(id)) => Some(BotRef::Id(id)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: u64,
    #[serde(default, alias = "timestamp")]
    pub time: String,
    #[serde(default, alias = "details")]
    pub message: String,
}

/// Client-side trade type filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TradeFilter {
    #[default]
    All,
    Only(TradeType),
}

impl TradeFilter {
    pub fn matches(&self, trade: &Trade) -> bool {
        match self {
            TradeFilter::All => true,
            TradeFilter::Only(trade_type) => trade.trade_type == *trade_type,
        }
    }
}

impl FromStr for TradeFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(TradeFilter::All),
            "buy" => Ok(TradeFilter::Only(TradeType::Buy)),
            "sell" => Ok(TradeFilter::Only(TradeType::Sell)),
            other => Err(format!("unknown trade filter '{}', expected all, buy or sell", other)),
        }
    }
}

impl fmt::Display for TradeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeFilter::All => write!(f, "all"),
            TradeFilter::Only(trade_type) => write!(f, "{}", trade_type),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_trade_accepts_frontend_names() {
        let trade: Trade = serde_json::from_str(
            r#"{"id": 1, "time": "2024-05-01T10:00:00", "type": "buy", "amount": 0.5, "price": 64000.1, "bot_name": "BTC-Scalper", "bot_id": 3}"#,
        )
        .unwrap();

        assert_eq!(trade.trade_type, TradeType::Buy);
        assert_eq!(trade.amount, Some(dec!(0.5)));
        assert_eq!(trade.bot(), Some(BotRef::Name("BTC-Scalper".to_string())));
    }

    #[test]
    fn test_trade_accepts_backend_names() {
        let trade: Trade = serde_json::from_str(
            r#"{"id": 2, "timestamp": "2024-05-01", "side": "SELL", "quantity": "2", "price": "10", "symbol": "ETHUSDT", "bot_id": 9}"#,
        )
        .unwrap();

        assert_eq!(trade.trade_type, TradeType::Sell);
        assert_eq!(trade.amount, Some(dec!(2)));
        assert_eq!(trade.bot(), Some(BotRef::Id(9)));
    }

    #[test]
    fn test_sparse_trades_decode_and_filter() {
        let trades: Vec<Trade> =
            serde_json::from_str(r#"[{"id":1,"type":"buy"},{"id":2,"type":"sell"}]"#).unwrap();

        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].time, "");
        assert_eq!(trades[0].amount, None);
        assert_eq!(trades[1].price, None);

        let filter = TradeFilter::Only(TradeType::Buy);
        let ids: Vec<u64> = trades.iter().filter(|t| filter.matches(t)).map(|t| t.id).collect();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn test_log_entry_without_time() {
        let log: LogEntry = serde_json::from_str(r#"{"id": 5, "message": "tick"}"#).unwrap();
        assert_eq!(log.time, "");
        assert_eq!(log.message, "tick");
    }

    #[test]
    fn test_log_entry_aliases() {
        let log: LogEntry =
            serde_json::from_str(r#"{"id": 4, "timestamp": "t", "details": "bot started"}"#).unwrap();
        assert_eq!(log.time, "t");
        assert_eq!(log.message, "bot started");
    }

    #[test]
    fn test_filter_parsing() {
        assert_eq!("ALL".parse::<TradeFilter>().unwrap(), TradeFilter::All);
        assert_eq!("buy".parse::<TradeFilter>().unwrap(), TradeFilter::Only(TradeType::Buy));
        assert!("hold".parse::<TradeFilter>().is_err());
    }
}
