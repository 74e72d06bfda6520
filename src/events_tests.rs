//! Unit tests for trade records and the sink payload shape.

#[cfg(test)]
mod events_tests {
    use crate::events::{iso_millis, ScoredTrade, TradeEvent};
    use crate::scoring::AnomalyScore;
    use serde_json::{json, Value};

    fn sample_trade() -> ScoredTrade {
        ScoredTrade {
            timestamp: "2024-05-01T10:00:00.123Z".to_string(),
            symbol: "BTCUSDT".to_string(),
            price: 70000.0,
            quantity: 0.1,
            anomaly_score: -0.05,
            is_anomaly: false,
        }
    }

    #[test]
    fn test_payload_field_set_and_types() {
        let batch = vec![sample_trade()];
        let value = serde_json::to_value(&batch).unwrap();

        let arr = value.as_array().expect("payload must be an array");
        assert_eq!(arr.len(), 1);
        let obj = arr[0].as_object().unwrap();

        let mut keys: Vec<&str> = obj.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            vec!["anomaly_score", "is_anomaly", "price", "quantity", "symbol", "timestamp"]
        );

        assert!(obj["timestamp"].is_string());
        assert_eq!(obj["symbol"], "BTCUSDT");
        assert_eq!(obj["price"], json!(70000.0));
        assert_eq!(obj["quantity"], json!(0.1));
        assert_eq!(obj["anomaly_score"], json!(-0.05));
        assert_eq!(obj["is_anomaly"], json!(0));
        assert!(obj["is_anomaly"].is_u64());
    }

    #[test]
    fn test_anomaly_flag_rendered_as_one() {
        let mut trade = sample_trade();
        trade.is_anomaly = true;
        let value = serde_json::to_value(&trade).unwrap();
        assert_eq!(value["is_anomaly"], json!(1));
    }

    #[test]
    fn test_payload_deserializes_back() {
        let raw = r#"{"timestamp":"2024-05-01T10:00:00.123Z","symbol":"ETHUSDT","price":3500.5,"quantity":2.0,"anomaly_score":0.12,"is_anomaly":1}"#;
        let trade: ScoredTrade = serde_json::from_str(raw).unwrap();
        assert_eq!(trade.symbol, "ETHUSDT");
        assert!(trade.is_anomaly);

        let bad = raw.replace(r#""is_anomaly":1"#, r#""is_anomaly":2"#);
        assert!(serde_json::from_str::<ScoredTrade>(&bad).is_err());
    }

    #[test]
    fn test_iso_millis_format() {
        assert_eq!(iso_millis(1714557600123), "2024-05-01T10:00:00.123Z");
        assert_eq!(iso_millis(1714557600000), "2024-05-01T10:00:00.000Z");
    }

    #[test]
    fn test_from_event_copies_fields() {
        let event = TradeEvent {
            symbol: "SOLUSDT".to_string(),
            price: 150.25,
            quantity: 12.5,
            event_time_ms: 1714557600123,
        };
        let score = AnomalyScore {
            score: -0.01,
            is_anomaly: true,
        };
        let trade = ScoredTrade::from_event(&event, score);

        assert_eq!(trade.timestamp, "2024-05-01T10:00:00.123Z");
        assert_eq!(trade.symbol, "SOLUSDT");
        assert_eq!(trade.price, 150.25);
        assert_eq!(trade.quantity, 12.5);
        assert_eq!(trade.anomaly_score, -0.01);
        assert!(trade.is_anomaly);

        let value: Value = serde_json::to_value(&trade).unwrap();
        assert_eq!(value["is_anomaly"], json!(1));
    }
}
