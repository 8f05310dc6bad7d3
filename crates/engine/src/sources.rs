use std::collections::HashMap;
use std::sync::Arc;
use taflow_core::{CandleHistory, LiveDataProvider, OrderBookHistory, TradeHistory};

/// External collaborators injected into the manager.
#[derive(Clone)]
pub struct DataSources {
    pub candles: Arc<dyn CandleHistory>,
    pub trades: Option<Arc<dyn TradeHistory>>,
    pub order_books: Option<Arc<dyn OrderBookHistory>>,
    /// Live providers keyed by provider name.
    pub live: HashMap<String, Arc<dyn LiveDataProvider>>,
}

impl DataSources {
    pub fn new(candles: Arc<dyn CandleHistory>) -> Self {
        Self {
            candles,
            trades: None,
            order_books: None,
            live: HashMap::new(),
        }
    }

    pub fn with_trades(mut self, trades: Arc<dyn TradeHistory>) -> Self {
        self.trades = Some(trades);
        self
    }

    pub fn with_order_books(mut self, order_books: Arc<dyn OrderBookHistory>) -> Self {
        self.order_books = Some(order_books);
        self
    }

    pub fn with_live_provider(mut self, provider: Arc<dyn LiveDataProvider>) -> Self {
        self.live.insert(provider.name().to_string(), provider);
        self
    }

    pub fn live_provider(&self, name: &str) -> Option<&Arc<dyn LiveDataProvider>> {
        self.live.get(name)
    }
}

impl std::fmt::Debug for DataSources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataSources")
            .field("trades", &self.trades.is_some())
            .field("order_books", &self.order_books.is_some())
            .field("live", &self.live.keys().collect::<Vec<_>>())
            .finish()
    }
}
