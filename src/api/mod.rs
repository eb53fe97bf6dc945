pub mod robinhood;

pub use robinhood::{
    Account, Credentials, Holding, Order, OrderState, Quote, RobinhoodClient, RobinhoodVenue,
    TradingPair,
};
