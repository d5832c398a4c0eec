pub mod catalog;
pub mod credentials;

pub use catalog::CoinCatalog;
pub use credentials::{CredentialSource, ExchangeCredential};
