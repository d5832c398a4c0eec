pub mod postgres;

pub use postgres::OrderStore;
