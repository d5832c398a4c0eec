pub mod engine;
pub mod fees;
pub mod slippage;
pub mod validator;

pub use engine::{ensure_cancelable, ensure_venue_released, submit_oco_legs, ExecutionEngine};
pub use validator::ValidatedOrder;
