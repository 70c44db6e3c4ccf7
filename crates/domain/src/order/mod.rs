//! The order aggregate and its supporting types.

mod aggregate;
mod line;
mod number;
mod state;

pub use aggregate::{Order, OrderTotals};
pub use line::{CartLine, OrderLine};
pub use number::OrderNumber;
pub use state::{OrderState, PaymentState};
