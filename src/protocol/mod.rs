//! KNX TP1 protocol implementation: telegram codec and TPUART line protocol.

pub mod constants;
pub mod telegram;
pub mod tpuart;

#[doc(inline)]
pub use telegram::{Command, CommunicationType, ControlData, ExtendedCommand, Priority, Telegram};
#[doc(inline)]
pub use tpuart::{SerialEvent, TpUart, TpUartConfig};
