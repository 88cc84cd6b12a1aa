//! KNX TP1 bus access through a TPUART bus coupler.
//!
//! This crate implements the host side of the TPUART serial protocol used by
//! KNX twisted-pair bus coupler chips, together with a bit-exact codec for
//! TP1 telegrams and typed datapoint payload accessors. It is `no_std` by
//! default (enable the `std` feature for host-side use) and performs no heap
//! allocation.
//!
//! # Architecture
//!
//! - [`protocol::telegram`] - the [`Telegram`] codec: a fixed 23-byte TP1
//!   frame with shift/mask field accessors and typed DPT payload get/set.
//! - [`protocol::tpuart`] - the [`TpUart`] engine: poll-driven receive with
//!   early ACK/NACK, chunked transmit with confirmation, chip reset and
//!   state-request primitives, and high-level group read/write/answer
//!   helpers.
//! - [`addressing`] - validated [`GroupAddress`] (`main/middle/sub`) and
//!   [`IndividualAddress`] (`area.line.member`) newtypes.
//! - [`serial`] - the [`SerialPort`] trait the engine drives, plus
//!   [`MockSerial`] for tests.
//!
//! # Example
//!
//! ```
//! use knx_tpuart::{GroupAddress, IndividualAddress, MockSerial, TpUart};
//!
//! let own = IndividualAddress::new(1, 1, 200)?;
//! let mut uart: TpUart<MockSerial> = TpUart::new(MockSerial::new(), own);
//!
//! // Accept telegrams for one group address.
//! uart.add_listen_group_address(GroupAddress::new(1, 2, 3)?)?;
//!
//! // The chip confirms the transmission with its success byte.
//! uart.serial_mut().queue_bytes(&[0x8B]);
//! uart.group_write_bool(GroupAddress::new(1, 2, 3)?, true)?;
//! # Ok::<(), knx_tpuart::KnxError>(())
//! ```
//!
//! # Feature Flags
//!
//! - `std` - host-side builds: backtraces on errors, `std::error::Error`.
//! - `defmt` - binary logging and `defmt::Format` derives for embedded
//!   targets.
//! - `log` - classic `log` facade output for host applications.
//! - `serde` - serde support in the underlying `heapless` collections.

#![cfg_attr(all(not(test), not(feature = "std")), no_std)]

pub mod addressing;
pub mod error;
pub mod logging;
pub mod protocol;
pub mod serial;

#[doc(inline)]
pub use addressing::{GroupAddress, IndividualAddress};
#[doc(inline)]
pub use error::{KnxError, Result};
#[doc(inline)]
pub use protocol::{
    Command, CommunicationType, ControlData, ExtendedCommand, Priority, SerialEvent, Telegram,
    TpUart, TpUartConfig,
};
#[doc(inline)]
pub use serial::{MockSerial, SerialPort};
