//! TPUART line-protocol engine.
//!
//! [`TpUart`] drives a byte-oriented serial channel speaking the TPUART
//! host protocol: it assembles incoming TP1 telegrams, decides interest and
//! answers ACK/NACK inside the bus timing window, confirms NCD telegrams,
//! and frames outgoing telegrams into the chip's two-byte chunk format.
//!
//! The engine is single-threaded and poll-driven. Call
//! [`TpUart::serial_event`] once per tick from your control loop; each call
//! performs a bounded amount of serial I/O (byte reads with millisecond
//! timeouts) and never blocks indefinitely. A read timeout mid-frame resets
//! the bus coupler and surfaces as [`SerialEvent::Timeout`], never as a
//! fatal error.

use crate::addressing::{GroupAddress, IndividualAddress};
use crate::error::{KnxError, Result};
use crate::protocol::constants::{
    is_control_byte, is_state_response, TELEGRAM_HEADER_SIZE, TPUART_DATA_END,
    TPUART_DATA_START_CONTINUE, TPUART_RESET_INDICATION, TPUART_SEND_ACK,
    TPUART_SEND_NOT_ADDRESSED, TPUART_SEND_NOT_SUCCESS, TPUART_SEND_SUCCESS, TPUART_SET_ADDRESS,
    TPUART_STATE_REQUEST, TPUART_UART_RESET,
};
use crate::protocol::telegram::{Command, CommunicationType, ControlData, ExtendedCommand, Telegram};
use crate::serial::SerialPort;
use crate::tp_log;

/// Engine tuning knobs, passed at construction.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TpUartConfig {
    /// Per-byte serial read timeout in milliseconds. Short by design so the
    /// poll loop stays responsive.
    pub read_timeout_ms: u32,
    /// Accept telegrams addressed to the all-zero broadcast group address
    /// (used for programming-mode address assignment).
    pub listen_to_broadcasts: bool,
}

impl Default for TpUartConfig {
    fn default() -> Self {
        Self {
            read_timeout_ms: 10,
            listen_to_broadcasts: false,
        }
    }
}

/// Outcome of one [`TpUart::serial_event`] poll step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SerialEvent {
    /// The chip announced a reset.
    ResetIndication,
    /// A telegram of interest was received; read it via
    /// [`TpUart::received_telegram`].
    Telegram,
    /// A complete telegram arrived but was not addressed to this device.
    IrrelevantTelegram,
    /// The chip confirmed (or rejected) a previously sent telegram.
    SendConfirmation {
        /// Whether the bus transmission succeeded.
        success: bool,
    },
    /// The chip answered a state request with its status byte.
    StateResponse(u8),
    /// A serial read timed out mid-frame; the bus coupler was reset and the
    /// engine is ready for a fresh frame.
    Timeout,
    /// An unrecognized byte arrived. Processing continues on the next poll.
    Unknown(u8),
}

/// TPUART protocol engine over a [`SerialPort`].
///
/// `MAX_GROUP` fixes the capacity of the listen-address set at compile time.
///
/// # Examples
///
/// ```
/// use knx_tpuart::addressing::{GroupAddress, IndividualAddress};
/// use knx_tpuart::protocol::tpuart::TpUart;
/// use knx_tpuart::serial::MockSerial;
///
/// let mut uart: TpUart<MockSerial> =
///     TpUart::new(MockSerial::new(), IndividualAddress::new(1, 1, 1).unwrap());
/// uart.add_listen_group_address(GroupAddress::new(1, 2, 3).unwrap()).unwrap();
///
/// // Nothing queued on the port, so a poll step yields no event.
/// assert!(uart.serial_event().is_none());
/// ```
#[derive(Debug)]
pub struct TpUart<S: SerialPort, const MAX_GROUP: usize = 15> {
    serial: S,
    own_address: IndividualAddress,
    config: TpUartConfig,
    listen_addresses: heapless::Vec<GroupAddress, MAX_GROUP>,
    filter: Option<fn(&Telegram) -> bool>,
    telegram: Telegram,
    reset_confirmed: bool,
    state_response: Option<u8>,
}

impl<S: SerialPort, const MAX_GROUP: usize> TpUart<S, MAX_GROUP> {
    /// Create an engine with the default configuration.
    pub fn new(serial: S, own_address: IndividualAddress) -> Self {
        Self::with_config(serial, own_address, TpUartConfig::default())
    }

    /// Create an engine with an explicit configuration.
    pub fn with_config(serial: S, own_address: IndividualAddress, config: TpUartConfig) -> Self {
        Self {
            serial,
            own_address,
            config,
            listen_addresses: heapless::Vec::new(),
            filter: None,
            telegram: Telegram::new(),
            reset_confirmed: false,
            state_response: None,
        }
    }

    /// This device's individual address.
    pub const fn own_address(&self) -> IndividualAddress {
        self.own_address
    }

    /// Change the individual address used to stamp outgoing telegrams and
    /// recognize individually addressed receives.
    pub fn set_own_address(&mut self, address: IndividualAddress) {
        self.own_address = address;
    }

    /// Borrow the underlying serial port.
    pub const fn serial(&self) -> &S {
        &self.serial
    }

    /// Mutably borrow the underlying serial port.
    pub fn serial_mut(&mut self) -> &mut S {
        &mut self.serial
    }

    /// Enable or disable acceptance of broadcast (all-zero group) telegrams.
    pub fn set_listen_to_broadcasts(&mut self, enabled: bool) {
        self.config.listen_to_broadcasts = enabled;
    }

    /// Install or clear the interest-filter callback.
    ///
    /// The filter widens what counts as "of interest": when it returns true
    /// the telegram is accepted before the built-in address matching runs.
    /// It gates the ACK timing window, so it must return quickly.
    ///
    /// The callback runs once the six header bytes are in, before the payload
    /// has been read: control byte, addresses, routing counter and payload
    /// length are valid, but bytes 6 and up are still zeroed. Filter on
    /// addresses and priority, not on command or payload contents.
    pub fn set_telegram_filter(&mut self, filter: Option<fn(&Telegram) -> bool>) {
        self.filter = filter;
    }

    /// Register a group address to accept telegrams for.
    ///
    /// # Errors
    ///
    /// Returns [`KnxError::CapacityExceeded`] when the listen set is full.
    pub fn add_listen_group_address(&mut self, address: GroupAddress) -> Result<()> {
        self.listen_addresses
            .push(address)
            .map_err(|_| KnxError::CapacityExceeded)
    }

    /// Whether telegrams for `address` are accepted.
    pub fn is_listening_to(&self, address: GroupAddress) -> bool {
        self.listen_addresses.contains(&address)
    }

    /// The most recently received telegram. Only meaningful right after
    /// [`TpUart::serial_event`] returned [`SerialEvent::Telegram`].
    pub const fn received_telegram(&self) -> &Telegram {
        &self.telegram
    }

    // =========================================================================
    // Receive path
    // =========================================================================

    /// Run one poll step: inspect the next serial byte (if any) and dispatch
    /// it. Returns `None` when the channel was idle for the whole read
    /// timeout or only noise arrived.
    pub fn serial_event(&mut self) -> Option<SerialEvent> {
        let first = self.serial.peek(self.config.read_timeout_ms)?;

        if first == 0x00 {
            // Noise the chip emits around a reset
            let _ = self.serial.read(self.config.read_timeout_ms);
            return None;
        }

        if is_control_byte(first) {
            return Some(self.receive_telegram());
        }

        let byte = self.serial.read(self.config.read_timeout_ms).ok()?;
        let event = match byte {
            TPUART_RESET_INDICATION => {
                self.reset_confirmed = true;
                SerialEvent::ResetIndication
            }
            TPUART_SEND_SUCCESS => SerialEvent::SendConfirmation { success: true },
            TPUART_SEND_NOT_SUCCESS => SerialEvent::SendConfirmation { success: false },
            byte if is_state_response(byte) => {
                self.state_response = Some(byte);
                SerialEvent::StateResponse(byte)
            }
            other => {
                tp_log!(debug, "unrecognized serial byte {}", other);
                SerialEvent::Unknown(other)
            }
        };
        Some(event)
    }

    /// Assemble one telegram into the receive buffer. The frame-start byte is
    /// still unconsumed on entry.
    fn receive_telegram(&mut self) -> SerialEvent {
        let timeout = self.config.read_timeout_ms;
        self.telegram.clear();

        for index in 0..TELEGRAM_HEADER_SIZE {
            match self.serial.read(timeout) {
                Ok(byte) => self.telegram.set_buffer_byte(index, byte),
                Err(_) => return self.recover_from_timeout(),
            }
        }

        // Source, target and payload length are all in the header, so the
        // interest decision is made here and the ACK goes out before the
        // payload arrives. The bus ACK window is tight.
        let interested = self.telegram_of_interest();
        let answer = if interested {
            TPUART_SEND_ACK
        } else {
            TPUART_SEND_NOT_ADDRESSED
        };
        if self.serial.write(&[answer]).is_err() {
            tp_log!(warn, "failed to write ACK/NACK");
        }

        let remaining = self.telegram.payload_length() + 1;
        for offset in 0..remaining {
            match self.serial.read(timeout) {
                Ok(byte) => self
                    .telegram
                    .set_buffer_byte(TELEGRAM_HEADER_SIZE + offset, byte),
                Err(_) => return self.recover_from_timeout(),
            }
        }

        if !self.telegram.verify_checksum() {
            // Diagnostic only; acceptance does not gate on the checksum
            tp_log!(warn, "received telegram with checksum mismatch");
        }

        if !interested {
            return SerialEvent::IrrelevantTelegram;
        }

        if self.telegram.communication_type() == CommunicationType::NumberedControl {
            let sequence = self.telegram.sequence_number();
            let sender = self.telegram.source_address();
            if self.send_ncd_pos_confirm(sequence, sender).is_err() {
                tp_log!(warn, "NCD positive confirm was not confirmed by the chip");
            }
        }

        SerialEvent::Telegram
    }

    /// Interest decision for the telegram in the receive buffer, evaluated
    /// in priority order with short-circuiting.
    fn telegram_of_interest(&self) -> bool {
        let tg = &self.telegram;

        // Our own transmissions echo back from the bus
        if tg.source_address() == self.own_address {
            return false;
        }

        if let Some(filter) = self.filter {
            if filter(tg) {
                return true;
            }
        }

        if tg.is_target_group() {
            let target = tg.target_group_address();
            self.is_listening_to(target)
                || (self.config.listen_to_broadcasts && target.is_broadcast())
        } else {
            tg.target_individual_address() == self.own_address
        }
    }

    fn recover_from_timeout(&mut self) -> SerialEvent {
        tp_log!(warn, "serial read timed out mid-frame, resetting bus coupler");
        if self.serial.write(&[TPUART_UART_RESET]).is_err() {
            tp_log!(error, "failed to write UART reset command");
        }
        SerialEvent::Timeout
    }

    /// Positive confirmation for a received NCD telegram: a minimal telegram
    /// addressed individually back to the sender, carrying its sequence
    /// number. Built in its own buffer so the just-received telegram stays
    /// intact.
    fn send_ncd_pos_confirm(
        &mut self,
        sequence: u8,
        target: IndividualAddress,
    ) -> Result<()> {
        let mut confirm = Telegram::new();
        confirm.set_source_address(self.own_address);
        confirm.set_target_individual_address(target);
        confirm.set_sequence_number(sequence);
        confirm.set_communication_type(CommunicationType::NumberedControl);
        confirm.set_control_data(ControlData::PositiveConfirm);
        confirm.set_payload_length(1);
        self.send_telegram(&mut confirm)
    }

    // =========================================================================
    // Send path
    // =========================================================================

    /// Send a telegram: compute its checksum, write it to the chip as
    /// two-byte chunks and wait for the transmission confirmation.
    ///
    /// Each chunk carries a framing byte (start-continue or end marker plus
    /// the byte index) followed by the raw telegram byte.
    ///
    /// # Errors
    ///
    /// Returns a send error when the chip answers with the not-success byte,
    /// or a timeout error when no confirmation arrives in time.
    pub fn send_telegram(&mut self, telegram: &mut Telegram) -> Result<()> {
        telegram.create_checksum();

        let size = telegram.total_length();
        for index in 0..size {
            let marker = if index == size - 1 {
                TPUART_DATA_END
            } else {
                TPUART_DATA_START_CONTINUE
            };
            self.serial
                .write(&[marker | index as u8, telegram.buffer_byte(index)])?;
        }

        self.wait_for_send_confirmation()
    }

    /// [`TpUart::send_telegram`] with up to `retries` additional attempts on
    /// failure. Returns as soon as any attempt succeeds.
    pub fn send_telegram_with_retry(
        &mut self,
        telegram: &mut Telegram,
        retries: u8,
    ) -> Result<()> {
        let mut result = self.send_telegram(telegram);
        for attempt in 0..retries {
            if result.is_ok() {
                break;
            }
            tp_log!(debug, "send attempt {} failed, retrying", attempt + 1);
            result = self.send_telegram(telegram);
        }
        result
    }

    /// Wait for the chip's transmission confirmation byte, skipping
    /// unrelated bus bytes that may interleave. A read timeout ends the wait.
    fn wait_for_send_confirmation(&mut self) -> Result<()> {
        loop {
            match self.serial.read(self.config.read_timeout_ms) {
                Ok(TPUART_SEND_SUCCESS) => return Ok(()),
                Ok(TPUART_SEND_NOT_SUCCESS) => return Err(KnxError::send_not_confirmed()),
                Ok(_) => {}
                Err(err) => return Err(err),
            }
        }
    }

    // =========================================================================
    // Chip control
    // =========================================================================

    /// Ask the chip to reset. Does not wait for the reset indication; use
    /// [`TpUart::uart_reset_wait`] for that.
    pub fn uart_reset(&mut self) -> Result<()> {
        self.reset_confirmed = false;
        self.serial.write(&[TPUART_UART_RESET])
    }

    /// Reset the chip and poll until the reset indication arrives or
    /// `timeout_ms` elapses.
    ///
    /// # Errors
    ///
    /// Returns a timeout error when no reset indication arrived in time.
    pub fn uart_reset_wait(&mut self, timeout_ms: u32) -> Result<()> {
        self.uart_reset()?;
        for _ in 0..self.poll_budget(timeout_ms) {
            let _ = self.serial_event();
            if self.reset_confirmed {
                return Ok(());
            }
        }
        Err(KnxError::Timeout)
    }

    /// Ask the chip for its state byte. Does not wait for the response; use
    /// [`TpUart::uart_state_request_wait`] for that.
    pub fn uart_state_request(&mut self) -> Result<()> {
        self.state_response = None;
        self.serial.write(&[TPUART_STATE_REQUEST])
    }

    /// Request the chip state and poll until the state-response byte arrives
    /// or `timeout_ms` elapses. Returns the raw state byte.
    ///
    /// # Errors
    ///
    /// Returns a timeout error when no state response arrived in time.
    pub fn uart_state_request_wait(&mut self, timeout_ms: u32) -> Result<u8> {
        self.uart_state_request()?;
        for _ in 0..self.poll_budget(timeout_ms) {
            let _ = self.serial_event();
            if let Some(state) = self.state_response.take() {
                return Ok(state);
            }
        }
        Err(KnxError::Timeout)
    }

    /// Program this device's individual address into the chip so it can
    /// ACK autonomously.
    pub fn set_own_address_on_chip(&mut self) -> Result<()> {
        let raw = self.own_address.raw();
        self.serial
            .write(&[TPUART_SET_ADDRESS, (raw >> 8) as u8, (raw & 0xFF) as u8])
    }

    /// Number of poll iterations that fit `timeout_ms`, each bounded by the
    /// per-read timeout.
    fn poll_budget(&self, timeout_ms: u32) -> u32 {
        (timeout_ms / self.config.read_timeout_ms.max(1)).max(1)
    }

    // =========================================================================
    // Group telegrams
    // =========================================================================

    fn create_group_frame(
        &self,
        payload_length: usize,
        command: Command,
        target: GroupAddress,
        first_data_byte: u8,
    ) -> Telegram {
        let mut tg = Telegram::new();
        tg.set_source_address(self.own_address);
        tg.set_target_group_address(target);
        tg.set_first_data_byte(first_data_byte);
        tg.set_command(command);
        tg.set_payload_length(payload_length);
        tg
    }

    fn create_individual_frame(
        &self,
        payload_length: usize,
        command: Command,
        target: IndividualAddress,
        first_data_byte: u8,
    ) -> Telegram {
        let mut tg = Telegram::new();
        tg.set_source_address(self.own_address);
        tg.set_target_individual_address(target);
        tg.set_first_data_byte(first_data_byte);
        tg.set_command(command);
        tg.set_payload_length(payload_length);
        tg
    }

    fn group_send<F>(
        &mut self,
        target: GroupAddress,
        command: Command,
        first_data_byte: u8,
        fill: F,
    ) -> Result<()>
    where
        F: FnOnce(&mut Telegram),
    {
        let mut tg = self.create_group_frame(2, command, target, first_data_byte);
        fill(&mut tg);
        self.send_telegram(&mut tg)
    }

    /// Request the current value of a group object.
    pub fn group_read(&mut self, target: GroupAddress) -> Result<()> {
        self.group_send(target, Command::Read, 0, |_| {})
    }

    /// Write a boolean to a group object. DPT 1.
    pub fn group_write_bool(&mut self, target: GroupAddress, value: bool) -> Result<()> {
        self.group_send(target, Command::Write, u8::from(value), |_| {})
    }

    /// Answer a group read with a boolean. DPT 1.
    pub fn group_answer_bool(&mut self, target: GroupAddress, value: bool) -> Result<()> {
        self.group_send(target, Command::Answer, u8::from(value), |_| {})
    }

    /// Write a 4-bit value to a group object. DPT 2/3.
    pub fn group_write_four_bit(&mut self, target: GroupAddress, value: u8) -> Result<()> {
        self.group_send(target, Command::Write, value & 0x0F, |_| {})
    }

    /// Answer a group read with a 4-bit value. DPT 2/3.
    pub fn group_answer_four_bit(&mut self, target: GroupAddress, value: u8) -> Result<()> {
        self.group_send(target, Command::Answer, value & 0x0F, |_| {})
    }

    /// Write a 4-bit dim/blind step (direction + 3-bit step code). DPT 3.
    pub fn group_write_four_bit_dim(
        &mut self,
        target: GroupAddress,
        direction: bool,
        steps: u8,
    ) -> Result<()> {
        let data = (u8::from(direction) << 3) | (steps & 0b0111);
        self.group_send(target, Command::Write, data, |_| {})
    }

    /// Answer a group read with a 4-bit dim/blind step. DPT 3.
    pub fn group_answer_four_bit_dim(
        &mut self,
        target: GroupAddress,
        direction: bool,
        steps: u8,
    ) -> Result<()> {
        let data = (u8::from(direction) << 3) | (steps & 0b0111);
        self.group_send(target, Command::Answer, data, |_| {})
    }

    /// Write a signed 8-bit value to a group object. DPT 6.
    pub fn group_write_one_byte_int(&mut self, target: GroupAddress, value: i8) -> Result<()> {
        self.group_send(target, Command::Write, 0, |tg| tg.set_one_byte_int(value))
    }

    /// Answer a group read with a signed 8-bit value. DPT 6.
    pub fn group_answer_one_byte_int(&mut self, target: GroupAddress, value: i8) -> Result<()> {
        self.group_send(target, Command::Answer, 0, |tg| tg.set_one_byte_int(value))
    }

    /// Write an unsigned 8-bit value to a group object. DPT 5.
    pub fn group_write_one_byte_uint(&mut self, target: GroupAddress, value: u8) -> Result<()> {
        self.group_send(target, Command::Write, 0, |tg| tg.set_one_byte_uint(value))
    }

    /// Answer a group read with an unsigned 8-bit value. DPT 5.
    pub fn group_answer_one_byte_uint(&mut self, target: GroupAddress, value: u8) -> Result<()> {
        self.group_send(target, Command::Answer, 0, |tg| tg.set_one_byte_uint(value))
    }

    /// Write a signed 16-bit value to a group object. DPT 8.
    pub fn group_write_two_byte_int(&mut self, target: GroupAddress, value: i16) -> Result<()> {
        self.group_send(target, Command::Write, 0, |tg| tg.set_two_byte_int(value))
    }

    /// Answer a group read with a signed 16-bit value. DPT 8.
    pub fn group_answer_two_byte_int(&mut self, target: GroupAddress, value: i16) -> Result<()> {
        self.group_send(target, Command::Answer, 0, |tg| tg.set_two_byte_int(value))
    }

    /// Write an unsigned 16-bit value to a group object. DPT 7.
    pub fn group_write_two_byte_uint(&mut self, target: GroupAddress, value: u16) -> Result<()> {
        self.group_send(target, Command::Write, 0, |tg| tg.set_two_byte_uint(value))
    }

    /// Answer a group read with an unsigned 16-bit value. DPT 7.
    pub fn group_answer_two_byte_uint(&mut self, target: GroupAddress, value: u16) -> Result<()> {
        self.group_send(target, Command::Answer, 0, |tg| tg.set_two_byte_uint(value))
    }

    /// Write a signed 32-bit value to a group object. DPT 13.
    pub fn group_write_four_byte_int(&mut self, target: GroupAddress, value: i32) -> Result<()> {
        self.group_send(target, Command::Write, 0, |tg| tg.set_four_byte_int(value))
    }

    /// Answer a group read with a signed 32-bit value. DPT 13.
    pub fn group_answer_four_byte_int(&mut self, target: GroupAddress, value: i32) -> Result<()> {
        self.group_send(target, Command::Answer, 0, |tg| tg.set_four_byte_int(value))
    }

    /// Write an unsigned 32-bit value to a group object. DPT 12.
    pub fn group_write_four_byte_uint(&mut self, target: GroupAddress, value: u32) -> Result<()> {
        self.group_send(target, Command::Write, 0, |tg| tg.set_four_byte_uint(value))
    }

    /// Answer a group read with an unsigned 32-bit value. DPT 12.
    pub fn group_answer_four_byte_uint(&mut self, target: GroupAddress, value: u32) -> Result<()> {
        self.group_send(target, Command::Answer, 0, |tg| tg.set_four_byte_uint(value))
    }

    /// Write a 2-byte float to a group object. DPT 9.
    pub fn group_write_two_byte_float(&mut self, target: GroupAddress, value: f32) -> Result<()> {
        self.group_send(target, Command::Write, 0, |tg| tg.set_two_byte_float(value))
    }

    /// Answer a group read with a 2-byte float. DPT 9.
    pub fn group_answer_two_byte_float(&mut self, target: GroupAddress, value: f32) -> Result<()> {
        self.group_send(target, Command::Answer, 0, |tg| tg.set_two_byte_float(value))
    }

    /// Write a 4-byte IEEE-754 float to a group object. DPT 14.
    pub fn group_write_four_byte_float(&mut self, target: GroupAddress, value: f32) -> Result<()> {
        self.group_send(target, Command::Write, 0, |tg| tg.set_four_byte_float(value))
    }

    /// Answer a group read with a 4-byte IEEE-754 float. DPT 14.
    pub fn group_answer_four_byte_float(&mut self, target: GroupAddress, value: f32) -> Result<()> {
        self.group_send(target, Command::Answer, 0, |tg| tg.set_four_byte_float(value))
    }

    /// Write a time of day to a group object. DPT 10.
    pub fn group_write_time(
        &mut self,
        target: GroupAddress,
        weekday: u8,
        hour: u8,
        minute: u8,
        second: u8,
    ) -> Result<()> {
        self.group_send(target, Command::Write, 0, |tg| {
            tg.set_time(weekday, hour, minute, second);
        })
    }

    /// Answer a group read with a time of day. DPT 10.
    pub fn group_answer_time(
        &mut self,
        target: GroupAddress,
        weekday: u8,
        hour: u8,
        minute: u8,
        second: u8,
    ) -> Result<()> {
        self.group_send(target, Command::Answer, 0, |tg| {
            tg.set_time(weekday, hour, minute, second);
        })
    }

    /// Write a date to a group object. DPT 11.
    pub fn group_write_date(
        &mut self,
        target: GroupAddress,
        day: u8,
        month: u8,
        year: u8,
    ) -> Result<()> {
        self.group_send(target, Command::Write, 0, |tg| tg.set_date(day, month, year))
    }

    /// Answer a group read with a date. DPT 11.
    pub fn group_answer_date(
        &mut self,
        target: GroupAddress,
        day: u8,
        month: u8,
        year: u8,
    ) -> Result<()> {
        self.group_send(target, Command::Answer, 0, |tg| tg.set_date(day, month, year))
    }

    /// Write a 14-byte text to a group object. DPT 16.
    pub fn group_write_text(&mut self, target: GroupAddress, text: &str) -> Result<()> {
        self.group_send(target, Command::Write, 0, |tg| tg.set_text(text))
    }

    /// Answer a group read with a 14-byte text. DPT 16.
    pub fn group_answer_text(&mut self, target: GroupAddress, text: &str) -> Result<()> {
        self.group_send(target, Command::Answer, 0, |tg| tg.set_text(text))
    }

    /// Write a raw payload to a group object.
    pub fn group_write_value(&mut self, target: GroupAddress, data: &[u8]) -> Result<()> {
        self.group_send(target, Command::Write, 0, |tg| tg.set_value(data))
    }

    /// Answer a group read with a raw payload.
    pub fn group_answer_value(&mut self, target: GroupAddress, data: &[u8]) -> Result<()> {
        self.group_send(target, Command::Answer, 0, |tg| tg.set_value(data))
    }

    // =========================================================================
    // Individual (device-to-device) telegrams
    // =========================================================================

    /// Broadcast this device's individual address, answering a
    /// programming-mode address request.
    pub fn individual_answer_address(&mut self) -> Result<()> {
        let mut tg = self.create_group_frame(
            2,
            Command::IndividualAddrResponse,
            GroupAddress::BROADCAST,
            0,
        );
        self.send_telegram(&mut tg)
    }

    /// Answer a device-descriptor (mask version) read. Reports the BIM M112
    /// descriptor 0x0701.
    pub fn individual_answer_mask_version(&mut self, target: IndividualAddress) -> Result<()> {
        let mut tg = self.create_individual_frame(4, Command::MaskVersionResponse, target, 0);
        tg.set_communication_type(CommunicationType::NumberedData);
        tg.set_buffer_byte(8, 0x07);
        tg.set_buffer_byte(9, 0x01);
        self.send_telegram(&mut tg)
    }

    /// Answer an authorization request with the granted access level.
    pub fn individual_answer_auth(
        &mut self,
        access_level: u8,
        sequence: u8,
        target: IndividualAddress,
    ) -> Result<()> {
        let mut tg = self.create_individual_frame(
            3,
            Command::Escape,
            target,
            ExtendedCommand::AuthResponse.bits(),
        );
        tg.set_communication_type(CommunicationType::NumberedData);
        tg.set_sequence_number(sequence);
        tg.set_buffer_byte(8, access_level);
        self.send_telegram(&mut tg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serial::MockSerial;

    fn own_address() -> IndividualAddress {
        IndividualAddress::new(1, 1, 1).unwrap()
    }

    fn make_uart() -> TpUart<MockSerial> {
        TpUart::new(MockSerial::new(), own_address())
    }

    #[test]
    fn test_idle_channel_yields_no_event() {
        let mut uart = make_uart();
        assert!(uart.serial_event().is_none());
    }

    #[test]
    fn test_zero_bytes_are_skipped() {
        let mut uart = make_uart();
        uart.serial_mut().queue_bytes(&[0x00, 0x00]);
        assert!(uart.serial_event().is_none());
        assert!(uart.serial_event().is_none());
        assert_eq!(uart.serial_mut().pending(), 0);
    }

    #[test]
    fn test_reset_indication_event() {
        let mut uart = make_uart();
        uart.serial_mut().queue_bytes(&[0x03]);
        assert_eq!(uart.serial_event(), Some(SerialEvent::ResetIndication));
    }

    #[test]
    fn test_send_confirmation_events() {
        let mut uart = make_uart();
        uart.serial_mut().queue_bytes(&[0x8B, 0x0B]);
        assert_eq!(
            uart.serial_event(),
            Some(SerialEvent::SendConfirmation { success: true })
        );
        assert_eq!(
            uart.serial_event(),
            Some(SerialEvent::SendConfirmation { success: false })
        );
    }

    #[test]
    fn test_state_response_event() {
        let mut uart = make_uart();
        uart.serial_mut().queue_bytes(&[0x47]);
        assert_eq!(uart.serial_event(), Some(SerialEvent::StateResponse(0x47)));
    }

    #[test]
    fn test_unknown_byte_event() {
        let mut uart = make_uart();
        uart.serial_mut().queue_bytes(&[0x55]);
        assert_eq!(uart.serial_event(), Some(SerialEvent::Unknown(0x55)));
    }

    #[test]
    fn test_listen_set_capacity() {
        let mut uart: TpUart<MockSerial, 2> = TpUart::new(MockSerial::new(), own_address());
        uart.add_listen_group_address(GroupAddress::new(1, 1, 1).unwrap())
            .unwrap();
        uart.add_listen_group_address(GroupAddress::new(1, 1, 2).unwrap())
            .unwrap();

        let overflow = uart.add_listen_group_address(GroupAddress::new(1, 1, 3).unwrap());
        assert!(matches!(overflow, Err(KnxError::CapacityExceeded)));

        assert!(uart.is_listening_to(GroupAddress::new(1, 1, 1).unwrap()));
        assert!(!uart.is_listening_to(GroupAddress::new(1, 1, 3).unwrap()));
    }

    #[test]
    fn test_uart_reset_wait_success() {
        let mut uart = make_uart();
        uart.serial_mut().queue_bytes(&[0x03]);
        uart.uart_reset_wait(100).unwrap();
        // The reset command byte went out first
        assert_eq!(uart.serial().written(), &[0x01]);
    }

    #[test]
    fn test_uart_reset_wait_timeout() {
        let mut uart = make_uart();
        let err = uart.uart_reset_wait(50).unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(uart.serial().written(), &[0x01]);
    }

    #[test]
    fn test_uart_state_request_wait() {
        let mut uart = make_uart();
        uart.serial_mut().queue_bytes(&[0x47]);
        let state = uart.uart_state_request_wait(100).unwrap();
        assert_eq!(state, 0x47);
        assert_eq!(uart.serial().written(), &[0x02]);
    }

    #[test]
    fn test_set_own_address_on_chip() {
        let mut uart = make_uart();
        uart.set_own_address_on_chip().unwrap();
        assert_eq!(uart.serial().written(), &[0x28, 0x11, 0x01]);
    }

    #[test]
    fn test_send_telegram_not_success_is_error() {
        let mut uart = make_uart();
        uart.serial_mut().queue_bytes(&[0x0B]);
        let mut tg = uart.create_group_frame(
            2,
            Command::Write,
            GroupAddress::new(1, 2, 3).unwrap(),
            1,
        );
        assert!(uart.send_telegram(&mut tg).is_err());
    }

    #[test]
    fn test_send_confirmation_skips_interleaved_bytes() {
        let mut uart = make_uart();
        uart.serial_mut().queue_bytes(&[0x55, 0x8B]);
        let mut tg = uart.create_group_frame(
            2,
            Command::Write,
            GroupAddress::new(1, 2, 3).unwrap(),
            1,
        );
        uart.send_telegram(&mut tg).unwrap();
    }

    #[test]
    fn test_send_retry_recovers() {
        let mut uart = make_uart();
        // First attempt rejected, second confirmed
        uart.serial_mut().queue_bytes(&[0x0B]);
        let mut tg = uart.create_group_frame(
            2,
            Command::Write,
            GroupAddress::new(1, 2, 3).unwrap(),
            1,
        );
        // Queue the success for the retry after the first failure consumed 0x0B
        uart.serial_mut().queue_bytes(&[0x8B]);
        uart.send_telegram_with_retry(&mut tg, 1).unwrap();
    }

    #[test]
    fn test_group_write_framing() {
        let mut uart = make_uart();
        uart.serial_mut().queue_bytes(&[0x8B]);
        uart.group_write_bool(GroupAddress::new(1, 2, 3).unwrap(), true)
            .unwrap();

        let written = uart.serial().written();
        // A boolean write telegram is 9 bytes, sent as 9 two-byte chunks
        assert_eq!(written.len(), 18);
        for index in 0..9usize {
            let marker = written[index * 2];
            if index == 8 {
                assert_eq!(marker, 0x40 | index as u8);
            } else {
                assert_eq!(marker, 0x80 | index as u8);
            }
        }
        // Chunk payloads reassemble the telegram
        let mut frame = [0u8; 9];
        for (index, byte) in frame.iter_mut().enumerate() {
            *byte = written[index * 2 + 1];
        }
        assert_eq!(frame[0], 0xBC);
        assert_eq!(&frame[1..3], &[0x11, 0x01]); // source 1.1.1
        assert_eq!(&frame[3..5], &[0x0A, 0x03]); // target 1/2/3
        let reassembled = Telegram::from_buffer(&frame).unwrap();
        assert!(reassembled.verify_checksum());
        assert!(reassembled.bool_value());
        assert_eq!(reassembled.command(), Some(Command::Write));
    }

    #[test]
    fn test_group_answer_four_bit_masks_value() {
        let mut uart = make_uart();
        uart.serial_mut().queue_bytes(&[0x8B]);
        uart.group_answer_four_bit(GroupAddress::new(4, 0, 9).unwrap(), 0x1F)
            .unwrap();

        let written = uart.serial().written();
        let mut frame = [0u8; 9];
        for (index, byte) in frame.iter_mut().enumerate() {
            *byte = written[index * 2 + 1];
        }
        let tg = Telegram::from_buffer(&frame).unwrap();
        assert_eq!(tg.command(), Some(Command::Answer));
        assert_eq!(tg.four_bit_value(), 0x0F);
    }

    #[test]
    fn test_group_answer_four_bit_dim_frame() {
        let mut uart = make_uart();
        uart.serial_mut().queue_bytes(&[0x8B]);
        uart.group_answer_four_bit_dim(GroupAddress::new(4, 0, 9).unwrap(), true, 5)
            .unwrap();

        let written = uart.serial().written();
        assert_eq!(written.len(), 18);
        let mut frame = [0u8; 9];
        for (index, byte) in frame.iter_mut().enumerate() {
            *byte = written[index * 2 + 1];
        }
        let tg = Telegram::from_buffer(&frame).unwrap();
        assert!(tg.verify_checksum());
        assert_eq!(tg.command(), Some(Command::Answer));
        assert!(tg.four_bit_direction());
        assert_eq!(tg.four_bit_steps(), 5);
    }

    #[test]
    fn test_own_address_accessors() {
        let mut uart = make_uart();
        assert_eq!(uart.own_address(), own_address());
        let other = IndividualAddress::new(2, 3, 4).unwrap();
        uart.set_own_address(other);
        assert_eq!(uart.own_address(), other);
    }
}
