//! KNX TP1 telegram codec.
//!
//! A telegram is a fixed 23-byte buffer holding one complete TP1 frame:
//! 6-byte header, up to 16 payload bytes and a trailing checksum. Every
//! protocol field lives at a fixed bit position inside that buffer:
//!
//! ```text
//! Byte 0      control field: 10R1 PP00 (R = repeat, active low; PP = priority)
//! Bytes 1-2   source address (individual, big-endian)
//! Bytes 3-4   target address (group or individual, big-endian)
//! Byte 5      G RRR LLLL (G = target is group, RRR = routing counter,
//!             LLLL = payload length - 1)
//! Byte 6      CC SSSS DD (CC = communication type, SSSS = sequence number,
//!             DD = control data / command high bits)
//! Byte 7      CC DDDDDD (CC = command low bits, DDDDDD = first data byte)
//! Bytes 8..   remaining payload
//! Last byte   checksum (XOR over header + payload, seeded 0xFF)
//! ```
//!
//! ## Silent-failure contract
//!
//! Every sized payload getter first checks that the telegram's payload length
//! matches the length its encoding requires. On mismatch it returns a
//! zero/empty default instead of an error. Callers are expected to have used
//! the matching setter; the guard only prevents reading unrelated buffer
//! bytes as a value. This is deliberate and mirrored by the tests.

use crate::addressing::{GroupAddress, IndividualAddress};
use crate::error::{KnxError, Result};
use crate::protocol::constants::{MAX_RAW_PAYLOAD, MAX_TELEGRAM_SIZE, TELEGRAM_HEADER_SIZE};

// =============================================================================
// Field Enums
// =============================================================================

/// KNX transmission priority (control field bits 2-3)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Priority {
    /// System priority (highest)
    System = 0b00,
    /// Alarm priority
    Alarm = 0b10,
    /// High priority
    High = 0b01,
    /// Normal priority (default)
    Normal = 0b11,
}

impl Priority {
    /// Convert the raw 2-bit field to a `Priority`
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0b00 => Self::System,
            0b10 => Self::Alarm,
            0b01 => Self::High,
            _ => Self::Normal,
        }
    }

    /// Raw 2-bit field value
    pub const fn bits(self) -> u8 {
        self as u8
    }
}

/// KNX application layer command (APCI, 4 bits spanning bytes 6 and 7)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Command {
    /// `GroupValue_Read`
    Read = 0b0000,
    /// `GroupValue_Response`
    Answer = 0b0001,
    /// `GroupValue_Write`
    Write = 0b0010,
    /// `IndividualAddress_Write`
    IndividualAddrWrite = 0b0011,
    /// `IndividualAddress_Read`
    IndividualAddrRequest = 0b0100,
    /// `IndividualAddress_Response`
    IndividualAddrResponse = 0b0101,
    /// `DeviceDescriptor_Read`
    MaskVersionRead = 0b1100,
    /// `DeviceDescriptor_Response`
    MaskVersionResponse = 0b1101,
    /// `Restart`
    Restart = 0b1110,
    /// Escape to the extended (10-bit) command set
    Escape = 0b1111,
}

impl Command {
    /// Convert the raw 4-bit APCI field to a `Command`
    pub const fn from_bits(bits: u8) -> Option<Self> {
        match bits & 0b1111 {
            0b0000 => Some(Self::Read),
            0b0001 => Some(Self::Answer),
            0b0010 => Some(Self::Write),
            0b0011 => Some(Self::IndividualAddrWrite),
            0b0100 => Some(Self::IndividualAddrRequest),
            0b0101 => Some(Self::IndividualAddrResponse),
            0b1100 => Some(Self::MaskVersionRead),
            0b1101 => Some(Self::MaskVersionResponse),
            0b1110 => Some(Self::Restart),
            0b1111 => Some(Self::Escape),
            _ => None,
        }
    }

    /// Raw 4-bit APCI value
    pub const fn bits(self) -> u8 {
        self as u8
    }
}

/// Extended (escaped) commands carried in the first data byte after
/// [`Command::Escape`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ExtendedCommand {
    /// `Authorize_Request`
    AuthRequest = 0b01_0001,
    /// `Authorize_Response`
    AuthResponse = 0b01_0010,
}

impl ExtendedCommand {
    /// Raw 6-bit value
    pub const fn bits(self) -> u8 {
        self as u8
    }
}

/// KNX transport layer communication type (byte 6 bits 6-7)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum CommunicationType {
    /// UDP - Unnumbered Data Packet
    UnnumberedData = 0b00,
    /// NDP - Numbered Data Packet
    NumberedData = 0b01,
    /// UCD - Unnumbered Control Data
    UnnumberedControl = 0b10,
    /// NCD - Numbered Control Data (requires positive confirmation)
    NumberedControl = 0b11,
}

impl CommunicationType {
    /// Convert the raw 2-bit field to a `CommunicationType`
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0b00 => Self::UnnumberedData,
            0b01 => Self::NumberedData,
            0b10 => Self::UnnumberedControl,
            _ => Self::NumberedControl,
        }
    }

    /// Raw 2-bit field value
    pub const fn bits(self) -> u8 {
        self as u8
    }
}

/// Control data for UCD / NCD telegrams (byte 6 bits 0-1)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ControlData {
    /// UCD connect
    Connect = 0b00,
    /// UCD disconnect
    Disconnect = 0b01,
    /// NCD positive confirmation
    PositiveConfirm = 0b10,
    /// NCD negative confirmation
    NegativeConfirm = 0b11,
}

impl ControlData {
    /// Convert the raw 2-bit field to `ControlData`
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0b00 => Self::Connect,
            0b01 => Self::Disconnect,
            0b10 => Self::PositiveConfirm,
            _ => Self::NegativeConfirm,
        }
    }

    /// Raw 2-bit field value
    pub const fn bits(self) -> u8 {
        self as u8
    }
}

// =============================================================================
// Telegram
// =============================================================================

/// One complete KNX TP1 telegram.
///
/// # Examples
///
/// ```
/// use knx_tpuart::{GroupAddress, IndividualAddress};
/// use knx_tpuart::protocol::telegram::{Command, Telegram};
///
/// let mut tg = Telegram::new();
/// tg.set_source_address(IndividualAddress::new(1, 1, 1).unwrap());
/// tg.set_target_group_address(GroupAddress::new(1, 2, 3).unwrap());
/// tg.set_command(Command::Write);
/// tg.set_bool_value(true);
/// tg.create_checksum();
///
/// assert!(tg.verify_checksum());
/// assert_eq!(tg.total_length(), 9);
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Telegram {
    buffer: [u8; MAX_TELEGRAM_SIZE],
}

impl Default for Telegram {
    fn default() -> Self {
        Self::new()
    }
}

impl Telegram {
    /// Create a new telegram with default header bits (see [`Telegram::clear`]).
    pub fn new() -> Self {
        let mut tg = Self {
            buffer: [0; MAX_TELEGRAM_SIZE],
        };
        tg.clear();
        tg
    }

    /// Create a telegram from raw frame bytes.
    ///
    /// # Errors
    ///
    /// Returns an invalid-frame error if `data` is shorter than the minimum
    /// on-wire frame (8 bytes), or a payload-too-large error if it exceeds
    /// the maximum telegram size.
    pub fn from_buffer(data: &[u8]) -> Result<Self> {
        if data.len() > MAX_TELEGRAM_SIZE {
            return Err(KnxError::payload_too_large());
        }
        if data.len() < TELEGRAM_HEADER_SIZE + 2 {
            return Err(KnxError::invalid_frame());
        }
        let mut tg = Self {
            buffer: [0; MAX_TELEGRAM_SIZE],
        };
        tg.buffer[..data.len()].copy_from_slice(data);
        Ok(tg)
    }

    /// Reset the buffer to the default header.
    ///
    /// Defaults: standard control field, normal priority, not repeated,
    /// group target, routing counter 6, payload length 1.
    pub fn clear(&mut self) {
        self.buffer = [0; MAX_TELEGRAM_SIZE];

        // Control field, normal priority, no repeat
        self.buffer[0] = 0b1011_1100;

        // Target group address, routing counter = 6, length = 1 (= 2 bytes)
        self.buffer[5] = 0b1110_0001;
    }

    /// Read a raw buffer byte.
    #[inline(always)]
    pub const fn buffer_byte(&self, index: usize) -> u8 {
        self.buffer[index]
    }

    /// Write a raw buffer byte.
    #[inline(always)]
    pub fn set_buffer_byte(&mut self, index: usize, value: u8) {
        self.buffer[index] = value;
    }

    /// The on-wire bytes of this telegram (header + payload + checksum).
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer[..self.total_length()]
    }

    // =========================================================================
    // Control field (byte 0)
    // =========================================================================

    /// Whether this telegram is a repetition of an earlier transmission.
    ///
    /// The repeat flag is active low on the wire: bit 5 set means NOT repeated.
    pub const fn is_repeated(&self) -> bool {
        self.buffer[0] & 0b0010_0000 == 0
    }

    /// Set or clear the repeat flag (stored inverted, see [`Self::is_repeated`]).
    pub fn set_repeated(&mut self, repeated: bool) {
        if repeated {
            self.buffer[0] &= 0b1101_1111;
        } else {
            self.buffer[0] |= 0b0010_0000;
        }
    }

    /// Transmission priority.
    pub const fn priority(&self) -> Priority {
        Priority::from_bits((self.buffer[0] & 0b0000_1100) >> 2)
    }

    /// Set the transmission priority.
    pub fn set_priority(&mut self, priority: Priority) {
        self.buffer[0] = (self.buffer[0] & 0b1111_0011) | (priority.bits() << 2);
    }

    // =========================================================================
    // Source address (bytes 1-2)
    // =========================================================================

    /// Source individual address.
    pub fn source_address(&self) -> IndividualAddress {
        IndividualAddress::from(u16::from_be_bytes([self.buffer[1], self.buffer[2]]))
    }

    /// Stamp the source individual address.
    pub fn set_source_address(&mut self, address: IndividualAddress) {
        let raw = address.raw();
        self.buffer[1] = (raw >> 8) as u8;
        self.buffer[2] = (raw & 0xFF) as u8;
    }

    // =========================================================================
    // Target address (bytes 3-4, group bit in byte 5)
    // =========================================================================

    /// Raw 16-bit target address, group or individual depending on
    /// [`Self::is_target_group`].
    pub const fn target_address(&self) -> u16 {
        u16::from_be_bytes([self.buffer[3], self.buffer[4]])
    }

    /// Target interpreted as a group address.
    ///
    /// Only meaningful when [`Self::is_target_group`] is true; otherwise the
    /// decomposition is garbage (but never unsafe).
    pub fn target_group_address(&self) -> GroupAddress {
        GroupAddress::from(self.target_address())
    }

    /// Target interpreted as an individual address.
    ///
    /// Only meaningful when [`Self::is_target_group`] is false.
    pub fn target_individual_address(&self) -> IndividualAddress {
        IndividualAddress::from(self.target_address())
    }

    /// Address this telegram to a group.
    pub fn set_target_group_address(&mut self, address: GroupAddress) {
        let raw = address.raw();
        self.buffer[3] = (raw >> 8) as u8;
        self.buffer[4] = (raw & 0xFF) as u8;
        self.buffer[5] |= 0b1000_0000;
    }

    /// Address this telegram to a single device.
    pub fn set_target_individual_address(&mut self, address: IndividualAddress) {
        let raw = address.raw();
        self.buffer[3] = (raw >> 8) as u8;
        self.buffer[4] = (raw & 0xFF) as u8;
        self.buffer[5] &= 0b0111_1111;
    }

    /// Whether the target is a group address.
    pub const fn is_target_group(&self) -> bool {
        self.buffer[5] & 0b1000_0000 != 0
    }

    // =========================================================================
    // Routing counter and payload length (byte 5)
    // =========================================================================

    /// Routing counter (0-7).
    pub const fn routing_counter(&self) -> u8 {
        (self.buffer[5] & 0b0111_0000) >> 4
    }

    /// Set the routing counter.
    pub fn set_routing_counter(&mut self, counter: u8) {
        self.buffer[5] = (self.buffer[5] & 0b1000_1111) | ((counter & 0b0111) << 4);
    }

    /// Payload byte count (field stores count - 1; valid values 1-16,
    /// the DPT encodings use 2-16).
    pub const fn payload_length(&self) -> usize {
        (self.buffer[5] & 0b0000_1111) as usize + 1
    }

    /// Set the payload byte count (stored as count - 1 in the 4-bit field).
    pub fn set_payload_length(&mut self, length: usize) {
        self.buffer[5] = (self.buffer[5] & 0b1111_0000) | ((length as u8).wrapping_sub(1) & 0x0F);
    }

    // =========================================================================
    // Command / transport control (bytes 6-7)
    // =========================================================================

    /// Application layer command (APCI). `None` if the 4-bit pattern is not
    /// an assigned command.
    pub const fn command(&self) -> Option<Command> {
        Command::from_bits(((self.buffer[6] & 0b11) << 2) | ((self.buffer[7] & 0b1100_0000) >> 6))
    }

    /// Set the application layer command. The 4-bit APCI spans bytes 6 and 7.
    pub fn set_command(&mut self, command: Command) {
        self.buffer[6] = (self.buffer[6] & 0b1111_1100) | (command.bits() >> 2);
        self.buffer[7] = (self.buffer[7] & 0b0011_1111) | (command.bits() << 6);
    }

    /// Communication type (UDP/NDP/UCD/NCD).
    pub const fn communication_type(&self) -> CommunicationType {
        CommunicationType::from_bits((self.buffer[6] & 0b1100_0000) >> 6)
    }

    /// Set the communication type.
    pub fn set_communication_type(&mut self, comm_type: CommunicationType) {
        self.buffer[6] = (self.buffer[6] & 0b0011_1111) | (comm_type.bits() << 6);
    }

    /// Transport layer sequence number (0-15), meaningful for NDP/NCD.
    pub const fn sequence_number(&self) -> u8 {
        (self.buffer[6] & 0b0011_1100) >> 2
    }

    /// Set the transport layer sequence number.
    pub fn set_sequence_number(&mut self, sequence: u8) {
        self.buffer[6] = (self.buffer[6] & 0b1100_0011) | ((sequence & 0x0F) << 2);
    }

    /// Control data (UCD/NCD connect/disconnect/confirm). Shares byte 6
    /// bits 0-1 with the command high bits.
    pub const fn control_data(&self) -> ControlData {
        ControlData::from_bits(self.buffer[6] & 0b11)
    }

    /// Set the control data bits.
    pub fn set_control_data(&mut self, control: ControlData) {
        self.buffer[6] = (self.buffer[6] & 0b1111_1100) | control.bits();
    }

    /// First data byte: the low 6 bits of byte 7, holding small payloads
    /// (bool, 4-bit values) or the escaped extended command.
    pub const fn first_data_byte(&self) -> u8 {
        self.buffer[7] & 0b0011_1111
    }

    /// Set the first data byte (low 6 bits of byte 7).
    pub fn set_first_data_byte(&mut self, data: u8) {
        self.buffer[7] = (self.buffer[7] & 0b1100_0000) | (data & 0b0011_1111);
    }

    // =========================================================================
    // DPT payload accessors
    //
    // Getters return a zero/empty default when the payload length does not
    // match the encoding. See the module docs for the silent-failure contract.
    // =========================================================================

    /// Read a boolean payload (payload length 2). DPT 1.
    pub const fn bool_value(&self) -> bool {
        if self.payload_length() != 2 {
            // Wrong payload length
            return false;
        }
        self.first_data_byte() & 0b0000_0001 != 0
    }

    /// Write a boolean payload. DPT 1.
    pub fn set_bool_value(&mut self, value: bool) {
        self.set_payload_length(2);
        self.set_first_data_byte(u8::from(value));
    }

    /// Read a 4-bit payload (payload length 2). DPT 2/3.
    pub const fn four_bit_value(&self) -> u8 {
        if self.payload_length() != 2 {
            // Wrong payload length
            return 0;
        }
        self.first_data_byte() & 0b0000_1111
    }

    /// Write a 4-bit payload. DPT 2/3.
    pub fn set_four_bit_value(&mut self, value: u8) {
        self.set_payload_length(2);
        self.set_first_data_byte(value & 0b0000_1111);
    }

    /// Read the direction bit of a 4-bit dim/blind payload. DPT 3.
    pub const fn four_bit_direction(&self) -> bool {
        if self.payload_length() != 2 {
            return false;
        }
        self.first_data_byte() & 0b0000_1000 != 0
    }

    /// Read the step code of a 4-bit dim/blind payload. DPT 3.
    pub const fn four_bit_steps(&self) -> u8 {
        if self.payload_length() != 2 {
            return 0;
        }
        self.first_data_byte() & 0b0000_0111
    }

    /// Write a 4-bit dim/blind payload (direction + 3-bit step code). DPT 3.
    pub fn set_four_bit_dim(&mut self, direction: bool, steps: u8) {
        self.set_four_bit_value((u8::from(direction) << 3) | (steps & 0b0000_0111));
    }

    /// Read a signed 8-bit payload (payload length 3). DPT 6.
    pub const fn one_byte_int(&self) -> i8 {
        if self.payload_length() != 3 {
            return 0;
        }
        self.buffer[8] as i8
    }

    /// Write a signed 8-bit payload. DPT 6.
    pub fn set_one_byte_int(&mut self, value: i8) {
        self.set_payload_length(3);
        self.buffer[8] = value as u8;
    }

    /// Read an unsigned 8-bit payload (payload length 3). DPT 5.
    pub const fn one_byte_uint(&self) -> u8 {
        if self.payload_length() != 3 {
            return 0;
        }
        self.buffer[8]
    }

    /// Write an unsigned 8-bit payload. DPT 5.
    pub fn set_one_byte_uint(&mut self, value: u8) {
        self.set_payload_length(3);
        self.buffer[8] = value;
    }

    /// Read a signed 16-bit payload (payload length 4). DPT 8.
    pub const fn two_byte_int(&self) -> i16 {
        if self.payload_length() != 4 {
            return 0;
        }
        i16::from_be_bytes([self.buffer[8], self.buffer[9]])
    }

    /// Write a signed 16-bit payload. DPT 8.
    pub fn set_two_byte_int(&mut self, value: i16) {
        self.set_payload_length(4);
        self.buffer[8..10].copy_from_slice(&value.to_be_bytes());
    }

    /// Read an unsigned 16-bit payload (payload length 4). DPT 7.
    pub const fn two_byte_uint(&self) -> u16 {
        if self.payload_length() != 4 {
            return 0;
        }
        u16::from_be_bytes([self.buffer[8], self.buffer[9]])
    }

    /// Write an unsigned 16-bit payload. DPT 7.
    pub fn set_two_byte_uint(&mut self, value: u16) {
        self.set_payload_length(4);
        self.buffer[8..10].copy_from_slice(&value.to_be_bytes());
    }

    /// Read a signed 32-bit payload (payload length 6). DPT 13.
    pub const fn four_byte_int(&self) -> i32 {
        if self.payload_length() != 6 {
            return 0;
        }
        i32::from_be_bytes([
            self.buffer[8],
            self.buffer[9],
            self.buffer[10],
            self.buffer[11],
        ])
    }

    /// Write a signed 32-bit payload. DPT 13.
    pub fn set_four_byte_int(&mut self, value: i32) {
        self.set_payload_length(6);
        self.buffer[8..12].copy_from_slice(&value.to_be_bytes());
    }

    /// Read an unsigned 32-bit payload (payload length 6). DPT 12.
    pub const fn four_byte_uint(&self) -> u32 {
        if self.payload_length() != 6 {
            return 0;
        }
        u32::from_be_bytes([
            self.buffer[8],
            self.buffer[9],
            self.buffer[10],
            self.buffer[11],
        ])
    }

    /// Write an unsigned 32-bit payload. DPT 12.
    pub fn set_four_byte_uint(&mut self, value: u32) {
        self.set_payload_length(6);
        self.buffer[8..12].copy_from_slice(&value.to_be_bytes());
    }

    /// Read a 2-byte KNX float payload (payload length 4). DPT 9.
    ///
    /// Format: 1 sign bit, 4 exponent bits, 11 mantissa bits; a set sign bit
    /// biases the mantissa by -2048. Value = mantissa * 0.01 * 2^exponent.
    pub fn two_byte_float(&self) -> f32 {
        if self.payload_length() != 4 {
            // Wrong payload length
            return 0.0;
        }

        let exponent = (self.buffer[8] & 0b0111_1000) >> 3;
        let mantissa = (u16::from(self.buffer[8] & 0b0000_0111) << 8) | u16::from(self.buffer[9]);
        let scale = 0.01 * (1u32 << exponent) as f32;

        if self.buffer[8] & 0b1000_0000 != 0 {
            (f32::from(mantissa) - 2048.0) * scale
        } else {
            f32::from(mantissa) * scale
        }
    }

    /// Write a 2-byte KNX float payload. DPT 9.
    ///
    /// The value is scaled by 100 and the exponent incremented (halving the
    /// mantissa) until the mantissa fits the 11-bit window, then rounded to
    /// the nearest integer. Resolution is 0.01 * 2^exponent.
    ///
    /// Inputs outside the representable range saturate to the nearest limit;
    /// NaN encodes as 0.0.
    pub fn set_two_byte_float(&mut self, value: f32) {
        self.set_payload_length(4);

        // Largest/smallest DPT 9 values (exponent 15). Inputs beyond them
        // would never leave the halving loop, so saturate first.
        const MAX: f32 = 670_760.96;
        const MIN: f32 = -671_088.64;
        let value = if value.is_nan() {
            0.0
        } else if value > MAX {
            MAX
        } else if value < MIN {
            MIN
        } else {
            value
        };

        let mut v = value * 100.0;
        let mut exponent = 0u8;
        while v < -2048.0 {
            v /= 2.0;
            exponent += 1;
        }
        while v > 2047.0 {
            v /= 2.0;
            exponent += 1;
        }

        // Round half away from zero (f32::round is unavailable in core)
        let rounded = if v >= 0.0 {
            (v + 0.5) as i32
        } else {
            (v - 0.5) as i32
        };
        let mantissa = (rounded & 0x7FF) as u16;

        let mut msb = (exponent << 3) | (mantissa >> 8) as u8;
        if value < 0.0 {
            msb |= 0b1000_0000;
        }
        self.buffer[8] = msb;
        self.buffer[9] = (mantissa & 0xFF) as u8;
    }

    /// Read a 4-byte IEEE-754 float payload (payload length 6). DPT 14.
    pub fn four_byte_float(&self) -> f32 {
        if self.payload_length() != 6 {
            // Wrong payload length
            return 0.0;
        }
        f32::from_bits(u32::from_be_bytes([
            self.buffer[8],
            self.buffer[9],
            self.buffer[10],
            self.buffer[11],
        ]))
    }

    /// Write a 4-byte IEEE-754 float payload, most significant byte first. DPT 14.
    pub fn set_four_byte_float(&mut self, value: f32) {
        self.set_payload_length(6);
        self.buffer[8..12].copy_from_slice(&value.to_bits().to_be_bytes());
    }

    /// Write a 3-byte time-of-day payload (payload length 5). DPT 10.
    ///
    /// Packs weekday (3 bits) + hour (5 bits), minute (6 bits), second (6 bits).
    pub fn set_time(&mut self, weekday: u8, hour: u8, minute: u8, second: u8) {
        self.set_payload_length(5);
        self.buffer[8] = ((weekday << 5) & 0b1110_0000) | (hour & 0b0001_1111);
        self.buffer[9] = minute & 0b0011_1111;
        self.buffer[10] = second & 0b0011_1111;
    }

    /// Weekday component of a time payload (payload length 5). DPT 10.
    pub const fn time_weekday(&self) -> u8 {
        if self.payload_length() != 5 {
            return 0;
        }
        (self.buffer[8] & 0b1110_0000) >> 5
    }

    /// Hour component of a time payload. DPT 10.
    pub const fn time_hour(&self) -> u8 {
        if self.payload_length() != 5 {
            return 0;
        }
        self.buffer[8] & 0b0001_1111
    }

    /// Minute component of a time payload. DPT 10.
    pub const fn time_minute(&self) -> u8 {
        if self.payload_length() != 5 {
            return 0;
        }
        self.buffer[9] & 0b0011_1111
    }

    /// Second component of a time payload. DPT 10.
    pub const fn time_second(&self) -> u8 {
        if self.payload_length() != 5 {
            return 0;
        }
        self.buffer[10] & 0b0011_1111
    }

    /// Write a 3-byte date payload (payload length 5). DPT 11.
    ///
    /// Packs day (5 bits), month (4 bits), year (8 bits, century implied).
    pub fn set_date(&mut self, day: u8, month: u8, year: u8) {
        self.set_payload_length(5);
        self.buffer[8] = day & 0b0001_1111;
        self.buffer[9] = month & 0b0000_1111;
        self.buffer[10] = year;
    }

    /// Day component of a date payload (payload length 5). DPT 11.
    pub const fn date_day(&self) -> u8 {
        if self.payload_length() != 5 {
            return 0;
        }
        self.buffer[8] & 0b0001_1111
    }

    /// Month component of a date payload. DPT 11.
    pub const fn date_month(&self) -> u8 {
        if self.payload_length() != 5 {
            return 0;
        }
        self.buffer[9] & 0b0000_1111
    }

    /// Year component of a date payload. DPT 11.
    pub const fn date_year(&self) -> u8 {
        if self.payload_length() != 5 {
            return 0;
        }
        self.buffer[10]
    }

    /// Write a 14-byte text payload (payload length 16). DPT 16.
    ///
    /// Text longer than 14 bytes is truncated, shorter text is null-padded.
    pub fn set_text(&mut self, text: &str) {
        self.set_payload_length(16);
        self.buffer[8..22].fill(0);
        let bytes = text.as_bytes();
        let count = bytes.len().min(MAX_RAW_PAYLOAD);
        self.buffer[8..8 + count].copy_from_slice(&bytes[..count]);
    }

    /// Read a 14-byte text payload (payload length 16). DPT 16.
    ///
    /// Returns an empty string on a length mismatch or if the stored bytes up
    /// to the first NUL are not valid UTF-8.
    pub fn text(&self) -> heapless::String<14> {
        let mut out = heapless::String::new();
        if self.payload_length() != 16 {
            // Wrong payload length
            return out;
        }

        let raw = &self.buffer[8..22];
        let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        if let Ok(text) = core::str::from_utf8(&raw[..end]) {
            let _ = out.push_str(text);
        }
        out
    }

    /// Copy up to `buf.len()` raw payload bytes into `buf`, starting at the
    /// first payload byte after byte 7. Returns the number of bytes copied
    /// (at most the payload length).
    pub fn value(&self, buf: &mut [u8]) -> usize {
        let count = self
            .payload_length()
            .min(buf.len())
            .min(MAX_TELEGRAM_SIZE - 8);
        buf[..count].copy_from_slice(&self.buffer[8..8 + count]);
        count
    }

    /// Store a raw payload. Silently ignores data longer than 14 bytes
    /// (the caller kept its existing payload in that case).
    pub fn set_value(&mut self, data: &[u8]) {
        if data.len() > MAX_RAW_PAYLOAD {
            // ignore
            return;
        }
        self.set_payload_length(data.len() + 2);
        self.buffer[8..8 + data.len()].copy_from_slice(data);
    }

    // =========================================================================
    // Checksum and length
    // =========================================================================

    /// Compute the checksum over header + payload and store it at the end of
    /// the frame.
    pub fn create_checksum(&mut self) {
        let position = self.payload_length() + TELEGRAM_HEADER_SIZE;
        self.buffer[position] = self.calculate_checksum();
    }

    /// The stored checksum byte.
    pub const fn checksum(&self) -> u8 {
        self.buffer[self.payload_length() + TELEGRAM_HEADER_SIZE]
    }

    /// Recompute the checksum and compare with the stored byte.
    pub fn verify_checksum(&self) -> bool {
        self.checksum() == self.calculate_checksum()
    }

    /// Checksum-verify as a `Result`, for callers that want to propagate
    /// corruption as an error. The receive path does not gate on this.
    pub fn validate(&self) -> Result<()> {
        if self.verify_checksum() {
            Ok(())
        } else {
            Err(KnxError::invalid_checksum())
        }
    }

    /// XOR over header + payload, seeded with 0xFF.
    fn calculate_checksum(&self) -> u8 {
        let size = self.payload_length() + TELEGRAM_HEADER_SIZE;
        self.buffer[..size].iter().fold(0xFF, |bcc, &b| bcc ^ b)
    }

    /// Total on-wire length: header + payload + checksum byte.
    pub const fn total_length(&self) -> usize {
        TELEGRAM_HEADER_SIZE + self.payload_length() + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_float_eq(a: f32, b: f32, epsilon: f32) {
        assert!(
            (a - b).abs() < epsilon,
            "Expected {} ≈ {}, diff = {}",
            a,
            b,
            (a - b).abs()
        );
    }

    #[test]
    fn test_clear_defaults() {
        let tg = Telegram::new();
        assert_eq!(tg.buffer_byte(0), 0xBC);
        assert_eq!(tg.buffer_byte(5), 0xE1);
        assert!(!tg.is_repeated());
        assert_eq!(tg.priority(), Priority::Normal);
        assert!(tg.is_target_group());
        assert_eq!(tg.routing_counter(), 6);
        assert_eq!(tg.payload_length(), 2);
    }

    #[test]
    fn test_repeat_flag_polarity() {
        let mut tg = Telegram::new();
        // Default from clear(): bit 5 set = not repeated
        assert!(!tg.is_repeated());

        tg.set_repeated(true);
        assert_eq!(tg.buffer_byte(0) & 0b0010_0000, 0, "repeat bit is active low");
        assert!(tg.is_repeated());

        tg.set_repeated(false);
        assert_eq!(tg.buffer_byte(0) & 0b0010_0000, 0b0010_0000);
        assert!(!tg.is_repeated());
    }

    #[test]
    fn test_priority() {
        let mut tg = Telegram::new();
        for prio in [
            Priority::System,
            Priority::Alarm,
            Priority::High,
            Priority::Normal,
        ] {
            tg.set_priority(prio);
            assert_eq!(tg.priority(), prio);
            // Control field pattern must survive priority changes
            assert_eq!(tg.buffer_byte(0) | 0b0010_1100, 0xBC);
        }
    }

    #[test]
    fn test_source_address_round_trip() {
        let mut tg = Telegram::new();
        let addr = IndividualAddress::new(1, 1, 5).unwrap();
        tg.set_source_address(addr);
        assert_eq!(tg.source_address(), addr);
        assert_eq!(tg.buffer_byte(1), 0x11);
        assert_eq!(tg.buffer_byte(2), 0x05);
    }

    #[test]
    fn test_target_group_address_round_trip() {
        let mut tg = Telegram::new();
        let addr = GroupAddress::new(1, 2, 3).unwrap();
        tg.set_target_group_address(addr);
        assert!(tg.is_target_group());
        assert_eq!(tg.target_group_address(), addr);
        assert_eq!(tg.target_group_address().main(), 1);
        assert_eq!(tg.target_group_address().middle(), 2);
        assert_eq!(tg.target_group_address().sub(), 3);
    }

    #[test]
    fn test_target_individual_address_round_trip() {
        let mut tg = Telegram::new();
        let addr = IndividualAddress::new(15, 15, 255).unwrap();
        tg.set_target_individual_address(addr);
        assert!(!tg.is_target_group());
        assert_eq!(tg.target_individual_address(), addr);
    }

    #[test]
    fn test_target_group_bit_toggling() {
        let mut tg = Telegram::new();
        tg.set_target_individual_address(IndividualAddress::new(1, 1, 1).unwrap());
        assert!(!tg.is_target_group());
        tg.set_target_group_address(GroupAddress::new(4, 5, 6).unwrap());
        assert!(tg.is_target_group());
    }

    #[test]
    fn test_routing_counter() {
        let mut tg = Telegram::new();
        tg.set_routing_counter(3);
        assert_eq!(tg.routing_counter(), 3);
        // Group bit survives
        assert!(tg.is_target_group());
    }

    #[test]
    fn test_payload_length_and_total_length() {
        let mut tg = Telegram::new();
        for length in 2..=16 {
            tg.set_payload_length(length);
            assert_eq!(tg.payload_length(), length);
            assert_eq!(tg.total_length(), 6 + length + 1);
            // Routing counter and group bit share byte 5 and must survive
            assert_eq!(tg.routing_counter(), 6);
            assert!(tg.is_target_group());
        }
    }

    #[test]
    fn test_command_spans_two_bytes() {
        let mut tg = Telegram::new();
        tg.set_first_data_byte(0b0011_1111);
        tg.set_communication_type(CommunicationType::NumberedData);
        tg.set_sequence_number(9);

        tg.set_command(Command::MaskVersionResponse);
        assert_eq!(tg.command(), Some(Command::MaskVersionResponse));

        // Fields sharing bytes 6 and 7 are untouched
        assert_eq!(tg.first_data_byte(), 0b0011_1111);
        assert_eq!(tg.communication_type(), CommunicationType::NumberedData);
        assert_eq!(tg.sequence_number(), 9);
    }

    #[test]
    fn test_all_commands_round_trip() {
        let mut tg = Telegram::new();
        for cmd in [
            Command::Read,
            Command::Answer,
            Command::Write,
            Command::IndividualAddrWrite,
            Command::IndividualAddrRequest,
            Command::IndividualAddrResponse,
            Command::MaskVersionRead,
            Command::MaskVersionResponse,
            Command::Restart,
            Command::Escape,
        ] {
            tg.set_command(cmd);
            assert_eq!(tg.command(), Some(cmd));
        }
    }

    #[test]
    fn test_unassigned_command_pattern() {
        let mut tg = Telegram::new();
        // APCI 0b0110 is not an assigned command
        tg.set_buffer_byte(6, 0b0000_0001);
        tg.set_buffer_byte(7, 0b1000_0000);
        assert_eq!(tg.command(), None);
    }

    #[test]
    fn test_communication_type_and_sequence() {
        let mut tg = Telegram::new();
        tg.set_communication_type(CommunicationType::NumberedControl);
        tg.set_sequence_number(4);
        tg.set_control_data(ControlData::PositiveConfirm);

        assert_eq!(tg.communication_type(), CommunicationType::NumberedControl);
        assert_eq!(tg.sequence_number(), 4);
        assert_eq!(tg.control_data(), ControlData::PositiveConfirm);
    }

    #[test]
    fn test_bool_value() {
        let mut tg = Telegram::new();
        tg.set_bool_value(true);
        assert_eq!(tg.payload_length(), 2);
        assert!(tg.bool_value());

        tg.set_bool_value(false);
        assert!(!tg.bool_value());
    }

    #[test]
    fn test_four_bit_value() {
        let mut tg = Telegram::new();
        for value in 0..=15 {
            tg.set_four_bit_value(value);
            assert_eq!(tg.four_bit_value(), value);
        }
    }

    #[test]
    fn test_four_bit_dim() {
        let mut tg = Telegram::new();
        tg.set_four_bit_dim(true, 5);
        assert!(tg.four_bit_direction());
        assert_eq!(tg.four_bit_steps(), 5);

        tg.set_four_bit_dim(false, 7);
        assert!(!tg.four_bit_direction());
        assert_eq!(tg.four_bit_steps(), 7);
    }

    #[test]
    fn test_one_byte_int_round_trip() {
        let mut tg = Telegram::new();
        for value in [i8::MIN, -1, 0, 1, i8::MAX] {
            tg.set_one_byte_int(value);
            assert_eq!(tg.payload_length(), 3);
            assert_eq!(tg.one_byte_int(), value);
        }
    }

    #[test]
    fn test_one_byte_uint_round_trip() {
        let mut tg = Telegram::new();
        for value in [0, 1, 127, 128, 255] {
            tg.set_one_byte_uint(value);
            assert_eq!(tg.one_byte_uint(), value);
        }
    }

    #[test]
    fn test_two_byte_int_round_trip() {
        let mut tg = Telegram::new();
        for value in [i16::MIN, -256, -1, 0, 1, 256, i16::MAX] {
            tg.set_two_byte_int(value);
            assert_eq!(tg.payload_length(), 4);
            assert_eq!(tg.two_byte_int(), value);
        }
    }

    #[test]
    fn test_two_byte_uint_round_trip() {
        let mut tg = Telegram::new();
        for value in [0, 1, 0x1234, 0xFFFF] {
            tg.set_two_byte_uint(value);
            assert_eq!(tg.two_byte_uint(), value);
        }
    }

    #[test]
    fn test_four_byte_int_round_trip() {
        let mut tg = Telegram::new();
        for value in [i32::MIN, -65536, -1, 0, 1, 65536, i32::MAX] {
            tg.set_four_byte_int(value);
            assert_eq!(tg.payload_length(), 6);
            assert_eq!(tg.four_byte_int(), value);
        }
    }

    #[test]
    fn test_four_byte_uint_round_trip() {
        let mut tg = Telegram::new();
        for value in [0, 1, 0xDEAD_BEEF, u32::MAX] {
            tg.set_four_byte_uint(value);
            assert_eq!(tg.four_byte_uint(), value);
        }
    }

    #[test]
    fn test_two_byte_float_round_trip() {
        let mut tg = Telegram::new();
        for value in [0.0f32, 0.5, 21.5, -5.0, 100.0, -100.0, 20.47] {
            tg.set_two_byte_float(value);
            assert_eq!(tg.payload_length(), 4);
            assert_float_eq(tg.two_byte_float(), value, 0.02);
        }
    }

    #[test]
    fn test_two_byte_float_minus_thirty() {
        // -30.0 needs exponent 1; resolution there is 0.02
        let mut tg = Telegram::new();
        tg.set_two_byte_float(-30.0);
        assert_eq!(tg.buffer_byte(8) & 0x80, 0x80, "sign bit must be set");
        assert_float_eq(tg.two_byte_float(), -30.0, 0.02);
    }

    #[test]
    fn test_two_byte_float_known_wire_values() {
        let mut tg = Telegram::new();
        tg.set_payload_length(4);

        // Official KNX example: 0x0AF0 = 15.04
        tg.set_buffer_byte(8, 0x0A);
        tg.set_buffer_byte(9, 0xF0);
        assert_float_eq(tg.two_byte_float(), 15.04, 0.001);

        // Captured bus value: 0x0C38 = 21.6
        tg.set_buffer_byte(8, 0x0C);
        tg.set_buffer_byte(9, 0x38);
        assert_float_eq(tg.two_byte_float(), 21.6, 0.001);
    }

    #[test]
    fn test_two_byte_float_large_magnitude() {
        let mut tg = Telegram::new();
        tg.set_two_byte_float(100_000.0);
        let decoded = tg.two_byte_float();
        // Resolution at that exponent is coarse
        assert_float_eq(decoded, 100_000.0, 500.0);
    }

    #[test]
    fn test_two_byte_float_saturates_unrepresentable_input() {
        let mut tg = Telegram::new();

        tg.set_two_byte_float(f32::INFINITY);
        assert_float_eq(tg.two_byte_float(), 670_760.96, 1.0);

        tg.set_two_byte_float(f32::NEG_INFINITY);
        assert_eq!(tg.buffer_byte(8) & 0x80, 0x80, "sign bit must be set");
        assert_float_eq(tg.two_byte_float(), -671_088.64, 1.0);

        // Finite but beyond the DPT 9 range
        tg.set_two_byte_float(1.0e38);
        assert_float_eq(tg.two_byte_float(), 670_760.96, 1.0);
        tg.set_two_byte_float(-1.0e38);
        assert_float_eq(tg.two_byte_float(), -671_088.64, 1.0);

        tg.set_two_byte_float(f32::NAN);
        assert_eq!(tg.two_byte_float(), 0.0);
    }

    #[test]
    fn test_four_byte_float_exact_round_trip() {
        let mut tg = Telegram::new();
        for value in [0.0f32, 1.5, -273.15, 6.022e23, f32::MIN_POSITIVE] {
            tg.set_four_byte_float(value);
            assert_eq!(tg.payload_length(), 6);
            assert_eq!(tg.four_byte_float(), value);
        }
    }

    #[test]
    fn test_four_byte_float_wire_order() {
        // Most significant float byte goes to the lowest payload offset
        let mut tg = Telegram::new();
        tg.set_four_byte_float(1.0); // bits 0x3F80_0000
        assert_eq!(tg.buffer_byte(8), 0x3F);
        assert_eq!(tg.buffer_byte(9), 0x80);
        assert_eq!(tg.buffer_byte(10), 0x00);
        assert_eq!(tg.buffer_byte(11), 0x00);
    }

    #[test]
    fn test_time_round_trip() {
        let mut tg = Telegram::new();
        tg.set_time(3, 14, 59, 42);
        assert_eq!(tg.payload_length(), 5);
        assert_eq!(tg.time_weekday(), 3);
        assert_eq!(tg.time_hour(), 14);
        assert_eq!(tg.time_minute(), 59);
        assert_eq!(tg.time_second(), 42);
    }

    #[test]
    fn test_time_masks_out_of_range() {
        let mut tg = Telegram::new();
        // Oversized components only keep their in-field bits
        tg.set_time(8, 32, 64, 64);
        assert_eq!(tg.time_weekday(), 0);
        assert_eq!(tg.time_hour(), 0);
        assert_eq!(tg.time_minute(), 0);
        assert_eq!(tg.time_second(), 0);
    }

    #[test]
    fn test_date_round_trip() {
        let mut tg = Telegram::new();
        tg.set_date(27, 11, 95);
        assert_eq!(tg.payload_length(), 5);
        assert_eq!(tg.date_day(), 27);
        assert_eq!(tg.date_month(), 11);
        assert_eq!(tg.date_year(), 95);
    }

    #[test]
    fn test_text_round_trip() {
        let mut tg = Telegram::new();
        tg.set_text("Hello KNX");
        assert_eq!(tg.payload_length(), 16);
        assert_eq!(tg.text().as_str(), "Hello KNX");
    }

    #[test]
    fn test_text_truncation_and_padding() {
        let mut tg = Telegram::new();
        tg.set_text("exactly 14 ch.");
        assert_eq!(tg.text().as_str(), "exactly 14 ch.");

        tg.set_text("this text is far too long");
        assert_eq!(tg.text().as_str(), "this text is f");

        tg.set_text("");
        assert_eq!(tg.text().as_str(), "");
    }

    #[test]
    fn test_raw_value_round_trip() {
        let mut tg = Telegram::new();
        let data = [0xDE, 0xAD, 0xBE, 0xEF];
        tg.set_value(&data);
        assert_eq!(tg.payload_length(), 6);

        let mut out = [0u8; 16];
        let count = tg.value(&mut out);
        // payload length covers the transport bytes too
        assert_eq!(count, 6);
        assert_eq!(&out[..4], &data);
    }

    #[test]
    fn test_set_value_oversize_ignored() {
        let mut tg = Telegram::new();
        tg.set_one_byte_uint(7);
        let before = tg.payload_length();

        tg.set_value(&[0u8; 15]);
        // Oversize writes are silently ignored, prior payload untouched
        assert_eq!(tg.payload_length(), before);
        assert_eq!(tg.one_byte_uint(), 7);
    }

    #[test]
    fn test_value_respects_buffer_size() {
        let mut tg = Telegram::new();
        tg.set_value(&[1, 2, 3, 4, 5, 6, 7, 8]);
        let mut small = [0u8; 3];
        assert_eq!(tg.value(&mut small), 3);
        assert_eq!(small, [1, 2, 3]);
    }

    #[test]
    fn test_wrong_length_getters_return_default() {
        let mut tg = Telegram::new();
        tg.set_two_byte_int(12345);

        // Payload length is 4 now; every other sized getter must default
        assert!(!tg.bool_value());
        assert_eq!(tg.four_bit_value(), 0);
        assert_eq!(tg.one_byte_int(), 0);
        assert_eq!(tg.one_byte_uint(), 0);
        assert_eq!(tg.four_byte_int(), 0);
        assert_eq!(tg.four_byte_uint(), 0);
        assert_eq!(tg.four_byte_float(), 0.0);
        assert_eq!(tg.time_hour(), 0);
        assert_eq!(tg.date_day(), 0);
        assert_eq!(tg.text().as_str(), "");

        // And the matching getter still works
        assert_eq!(tg.two_byte_int(), 12345);
    }

    #[test]
    fn test_checksum_round_trip() {
        let mut tg = Telegram::new();
        tg.set_source_address(IndividualAddress::new(1, 1, 1).unwrap());
        tg.set_target_group_address(GroupAddress::new(1, 2, 3).unwrap());
        tg.set_command(Command::Write);
        tg.set_bool_value(true);
        tg.create_checksum();

        assert!(tg.verify_checksum());
        assert!(tg.validate().is_ok());
    }

    #[test]
    fn test_checksum_detects_any_single_byte_corruption() {
        let mut tg = Telegram::new();
        tg.set_source_address(IndividualAddress::new(1, 1, 1).unwrap());
        tg.set_target_group_address(GroupAddress::new(1, 2, 3).unwrap());
        tg.set_command(Command::Write);
        tg.set_two_byte_float(21.5);
        tg.create_checksum();

        let size = tg.payload_length() + 6;
        for index in 0..size {
            let mut corrupted = tg.clone();
            corrupted.set_buffer_byte(index, corrupted.buffer_byte(index) ^ 0x01);
            assert!(
                !corrupted.verify_checksum(),
                "flip at byte {index} went undetected"
            );
            assert!(corrupted.validate().is_err());
        }
    }

    #[test]
    fn test_checksum_known_vector() {
        // 9-byte boolean write telegram, checksum computed by hand
        let mut tg = Telegram::new();
        tg.set_source_address(IndividualAddress::from(0x1101));
        tg.set_target_group_address(GroupAddress::from(0x0A03));
        tg.set_command(Command::Write);
        tg.set_bool_value(true);
        tg.create_checksum();

        let expected = [0xBCu8, 0x11, 0x01, 0x0A, 0x03, 0xE1, 0x00, 0x81]
            .iter()
            .fold(0xFFu8, |bcc, &b| bcc ^ b);
        assert_eq!(tg.checksum(), expected);
        assert_eq!(tg.as_bytes().len(), 9);
    }

    #[test]
    fn test_from_buffer() {
        let mut tg = Telegram::new();
        tg.set_source_address(IndividualAddress::new(2, 2, 2).unwrap());
        tg.set_target_group_address(GroupAddress::new(1, 0, 9).unwrap());
        tg.set_command(Command::Write);
        tg.set_bool_value(true);
        tg.create_checksum();

        let parsed = Telegram::from_buffer(tg.as_bytes()).unwrap();
        assert_eq!(parsed.source_address(), tg.source_address());
        assert_eq!(parsed.target_address(), tg.target_address());
        assert!(parsed.verify_checksum());
    }

    #[test]
    fn test_from_buffer_rejects_bad_sizes() {
        assert!(Telegram::from_buffer(&[0xBC; 7]).is_err());
        assert!(Telegram::from_buffer(&[0xBC; 24]).is_err());
        assert!(Telegram::from_buffer(&[]).is_err());
    }
}
