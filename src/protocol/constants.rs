//! KNX TP1 and TPUART host protocol constants.

// =============================================================================
// Telegram layout
// =============================================================================

/// Maximum size of a KNX TP1 telegram (6-byte header + 16-byte payload + checksum)
pub const MAX_TELEGRAM_SIZE: usize = 23;

/// Size of the TP1 telegram header
pub const TELEGRAM_HEADER_SIZE: usize = 6;

/// Maximum number of raw payload bytes behind the first data byte
pub const MAX_RAW_PAYLOAD: usize = 14;

/// Control field value after masking out the repeat and priority bits.
///
/// A byte `b` opens a TP1 frame iff `(b | CONTROL_FIELD_DONT_CARE) == CONTROL_FIELD`.
pub const CONTROL_FIELD: u8 = 0b1011_1100;

/// Repeat flag (bit 5) and priority (bits 2-3) are variable within the control field
pub const CONTROL_FIELD_DONT_CARE: u8 = 0b0010_1100;

// =============================================================================
// Services from the TPUART chip (single-byte, chip to host)
// =============================================================================

/// Reset.indication - the chip (re)started
pub const TPUART_RESET_INDICATION: u8 = 0b0000_0011;

/// L_Data.confirm, positive - previous transmission accepted on the bus
pub const TPUART_SEND_SUCCESS: u8 = 0b1000_1011;

/// L_Data.confirm, negative - previous transmission failed
pub const TPUART_SEND_NOT_SUCCESS: u8 = 0b0000_1011;

/// State.response marker: the low three bits of the status byte are all set
pub const TPUART_STATE_RESPONSE_MASK: u8 = 0b0000_0111;

// =============================================================================
// Services to the TPUART chip (host to chip)
// =============================================================================

/// U_Reset.request - reset the chip
pub const TPUART_UART_RESET: u8 = 0x01;

/// U_State.request - query the chip status byte
pub const TPUART_STATE_REQUEST: u8 = 0x02;

/// U_SetAddress - program the chip's own individual address (followed by 2 bytes)
pub const TPUART_SET_ADDRESS: u8 = 0x28;

/// U_Ackn - acknowledge the telegram currently on the bus
pub const TPUART_SEND_ACK: u8 = 0b0001_0001;

/// U_Ackn, not addressed - reject the telegram currently on the bus
pub const TPUART_SEND_NOT_ADDRESSED: u8 = 0b0001_0000;

/// U_L_DataStart / U_L_DataContinue framing marker (high bits `10`, low 6 bits = byte index)
pub const TPUART_DATA_START_CONTINUE: u8 = 0b1000_0000;

/// U_L_DataEnd framing marker (high bits `01`, low 6 bits = byte index)
pub const TPUART_DATA_END: u8 = 0b0100_0000;

/// Check whether a peeked byte opens a KNX TP1 frame.
///
/// Repeat flag and priority vary between frames and are ignored.
#[inline(always)]
pub const fn is_control_byte(byte: u8) -> bool {
    (byte | CONTROL_FIELD_DONT_CARE) == CONTROL_FIELD
}

/// Check whether a byte is a TPUART State.response.
#[inline(always)]
pub const fn is_state_response(byte: u8) -> bool {
    byte & TPUART_STATE_RESPONSE_MASK == TPUART_STATE_RESPONSE_MASK
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_byte_detection() {
        // Standard frame, normal priority, not repeated
        assert!(is_control_byte(0xBC));
        // Repeated frame (bit 5 clear)
        assert!(is_control_byte(0x9C));
        // System priority
        assert!(is_control_byte(0xB0));
        // Urgent/alarm priorities
        assert!(is_control_byte(0xB4));
        assert!(is_control_byte(0xB8));

        assert!(!is_control_byte(0x00));
        assert!(!is_control_byte(TPUART_RESET_INDICATION));
        assert!(!is_control_byte(TPUART_SEND_SUCCESS));
        assert!(!is_control_byte(0xFF));
    }

    #[test]
    fn test_state_response_detection() {
        assert!(is_state_response(0x07));
        // Status byte with error flags in the upper bits
        assert!(is_state_response(0x87));
        assert!(is_state_response(0x2F));

        assert!(!is_state_response(TPUART_RESET_INDICATION));
        assert!(!is_state_response(TPUART_SEND_SUCCESS));
        assert!(!is_state_response(TPUART_SEND_NOT_SUCCESS));
        assert!(!is_state_response(0xBC));
    }

    #[test]
    fn test_signal_bytes_are_distinct() {
        // No chip-to-host signal may be mistaken for a frame start
        for byte in [
            TPUART_RESET_INDICATION,
            TPUART_SEND_SUCCESS,
            TPUART_SEND_NOT_SUCCESS,
            0x07,
        ] {
            assert!(!is_control_byte(byte));
        }
    }
}
