//! KNX Individual Address implementation.
//!
//! Individual addresses identify physical devices on the KNX bus.
//! Format: Area.Line.Member (e.g., 1.1.5)
//! - Area: 0-15 (4 bits)
//! - Line: 0-15 (4 bits)
//! - Member: 0-255 (8 bits)

use crate::error::{KnxError, Result};
use core::fmt;

/// KNX Individual Address (Area.Line.Member)
///
/// Used to identify exactly one physical device on the KNX bus. This is the
/// address an engine stamps into the source field of outgoing telegrams and
/// matches against the target field of incoming point-to-point telegrams.
///
/// # Examples
///
/// ```
/// use knx_tpuart::IndividualAddress;
///
/// let addr = IndividualAddress::new(1, 1, 5).unwrap();
/// assert_eq!(addr.to_string(), "1.1.5");
///
/// // Create from raw u16
/// let addr = IndividualAddress::from(0x1105u16);
/// assert_eq!(addr.area(), 1);
/// assert_eq!(addr.line(), 1);
/// assert_eq!(addr.member(), 5);
///
/// // Parse from string
/// let addr: IndividualAddress = "1.1.5".parse().unwrap();
/// assert_eq!(u16::from(addr), 0x1105);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IndividualAddress {
    raw: u16,
}

impl IndividualAddress {
    /// Maximum area value (4 bits)
    pub const MAX_AREA: u8 = 15;
    /// Maximum line value (4 bits)
    pub const MAX_LINE: u8 = 15;
    /// Maximum member value (8 bits)
    pub const MAX_MEMBER: u8 = 255;

    /// Create a new Individual Address from components.
    ///
    /// # Arguments
    ///
    /// * `area` - Area (0-15)
    /// * `line` - Line (0-15)
    /// * `member` - Member (0-255)
    ///
    /// # Errors
    ///
    /// Returns an addressing error if any component is out of range.
    pub fn new(area: u8, line: u8, member: u8) -> Result<Self> {
        if area > Self::MAX_AREA {
            return Err(KnxError::address_out_of_range());
        }
        if line > Self::MAX_LINE {
            return Err(KnxError::address_out_of_range());
        }
        // member is u8, so it's always in range

        let raw = (u16::from(area) << 12) | (u16::from(line) << 8) | u16::from(member);
        Ok(Self { raw })
    }

    /// Get the raw u16 representation of the address.
    #[inline(always)]
    pub const fn raw(self) -> u16 {
        self.raw
    }

    /// Get the area component (0-15).
    #[inline(always)]
    pub const fn area(self) -> u8 {
        ((self.raw >> 12) & 0x0F) as u8
    }

    /// Get the line component (0-15).
    #[inline(always)]
    pub const fn line(self) -> u8 {
        ((self.raw >> 8) & 0x0F) as u8
    }

    /// Get the member component (0-255).
    #[inline(always)]
    pub const fn member(self) -> u8 {
        (self.raw & 0xFF) as u8
    }
}

impl From<u16> for IndividualAddress {
    #[inline(always)]
    fn from(raw: u16) -> Self {
        Self { raw }
    }
}

impl From<IndividualAddress> for u16 {
    #[inline(always)]
    fn from(addr: IndividualAddress) -> u16 {
        addr.raw
    }
}

impl fmt::Display for IndividualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.area(), self.line(), self.member())
    }
}

impl core::str::FromStr for IndividualAddress {
    type Err = KnxError;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split('.');

        let area = parts
            .next()
            .and_then(|p| p.parse::<u8>().ok())
            .ok_or_else(KnxError::invalid_individual_address)?;

        let line = parts
            .next()
            .and_then(|p| p.parse::<u8>().ok())
            .ok_or_else(KnxError::invalid_individual_address)?;

        let member = parts
            .next()
            .and_then(|p| p.parse::<u8>().ok())
            .ok_or_else(KnxError::invalid_individual_address)?;

        if parts.next().is_some() {
            return Err(KnxError::invalid_individual_address());
        }

        Self::new(area, line, member)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_valid() {
        let addr = IndividualAddress::new(1, 1, 5).unwrap();
        assert_eq!(addr.area(), 1);
        assert_eq!(addr.line(), 1);
        assert_eq!(addr.member(), 5);
    }

    #[test]
    fn test_new_invalid_area() {
        assert!(IndividualAddress::new(16, 0, 0).is_err());
    }

    #[test]
    fn test_new_invalid_line() {
        assert!(IndividualAddress::new(0, 16, 0).is_err());
    }

    #[test]
    fn test_from_raw() {
        let addr = IndividualAddress::from(0x1105u16);
        assert_eq!(addr.area(), 1);
        assert_eq!(addr.line(), 1);
        assert_eq!(addr.member(), 5);
    }

    #[test]
    fn test_to_raw() {
        let addr = IndividualAddress::new(1, 1, 5).unwrap();
        assert_eq!(u16::from(addr), 0x1105);
    }

    #[test]
    fn test_component_masking() {
        let addr = IndividualAddress::new(15, 15, 255).unwrap();
        assert_eq!(addr.area(), 15);
        assert_eq!(addr.line(), 15);
        assert_eq!(addr.member(), 255);
    }

    #[test]
    fn test_display() {
        let addr = IndividualAddress::new(2, 3, 44).unwrap();
        assert_eq!(format!("{}", addr), "2.3.44");
    }

    #[test]
    fn test_from_str() {
        let addr: IndividualAddress = "1.1.5".parse().unwrap();
        assert_eq!(u16::from(addr), 0x1105);
    }

    #[test]
    fn test_from_str_invalid() {
        assert!("1".parse::<IndividualAddress>().is_err());
        assert!("1.1".parse::<IndividualAddress>().is_err());
        assert!("16.0.0".parse::<IndividualAddress>().is_err());
        assert!("1.1.5.2".parse::<IndividualAddress>().is_err());
        assert!("a.b.c".parse::<IndividualAddress>().is_err());
        assert!("1/1/5".parse::<IndividualAddress>().is_err());
    }
}
