//! Byte sizes in Kubernetes quantity notation (`10Mi`, `512K`, `2048`)

use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Default upper bound for rendered output
pub const DEFAULT_MAX_MANIFEST_SIZE: ByteSize = ByteSize(10 * 1024 * 1024);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ByteSize(u64);

impl ByteSize {
    pub const fn new(bytes: u64) -> Self {
        Self(bytes)
    }

    pub const fn bytes(self) -> u64 {
        self.0
    }
}

const SUFFIXES: &[(&str, u64)] = &[
    ("Ki", 1 << 10),
    ("Mi", 1 << 20),
    ("Gi", 1 << 30),
    ("K", 1_000),
    ("M", 1_000_000),
    ("G", 1_000_000_000),
];

impl FromStr for ByteSize {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        let invalid = |message: &str| CoreError::InvalidSize {
            input: s.to_string(),
            message: message.to_string(),
        };

        let (digits, multiplier) = SUFFIXES
            .iter()
            .find_map(|(suffix, mul)| input.strip_suffix(suffix).map(|d| (d, *mul)))
            .unwrap_or((input, 1));

        if digits.is_empty() {
            return Err(invalid("missing number"));
        }

        let value: u64 = digits
            .parse()
            .map_err(|_| invalid("expected a whole number with an optional Ki/Mi/Gi or K/M/G suffix"))?;

        value
            .checked_mul(multiplier)
            .map(ByteSize)
            .ok_or_else(|| invalid("value too large"))
    }
}

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (suffix, mul) in [("Gi", 1u64 << 30), ("Mi", 1 << 20), ("Ki", 1 << 10)] {
            if self.0 >= mul && self.0 % mul == 0 {
                return write!(f, "{}{}", self.0 / mul, suffix);
            }
        }
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_binary_suffixes() {
        assert_eq!("10Mi".parse::<ByteSize>().unwrap().bytes(), 10 * 1024 * 1024);
        assert_eq!("4Ki".parse::<ByteSize>().unwrap().bytes(), 4096);
        assert_eq!("1Gi".parse::<ByteSize>().unwrap().bytes(), 1 << 30);
    }

    #[test]
    fn test_parse_decimal_and_plain() {
        assert_eq!("5M".parse::<ByteSize>().unwrap().bytes(), 5_000_000);
        assert_eq!("2048".parse::<ByteSize>().unwrap().bytes(), 2048);
        assert_eq!(" 3K ".parse::<ByteSize>().unwrap().bytes(), 3000);
    }

    #[test]
    fn test_parse_invalid() {
        assert!("".parse::<ByteSize>().is_err());
        assert!("Mi".parse::<ByteSize>().is_err());
        assert!("1.5Mi".parse::<ByteSize>().is_err());
        assert!("-1".parse::<ByteSize>().is_err());
        assert!("99999999999999999999Gi".parse::<ByteSize>().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(DEFAULT_MAX_MANIFEST_SIZE.to_string(), "10Mi");
        assert_eq!(ByteSize::new(1500).to_string(), "1500");
    }
}
