//! IP and node-name helpers shared by the allocator and the resolver.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::LazyLock;

use regex::Regex;

/// First run of digits in a router or switch name, e.g. `r12` -> `12`
static NUMERIC_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("Invalid numeric key regex"));

/// Bit width of the address family of `addr`
pub fn address_width(addr: &IpAddr) -> u32 {
    match addr {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    }
}

/// Convert an address into its integer value
pub fn addr_to_u128(addr: &IpAddr) -> u128 {
    match addr {
        IpAddr::V4(v4) => u32::from(*v4) as u128,
        IpAddr::V6(v6) => u128::from(*v6),
    }
}

/// Convert an integer back into an address of the same family as `like`.
///
/// Returns `None` if the value does not fit into that family.
pub fn u128_to_addr(value: u128, like: &IpAddr) -> Option<IpAddr> {
    match like {
        IpAddr::V4(_) => u32::try_from(value).ok().map(|v| IpAddr::V4(Ipv4Addr::from(v))),
        IpAddr::V6(_) => Some(IpAddr::V6(Ipv6Addr::from(value))),
    }
}

/// Add `offset` to `addr`, staying in the same address family.
///
/// # Examples
/// ```
/// use topojson::utils::ip_utils::offset_addr;
/// use std::net::IpAddr;
///
/// let addr: IpAddr = "10.0.0.255".parse().unwrap();
/// assert_eq!(offset_addr(&addr, 1), Some("10.0.1.0".parse().unwrap()));
/// ```
pub fn offset_addr(addr: &IpAddr, offset: u128) -> Option<IpAddr> {
    addr_to_u128(addr)
        .checked_add(offset)
        .and_then(|value| u128_to_addr(value, addr))
}

/// Numeric ordering key of a node name: the first embedded run of digits.
///
/// Digit runs of any length compare by value, so `r2` < `r10` and names
/// beyond the range of a machine integer still order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct NumericKey {
    // field order drives the derived Ord: fewer significant digits first
    len: usize,
    digits: String,
}

impl NumericKey {
    /// Significant digits of the key, without leading zeros
    pub fn digits(&self) -> &str {
        &self.digits
    }
}

/// Numeric ordering key of `name`.
///
/// `r1` -> 1, `r10` -> 10, `s2` -> 2, `lo` -> `None`.
///
/// # Examples
/// ```
/// use topojson::utils::ip_utils::numeric_key;
///
/// assert!(numeric_key("r2") < numeric_key("r10"));
/// assert_eq!(numeric_key("r007").unwrap().digits(), "7");
/// assert!(numeric_key("lo").is_none());
/// ```
pub fn numeric_key(name: &str) -> Option<NumericKey> {
    NUMERIC_KEY.find(name).map(|m| {
        let digits = m.as_str().trim_start_matches('0').to_string();
        NumericKey {
            len: digits.len(),
            digits,
        }
    })
}

/// Column encoding of a router name used in loopback addresses.
///
/// The first letter encodes the column: `a0` -> 0, `b2` -> 1, `r1` -> 17.
pub fn number_to_column(name: &str) -> Option<i64> {
    name.chars().next().map(|c| c as i64 - 'a' as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_key() {
        let digits = |name: &str| numeric_key(name).map(|key| key.digits().to_string());
        assert_eq!(digits("r1").as_deref(), Some("1"));
        assert_eq!(digits("r10").as_deref(), Some("10"));
        assert_eq!(digits("rt5-edge2").as_deref(), Some("5"));
        assert_eq!(digits("s03").as_deref(), Some("3"));
        assert_eq!(numeric_key("lo"), None);

        assert!(numeric_key("r2") < numeric_key("r10"));
        assert!(numeric_key("r9") < numeric_key("r10"));
        assert_eq!(numeric_key("r1"), numeric_key("s01"));
    }

    #[test]
    fn test_numeric_key_beyond_u64() {
        let huge = numeric_key("r99999999999999999999").unwrap();
        assert_eq!(huge.digits(), "99999999999999999999");
        assert!(numeric_key("r18446744073709551615").unwrap() < huge);
        assert!(huge < numeric_key("r100000000000000000000").unwrap());
    }

    #[test]
    fn test_number_to_column() {
        assert_eq!(number_to_column("a0"), Some(0));
        assert_eq!(number_to_column("b2"), Some(1));
        assert_eq!(number_to_column("r1"), Some(17));
        assert_eq!(number_to_column(""), None);
    }

    #[test]
    fn test_offset_addr() {
        let v4: IpAddr = "10.0.0.1".parse().unwrap();
        assert_eq!(offset_addr(&v4, 256), Some("10.0.1.1".parse().unwrap()));

        let max_v4: IpAddr = "255.255.255.255".parse().unwrap();
        assert_eq!(offset_addr(&max_v4, 1), None);

        let v6: IpAddr = "fd00::ffff".parse().unwrap();
        assert_eq!(offset_addr(&v6, 1), Some("fd00::1:0".parse().unwrap()));
    }

    #[test]
    fn test_width() {
        assert_eq!(address_width(&"1.2.3.4".parse().unwrap()), 32);
        assert_eq!(address_width(&"::1".parse().unwrap()), 128);
    }
}
