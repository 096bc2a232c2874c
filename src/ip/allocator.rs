//! Address pool allocation.
//!
//! Link addresses come from a cursor per address family that walks the
//! configured `link_ip_start` range. Point-to-point links take a pair of
//! consecutive addresses and move the cursor by one subnet; switch
//! attachments take one address at a time. Loopback addresses are not drawn
//! from a cursor but formatted from the `lo_prefix` strings, an ordinal and
//! the router's column.

use crate::config::{LoopbackPrefix, TopologyDocument};
use crate::utils::ip_utils::{address_width, offset_addr};
use ipnet::IpNet;
use std::fmt;
use std::net::IpAddr;

/// IP address family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AddressFamily {
    V4,
    V6,
}

impl AddressFamily {
    pub const ALL: [AddressFamily; 2] = [AddressFamily::V4, AddressFamily::V6];

    pub fn of(addr: &IpAddr) -> Self {
        match addr {
            IpAddr::V4(_) => AddressFamily::V4,
            IpAddr::V6(_) => AddressFamily::V6,
        }
    }

    /// Document key of this family (`ipv4` / `ipv6`)
    pub fn key(self) -> &'static str {
        match self {
            AddressFamily::V4 => "ipv4",
            AddressFamily::V6 => "ipv6",
        }
    }

    /// Masks shorter than this reserve the pool's base address
    fn reserve_base_below(self) -> u8 {
        match self {
            AddressFamily::V4 => 32,
            AddressFamily::V6 => 127,
        }
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressFamily::V4 => write!(f, "IPv4"),
            AddressFamily::V6 => write!(f, "IPv6"),
        }
    }
}

/// Errors raised by the allocator
#[derive(Debug, thiserror::Error)]
pub enum AllocError {
    #[error("no {0} link pool is configured")]
    NotInitialized(AddressFamily),
    #[error("{0} link pool is exhausted")]
    Exhausted(AddressFamily),
    #[error("no {0} loopback prefix is configured")]
    NoLoopbackPrefix(AddressFamily),
    #[error("invalid loopback address '{0}'")]
    InvalidLoopback(String),
    #[error("invalid prefix length: {0}")]
    InvalidPrefixLength(#[from] ipnet::PrefixLenError),
}

/// Cursor over one family's link address range
#[derive(Debug, Clone)]
pub struct LinkPool {
    family: AddressFamily,
    /// `None` once the cursor ran past the end of the address space
    next: Option<IpAddr>,
    step: u128,
    prefix_len: u8,
}

impl LinkPool {
    /// Start a pool at `base`.
    ///
    /// Unless the mask leaves no room (`/32` for IPv4, `/127` and `/128` for
    /// IPv6), the base address itself is skipped.
    pub fn new(base: IpAddr, prefix_len: u8) -> Result<Self, AllocError> {
        IpNet::new(base, prefix_len)?;
        let family = AddressFamily::of(&base);
        let host_bits = address_width(&base) - prefix_len as u32;
        let step = 1u128
            .checked_shl(host_bits)
            .ok_or(ipnet::PrefixLenError)?;

        let next = if prefix_len < family.reserve_base_below() {
            offset_addr(&base, 1)
        } else {
            Some(base)
        };

        Ok(Self { family, next, step, prefix_len })
    }

    pub fn step(&self) -> u128 {
        self.step
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// Address the next allocation starts from
    pub fn cursor(&self) -> Option<IpAddr> {
        self.next
    }

    fn net(&self, addr: IpAddr) -> Result<IpNet, AllocError> {
        Ok(IpNet::new(addr, self.prefix_len)?)
    }

    /// Two consecutive addresses `(a, a + 1)`; the cursor then moves by `step`
    pub fn allocate_pair(&mut self) -> Result<(IpNet, IpNet), AllocError> {
        let first = self.next.ok_or(AllocError::Exhausted(self.family))?;
        let second = offset_addr(&first, 1).ok_or(AllocError::Exhausted(self.family))?;
        let pair = (self.net(first)?, self.net(second)?);
        self.next = offset_addr(&first, self.step);
        Ok(pair)
    }

    /// A single address for a switch attachment.
    ///
    /// IPv4 moves the cursor by one address, IPv6 by a whole `step`. Existing
    /// topologies depend on this difference.
    pub fn allocate_single(&mut self) -> Result<IpNet, AllocError> {
        let addr = self.next.ok_or(AllocError::Exhausted(self.family))?;
        let advance = match self.family {
            AddressFamily::V4 => 1,
            AddressFamily::V6 => self.step,
        };
        let net = self.net(addr)?;
        self.next = offset_addr(&addr, advance);
        Ok(net)
    }
}

/// Link and loopback address allocator for one document
#[derive(Debug, Default)]
pub struct AddressPoolAllocator {
    v4: Option<LinkPool>,
    v6: Option<LinkPool>,
    loopback: Option<LoopbackPrefix>,
}

impl AddressPoolAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set up the pools a document asks for.
    ///
    /// A family's link pool is only initialized when the document enables it
    /// (`ipv4base` / `ipv6base`) and `link_ip_start` carries both its base and
    /// mask. Missing pools only become an error once an `auto` address of
    /// that family is requested.
    pub fn from_document(doc: &TopologyDocument) -> Result<Self, AllocError> {
        let mut allocator = Self::new();

        if let Some(start) = &doc.link_ip_start {
            if doc.family_enabled(AddressFamily::V4) {
                if let (Some(base), Some(mask)) = (start.ipv4, start.v4mask) {
                    allocator.init_link_pool(IpAddr::V4(base), mask)?;
                }
            }
            if doc.family_enabled(AddressFamily::V6) {
                if let (Some(base), Some(mask)) = (start.ipv6, start.v6mask) {
                    allocator.init_link_pool(IpAddr::V6(base), mask)?;
                }
            }
        }

        if let Some(lo) = &doc.lo_prefix {
            allocator.set_loopback_prefix(lo.clone());
        }

        Ok(allocator)
    }

    /// Initialize (or reset) the link pool of `base`'s family
    pub fn init_link_pool(&mut self, base: IpAddr, mask: u8) -> Result<(), AllocError> {
        let pool = LinkPool::new(base, mask)?;
        log::debug!(
            "Initialized {} link pool at {}/{} (step {})",
            AddressFamily::of(&base),
            base,
            mask,
            pool.step()
        );
        match AddressFamily::of(&base) {
            AddressFamily::V4 => self.v4 = Some(pool),
            AddressFamily::V6 => self.v6 = Some(pool),
        }
        Ok(())
    }

    pub fn set_loopback_prefix(&mut self, prefix: LoopbackPrefix) {
        self.loopback = Some(prefix);
    }

    pub fn pool(&self, family: AddressFamily) -> Option<&LinkPool> {
        match family {
            AddressFamily::V4 => self.v4.as_ref(),
            AddressFamily::V6 => self.v6.as_ref(),
        }
    }

    fn pool_mut(&mut self, family: AddressFamily) -> Result<&mut LinkPool, AllocError> {
        let pool = match family {
            AddressFamily::V4 => self.v4.as_mut(),
            AddressFamily::V6 => self.v6.as_mut(),
        };
        pool.ok_or(AllocError::NotInitialized(family))
    }

    /// Addresses for both ends of a point-to-point link
    pub fn allocate_link_pair(&mut self, family: AddressFamily) -> Result<(IpNet, IpNet), AllocError> {
        self.pool_mut(family)?.allocate_pair()
    }

    /// Address for one router attached to a switch
    pub fn allocate_switch_address(&mut self, family: AddressFamily) -> Result<IpNet, AllocError> {
        self.pool_mut(family)?.allocate_single()
    }

    /// Loopback address for the `counter`-th router carrying a loopback
    pub fn allocate_loopback(
        &self,
        family: AddressFamily,
        counter: usize,
        column: i64,
    ) -> Result<IpNet, AllocError> {
        let lo = self
            .loopback
            .as_ref()
            .ok_or(AllocError::NoLoopbackPrefix(family))?;

        let text = match family {
            AddressFamily::V4 => match (&lo.ipv4, lo.v4mask) {
                (Some(prefix), Some(mask)) => format!("{}{}.{}/{}", prefix, counter, column, mask),
                _ => return Err(AllocError::NoLoopbackPrefix(family)),
            },
            AddressFamily::V6 => match (&lo.ipv6, lo.v6mask) {
                (Some(prefix), Some(mask)) => format!("{}{}:{}/{}", prefix, counter, column, mask),
                _ => return Err(AllocError::NoLoopbackPrefix(family)),
            },
        };

        text.parse::<IpNet>()
            .map_err(|_| AllocError::InvalidLoopback(text))
    }
}
