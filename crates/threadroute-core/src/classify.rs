// ── Address classification ──
//
// Pure predicates deciding which prefixes may be routed and which
// addresses may serve as a next hop. Malformed input is never an error;
// it is simply not routable.

use std::net::{IpAddr, Ipv6Addr};

use cidr::{Ipv6Cidr, Ipv6Inet};

/// Prefix length of every route this system manages.
pub const PREFIX_LEN: u8 = 64;

const PREFIX_MASK: u128 = !0u128 << (128 - PREFIX_LEN);

/// The /64 network containing `addr` (the first 8 bytes, rest zeroed).
pub fn prefix64(addr: Ipv6Addr) -> Ipv6Cidr {
    let network = Ipv6Addr::from(u128::from(addr) & PREFIX_MASK);
    // The masked address has no host bits, so `new` cannot fail here.
    Ipv6Cidr::new(network, PREFIX_LEN).unwrap_or_else(|_| Ipv6Cidr::new_host(network))
}

/// Whether a textual CIDR (`"fd00::/64"`, host bits allowed) names a
/// network that may be routed.
///
/// Unique-local prefixes are routable here: Thread end-devices normally
/// live in a ULA /64.
pub fn is_routable_prefix(cidr: &str) -> bool {
    if !cidr.contains('/') {
        return false;
    }
    cidr.trim()
        .parse::<Ipv6Inet>()
        .is_ok_and(|inet| is_routable_network(&inet.network()))
}

/// [`is_routable_prefix`] for an already-parsed network.
pub fn is_routable_network(prefix: &Ipv6Cidr) -> bool {
    !is_reserved(prefix.first_address())
}

/// Whether `addr` can be used as a next hop.
///
/// Everything [`is_routable_prefix`] rejects, plus unique-local
/// (`fc00::/7`), IPv4 and IPv4-mapped addresses.
pub fn is_routable_next_hop(addr: impl Into<IpAddr>) -> bool {
    match addr.into() {
        IpAddr::V4(_) => false,
        IpAddr::V6(v6) => v6.to_ipv4_mapped().is_none() && !is_reserved(v6) && !is_unique_local(v6),
    }
}

fn is_reserved(addr: Ipv6Addr) -> bool {
    let s = addr.segments();
    addr.is_unspecified()
        || addr.is_loopback()
        // ff00::/8
        || addr.is_multicast()
        // fe80::/10
        || (s[0] & 0xffc0) == 0xfe80
        // 2001:db8::/32 documentation
        || (s[0] == 0x2001 && s[1] == 0x0db8)
        // 2001::/32 Teredo
        || (s[0] == 0x2001 && s[1] == 0x0000)
        // 2002::/16 6to4
        || s[0] == 0x2002
}

fn is_unique_local(addr: Ipv6Addr) -> bool {
    (addr.segments()[0] & 0xfe00) == 0xfc00
}
