use std::net::{Ipv4Addr, SocketAddr, ToSocketAddrs};

use tracing::debug;

use crate::error::ScanError;

/// Expands a target specification into the concrete addresses to scan.
///
/// Three forms are accepted, tried in this order:
/// - `a.b.c.start-end` — last-octet range, expanded ascending
/// - anything not starting with a digit — hostname, resolved to one address
/// - a literal IPv4 address
pub fn expand_target(spec: &str) -> Result<Vec<Ipv4Addr>, ScanError> {
    expand_with(spec, resolve_host)
}

/// Same as [`expand_target`] but with an injectable resolver, so expansion
/// logic is testable without touching the network.
pub fn expand_with<R>(spec: &str, resolve: R) -> Result<Vec<Ipv4Addr>, ScanError>
where
    R: Fn(&str) -> Option<Ipv4Addr>,
{
    if let Some(addresses) = parse_octet_range(spec)? {
        debug!(spec, count = addresses.len(), "expanded octet range");
        return Ok(addresses);
    }

    if !spec.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        return match resolve(spec) {
            Some(address) => {
                debug!(spec, %address, "resolved hostname");
                Ok(vec![address])
            }
            None => Err(ScanError::ResolutionFailure(spec.to_string())),
        };
    }

    let address: Ipv4Addr = spec.parse().map_err(|_| {
        ScanError::InvalidArguments(format!("'{}' is not a valid IPv4 address", spec))
    })?;
    Ok(vec![address])
}

/// Recognizes the `a.b.c.start-end` pattern.
///
/// Returns `Ok(None)` when the spec does not have that shape at all, and
/// `InvalidRange` when it does but the bounds are unusable.
fn parse_octet_range(spec: &str) -> Result<Option<Vec<Ipv4Addr>>, ScanError> {
    let Some((prefix, bounds)) = spec.rsplit_once('.') else {
        return Ok(None);
    };
    let Some((start, end)) = bounds.split_once('-') else {
        return Ok(None);
    };

    let octets: Vec<u8> = prefix
        .split('.')
        .filter_map(|o| o.parse().ok())
        .collect();
    if octets.len() != 3 || prefix.split('.').count() != 3 {
        return Ok(None);
    }
    let (Ok(start), Ok(end)) = (start.parse::<u32>(), end.parse::<u32>()) else {
        return Ok(None);
    };

    if start < 1 || end < start || end > 254 {
        return Err(ScanError::InvalidRange(format!(
            "octet range {}-{} (expected 1 <= start <= end <= 254)",
            start, end
        )));
    }

    Ok(Some(
        (start..=end)
            .map(|i| Ipv4Addr::new(octets[0], octets[1], octets[2], i as u8))
            .collect(),
    ))
}

/// Blocking system lookup; the first A record wins.
fn resolve_host(name: &str) -> Option<Ipv4Addr> {
    let addrs = format!("{}:0", name).to_socket_addrs().ok()?;
    addrs
        .filter_map(|addr| match addr {
            SocketAddr::V4(v4) => Some(*v4.ip()),
            SocketAddr::V6(_) => None,
        })
        .next()
}
