pub mod cloudflare;

use std::net::Ipv4Addr;

use crate::error::DeployResult;

/// Points the configured domain at the server.
pub trait DnsProvider {
    /// The fully-qualified domain name managed by this provider.
    fn domain(&self) -> &str;

    /// Create or update the A record of [`DnsProvider::domain`].
    fn upsert_a_record(&self, ip: Ipv4Addr) -> DeployResult<()>;
}

/// Zones that could hold `fqdn`, most specific first.
///
/// Every suffix of at least two labels is a candidate, so the zone of
/// `shop.example.co.uk` is found whether it is `example.co.uk` or a
/// delegated `shop.example.co.uk`. The provider keeps the first
/// candidate it hosts.
///
/// ```
/// use hcloud_deploy::dns::zone_candidates;
///
/// assert_eq!(
///     zone_candidates("shop.example.co.uk"),
///     ["shop.example.co.uk", "example.co.uk", "co.uk"]
/// );
/// ```
#[must_use]
pub fn zone_candidates(fqdn: &str) -> Vec<&str> {
    let fqdn = fqdn.trim_end_matches('.');
    std::iter::once(fqdn)
        .chain(fqdn.match_indices('.').map(|(i, _)| &fqdn[i + 1..]))
        .filter(|zone| zone.contains('.'))
        .collect()
}

/// Record name of `fqdn` relative to `zone`, `@` for the apex.
#[must_use]
pub fn record_label<'a>(fqdn: &'a str, zone: &str) -> &'a str {
    fqdn.trim_end_matches('.')
        .strip_suffix(zone)
        .map(|rest| rest.trim_end_matches('.'))
        .filter(|label| !label.is_empty())
        .unwrap_or("@")
}
