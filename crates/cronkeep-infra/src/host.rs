//! Identity of the machine a job runs on.

use std::net::IpAddr;

/// Placeholder for an interface without an IPv4 address.
pub const NO_IPV4: &str = "No IP addr";

pub fn host_name() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "unknown".to_string())
}

/// IPv4 addresses of every network interface, one line each. An interface
/// that only carries IPv6 addresses contributes a `No IP addr` line.
pub fn interface_addresses() -> Vec<String> {
    match if_addrs::get_if_addrs() {
        Ok(interfaces) => address_lines(
            interfaces
                .into_iter()
                .map(|iface| {
                    let ip = iface.ip();
                    (iface.name, ip)
                }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to list network interfaces");
            Vec::new()
        }
    }
}

/// Group addresses by interface, keeping first-seen interface order.
fn address_lines<I>(addresses: I) -> Vec<String>
where
    I: IntoIterator<Item = (String, IpAddr)>,
{
    let mut interfaces: Vec<(String, Vec<String>)> = Vec::new();
    for (name, ip) in addresses {
        let idx = match interfaces.iter().position(|(n, _)| *n == name) {
            Some(idx) => idx,
            None => {
                interfaces.push((name, Vec::new()));
                interfaces.len() - 1
            }
        };
        if let IpAddr::V4(v4) = ip {
            interfaces[idx].1.push(v4.to_string());
        }
    }

    interfaces
        .into_iter()
        .flat_map(|(_, v4)| {
            if v4.is_empty() {
                vec![NO_IPV4.to_string()]
            } else {
                v4
            }
        })
        .collect()
}
