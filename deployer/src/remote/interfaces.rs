//! Network interface discovery on a remote host

use tracing::debug;

use crate::errors::DeployError;
use crate::remote::RemoteSession;

/// One line per link, `N: name: <flags> ...`
pub const LIST_INTERFACES_COMMAND: &str = "ip -o link show";

/// List the host's interfaces, sorted by name
pub async fn list_interfaces(session: &dyn RemoteSession) -> Result<Vec<String>, DeployError> {
    let output = session
        .run(LIST_INTERFACES_COMMAND)
        .await?
        .check(LIST_INTERFACES_COMMAND)?;
    let interfaces = parse_interfaces(&output.stdout);
    debug!("Found {} interfaces", interfaces.len());
    Ok(interfaces)
}

/// Extract interface names from `ip -o link show` output
///
/// Names containing anything other than ASCII letters and digits (e.g.
/// `veth1@if4`) are skipped.
pub fn parse_interfaces(output: &str) -> Vec<String> {
    let mut names: Vec<String> = output.lines().filter_map(parse_line).collect();
    names.sort();
    names
}

fn parse_line(line: &str) -> Option<String> {
    let (index, rest) = line.split_once(':')?;
    if !index.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    // exactly one separator character before the name
    let mut chars = rest.chars();
    let separator = chars.next()?;
    if separator.is_ascii_alphanumeric() || separator == '_' {
        return None;
    }

    let (name, tail) = chars.as_str().split_once(':')?;
    if name.is_empty() || tail.is_empty() || !name.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return None;
    }
    Some(name.to_string())
}

/// First three octets of a dotted IPv4 address, e.g. `10.1.1` for `10.1.1.10`
///
/// Only /24 networks are supported.
pub fn address_prefix(address: &str) -> Option<String> {
    let octets: Vec<&str> = address.trim().split('.').collect();
    if octets.len() != 4 || octets.iter().any(|o| o.parse::<u8>().is_err()) {
        return None;
    }
    Some(octets[..3].join("."))
}
