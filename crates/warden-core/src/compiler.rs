//! Config compiler: structured settings to engine configuration text
//!
//! Pure string assembly with no I/O and no state. The output document is
//! parsed by the tunnel engine; section order, key names, value syntax and
//! the comment scaffolding are part of the wire contract and must be
//! reproduced exactly.

use crate::types::ConfigInput;

/// Routes set on the virtual interface when the tunnel is up
const DEFAULT_INCLUDED_ROUTES: &[&str] = &["0.0.0.0/0", "2000::/3"];

/// Private and link-local ranges never routed through the interface
const DEFAULT_EXCLUDED_ROUTES: &[&str] = &[
    "10.0.0.0/8",
    "100.64.0.0/10",
    "169.254.0.0/16",
    "172.16.0.0/12",
    "192.0.0.0/24",
    "192.168.0.0/16",
    "255.255.255.255/32",
];

const DEFAULT_TUN_MTU: u32 = 1500;
const DEFAULT_PORT: u16 = 443;

const WILDCARD_PREFIX: &str = "*.";

/// Compile a structured config into the engine's text format.
///
/// Deterministic and total for well-formed input: identical `ConfigInput`
/// always yields byte-identical output.
pub fn compile(input: &ConfigInput) -> String {
    let server = &input.server;
    let routing = &input.routing;

    let exclusions = quote_list(&expand_exclusions(&routing.rules));
    let dns_upstreams = quote_list(&server.dns_servers);

    let addresses = quote_list(&[format_address(&server.ip_address, DEFAULT_PORT)]);

    let tun_excluded_routes: Vec<String> = if input.excluded_routes.is_empty() {
        DEFAULT_EXCLUDED_ROUTES.iter().map(|s| s.to_string()).collect()
    } else {
        input.excluded_routes.clone()
    };
    let tun_included_routes: Vec<String> =
        DEFAULT_INCLUDED_ROUTES.iter().map(|s| s.to_string()).collect();

    render_template(&TemplateInput {
        log_level: quote_string("debug"),
        vpn_mode: quote_string(routing.mode.engine_token()),
        killswitch_enabled: true,
        post_quantum_group_enabled: false,
        exclusions,
        dns_upstreams,
        host_name: quote_string(&server.domain),
        addresses,
        has_ipv6: false,
        username: quote_string(&server.login),
        password: quote_string(&server.password),
        client_random: quote_string(""),
        skip_verification: false,
        certificate: quote_certificate(""),
        upstream_protocol: quote_string(server.protocol.engine_token()),
        upstream_fallback_protocol: quote_string(""),
        anti_dpi: false,
        tun_included_routes: quote_list(&tun_included_routes),
        tun_excluded_routes: quote_list(&tun_excluded_routes),
        tun_mtu_size: DEFAULT_TUN_MTU,
        socks_address: quote_string("127.0.0.1:1080"),
        socks_username: quote_string(""),
        socks_password: quote_string(""),
    })
}

/// Heuristic classification of a routing rule.
///
/// A rule is domain-like iff it does not start with `[`, contains no `/` or
/// `:`, and contains at least one `.` with no whitespace. This is a
/// documented approximation, not a canonical grammar: exotic inputs (a bare
/// hostname carrying a colon-free IPv6-looking token, say) can misclassify,
/// and the behavior is kept as-is for engine compatibility.
fn is_domain_like(value: &str) -> bool {
    if value.starts_with('[') {
        return false;
    }
    if value.contains('/') || value.contains(':') {
        return false;
    }
    value.contains('.') && !value.contains(' ')
}

/// Expand routing rules into the engine exclusion list.
///
/// Domain-like rules emit the literal domain plus a `*.`-prefixed wildcard
/// variant (unless already wildcarded) so subdomains are covered.
/// Address-like rules pass through unchanged. Duplicates collapse; the
/// result is all addresses followed by all domains, preserving first-seen
/// order within each group.
fn expand_exclusions(rules: &[String]) -> Vec<String> {
    let mut domains: Vec<String> = Vec::new();
    let mut addresses: Vec<String> = Vec::new();

    let mut push_unique = |set: &mut Vec<String>, value: String| {
        if !set.contains(&value) {
            set.push(value);
        }
    };

    for rule in rules {
        let normalized = rule.trim();
        if normalized.is_empty() {
            continue;
        }

        if is_domain_like(normalized) {
            push_unique(&mut domains, normalized.to_string());
            if !normalized.starts_with(WILDCARD_PREFIX) {
                push_unique(&mut domains, format!("{WILDCARD_PREFIX}{normalized}"));
            }
        } else {
            push_unique(&mut addresses, normalized.to_string());
        }
    }

    addresses.extend(domains);
    addresses
}

/// Normalize an endpoint address for the `addresses` list.
///
/// IPv6 literals are detected by containing more than one colon and are
/// bracket-wrapped before port suffixing if not already bracketed. An
/// address lacking an explicit port receives `fallback_port`.
fn format_address(address: &str, fallback_port: u16) -> String {
    let is_ipv6 = address.matches(':').count() > 1;
    let port_divider = if is_ipv6 { "]:" } else { ":" };

    if address.contains(port_divider) {
        return address.to_string();
    }

    let with_brackets = if is_ipv6 && !address.starts_with('[') {
        format!("[{address}]")
    } else {
        address.to_string()
    };
    format!("{with_brackets}:{fallback_port}")
}

/// Render a string value as a quoted config literal. Empty renders as `""`.
fn quote_string(value: &str) -> String {
    if value.is_empty() {
        "\"\"".to_string()
    } else {
        format!("\"{value}\"")
    }
}

/// Render a list of strings as `[v1, v2, ...]` with each element quoted
/// per the string rule.
fn quote_list<S: AsRef<str>>(values: &[S]) -> String {
    let quoted: Vec<String> = values.iter().map(|v| quote_string(v.as_ref())).collect();
    format!("[{}]", quoted.join(", "))
}

/// A non-empty PEM certificate is embedded between its own newline-framed
/// quotes before the outer quoting.
fn quote_certificate(certificate: &str) -> String {
    if certificate.is_empty() {
        quote_string(certificate)
    } else {
        quote_string(&format!("\"\n{certificate}\n\""))
    }
}

struct TemplateInput {
    log_level: String,
    vpn_mode: String,
    killswitch_enabled: bool,
    post_quantum_group_enabled: bool,
    exclusions: String,
    dns_upstreams: String,
    host_name: String,
    addresses: String,
    has_ipv6: bool,
    username: String,
    password: String,
    client_random: String,
    skip_verification: bool,
    certificate: String,
    upstream_protocol: String,
    upstream_fallback_protocol: String,
    anti_dpi: bool,
    tun_included_routes: String,
    tun_excluded_routes: String,
    tun_mtu_size: u32,
    socks_address: String,
    socks_username: String,
    socks_password: String,
}

// The engine parses this document including its section ordering; the
// comment scaffolding matches the upstream client library README.
fn render_template(input: &TemplateInput) -> String {
    format!(
        r#"# Logging level [info, debug, trace]
loglevel = {log_level}

# VPN mode.
# Defines client connections routing policy:
# * general: route through a VPN endpoint all connections except ones which destinations are in exclusions,
# * selective: route through a VPN endpoint only the connections which destinations are in exclusions.
vpn_mode = {vpn_mode}

# When disabled, all connection requests are routed directly to target hosts
# in case connection to VPN endpoint is lost. This helps not to break an
# Internet connection if user has poor connectivity to an endpoint.
# When enabled, incoming connection requests which should be routed through
# an endpoint will not be routed directly in that case.
killswitch_enabled = {killswitch_enabled}

# When enabled, a post-quantum group may be used for key exchange
# in TLS handshakes initiated by the VPN client.
post_quantum_group_enabled = {post_quantum_group_enabled}

# Domains and addresses which should be routed in a special manner.
# Supported syntax:
#   * domain name
#     * if starts with "*.", any subdomain of the domain will be matched including
#       www-subdomain, but not the domain itself (e.g., `*.example.com`  will match
#       `sub.example.com` , `sub.sub.example.com` , `www.example.com` , but not `example.com` )
#     * if starts with "www." or it's just a domain name, the domain itself and its
#       www-subdomain will be matched (e.g. `example.com`  and `www.example.com`  will
#       match `example.com`  `www.example.com` , but not `sub.example.com` )
#   * ip address
#     * recognized formats are:
#       * [IPv6Address]:port
#       * [IPv6Address]
#       * IPv6Address
#       * IPv4Address:port
#       * IPv4Address
#     * if port is not specified, any port will be matched
#   * CIDR range
#     * recognized formats are:
#       * IPv4Address/mask
#       * IPv6Address/mask
exclusions = {exclusions}

# DNS upstreams.
# If specified, the library intercepts and routes plain DNS queries
# going through the endpoint to the DNS resolvers.
# One of the following kinds:
#   * 8.8.8.8:53 -- plain DNS
#   * tcp://8.8.8.8:53 -- plain DNS over TCP
#   * tls://1.1.1.1 -- DNS-over-TLS
#   * https://dns.adguard.com/dns-query -- DNS-over-HTTPS
#   * sdns://... -- DNS stamp (see https://dnscrypt.info/stamps-specifications)
#   * quic://dns.adguard.com:8853 -- DNS-over-QUIC
dns_upstreams = {dns_upstreams}

# The set of endpoint connection settings
[endpoint]
# Endpoint host name, used for TLS session establishment
hostname = {host_name}
# Endpoint addresses.
# The exact address is selected by the pinger. Absence of IPv6 addresses in
# the list makes the VPN client reject IPv6 connections which must be routed
# through the endpoint with unreachable code.
addresses = {addresses}
# Whether IPv6 traffic can be routed through the endpoint
has_ipv6 = {has_ipv6}
# Username for authorization
username = {username}
# Password for authorization
password = {password}
# TLS client random prefix (hex string)
client_random = {client_random}
# Skip the endpoint certificate verification?
# That is, any certificate is accepted with this one set to true.
skip_verification = {skip_verification}
# Endpoint certificate in PEM format.
# If not specified, the endpoint certificate is verified using the system storage.
certificate = {certificate}
# Protocol to be used to communicate with the endpoint [http2, http3]
upstream_protocol = {upstream_protocol}
# Fallback protocol to be used in case the main one fails [<none>, http2, http3]
upstream_fallback_protocol = {upstream_fallback_protocol}
# Is anti-DPI measures should be enabled
anti_dpi = {anti_dpi}


# Defines the way to listen to network traffic by the kind of the nested table.
# Possible types:
#   * socks: SOCKS proxy with UDP support,
#   * tun: TUN device.
[listener]

[listener.tun]
# Name of the interface used for connections made by the VPN client.
# On Linux and Windows, it is detected automatically if not specified.
# On macOS, it defaults to `en0`  if not specified.
# On Windows, an interface index as shown by `route print` , written as a string, may be used instead of a name.
# bound_if = "en0"
# Routes in CIDR notation to set to the virtual interface
included_routes = {tun_included_routes}
# Routes in CIDR notation to exclude from routing through the virtual interface
excluded_routes = {tun_excluded_routes}
# MTU size on the interface
mtu_size = {tun_mtu_size}

# [listener.socks]
# # IP address to bind the listener to
# address = {socks_address}
# # Username for authentication if desired
# username = {socks_username}
# # Password for authentication if desired
# password = {socks_password}
"#,
        log_level = input.log_level,
        vpn_mode = input.vpn_mode,
        killswitch_enabled = input.killswitch_enabled,
        post_quantum_group_enabled = input.post_quantum_group_enabled,
        exclusions = input.exclusions,
        dns_upstreams = input.dns_upstreams,
        host_name = input.host_name,
        addresses = input.addresses,
        has_ipv6 = input.has_ipv6,
        username = input.username,
        password = input.password,
        client_random = input.client_random,
        skip_verification = input.skip_verification,
        certificate = input.certificate,
        upstream_protocol = input.upstream_protocol,
        upstream_fallback_protocol = input.upstream_fallback_protocol,
        anti_dpi = input.anti_dpi,
        tun_included_routes = input.tun_included_routes,
        tun_excluded_routes = input.tun_excluded_routes,
        tun_mtu_size = input.tun_mtu_size,
        socks_address = input.socks_address,
        socks_username = input.socks_username,
        socks_password = input.socks_password,
    )
}
