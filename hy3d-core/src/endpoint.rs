// Request target construction, including the CORS-relay form where the true
// target travels percent-encoded inside the relay URL.

pub const SUBMIT_ENDPOINT: &str = "/submit";
pub const QUERY_ENDPOINT: &str = "/query";

/// `{base without trailing slashes}{endpoint}`, or the relay form
/// `{proxy}{'?' unless proxy already has one}{encoded target}`.
pub fn build_endpoint_url(base_url: &str, endpoint: &str, use_proxy: bool, proxy_url: &str) -> String {
    let target = format!("{}{}", base_url.trim_end_matches('/'), endpoint);
    if !use_proxy {
        return target;
    }

    let separator = if proxy_url.contains('?') { "" } else { "?" };
    format!("{proxy_url}{separator}{}", encode_uri_component(&target))
}

/// Percent-encodes everything except `A-Z a-z 0-9 - _ . ! ~ * ' ( )`,
/// byte-wise over UTF-8.
pub fn encode_uri_component(input: &str) -> String {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";

    let mut out = String::with_capacity(input.len() * 3);
    for &b in input.as_bytes() {
        let keep = b.is_ascii_alphanumeric()
            || matches!(b, b'-' | b'_' | b'.' | b'!' | b'~' | b'*' | b'\'' | b'(' | b')');
        if keep {
            out.push(b as char);
        } else {
            out.push('%');
            out.push(HEX[(b >> 4) as usize] as char);
            out.push(HEX[(b & 0x0f) as usize] as char);
        }
    }
    out
}
