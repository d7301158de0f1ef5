use std::time::{SystemTime, UNIX_EPOCH};

const HEX: &[u8; 16] = b"0123456789abcdef";

#[inline]
pub(crate) fn unix_now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
}

/// Generate a message id of the form `msg_<unix millis><8 random hex>`.
///
/// The random suffix keeps ids distinct within one millisecond; uniqueness
/// is advisory only.
pub(crate) fn generated_message_id() -> String {
    let mut out = String::with_capacity(4 + 20 + 8);
    out.push_str("msg_");
    out.push_str(&unix_now_millis().to_string());
    push_u32_hex_8(&mut out, fastrand::u32(..));
    out
}

#[inline]
fn push_u32_hex_8(out: &mut String, value: u32) {
    for shift in (0..8).rev() {
        let nibble = ((value >> (shift * 4)) & 0x0f) as usize;
        out.push(char::from(HEX[nibble]));
    }
}
