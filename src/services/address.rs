const BASE58_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// `0x` followed by exactly 40 hex characters.
pub fn is_evm_address(s: &str) -> bool {
    let Some(hex_part) = s.strip_prefix("0x") else {
        return false;
    };
    hex_part.len() == 40 && hex_part.chars().all(|c| c.is_ascii_hexdigit())
}

/// Tron base58check address: 34 characters starting with `T`.
pub fn is_tron_address(s: &str) -> bool {
    s.len() == 34 && s.starts_with('T') && s.chars().all(|c| BASE58_ALPHABET.contains(c))
}

pub fn is_contract_address(s: &str) -> bool {
    is_evm_address(s) || is_tron_address(s)
}

/// `0xbb4cdb9c...` style preview used in replies.
pub fn short(address: &str) -> String {
    if address.chars().count() <= 10 {
        return address.to_string();
    }
    let head: String = address.chars().take(10).collect();
    format!("{head}...")
}

/// EVM addresses are case-insensitive and stored lowercase; Tron is case-sensitive.
pub fn normalize(address: &str) -> String {
    if is_evm_address(address) {
        address.to_lowercase()
    } else {
        address.to_string()
    }
}
