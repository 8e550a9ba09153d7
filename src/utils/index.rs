/// Reverse the byte order of a hex encoded hash.
///
/// Hashes travel little-endian on the wire while the wallet stores ids in display order,
/// so every comparison goes through this conversion.
pub fn reverse_hex(hash_hex: &str) -> Result<String, hex::FromHexError> {
	let bytes = hex::decode(hash_hex)?;
	Ok(reverse_hex_bytes(&bytes))
}

/// Hex encode `bytes` after reversing them.
pub fn reverse_hex_bytes(bytes: &[u8]) -> String {
	let mut reversed = bytes.to_vec();
	reversed.reverse();
	hex::encode(reversed)
}
