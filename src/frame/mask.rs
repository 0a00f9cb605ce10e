//!  Mask flag and key.

/// Payload mask with a 32-bit key.
///
/// Clients mask every frame they send, servers never do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mask {
    Key([u8; 4]),
    None,
}

impl Mask {
    /// Read the flag which indicates whether mask is used.
    /// The key itself follows the length bytes.
    #[inline]
    pub const fn is_set(b: u8) -> bool { b & 0x80 == 0x80 }

    /// Get the flag byte.
    #[inline]
    pub const fn to_flag(&self) -> u8 {
        match self {
            Mask::Key(_) => 0x80,
            Mask::None => 0x00,
        }
    }
}

/// Generate a new random key.
#[inline]
pub fn new_rand_key() -> [u8; 4] { rand::random::<[u8; 4]>() }

/// Mask the buffer, byte by byte.
#[inline]
pub fn apply_mask(key: [u8; 4], buf: &mut [u8]) {
    for (i, b) in buf.iter_mut().enumerate() {
        *b ^= key[i & 0x03];
    }
}

/// Mask the buffer, 4 bytes at a time.
///
/// Blocks start at payload offset 0, so the key phase of the trailing
/// partial block is the same as in [`apply_mask`].
#[inline]
pub fn apply_mask4(key: [u8; 4], buf: &mut [u8]) {
    let key4 = u32::from_ne_bytes(key);

    let mut blocks = buf.chunks_exact_mut(4);
    for b4 in blocks.by_ref() {
        let v = u32::from_ne_bytes([b4[0], b4[1], b4[2], b4[3]]) ^ key4;
        b4.copy_from_slice(&v.to_ne_bytes());
    }

    apply_mask(key, blocks.into_remainder());
}
