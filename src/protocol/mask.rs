//! Payload masking.

/// XOR `data` with the repeating 4-byte mask, in place.
///
/// Works on 8-byte lanes with a byte tail; the lane width is a multiple
/// of the mask length, so the tail continues at mask offset zero.
pub(crate) fn apply_mask(data: &mut [u8], mask: [u8; 4]) {
    let key = u64::from_ne_bytes([
        mask[0], mask[1], mask[2], mask[3], mask[0], mask[1], mask[2], mask[3],
    ]);

    let mut chunks = data.chunks_exact_mut(8);
    for chunk in chunks.by_ref() {
        let mut lane = [0u8; 8];
        lane.copy_from_slice(chunk);
        let mixed = u64::from_ne_bytes(lane) ^ key;
        chunk.copy_from_slice(&mixed.to_ne_bytes());
    }
    for (i, byte) in chunks.into_remainder().iter_mut().enumerate() {
        *byte ^= mask[i & 3];
    }
}
