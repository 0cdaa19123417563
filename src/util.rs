use rand::Rng;

use crate::inject::ErrorPolicy;

/// Internet checksum of `data`, replaced by a random value when `policy` fires.
pub fn internet_checksum<R: Rng + ?Sized>(data: &[u8], policy: ErrorPolicy, rng: &mut R) -> u16 {
    policy.apply(rng, get_checksum(data))
}

/// Ethernet frame check sequence (CRC-32) of `data`, replaced by a random
/// value when `policy` fires.
pub fn frame_check_sequence<R: Rng + ?Sized>(data: &[u8], policy: ErrorPolicy, rng: &mut R) -> u32 {
    policy.apply(rng, crc32fast::hash(data))
}

pub fn get_checksum(data: &[u8]) -> u16 {
    !fold(sum_be_words(data)) // The checksum field should be the ones complement of the sum
}

/// A block carrying a correct checksum sums to 0xFFFF.
pub fn verify_internet_checksum(data: &[u8]) -> bool {
    fold(sum_be_words(data)) == 0xFFFF
}

fn fold(mut sum: u64) -> u16 {
    while sum >> 16 != 0 {
        sum = (sum >> 16) + (sum & 0xFFFF);
    }
    sum as u16
}

/// Sum all words (16 bit chunks) in the given data, each treated as big endian.
/// A trailing odd byte is summed as if followed by a zero byte.
fn sum_be_words(data: &[u8]) -> u64 {
    data.chunks(2)
        .map(|word| match *word {
            [wh] => u16::from_be_bytes([wh, 0]),
            [wh, wl] => u16::from_be_bytes([wh, wl]),
            _ => unreachable!(),
        })
        .fold(0u64, |sum, w| sum + w as u64)
}
