//! Stateless hashing for per-cell variation and per-roll RNG seeds.

/// splitmix64 finaliser
#[inline]
pub fn mix64(mut x: u64) -> u64 {
    x = (x ^ (x >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94d049bb133111eb);
    x ^ (x >> 31)
}

/// Hash of a grid position salted with `salt`
#[inline]
pub fn cell_hash(x: i32, z: i32, salt: u64) -> u64 {
    let packed = (u64::from(x as u32) << 32) | u64::from(z as u32);
    mix64(packed ^ mix64(salt))
}

/// Map a hash to `[0, 1)` using its top 24 bits
#[inline]
pub fn unit_f32(hash: u64) -> f32 {
    (hash >> 40) as f32 / (1u64 << 24) as f32
}

/// Map a hash to `[-1, 1)`
#[inline]
pub fn signed_unit_f32(hash: u64) -> f32 {
    unit_f32(hash) * 2.0 - 1.0
}
