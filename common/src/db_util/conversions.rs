//! Safe-ish conversions between rust and sql types.

use super::*;

pub fn i32_to_u32(i: i32) -> Result<u32> {
    u32::try_from(i).map_err(|_| {
        RankerError::Store(format!("i32 value {i} is negative and cannot be converted to u32"))
    })
}

pub fn u32_to_i32(i: u32) -> Result<i32> {
    i32::try_from(i).map_err(|_| {
        RankerError::Store(format!("u32 value {i} exceeds i32::MAX and cannot be converted to i32"))
    })
}

pub fn u32s_to_i32s(ids: &[u32]) -> Result<Vec<i32>> {
    ids.iter().map(|&i| u32_to_i32(i)).collect()
}
