//! Consistent Overhead Byte Stuffing.
//!
//! Classic Cheney/Williams COBS: the encoded stream contains no `0x00`
//! byte; callers append the single `0x00` package terminator themselves
//! (the framer is stateless; sequencing lives in [`crate::channel`]).

use comlink_types::ComError;

/// Encode `payload` as a COBS block, with no embedded `0x00` byte and no
/// terminator appended (the caller appends `0x00`).
///
/// **Empty payload**: `encode(&[])` returns an empty `Vec` rather than
/// standard COBS's `{0x01}` overhead byte, so the wire frame for an
/// empty payload is the bare terminator `{0x00}`. Both choices satisfy
/// the "no embedded zero" invariant; this crate picks the cheaper one.
#[must_use]
pub fn encode(payload: &[u8]) -> Vec<u8> {
    if payload.is_empty() {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(payload.len() + payload.len() / 254 + 2);
    out.push(0); // placeholder for the first chunk's length code
    let mut code_index = 0usize;
    let mut code = 1u8;

    for &byte in payload {
        if byte == 0 {
            out[code_index] = code;
            code_index = out.len();
            out.push(0); // placeholder
            code = 1;
            continue;
        }
        out.push(byte);
        code += 1;
        if code == 0xFF {
            out[code_index] = code;
            code_index = out.len();
            out.push(0);
            code = 1;
        }
    }
    out[code_index] = code;
    out
}

/// Decode a COBS block back to its original payload (terminator already
/// stripped by the caller). Fails with `FramingError` if the block is not
/// valid COBS structure.
pub fn decode(block: &[u8]) -> Result<Vec<u8>, ComError> {
    if block.is_empty() {
        // Bare-terminator empty frame (see `encode`'s doc comment).
        return Ok(Vec::new());
    }
    let mut out = Vec::with_capacity(block.len());
    let mut i = 0usize;
    while i < block.len() {
        let code = block[i] as usize;
        if code == 0 {
            return Err(ComError::FramingError("zero length code inside COBS block".into()));
        }
        i += 1;
        let run_end = i + (code - 1);
        if run_end > block.len() {
            return Err(ComError::FramingError("COBS length code overruns block".into()));
        }
        out.extend_from_slice(&block[i..run_end]);
        i = run_end;
        if code < 0xFF && i < block.len() {
            out.push(0);
        }
    }
    Ok(out)
}
