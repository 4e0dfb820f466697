use crate::models::{DecodedDeposit, RawLog};

const CHUNK_BASE: u64 = 1_000_000_000;

/// Decode a deposit log into its notification fields.
///
/// Never fails: whatever the payload holds is read as the amount.
pub fn decode(log: &RawLog) -> DecodedDeposit {
    DecodedDeposit {
        block_number: log.block_number,
        transaction_hash: log.transaction_hash.clone(),
        log_index: log.log_index,
        amount: decode_amount(&log.data),
    }
}

/// Read `data` as one unsigned big-endian integer of any width and render it
/// in decimal. An empty payload is zero.
pub fn decode_amount(data: &[u8]) -> String {
    let first_non_zero = data.iter().position(|byte| *byte != 0).unwrap_or(data.len());
    let mut dividend: Vec<u8> = data[first_non_zero..].to_vec();
    if dividend.is_empty() {
        return "0".to_string();
    }

    // Repeated long division by 10^9, least significant chunk first
    let mut chunks: Vec<u64> = Vec::new();
    while !dividend.is_empty() {
        let mut quotient = Vec::with_capacity(dividend.len());
        let mut remainder = 0u64;
        for byte in &dividend {
            let accumulator = (remainder << 8) | u64::from(*byte);
            let digit = accumulator / CHUNK_BASE;
            remainder = accumulator % CHUNK_BASE;
            if digit != 0 || !quotient.is_empty() {
                quotient.push(digit as u8);
            }
        }
        chunks.push(remainder);
        dividend = quotient;
    }

    let mut decimal = String::with_capacity(chunks.len() * 9);
    let mut chunks = chunks.into_iter().rev();
    if let Some(most_significant) = chunks.next() {
        decimal.push_str(&most_significant.to_string());
    }
    for chunk in chunks {
        decimal.push_str(&format!("{:09}", chunk));
    }
    decimal
}
