use senselearn_core::{AppError, AppResult};

/// Bytes at or above this value are discarded so every digit is equally likely.
const UNBIASED_BYTE_LIMIT: u8 = 250;

/// Generates a random numeric code of `length` digits.
pub(super) fn generate_numeric_code(length: usize) -> AppResult<String> {
    let mut code = String::with_capacity(length);
    let mut buffer = [0u8; 32];

    while code.len() < length {
        getrandom::fill(&mut buffer).map_err(|error| {
            AppError::Internal(format!("failed to generate one-time code: {error}"))
        })?;

        for byte in buffer {
            if code.len() == length {
                break;
            }
            if byte < UNBIASED_BYTE_LIMIT {
                code.push(char::from(b'0' + byte % 10));
            }
        }
    }

    Ok(code)
}

/// Computes the SHA-256 hash of a code for storage.
pub(super) fn hash_code(code: &str) -> String {
    use sha2::{Digest, Sha256};
    use std::fmt::Write;

    let mut hasher = Sha256::new();
    hasher.update(code.as_bytes());
    let result = hasher.finalize();

    result
        .iter()
        .fold(String::with_capacity(64), |mut acc, byte| {
            let _ = write!(acc, "{byte:02x}");
            acc
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_has_requested_number_of_digits() -> AppResult<()> {
        for length in [4, 6, 40] {
            let code = generate_numeric_code(length)?;
            assert_eq!(code.len(), length);
            assert!(code.chars().all(|character| character.is_ascii_digit()));
        }
        Ok(())
    }

    #[test]
    fn hash_is_hex_sha256() {
        assert_eq!(
            hash_code("123456"),
            "8d969eef6ecad3c29a3a629280e686cf0c3f5d5a86aff3ca12020c923adc6c92"
        );
    }
}
