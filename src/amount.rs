//! 수량 정규화 유틸리티
//!
//! 임의의 숫자 텍스트(정수, 소수, 과학적 표기, 부호)를 정확한 정수 연산에
//! 쓸 수 있는 정규 정수 문자열로 변환한다. 순수 함수이며 입력이 같으면
//! 결과도 같다.

use crate::types::QuoteError;

/// f64에서 유한하게 표현 가능한 최대 십진 지수. 이 범위를 넘는 지수는
/// 비유한(Infinity) 입력으로 간주한다.
const MAX_FINITE_EXPONENT: i64 = 308;

/// Normalize arbitrary numeric text into a canonical integer string.
///
/// - Plain decimals concatenate the digits around the removed point as-is
///   (inputs are assumed pre-scaled to smallest units).
/// - Scientific notation shifts the mantissa digits by
///   `exponent - fractional_digit_count`: trailing-zero padding when the
///   shift is non-negative, right truncation (never rounding) otherwise.
/// - Leading zeros are stripped (a single `"0"` survives) and a `-` prefix
///   is kept only for non-zero negatives.
/// - Errors only on a non-finite exponent; any other malformed input
///   degrades to `"0"` (fail-open).
pub fn normalize(text: &str) -> Result<String, QuoteError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok("0".to_string());
    }

    let (negative, body) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };

    let (mantissa, exponent) = match body.find(['e', 'E']) {
        Some(idx) => {
            let exp = parse_exponent(&body[idx + 1..], text)?;
            (&body[..idx], exp)
        }
        None => (body, 0i64),
    };

    let (int_part, frac_part) = match mantissa.find('.') {
        Some(idx) => (&mantissa[..idx], &mantissa[idx + 1..]),
        None => (mantissa, ""),
    };

    // 가수에 숫자가 아닌 문자가 섞여 있으면 "0"으로 격하
    if !int_part.bytes().all(|b| b.is_ascii_digit())
        || !frac_part.bytes().all(|b| b.is_ascii_digit())
    {
        return Ok("0".to_string());
    }

    let mut digits = String::with_capacity(int_part.len() + frac_part.len());
    digits.push_str(int_part);
    digits.push_str(frac_part);
    if digits.is_empty() {
        return Ok("0".to_string());
    }

    let shift = exponent - frac_part.len() as i64;
    if shift >= 0 {
        digits.reserve(shift as usize);
        for _ in 0..shift {
            digits.push('0');
        }
    } else {
        let cut = (-shift) as usize;
        if cut >= digits.len() {
            // 모든 자릿수가 잘려나가면 0으로 바닥 처리 (반올림 없음)
            return Ok("0".to_string());
        }
        digits.truncate(digits.len() - cut);
    }

    let stripped = digits.trim_start_matches('0');
    let canonical = if stripped.is_empty() { "0" } else { stripped };

    if negative && canonical != "0" {
        Ok(format!("-{canonical}"))
    } else {
        Ok(canonical.to_string())
    }
}

/// Canonical non-negative integer string check: digits only, no leading
/// zeros except a bare "0".
pub fn is_canonical_nonneg_int(text: &str) -> bool {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    text == "0" || !text.starts_with('0')
}

fn parse_exponent(raw: &str, original: &str) -> Result<i64, QuoteError> {
    let unsigned = raw
        .strip_prefix('-')
        .or_else(|| raw.strip_prefix('+'))
        .unwrap_or(raw);
    let all_digits = !unsigned.is_empty() && unsigned.bytes().all(|b| b.is_ascii_digit());

    match raw.parse::<i64>() {
        Ok(exp) if exp > MAX_FINITE_EXPONENT => Err(QuoteError::InvalidAmount {
            reason: format!("non-finite exponent in {original:?}"),
        }),
        Ok(exp) => Ok(exp),
        // 자릿수로만 이루어졌는데 파싱이 실패했다면 i64 오버플로우, 즉 비유한 지수
        Err(_) if all_digits => Err(QuoteError::InvalidAmount {
            reason: format!("non-finite exponent in {original:?}"),
        }),
        // 그 외의 깨진 지수는 일반적인 불량 입력과 동일하게 0으로 격하
        Err(_) => Ok(i64::MIN / 2),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_strips_leading_zeros() {
        for (input, expected) in [
            ("0", "0"),
            ("000", "0"),
            ("7", "7"),
            ("007", "7"),
            ("000123000", "123000"),
            ("1000000", "1000000"),
        ] {
            assert_eq!(normalize(input).unwrap(), expected, "input {input:?}");
        }
    }

    #[test]
    fn test_scientific_notation() {
        assert_eq!(normalize("1.23e5").unwrap(), "123000");
        assert_eq!(normalize("1e18").unwrap(), "1000000000000000000");
        assert_eq!(normalize("2.5E3").unwrap(), "2500");
        assert_eq!(normalize("9e0").unwrap(), "9");
    }

    #[test]
    fn test_negative_exponent_truncates_never_rounds() {
        assert_eq!(normalize("123e-2").unwrap(), "1");
        assert_eq!(normalize("199e-2").unwrap(), "1");
        assert_eq!(normalize("123e-3").unwrap(), "0");
        assert_eq!(normalize("123e-9").unwrap(), "0");
    }

    #[test]
    fn test_plain_decimal_concatenates_digits() {
        // 소수점 이하를 스케일 변환하지 않고 그대로 이어붙인다
        assert_eq!(normalize("1.5").unwrap(), "15");
        assert_eq!(normalize("1.0").unwrap(), "10");
        assert_eq!(normalize("0.25").unwrap(), "25");
    }

    #[test]
    fn test_signs() {
        assert_eq!(normalize("-42").unwrap(), "-42");
        assert_eq!(normalize("+42").unwrap(), "42");
        assert_eq!(normalize("-0").unwrap(), "0");
        assert_eq!(normalize("-0.0e5").unwrap(), "0");
        assert_eq!(normalize("-1.2e1").unwrap(), "-12");
    }

    #[test]
    fn test_malformed_input_degrades_to_zero() {
        for input in ["", "   ", "abc", "12a4", "1.2.3", "--5", ".", "1e5x"] {
            assert_eq!(normalize(input).unwrap(), "0", "input {input:?}");
        }
    }

    #[test]
    fn test_non_finite_exponent_errors() {
        assert!(matches!(
            normalize("1e309"),
            Err(QuoteError::InvalidAmount { .. })
        ));
        assert!(matches!(
            normalize("1e99999999999999999999"),
            Err(QuoteError::InvalidAmount { .. })
        ));
        // 음의 대형 지수는 0으로 언더플로우하므로 유한하게 처리된다
        assert_eq!(normalize("1e-99999").unwrap(), "0");
    }

    #[test]
    fn test_idempotence() {
        for input in ["0", "1", "123000", "999999999999999999999999"] {
            let once = normalize(input).unwrap();
            assert_eq!(normalize(&once).unwrap(), once);
        }
    }

    #[test]
    fn test_is_canonical_nonneg_int() {
        assert!(is_canonical_nonneg_int("0"));
        assert!(is_canonical_nonneg_int("10"));
        assert!(!is_canonical_nonneg_int("007"));
        assert!(!is_canonical_nonneg_int(""));
        assert!(!is_canonical_nonneg_int("-1"));
        assert!(!is_canonical_nonneg_int("1.5"));
    }
}
