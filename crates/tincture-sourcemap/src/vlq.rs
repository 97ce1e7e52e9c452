//! Base64 variable-length quantities.

const BASE64: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
const SHIFT: u32 = 5;
const MASK: i64 = (1 << SHIFT) - 1;
const CONTINUATION: i64 = 1 << SHIFT;

/// Append the VLQ encoding of `value` to `out`.
pub fn encode(value: i64, out: &mut String) {
    // The sign lives in the least significant bit.
    let mut vlq = if value < 0 {
        ((-value) << 1) | 1
    } else {
        value << 1
    };
    loop {
        let mut digit = vlq & MASK;
        vlq >>= SHIFT;
        if vlq > 0 {
            digit |= CONTINUATION;
        }
        out.push(BASE64[digit as usize] as char);
        if vlq == 0 {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vlq(value: i64) -> String {
        let mut out = String::new();
        encode(value, &mut out);
        out
    }

    #[test]
    fn test_small_values() {
        assert_eq!(vlq(0), "A");
        assert_eq!(vlq(1), "C");
        assert_eq!(vlq(-1), "D");
        assert_eq!(vlq(15), "e");
    }

    #[test]
    fn test_continuation() {
        assert_eq!(vlq(16), "gB");
        assert_eq!(vlq(-16), "hB");
        assert_eq!(vlq(1000), "w+B");
    }

    proptest::proptest! {
        #[test]
        fn only_the_last_digit_ends_the_quantity(value in -1_000_000i64..1_000_000) {
            let encoded = vlq(value);
            let digits: Vec<i64> = encoded
                .bytes()
                .map(|b| BASE64.iter().position(|&c| c == b).unwrap() as i64)
                .collect();
            let (last, rest) = digits.split_last().unwrap();
            proptest::prop_assert!(*last & CONTINUATION == 0);
            proptest::prop_assert!(rest.iter().all(|d| d & CONTINUATION != 0));
        }
    }
}
