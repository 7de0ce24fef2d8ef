//! `--keys` argument decoding.

/// Expand `\r`, `\n`, `\t`, `\e`, `\\` and `\xNN` into raw bytes.
///
/// Unknown escapes and a trailing backslash are kept literally.
pub fn unescape(raw: &str) -> Vec<u8> {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b != b'\\' || i + 1 == bytes.len() {
            out.push(b);
            i += 1;
            continue;
        }
        // (value, bytes consumed including the backslash)
        let escaped = match bytes[i + 1] {
            b'r' => Some((b'\r', 2)),
            b'n' => Some((b'\n', 2)),
            b't' => Some((b'\t', 2)),
            b'e' => Some((0x1B, 2)),
            b'\\' => Some((b'\\', 2)),
            b'x' => bytes
                .get(i + 2..i + 4)
                .and_then(|hex| std::str::from_utf8(hex).ok())
                .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                .map(|v| (v, 4)),
            _ => None,
        };
        match escaped {
            Some((v, consumed)) => {
                out.push(v);
                i += consumed;
            }
            None => {
                out.push(b'\\');
                i += 1;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn named_escapes() {
        assert_eq!(unescape(r"ls\r"), b"ls\r");
        assert_eq!(unescape(r"a\tb\n"), b"a\tb\n");
        assert_eq!(unescape(r"\e[A"), b"\x1b[A");
        assert_eq!(unescape(r"c:\\x"), b"c:\\x");
    }

    #[test]
    fn hex_escapes() {
        assert_eq!(unescape(r"\x12\x04"), b"\x12\x04");
        assert_eq!(unescape(r"\x7f"), b"\x7f");
    }

    #[test]
    fn malformed_escapes_stay_literal() {
        assert_eq!(unescape(r"\q"), b"\\q");
        assert_eq!(unescape(r"\xZZ"), b"\\xZZ");
        assert_eq!(unescape(r"\x4"), b"\\x4");
        assert_eq!(unescape("end\\"), b"end\\");
    }

    #[test]
    fn utf8_passes_through() {
        assert_eq!(unescape("héllo"), "héllo".as_bytes());
    }
}
