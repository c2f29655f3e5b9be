//! DXF text decoder (§4.2).
//!
//! DXF TEXT/MTEXT content can carry two families of escape sequences for
//! characters outside the drawing's native code page: MIF sequences
//! (`\M+chhhh`, ezdxf's `decode_mif_to_unicode`) and DXF Unicode escapes
//! (`\U+hhhh`). The two are not the same kind of value: a `\U+` escape's
//! four hex digits are already a Unicode code point, but a `\M+` escape's
//! five hex digits are a one-digit codepage indicator followed by a
//! big-endian GBK (cp936) double-byte value, which must be decoded through
//! that codepage rather than read as a code point directly. Decoding never
//! fails — a malformed or unrecognized escape is left intact rather than
//! raising, and any internal error falls back to returning the original
//! text untouched.

use encoding_rs::GBK;

/// Decode MIF (`\M+chhhh`) and DXF Unicode (`\U+hhhh`) escapes in `text`
/// into real Unicode characters. Unrecognized or truncated escapes are
/// passed through unchanged. Trailing NUL bytes are stripped and the result
/// is trimmed of leading/trailing whitespace.
///
/// Idempotent: `decode(decode(s)) == decode(s)` for any `s`, since a
/// successfully decoded character can never itself be re-matched as an
/// escape sequence.
pub fn decode_dxf_text(text: &str) -> String {
    match std::panic::catch_unwind(|| decode_inner(text)) {
        Ok(decoded) => decoded,
        Err(_) => text.to_string(),
    }
}

fn decode_inner(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(chars.len());
    let mut i = 0;

    while i < chars.len() {
        if chars[i] == '\\' && i + 2 < chars.len() && (chars[i + 1] == 'M' || chars[i + 1] == 'U') && chars[i + 2] == '+' {
            let kind = chars[i + 1];
            // `\U+hhhh` is exactly 4 hex digits; `\M+chhhh` is exactly 5 (a
            // codepage digit plus a 4-digit GBK double-byte value). Reading
            // past either fixed width would over-consume trailing hex text.
            let width = if kind == 'U' { 4 } else { 5 };
            let hex_start = i + 3;
            let hex_end = hex_start + width;

            if hex_end <= chars.len() && chars[hex_start..hex_end].iter().all(|c| c.is_ascii_hexdigit()) {
                let hex: String = chars[hex_start..hex_end].iter().collect();
                let decoded_char = if kind == 'U' {
                    u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32)
                } else {
                    decode_mif_gbk(&hex)
                };

                if let Some(decoded_char) = decoded_char {
                    out.push(decoded_char);
                    i = hex_end;
                    continue;
                }
            }

            // Not a valid escape after all (e.g. too few hex digits left,
            // or a byte pair the codepage doesn't map): leave it intact.
            out.push(chars[i]);
            i += 1;
            continue;
        }

        out.push(chars[i]);
        i += 1;
    }

    out.trim_end_matches('\0').trim().to_string()
}

/// Decode a MIF escape's 5 hex digits: the leading digit is a codepage
/// indicator (ezdxf threads this through to pick the active codepage; this
/// runtime only ever sees GBK-encoded drawings, so it's dropped), and the
/// remaining four digits form a big-endian GBK double-byte value.
fn decode_mif_gbk(hex: &str) -> Option<char> {
    let gbk_word = u16::from_str_radix(&hex[1..], 16).ok()?;
    let bytes = [(gbk_word >> 8) as u8, (gbk_word & 0xFF) as u8];
    let (decoded, _, had_errors) = GBK.decode(&bytes);
    if had_errors {
        return None;
    }
    decoded.chars().next()
}

/// Simplify MTEXT formatting codes into plain text before decoding escapes.
///
/// MTEXT content embeds inline formatting directives (`\P` paragraph break,
/// `\~` non-breaking space, grouping braces, and attribute codes like
/// `\fArial|b0|i0;`, `\Hheight;`, `\Ccolor;`, `\Wwidth;`, `\Qangle;`,
/// `\Ttracking;`) that have no bearing on the extracted text content. Each
/// is stripped or collapsed to its plain-text equivalent.
pub fn plain_mtext(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '\\' if i + 1 < chars.len() => {
                let next = chars[i + 1];
                match next {
                    'P' => {
                        out.push('\n');
                        i += 2;
                    }
                    '~' => {
                        out.push(' ');
                        i += 2;
                    }
                    '\\' | '{' | '}' => {
                        out.push(next);
                        i += 2;
                    }
                    // Attribute codes: letter followed by arbitrary content
                    // up to a terminating `;`. The content itself (font
                    // name, height, color, width, angle, tracking) carries
                    // no text and is dropped.
                    'f' | 'F' | 'H' | 'C' | 'W' | 'Q' | 'T' | 'A' | 'L' | 'O' | 'K' => {
                        let mut j = i + 2;
                        while j < chars.len() && chars[j] != ';' {
                            j += 1;
                        }
                        i = if j < chars.len() { j + 1 } else { j };
                    }
                    _ => {
                        // Unknown escape: keep the backslash and character
                        // as-is rather than silently dropping content.
                        out.push(chars[i]);
                        out.push(next);
                        i += 2;
                    }
                }
            }
            '{' | '}' => {
                // Formatting-group braces carry no text.
                i += 1;
            }
            other => {
                out.push(other);
                i += 1;
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_unicode_escape_to_char() {
        // \U+56FA is 固 (U+56FA).
        let decoded = decode_dxf_text("\\U+56FA");
        assert_eq!(decoded, "\u{56FA}");
    }

    #[test]
    fn decodes_mif_escape_through_gbk_codepage() {
        // The trailing 4 hex digits are a GBK double-byte value, not a
        // direct code point: GBK 0xB9CC decodes to 固 (spec §8 scenario 1),
        // not U+5B9CC (an unassigned code point beyond the Unicode range).
        let decoded = decode_dxf_text("\\M+5B9CC");
        assert_eq!(decoded, "固");

        let decoded = decode_dxf_text("\\M+5B6A8");
        assert_eq!(decoded, "定");
    }

    #[test]
    fn decodes_mif_sequence_from_spec_scenario() {
        // §8 scenario 1: a TEXT entity's MIF-encoded value must decode to
        // contain 固定挡烟垂壁.
        let decoded =
            decode_dxf_text("\\M+5B9CC\\M+5B6A8\\M+5B5B2\\M+5D1CC\\M+5B4B9\\M+5B1DA");
        assert!(decoded.contains('固') && decoded.contains('定'));
    }

    #[test]
    fn leaves_malformed_escape_intact() {
        let decoded = decode_dxf_text("\\M+ZZZZZ");
        assert_eq!(decoded, "\\M+ZZZZZ");
    }

    #[test]
    fn mif_escape_with_too_few_hex_digits_is_left_intact() {
        // Only 4 hex digits follow `\M+`, one short of the required 5; must
        // not over-consume into whatever character comes after.
        let decoded = decode_dxf_text("\\M+56FAx");
        assert_eq!(decoded, "\\M+56FAx");
    }

    #[test]
    fn unicode_escape_does_not_over_consume_trailing_hex_digits() {
        // \U+ is exactly 4 hex digits; a 5th hex digit belongs to whatever
        // follows, not the escape.
        let decoded = decode_dxf_text("\\U+56FAB");
        assert_eq!(decoded, "\u{56FA}B");
    }

    #[test]
    fn strips_trailing_nul_and_trims() {
        let decoded = decode_dxf_text("  hello\0\0");
        assert_eq!(decoded, "hello");
    }

    #[test]
    fn decode_is_idempotent() {
        let text = "prefix \\U+56FA suffix \\M+ZZZZZ";
        let once = decode_dxf_text(text);
        let twice = decode_dxf_text(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn plain_mtext_converts_paragraph_break_and_strips_attributes() {
        let raw = "\\fArial|b0|i0;Line one\\PLine two";
        let plain = plain_mtext(raw);
        assert_eq!(plain, "Line one\nLine two");
    }

    #[test]
    fn plain_mtext_unwraps_grouping_braces() {
        let raw = "{\\Hheight2;grouped text}";
        let plain = plain_mtext(raw);
        assert_eq!(plain, "grouped text");
    }
}
