//! Printable sanitisation for outbound command and stdout text.
//!
//! Every byte `< 32` is replaced by `?` before a name or payload is placed
//! on the wire or echoed to standard output. The internal, stored copy
//! (e.g. a peer's roster name) is never modified — sanitisation only
//! happens at the point of outbound formatting.

pub fn printable(s: &str) -> String {
    s.chars()
        .map(|c| if (c as u32) < 32 { '?' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_control_bytes() {
        assert_eq!(printable("alice\tbob\n"), "alice?bob?");
    }

    #[test]
    fn leaves_printable_text_untouched() {
        assert_eq!(printable("hi: there"), "hi: there");
    }
}
