//! A buffer callers may append to without limit; only the first `max_len`
//! bytes are stored.

/// Fixed-capacity byte buffer with a logical write cursor.
///
/// Appends past capacity are dropped from storage but still advance the
/// cursor, so truncation is detectable via [`StringBuffer::has_overflow`].
/// The buffer never fails and never validates its input; it only promises
/// that [`StringBuffer::valid_utf8_view`] will not split a multi-byte UTF-8
/// sequence, assuming the appended bytes were valid UTF-8 to begin with.
#[derive(Debug)]
pub struct StringBuffer {
    bytes: Vec<u8>,
    max_len: usize,
    pos: usize,
}

impl StringBuffer {
    pub fn new(max_len: usize) -> Self {
        Self {
            bytes: Vec::new(),
            max_len,
            pos: 0,
        }
    }

    pub fn append(&mut self, s: &[u8]) {
        if self.bytes.len() < self.max_len {
            let room = self.max_len - self.bytes.len();
            let n = s.len().min(room);
            self.bytes.extend_from_slice(&s[..n]);
        }
        self.pos += s.len();
    }

    pub fn append_byte(&mut self, c: u8) {
        if self.bytes.len() < self.max_len {
            self.bytes.push(c);
        }
        self.pos += 1;
    }

    /// Append `s` as a JSON-encoded string, quotes included.
    ///
    /// Escaping per RFC 7159: `\b \t \n \f \r \" \\`, and `\u00XX` for any
    /// other byte below 0x20.
    pub fn append_json_quoted(&mut self, s: &[u8]) {
        const HEX: &[u8; 16] = b"0123456789ABCDEF";

        self.append_byte(b'"');
        for &c in s {
            match c {
                b'"' => self.append(b"\\\""),
                b'\\' => self.append(b"\\\\"),
                0x08 => self.append(b"\\b"),
                b'\t' => self.append(b"\\t"),
                b'\n' => self.append(b"\\n"),
                0x0c => self.append(b"\\f"),
                b'\r' => self.append(b"\\r"),
                c if c < 0x20 => {
                    self.append(b"\\u00");
                    self.append_byte(HEX[(c >> 4) as usize]);
                    self.append_byte(HEX[(c & 0x0f) as usize]);
                }
                c => self.append_byte(c),
            }
        }
        self.append_byte(b'"');
    }

    pub fn reset(&mut self) {
        self.bytes.clear();
        self.pos = 0;
    }

    pub fn has_overflow(&self) -> bool {
        self.pos > self.max_len
    }

    /// The stored bytes, truncated so no multi-byte UTF-8 sequence is split.
    pub fn valid_utf8_view(&self) -> &str {
        let stored = if self.has_overflow() {
            &self.bytes[..greatest_valid_utf8_len(&self.bytes)]
        } else {
            &self.bytes[..]
        };
        match std::str::from_utf8(stored) {
            Ok(s) => s,
            // Input is UTF-8 by contract; tolerate violations by keeping the
            // longest valid prefix.
            Err(e) => std::str::from_utf8(&stored[..e.valid_up_to()]).unwrap_or_default(),
        }
    }

    /// The stored bytes with no UTF-8 adjustment.
    pub fn raw_view(&self) -> &[u8] {
        &self.bytes
    }
}

/// Longest prefix of `buf` that does not end mid-UTF-8-sequence.
///
/// Inspects at most the last three bytes: a dangling lead byte or the tail
/// of an incomplete 2/3/4-byte sequence is peeled off. Assumes `buf` is a
/// prefix of valid UTF-8.
fn greatest_valid_utf8_len(buf: &[u8]) -> usize {
    let len = buf.len();
    if len == 0 {
        return 0;
    }
    let last = buf[len - 1];

    if last & 0xc0 == 0xc0 {
        // Lead byte of a sequence whose continuation bytes were cut off.
        return len - 1;
    }
    if last & 0xc0 != 0x80 {
        // ASCII.
        return len;
    }

    // Continuation byte. Valid input guarantees a lead byte within reach.
    if len < 2 {
        return 0;
    }
    let second_last = buf[len - 2];
    if second_last & 0xe0 == 0xc0 {
        // Complete 2-byte sequence.
        return len;
    }
    if second_last & 0xe0 == 0xe0 {
        // Lead of a 3- or 4-byte sequence; we are mid-sequence.
        return len - 2;
    }

    if len < 3 {
        return 0;
    }
    let third_last = buf[len - 3];
    if third_last & 0xf8 == 0xf0 {
        // First three bytes of a 4-byte sequence.
        return len - 3;
    }
    // Final byte of a complete 3- or 4-byte sequence.
    len
}
