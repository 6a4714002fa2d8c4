//! Deterministic benchmark payloads.

use bytes::Bytes;

/// Number of `meow`s in each line of the payload.
const MEOWS_PER_LINE: usize = 249;

/// Length of a single payload line, including its trailing newline.
pub const LINE_LEN: usize = MEOWS_PER_LINE * 4 + 4;

/// A deterministic block of text used for write and read benchmarks.
///
/// The payload consists of `multiplier` identical lines of [`LINE_LEN`] bytes, each made of
/// `meow`s and terminated by `mew\n`. The same multiplier always produces the same bytes, which
/// allows exact comparisons after a round trip through storage.
#[derive(Clone, Debug)]
pub struct Payload {
    data: Bytes,
}

impl Payload {
    /// Generates a payload of `multiplier` lines.
    pub fn generate(multiplier: usize) -> Self {
        let mut line = b"meow".repeat(MEOWS_PER_LINE);
        line.extend_from_slice(b"mew\n");
        debug_assert_eq!(line.len(), LINE_LEN);

        Self {
            data: line.repeat(multiplier).into(),
        }
    }

    /// The length of the payload in bytes.
    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    /// Returns `true` if the payload has no lines.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The number of lines in the payload.
    pub fn lines(&self) -> u64 {
        self.len() / LINE_LEN as u64
    }

    /// The payload contents.
    ///
    /// Cloning the returned [`Bytes`] does not copy the data.
    pub fn bytes(&self) -> &Bytes {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_are_one_kilobyte() {
        let payload = Payload::generate(3);
        assert_eq!(payload.len(), 3000);
        assert_eq!(payload.lines(), 3);

        let text = std::str::from_utf8(payload.bytes()).unwrap();
        let lines: Vec<_> = text.split_inclusive('\n').collect();
        assert_eq!(lines.len(), 3);
        assert!(lines.iter().all(|line| line.len() == LINE_LEN));
        assert!(lines[0].starts_with("meowmeow"));
        assert!(lines[0].ends_with("meowmew\n"));
    }

    #[test]
    fn generation_is_deterministic() {
        assert_eq!(Payload::generate(7).bytes(), Payload::generate(7).bytes());
    }

    #[test]
    fn zero_multiplier_is_empty() {
        assert!(Payload::generate(0).is_empty());
    }
}
