//! Length-bounded strings for credential fields
//!
//! Values longer than the field limit are truncated on a char boundary
//! rather than rejected, so a long BLE write never overruns a field.

use std::fmt;

use zeroize::Zeroize;

/// A string holding at most `N` bytes of UTF-8
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Bounded<const N: usize>(String);

impl<const N: usize> Bounded<N> {
    pub const CAPACITY: usize = N;

    /// Copy `value`, dropping whatever does not fit in `N` bytes
    pub fn new(value: &str) -> Self {
        let mut end = value.len().min(N);
        while !value.is_char_boundary(end) {
            end -= 1;
        }
        Self(value[..end].to_string())
    }

    /// Decode a raw characteristic value
    ///
    /// Reading stops at the first NUL byte. Invalid UTF-8 is replaced, and
    /// the result is clamped to `N` bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        let end = end.min(N);
        Self::new(&String::from_utf8_lossy(&bytes[..end]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Overwrite the contents with zeros and empty the string
    pub fn erase(&mut self) {
        self.0.zeroize();
    }
}

impl<const N: usize> Zeroize for Bounded<N> {
    fn zeroize(&mut self) {
        self.erase();
    }
}

impl<const N: usize> AsRef<str> for Bounded<N> {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<const N: usize> From<&str> for Bounded<N> {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl<const N: usize> fmt::Display for Bounded<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<const N: usize> fmt::Debug for Bounded<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::Bounded;

    #[test]
    fn truncates_to_capacity() {
        let s = Bounded::<4>::new("abcdef");
        assert_eq!(s.as_str(), "abcd");
        assert_eq!(Bounded::<4>::new("ab").as_str(), "ab");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        // "é" is two bytes, so only one fits after "ab"
        let s = Bounded::<4>::new("abéé");
        assert_eq!(s.as_str(), "abé");
        let s = Bounded::<3>::new("abé");
        assert_eq!(s.as_str(), "ab");
    }

    #[test]
    fn from_bytes_stops_at_nul() {
        let s = Bounded::<32>::from_bytes(b"Home\0garbage");
        assert_eq!(s.as_str(), "Home");
    }

    #[test]
    fn from_bytes_never_exceeds_capacity() {
        let s = Bounded::<4>::from_bytes(&[0xff, 0xff, 0xff, 0xff, 0xff]);
        assert!(s.len() <= 4);
        let s = Bounded::<32>::from_bytes(&[b'x'; 100]);
        assert_eq!(s.len(), 32);
    }

    #[test]
    fn erase_empties() {
        let mut s = Bounded::<8>::new("secret");
        s.erase();
        assert!(s.is_empty());
    }
}
