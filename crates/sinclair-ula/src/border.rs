//! Border colour register.

/// The 3-bit border colour written through port $FE. Last write wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BorderState {
    colour: u8,
}

impl BorderState {
    /// White, as after power-on.
    #[must_use]
    pub const fn new() -> Self {
        Self { colour: 7 }
    }

    #[must_use]
    pub const fn colour(&self) -> u8 {
        self.colour
    }

    /// Store the low three bits of `value`.
    pub fn set(&mut self, value: u8) {
        self.colour = value & 0x07;
    }
}

impl Default for BorderState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_low_three_bits_are_kept() {
        let mut border = BorderState::new();
        assert_eq!(border.colour(), 7);
        border.set(2);
        assert_eq!(border.colour(), 2);
        border.set(0xFD);
        assert_eq!(border.colour(), 5);
    }
}
