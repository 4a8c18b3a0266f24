//! 48K keyboard matrix.
//!
//! Forty keys wired as eight half-rows ("lines") of five. An `IN` from port
//! $FE drives low the address lines A8-A15 that select half-rows, and each
//! pressed key in a selected line pulls its column bit low.
//!
//! | line | address bit | keys, bit 0 to bit 4     |
//! |------|-------------|--------------------------|
//! | 0    | A8          | CAPS SHIFT, Z, X, C, V   |
//! | 1    | A9          | A, S, D, F, G            |
//! | 2    | A10         | Q, W, E, R, T            |
//! | 3    | A11         | 1, 2, 3, 4, 5            |
//! | 4    | A12         | 0, 9, 8, 7, 6            |
//! | 5    | A13         | P, O, I, U, Y            |
//! | 6    | A14         | ENTER, L, K, J, H        |
//! | 7    | A15         | SPACE, SYMBOL SHIFT, M, N, B |

/// A key on the 48K keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpectrumKey {
    CapsShift,
    Z,
    X,
    C,
    V,
    A,
    S,
    D,
    F,
    G,
    Q,
    W,
    E,
    R,
    T,
    N1,
    N2,
    N3,
    N4,
    N5,
    N0,
    N9,
    N8,
    N7,
    N6,
    P,
    O,
    I,
    U,
    Y,
    Enter,
    L,
    K,
    J,
    H,
    Space,
    SymShift,
    M,
    N,
    B,
}

/// Keys in matrix order: index / 5 is the line, index % 5 the bit.
const LAYOUT: [SpectrumKey; 40] = {
    use SpectrumKey::{
        A, B, C, CapsShift, D, E, Enter, F, G, H, I, J, K, L, M, N, N0, N1, N2, N3, N4, N5, N6,
        N7, N8, N9, O, P, Q, R, S, Space, SymShift, T, U, V, W, X, Y, Z,
    };
    [
        CapsShift, Z, X, C, V, //
        A, S, D, F, G, //
        Q, W, E, R, T, //
        N1, N2, N3, N4, N5, //
        N0, N9, N8, N7, N6, //
        P, O, I, U, Y, //
        Enter, L, K, J, H, //
        Space, SymShift, M, N, B,
    ]
};

impl SpectrumKey {
    /// `(line, bit)` position in the matrix.
    #[must_use]
    pub fn matrix(self) -> (usize, u8) {
        let index = LAYOUT
            .iter()
            .position(|&key| key == self)
            .unwrap_or_default();
        (index / 5, (index % 5) as u8)
    }
}

/// Pressed keys, one byte per line with bit set = key down.
#[derive(Debug, Clone, Default)]
pub struct KeyboardState {
    lines: [u8; 8],
}

impl KeyboardState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_status(&mut self, key: SpectrumKey, pressed: bool) {
        let (line, bit) = key.matrix();
        self.set_key(line, bit, pressed);
    }

    /// Raw byte for `line`; lines past 7 read as no keys.
    #[must_use]
    pub fn line_status(&self, line: usize) -> u8 {
        self.lines.get(line).copied().unwrap_or(0)
    }

    /// Press or release the key at `line` (0-7), `bit` (0-4). Out of range
    /// positions are ignored.
    pub fn set_key(&mut self, line: usize, bit: u8, pressed: bool) {
        let Some(byte) = self.lines.get_mut(line) else {
            return;
        };
        if bit < 5 {
            if pressed {
                *byte |= 1 << bit;
            } else {
                *byte &= !(1 << bit);
            }
        }
    }

    /// Port $FE keyboard byte for address high byte `addr_high`.
    ///
    /// Bits 0-4 are active low, bits 5-7 read high. Keys sharing a column
    /// with a pressed key in a selected line connect their own lines too, so
    /// three keys on the corners of a rectangle ghost the fourth.
    #[must_use]
    pub fn read(&self, addr_high: u8) -> u8 {
        let mut selected = !addr_high;
        let mut columns = self.columns_of(selected);
        loop {
            let reached = (0..8)
                .filter(|&line| self.lines[line] & columns != 0)
                .fold(selected, |mask, line| mask | (1 << line));
            if reached == selected {
                break;
            }
            selected = reached;
            columns = self.columns_of(selected);
        }
        (!columns & 0x1F) | 0xE0
    }

    pub fn release_all(&mut self) {
        self.lines = [0; 8];
    }

    /// OR of the lines whose bit is set in `mask`.
    fn columns_of(&self, mask: u8) -> u8 {
        (0..8)
            .filter(|&line| mask & (1 << line) != 0)
            .fold(0, |columns, line| columns | self.lines[line])
    }
}
