//! 48K memory map.
//!
//! - $0000-$3FFF: ROM (CPU writes ignored)
//! - $4000-$7FFF: Contended RAM (shared with the ULA)
//! - $8000-$FFFF: Uncontended RAM
//!
//! Addresses are `u16`, so every access lands somewhere in the 64K space.

const ROM_SIZE: usize = 0x4000;

pub struct Memory48K {
    bytes: Box<[u8; 0x10000]>,
}

impl Memory48K {
    /// All 64K cleared to zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            bytes: Box::new([0; 0x10000]),
        }
    }

    /// Copy up to 16K of ROM image to $0000. Returns the bytes copied.
    pub fn load_rom(&mut self, image: &[u8]) -> usize {
        let len = image.len().min(ROM_SIZE);
        self.bytes[..len].copy_from_slice(&image[..len]);
        len
    }

    /// CPU read.
    #[must_use]
    pub fn read(&self, addr: u16) -> u8 {
        self.bytes[usize::from(addr)]
    }

    /// CPU write. ROM writes are silently ignored.
    pub fn write(&mut self, addr: u16, value: u8) {
        if usize::from(addr) >= ROM_SIZE {
            self.bytes[usize::from(addr)] = value;
        }
    }

    /// Side-effect free read for the screen and debuggers.
    #[must_use]
    pub fn peek(&self, addr: u16) -> u8 {
        self.read(addr)
    }

    /// Write that ignores ROM protection, for loaders and patching.
    pub fn poke(&mut self, addr: u16, value: u8) {
        self.bytes[usize::from(addr)] = value;
    }

    /// Copy `data` to `addr` with [`poke`](Self::poke), wrapping at $FFFF.
    pub fn load(&mut self, addr: u16, data: &[u8]) {
        for (offset, byte) in data.iter().enumerate() {
            self.poke(addr.wrapping_add(offset as u16), *byte);
        }
    }

    /// Is this address in contended RAM?
    #[must_use]
    pub fn contended_page(&self, addr: u16) -> bool {
        (0x4000..0x8000).contains(&addr)
    }

    /// The whole address space.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..]
    }
}

impl Default for Memory48K {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_rom() -> Vec<u8> {
        let mut rom = vec![0u8; 0x4000];
        rom[0] = 0xF3; // DI
        rom[1] = 0xAF; // XOR A
        rom[0x3FFF] = 0x42;
        rom
    }

    fn memory() -> Memory48K {
        let mut mem = Memory48K::new();
        mem.load_rom(&make_rom());
        mem
    }

    #[test]
    fn read_rom() {
        let mem = memory();
        assert_eq!(mem.read(0x0000), 0xF3);
        assert_eq!(mem.read(0x0001), 0xAF);
        assert_eq!(mem.read(0x3FFF), 0x42);
    }

    #[test]
    fn rom_writes_ignored() {
        let mut mem = memory();
        mem.write(0x0000, 0x00);
        mem.write(0x3FFF, 0x00);
        assert_eq!(mem.read(0x0000), 0xF3);
        assert_eq!(mem.read(0x3FFF), 0x42);
    }

    #[test]
    fn poke_bypasses_rom_protection() {
        let mut mem = memory();
        mem.poke(0x0000, 0x3E);
        assert_eq!(mem.read(0x0000), 0x3E);
    }

    #[test]
    fn ram_read_write() {
        let mut mem = memory();
        mem.write(0x4000, 0xAB);
        assert_eq!(mem.read(0x4000), 0xAB);
        mem.write(0xFFFF, 0xCD);
        assert_eq!(mem.read(0xFFFF), 0xCD);
    }

    #[test]
    fn contended_page_48k() {
        let mem = memory();
        assert!(!mem.contended_page(0x0000));
        assert!(!mem.contended_page(0x3FFF));
        assert!(mem.contended_page(0x4000));
        assert!(mem.contended_page(0x7FFF));
        assert!(!mem.contended_page(0x8000));
        assert!(!mem.contended_page(0xFFFF));
    }

    #[test]
    fn oversized_rom_is_truncated() {
        let mut mem = Memory48K::new();
        assert_eq!(mem.load_rom(&vec![0x55; 0x5000]), 0x4000);
        assert_eq!(mem.read(0x3FFF), 0x55);
        assert_eq!(mem.read(0x4000), 0x00);
    }

    #[test]
    fn load_wraps_at_top_of_memory() {
        let mut mem = Memory48K::new();
        mem.load(0xFFFF, &[1, 2]);
        assert_eq!(mem.read(0xFFFF), 1);
        assert_eq!(mem.read(0x0000), 2);
    }
}
