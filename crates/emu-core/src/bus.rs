//! Memory and I/O bus interface.

/// Result of a bus read: the data byte and any wait states the access costs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReadResult {
    pub data: u8,
    /// Extra ticks the CPU must spend before the access completes.
    pub wait: u8,
}

impl ReadResult {
    #[must_use]
    pub const fn new(data: u8) -> Self {
        Self { data, wait: 0 }
    }

    #[must_use]
    pub const fn with_wait(data: u8, wait: u8) -> Self {
        Self { data, wait }
    }
}

/// Memory and I/O bus interface.
///
/// Every access carries the CPU tick at which it starts. Machines with
/// contended memory use it to work out how many cycles the video circuit
/// steals; the returned wait count is applied by the CPU before the access
/// is charged its normal cost.
///
/// Addresses are `u16`, so every access lands inside the 64K space.
pub trait Bus {
    /// Read a byte from memory.
    fn read(&mut self, address: u16, tick: u64) -> ReadResult;

    /// Write a byte to memory. Returns wait states.
    fn write(&mut self, address: u16, value: u8, tick: u64) -> u8;

    /// Read from an I/O port.
    fn io_read(&mut self, port: u16, tick: u64) -> ReadResult;

    /// Write to an I/O port. Returns wait states.
    fn io_write(&mut self, port: u16, value: u8, tick: u64) -> u8;

    /// Read memory without side effects or timing. Used by debuggers and
    /// instruction decoders.
    fn peek(&self, address: u16) -> u8;
}

/// Flat 64K RAM with no wait states and no I/O devices.
///
/// Port reads return `0xFF`. Useful for CPU tests.
pub struct SimpleBus {
    memory: Box<[u8; 0x10000]>,
}

impl SimpleBus {
    #[must_use]
    pub fn new() -> Self {
        Self {
            memory: Box::new([0; 0x10000]),
        }
    }

    /// Copy `bytes` into memory starting at `address`, wrapping at 64K.
    pub fn load(&mut self, address: u16, bytes: &[u8]) {
        let mut addr = address;
        for &byte in bytes {
            self.memory[addr as usize] = byte;
            addr = addr.wrapping_add(1);
        }
    }
}

impl Default for SimpleBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus for SimpleBus {
    fn read(&mut self, address: u16, _tick: u64) -> ReadResult {
        ReadResult::new(self.memory[address as usize])
    }

    fn write(&mut self, address: u16, value: u8, _tick: u64) -> u8 {
        self.memory[address as usize] = value;
        0
    }

    fn io_read(&mut self, _port: u16, _tick: u64) -> ReadResult {
        ReadResult::new(0xFF)
    }

    fn io_write(&mut self, _port: u16, _value: u8, _tick: u64) -> u8 {
        0
    }

    fn peek(&self, address: u16) -> u8 {
        self.memory[address as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_wraps_at_top_of_memory() {
        let mut bus = SimpleBus::new();
        bus.load(0xFFFF, &[0x11, 0x22]);
        assert_eq!(bus.peek(0xFFFF), 0x11);
        assert_eq!(bus.peek(0x0000), 0x22);
    }

    #[test]
    fn simple_bus_never_waits() {
        let mut bus = SimpleBus::new();
        assert_eq!(bus.write(0x4000, 0xAA, 14_335), 0);
        assert_eq!(bus.read(0x4000, 14_335), ReadResult::new(0xAA));
        assert_eq!(bus.io_read(0x00FE, 0).data, 0xFF);
    }
}
