//! ROM images.

use std::collections::HashMap;

/// Supplies ROM images by resource name.
pub trait RomProvider {
    /// The named image, or `None` when it is not available.
    fn load_rom(&self, name: &str) -> Option<Vec<u8>>;
}

/// ROM images held in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticRom {
    images: HashMap<String, Vec<u8>>,
}

impl StaticRom {
    /// A provider with one image under `name`.
    #[must_use]
    pub fn new(name: &str, image: Vec<u8>) -> Self {
        Self::default().with_rom(name, image)
    }

    #[must_use]
    pub fn with_rom(mut self, name: &str, image: Vec<u8>) -> Self {
        self.images.insert(name.to_string(), image);
        self
    }
}

impl RomProvider for StaticRom {
    fn load_rom(&self, name: &str) -> Option<Vec<u8>> {
        self.images.get(name).cloned()
    }
}
