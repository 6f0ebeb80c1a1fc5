/// Abstraction for guest physical memory access.
///
/// Accesses take `&self` so a single composed address space can be shared between every CPU core
/// that has been released by firmware. Implementations that route to devices with side effects
/// must override the typed accessors so the device observes the real access width instead of a
/// sequence of byte accesses.
pub trait MemoryBus {
    fn read_physical(&self, paddr: u64, buf: &mut [u8]);
    fn write_physical(&self, paddr: u64, buf: &[u8]);

    fn read_u8(&self, paddr: u64) -> u8 {
        let mut buf = [0u8; 1];
        self.read_physical(paddr, &mut buf);
        buf[0]
    }

    fn read_u16(&self, paddr: u64) -> u16 {
        let mut buf = [0u8; 2];
        self.read_physical(paddr, &mut buf);
        u16::from_le_bytes(buf)
    }

    fn read_u32(&self, paddr: u64) -> u32 {
        let mut buf = [0u8; 4];
        self.read_physical(paddr, &mut buf);
        u32::from_le_bytes(buf)
    }

    fn read_u64(&self, paddr: u64) -> u64 {
        let mut buf = [0u8; 8];
        self.read_physical(paddr, &mut buf);
        u64::from_le_bytes(buf)
    }

    fn write_u8(&self, paddr: u64, val: u8) {
        self.write_physical(paddr, &[val]);
    }

    fn write_u16(&self, paddr: u64, val: u16) {
        self.write_physical(paddr, &val.to_le_bytes());
    }

    fn write_u32(&self, paddr: u64, val: u32) {
        self.write_physical(paddr, &val.to_le_bytes());
    }

    fn write_u64(&self, paddr: u64, val: u64) {
        self.write_physical(paddr, &val.to_le_bytes());
    }
}
