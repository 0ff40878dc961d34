use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Host-side memory as the emitted code sees it: little-endian words.
pub trait Bus {
    fn read_u8(&mut self, addr: u32) -> Result<u8>;
    fn read_u16(&mut self, addr: u32) -> Result<u16>;
    fn read_u32(&mut self, addr: u32) -> Result<u32>;
    fn write_u8(&mut self, addr: u32, val: u8) -> Result<()>;
    fn write_u16(&mut self, addr: u32, val: u16) -> Result<()>;
    fn write_u32(&mut self, addr: u32, val: u32) -> Result<()>;
}

#[derive(Clone, Serialize, Deserialize)]
pub struct LinearMemory {
    pub mem: Vec<u8>,
    pub base: u32,
}

impl LinearMemory {
    pub fn new(size: usize) -> Self {
        Self {
            mem: vec![0; size],
            base: 0,
        }
    }

    fn range(&self, addr: u32, len: usize) -> Result<std::ops::Range<usize>> {
        let off = addr.wrapping_sub(self.base) as usize;
        match off.checked_add(len) {
            Some(end) if end <= self.mem.len() => Ok(off..end),
            _ => bail!("access of {len} bytes at {addr:#010x} outside {} bytes of memory", self.mem.len()),
        }
    }

    pub fn bytes(&self, addr: u32, len: usize) -> Result<&[u8]> {
        let r = self.range(addr, len)?;
        Ok(&self.mem[r])
    }

    pub fn bytes_mut(&mut self, addr: u32, len: usize) -> Result<&mut [u8]> {
        let r = self.range(addr, len)?;
        Ok(&mut self.mem[r])
    }

    fn load<const N: usize>(&self, addr: u32) -> Result<[u8; N]> {
        let mut b = [0; N];
        b.copy_from_slice(self.bytes(addr, N)?);
        Ok(b)
    }

    fn store(&mut self, addr: u32, b: &[u8]) -> Result<()> {
        self.bytes_mut(addr, b.len())?.copy_from_slice(b);
        Ok(())
    }
}

impl std::fmt::Debug for LinearMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinearMemory")
            .field("base", &format_args!("{:#x}", self.base))
            .field("len", &self.mem.len())
            .finish()
    }
}

impl Bus for LinearMemory {
    fn read_u8(&mut self, addr: u32) -> Result<u8> {
        Ok(self.load::<1>(addr)?[0])
    }
    fn read_u16(&mut self, addr: u32) -> Result<u16> {
        Ok(u16::from_le_bytes(self.load(addr)?))
    }
    fn read_u32(&mut self, addr: u32) -> Result<u32> {
        Ok(u32::from_le_bytes(self.load(addr)?))
    }
    fn write_u8(&mut self, addr: u32, val: u8) -> Result<()> {
        self.store(addr, &[val])
    }
    fn write_u16(&mut self, addr: u32, val: u16) -> Result<()> {
        self.store(addr, &val.to_le_bytes())
    }
    fn write_u32(&mut self, addr: u32, val: u32) -> Result<()> {
        self.store(addr, &val.to_le_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn little_endian_and_bounds() {
        let mut m = LinearMemory::new(8);
        m.write_u32(0, 0x1122_3344).unwrap();
        assert_eq!(m.read_u8(0).unwrap(), 0x44);
        assert_eq!(m.read_u16(2).unwrap(), 0x1122);
        assert!(m.read_u32(6).is_err());
        assert!(m.write_u8(8, 0).is_err());
    }
}
