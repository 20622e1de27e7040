pub type LineId = u64;

/// Maps byte addresses onto cache lines and banks.
#[derive(Debug, Clone, Copy)]
pub struct AddressMapper {
    line_bytes: u64,
}

impl AddressMapper {
    pub fn new(line_bytes: u64) -> Self {
        assert!(line_bytes > 0, "line_bytes must be > 0");
        Self { line_bytes }
    }

    pub fn line_id(&self, addr: u64) -> LineId {
        addr / self.line_bytes
    }

    pub fn bank_id(&self, addr: u64, num_banks: usize) -> usize {
        bank_of_line(self.line_id(addr), num_banks)
    }
}

pub fn bank_of_line(line: LineId, num_banks: usize) -> usize {
    debug_assert!(num_banks > 0);
    (line % num_banks as u64) as usize
}
