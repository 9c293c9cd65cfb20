use crate::register::Register;
use std::collections::HashMap;

/// An ordered collection of [`Register`]s, indexed both by address and by any of their
/// names/aliases.
pub struct RegisterFile {
    registers: Vec<Register>,
    by_name: HashMap<&'static str, usize>,
}

impl RegisterFile {
    pub fn new(registers: Vec<Register>) -> Self {
        let mut by_name = HashMap::new();
        for (i, r) in registers.iter().enumerate() {
            for &name in &r.names {
                by_name.insert(name, i);
            }
        }
        RegisterFile { registers, by_name }
    }

    pub fn by_address(&self, addr: u32) -> Option<&Register> {
        self.registers.iter().find(|r| r.address == addr)
    }

    pub fn by_address_mut(&mut self, addr: u32) -> Option<&mut Register> {
        self.registers.iter_mut().find(|r| r.address == addr)
    }

    pub fn by_name(&self, name: &str) -> Option<&Register> {
        self.by_name.get(name).map(|&i| &self.registers[i])
    }

    pub fn index_of_name(&self, name: &str) -> Option<u32> {
        self.by_name.get(name).map(|&i| self.registers[i].address)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Register> {
        self.registers.iter()
    }

    /// `read_integer(addr, signed=true)` sign-extends; `signed=false` returns raw bits
    ///. Reading a nonexistent address returns `0`.
    pub fn read_integer(&self, addr: u32, signed: bool) -> u64 {
        match self.by_address(addr) {
            Some(r) if signed => r.signed() as u64,
            Some(r) => r.raw(),
            None => 0,
        }
    }

    /// `write_integer($zero, _)` is a no-op because `$zero`'s register is `read_only`.
    pub fn write_integer(&mut self, addr: u32, value: u64) {
        if let Some(r) = self.by_address_mut(addr) {
            r.write(value);
        }
    }

    pub fn read_float(&self, addr: u32) -> f32 {
        mips_util::to_float(self.read_integer(addr, false) as u32)
    }

    pub fn write_float(&mut self, addr: u32, value: f32) {
        self.write_integer(addr, mips_util::from_float(value) as u64);
    }

    /// Double-precision read over a word-wide file: concatenates the register at `addr` (low
    /// word) and `addr + 1` (high word).
    pub fn read_double(&self, addr: u32) -> f64 {
        let low = self.read_integer(addr, false) as u32;
        let high = self.read_integer(addr + 1, false) as u32;
        mips_util::to_double(((high as u64) << 32) | low as u64)
    }

    pub fn write_double(&mut self, addr: u32, value: f64) {
        let bits = mips_util::from_double(value);
        self.write_integer(addr, bits & 0xFFFF_FFFF);
        self.write_integer(addr + 1, bits >> 32);
    }
}

/// The 32 names GPR register `n` is known by: its canonical ABI name and its bare numeric form
/// (e.g. `t0` and `8`), mirroring the register surface MARS-style assemblers expose.
const GPR_NAMES: [&str; 32] = [
    "zero", "at", "v0", "v1", "a0", "a1", "a2", "a3", "t0", "t1", "t2", "t3", "t4", "t5", "t6",
    "t7", "s0", "s1", "s2", "s3", "s4", "s5", "s6", "s7", "t8", "t9", "k0", "k1", "gp", "sp",
    "fp", "ra",
];

pub fn new_gpr_file() -> RegisterFile {
    let numbers: Vec<String> = (0..32).map(|i| i.to_string()).collect();
    let registers = (0..32u32)
        .map(|i| {
            let mut names = vec![GPR_NAMES[i as usize]];
            // leak the per-index numeric alias to get a 'static str without unsafe; these are
            // allocated once at startup and live for the process lifetime.
            let leaked: &'static str = Box::leak(numbers[i as usize].clone().into_boxed_str());
            names.push(leaked);
            Register::new(i, 32, i == 0, names)
        })
        .collect();
    RegisterFile::new(registers)
}

pub fn new_fpr_file() -> RegisterFile {
    let registers = (0..32u32)
        .map(|i| {
            let leaked: &'static str = Box::leak(format!("f{}", i).into_boxed_str());
            Register::new(i, 32, false, vec![leaked])
        })
        .collect();
    RegisterFile::new(registers)
}

/// Coprocessor-0 register names. Unlike GPR/FPR, the CP0 set is closed and small, so it is
/// modeled as a plain enum rather than an open alias list.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum Cp0Register {
    BadVAddr,
    Count,
    Compare,
    Status,
    Cause,
    ExceptionPc,
    Prid,
    Config,
    ErrorPc,
}

impl Cp0Register {
    /// The real MIPS32 CP0 register number this name occupies.
    pub fn address(self) -> u32 {
        match self {
            Cp0Register::BadVAddr => 8,
            Cp0Register::Count => 9,
            Cp0Register::Compare => 11,
            Cp0Register::Status => 12,
            Cp0Register::Cause => 13,
            Cp0Register::ExceptionPc => 14,
            Cp0Register::Prid => 15,
            Cp0Register::Config => 16,
            Cp0Register::ErrorPc => 30,
        }
    }

    /// The name this register is looked up by in `RegisterFile::by_name`.
    pub fn name(self) -> &'static str {
        match self {
            Cp0Register::BadVAddr => "badvaddr",
            Cp0Register::Count => "count",
            Cp0Register::Compare => "compare",
            Cp0Register::Status => "status",
            Cp0Register::Cause => "cause",
            Cp0Register::ExceptionPc => "exceptionpc",
            Cp0Register::Prid => "prid",
            Cp0Register::Config => "config",
            Cp0Register::ErrorPc => "errorpc",
        }
    }

    pub const ALL: [Cp0Register; 9] = [
        Cp0Register::BadVAddr,
        Cp0Register::Count,
        Cp0Register::Compare,
        Cp0Register::Status,
        Cp0Register::Cause,
        Cp0Register::ExceptionPc,
        Cp0Register::Prid,
        Cp0Register::Config,
        Cp0Register::ErrorPc,
    ];
}

pub fn new_cp0_file() -> RegisterFile {
    let registers = Cp0Register::ALL
        .iter()
        .map(|r| Register::new(r.address(), 32, false, vec![r.name()]))
        .collect();
    RegisterFile::new(registers)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn gpr_zero_write_is_ignored_regardless_of_width_or_value() {
        let mut gpr = new_gpr_file();
        gpr.write_integer(0, 0xFFFF_FFFF);
        assert_eq!(gpr.read_integer(0, false), 0);
    }

    #[test]
    fn gpr_lookup_by_alias_and_number_agree() {
        let gpr = new_gpr_file();
        assert_eq!(gpr.index_of_name("t0"), gpr.index_of_name("8"));
        assert_eq!(gpr.index_of_name("t0"), Some(8));
    }

    #[test]
    fn double_write_splits_across_two_word_registers() {
        let mut fpr = new_fpr_file();
        fpr.write_double(0, 1.5);
        let low = fpr.read_integer(0, false);
        let high = fpr.read_integer(1, false);
        assert_eq!(((high << 32) | low), mips_util::from_double(1.5));
    }

    #[test]
    fn cp0_register_addresses_match_mips32() {
        let cp0 = new_cp0_file();
        assert_eq!(cp0.by_name("status").unwrap().address, 12);
        assert_eq!(cp0.by_name("cause").unwrap().address, 13);
    }
}
