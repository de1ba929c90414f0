use std::fmt;

pub(crate) type RegisterType = u16;

// Unique program-order key, assigned at dispatch. Tag 0 means "not yet dispatched".
pub(crate) type Tag = u64;

// The maximum number of source operands of an instruction.
pub(crate) const MAX_SOURCE_COUNT: usize = 2;

pub(crate) const FU_CLASS_COUNT: usize = 3;

/// Functional-unit class an instruction executes on.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum FuClass {
    K0,
    K1,
    K2,
}

// An instruction that doesn't name a functional-unit class executes on k1.
pub(crate) const DEFAULT_FU_CLASS: FuClass = FuClass::K1;

impl FuClass {
    pub(crate) fn index(&self) -> usize {
        match self {
            FuClass::K0 => 0,
            FuClass::K1 => 1,
            FuClass::K2 => 2,
        }
    }

    pub(crate) fn from_index(index: usize) -> Option<FuClass> {
        match index {
            0 => Some(FuClass::K0),
            1 => Some(FuClass::K1),
            2 => Some(FuClass::K2),
            _ => None,
        }
    }
}

impl fmt::Display for FuClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "k{}", self.index())
    }
}

/// A single trace instruction. Only dependency information is carried; the
/// simulator models timing, not values.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Instr {
    // the instruction address from the trace; informational only
    pub(crate) addr: u64,
    // None means no functional-unit requirement; routed to DEFAULT_FU_CLASS
    pub(crate) fu_class: Option<FuClass>,
    pub(crate) source: [Option<RegisterType>; MAX_SOURCE_COUNT],
    pub(crate) dest: Option<RegisterType>,
    pub(crate) tag: Tag,
}

impl Instr {
    pub(crate) fn new(addr: u64,
                      fu_class: Option<FuClass>,
                      dest: Option<RegisterType>,
                      source: [Option<RegisterType>; MAX_SOURCE_COUNT]) -> Instr {
        Instr {
            addr,
            fu_class,
            source,
            dest,
            tag: 0,
        }
    }
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} @{:x}", self.tag, self.addr)?;

        match self.fu_class {
            Some(class) => write!(f, " {}", class)?,
            None => write!(f, " k-")?,
        }

        match self.dest {
            Some(reg) => write!(f, " R{}", reg)?,
            None => write!(f, " R-")?,
        }

        for source in &self.source {
            match source {
                Some(reg) => write!(f, ",R{}", reg)?,
                None => write!(f, ",R-")?,
            }
        }

        Ok(())
    }
}

/// The loaded instruction trace. The frontend pulls from it sequentially;
/// running off the end is the end-of-trace signal.
pub(crate) struct Program {
    pub(crate) code: Vec<Instr>,
}

impl Program {
    pub(crate) fn get_instr(&self, pos: usize) -> Instr {
        self.code[pos]
    }

    pub(crate) fn len(&self) -> usize {
        self.code.len()
    }
}
