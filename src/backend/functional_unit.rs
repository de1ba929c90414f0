use crate::cpu::CPUConfig;
use crate::instructions::instructions::{FuClass, FU_CLASS_COUNT};

/// Credit pools for the functional-unit classes. One credit represents one
/// free unit of a class: consumed when an instruction starts executing,
/// returned when its result is broadcast.
pub(crate) struct FuTable {
    credits: [u64; FU_CLASS_COUNT],
    capacity: [u64; FU_CLASS_COUNT],
}

impl FuTable {
    pub(crate) fn new(cpu_config: &CPUConfig) -> FuTable {
        let capacity = [
            cpu_config.k0_count,
            cpu_config.k1_count,
            cpu_config.k2_count,
        ];

        FuTable {
            credits: capacity,
            capacity,
        }
    }

    pub(crate) fn has_credit(&self, class: FuClass) -> bool {
        self.credits[class.index()] > 0
    }

    pub(crate) fn acquire(&mut self, class: FuClass) {
        debug_assert!(self.has_credit(class), "FuTable: can't acquire a {} credit when none are free", class);

        self.credits[class.index()] -= 1;
    }

    pub(crate) fn release(&mut self, class: FuClass) {
        debug_assert!(self.credits[class.index()] < self.capacity[class.index()],
                      "FuTable: can't release a {} credit beyond capacity", class);

        self.credits[class.index()] += 1;
    }

    pub(crate) fn credits(&self, class: FuClass) -> u64 {
        self.credits[class.index()]
    }

    pub(crate) fn capacity(&self, class: FuClass) -> u64 {
        self.capacity[class.index()]
    }
}
