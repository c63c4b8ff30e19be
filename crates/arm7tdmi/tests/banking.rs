//! Register banking laws, checked over random mode-switch sequences.

use std::collections::HashMap;

use arm7tdmi::{Mode, Psr, RegisterFile};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Switch(Mode),
    Write(usize, u32),
    WriteSpsr(u32),
}

fn mode() -> impl Strategy<Value = Mode> {
    prop::sample::select(Mode::ALL.to_vec())
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        mode().prop_map(Op::Switch),
        (0usize..15, any::<u32>()).prop_map(|(r, v)| Op::Write(r, v)),
        any::<u32>().prop_map(Op::WriteSpsr),
    ]
}

/// Physical register a visible index maps to in a mode.
fn slot(mode: Mode, index: usize) -> (usize, usize) {
    match index {
        8..=12 if mode == Mode::Fiq => (1, index),
        13 | 14 => (mode.bank(), index),
        _ => (0, index),
    }
}

proptest! {
    /// Every banked value reads back exactly what was last written to that
    /// physical register, whatever modes were visited in between.
    #[test]
    fn banked_registers_survive_mode_switches(ops in prop::collection::vec(op(), 1..64)) {
        let mut regs = RegisterFile::new();
        let mut model: HashMap<(usize, usize), u32> = HashMap::new();
        let mut spsr_model: HashMap<usize, u32> = HashMap::new();

        for op in ops {
            match op {
                Op::Switch(mode) => regs.switch_mode(mode),
                Op::Write(index, value) => {
                    regs.set(index, value);
                    model.insert(slot(regs.mode(), index), value);
                }
                Op::WriteSpsr(value) => {
                    regs.set_spsr(Psr(value));
                    if regs.mode().has_spsr() {
                        spsr_model.insert(regs.mode().bank(), value);
                    }
                }
            }

            let mode = regs.mode();
            for index in 0..15 {
                let expected = model.get(&slot(mode, index)).copied().unwrap_or(0);
                prop_assert_eq!(regs.get(index), expected, "r{} in {:?}", index, mode);
            }
            let expected_spsr = mode
                .has_spsr()
                .then(|| Psr(spsr_model.get(&mode.bank()).copied().unwrap_or(0)));
            prop_assert_eq!(regs.spsr(), expected_spsr);
            prop_assert_eq!(regs.cpsr().mode_bits(), mode.bits());
        }
    }

    /// Switching away and straight back is the identity on visible state.
    #[test]
    fn round_trip_switch_is_identity(
        values in prop::array::uniform15(any::<u32>()),
        from in mode(),
        via in mode(),
    ) {
        let mut regs = RegisterFile::new();
        regs.switch_mode(from);
        for (index, value) in values.iter().enumerate() {
            regs.set(index, *value);
        }
        let before = regs.visible();

        regs.switch_mode(via);
        regs.switch_mode(from);

        prop_assert_eq!(regs.visible(), before);
    }

    /// User-bank accessors see the same registers User mode would.
    #[test]
    fn user_bank_accessors_match_user_mode(
        index in 0usize..15,
        value in any::<u32>(),
        mode in mode(),
    ) {
        let mut regs = RegisterFile::new();
        regs.switch_mode(mode);
        regs.set_user_reg(index, value);
        prop_assert_eq!(regs.user_reg(index), value);

        regs.switch_mode(Mode::User);
        prop_assert_eq!(regs.get(index), value);
    }
}
