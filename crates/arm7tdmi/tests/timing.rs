//! Per-instruction cycle counts.
//!
//! The test bus charges 3 cycles for a non-sequential access and 1 for a
//! sequential one, so N and S contributions can be told apart.

use arm7tdmi::psr::T;
use arm7tdmi::{Arm7tdmi, Mode, Psr};
use emu_core::{Cpu, SimpleBus};

const N: u32 = 3;
const S: u32 = 1;

fn timed_bus() -> SimpleBus {
    let mut bus = SimpleBus::new();
    bus.nonseq_cycles = N;
    bus.seq_cycles = S;
    bus
}

fn setup_arm(program: &[u32]) -> (Arm7tdmi, SimpleBus) {
    let mut bus = timed_bus();
    let mut cpu = Arm7tdmi::new();
    bus.load_words(0x100, program);
    cpu.registers_mut().set_cpsr(Psr(Mode::System.bits()));
    cpu.set_pc(0x100);
    (cpu, bus)
}

#[test]
fn test_reset_vector_nop() {
    let mut bus = timed_bus();
    bus.load_words(0, &[0xE1A0_0000]);
    let mut cpu = Arm7tdmi::new();

    let cycles = cpu.step(&mut bus);

    assert_eq!(cycles, N, "one non-sequential fetch");
    assert_eq!(cpu.pc(), 4);
}

#[test]
fn test_straight_line_fetches_are_sequential() {
    let (mut cpu, mut bus) = setup_arm(&[0xE1A0_0000; 3]);
    let costs: Vec<u32> = (0..3).map(|_| cpu.step(&mut bus)).collect();

    assert_eq!(costs, [N, S, S]);
}

#[test]
fn test_branch_costs_2s_plus_n() {
    let (mut cpu, mut bus) = setup_arm(&[0xE1A0_0000, 0xEAFF_FFFD]); // nop; b 0x100
    cpu.step(&mut bus);

    assert_eq!(cpu.step(&mut bus), S + N + S);
    assert_eq!(cpu.pc(), 0x100);
    assert_eq!(cpu.step(&mut bus), S, "fetch after a refill is sequential");
}

#[test]
fn test_register_shift_adds_internal_cycle() {
    let (mut cpu, mut bus) = setup_arm(&[0xE1A0_0000, 0xE1A0_0112]); // nop; mov r0, r2, lsl r1
    cpu.step(&mut bus);

    assert_eq!(cpu.step(&mut bus), S + 1);
}

#[test]
fn test_ldr_costs_s_plus_n_plus_i_then_n_fetch() {
    let (mut cpu, mut bus) = setup_arm(&[
        0xE1A0_0000, // nop
        0xE591_0000, // ldr r0, [r1]
        0xE1A0_0000, // nop
    ]);
    cpu.registers_mut().set(1, 0x400);
    cpu.step(&mut bus);

    assert_eq!(cpu.step(&mut bus), S + N + 1);
    assert_eq!(cpu.step(&mut bus), N, "data access breaks the fetch sequence");
}

#[test]
fn test_ldr_into_pc_adds_refill() {
    let (mut cpu, mut bus) = setup_arm(&[0xE1A0_0000, 0xE591_F000]); // nop; ldr pc, [r1]
    bus.load_words(0x400, &[0x200]);
    cpu.registers_mut().set(1, 0x400);
    cpu.step(&mut bus);

    assert_eq!(cpu.step(&mut bus), S + N + 1 + N + S);
    assert_eq!(cpu.pc(), 0x200);
}

#[test]
fn test_str_costs_two_n() {
    let (mut cpu, mut bus) = setup_arm(&[0xE1A0_0000, 0xE581_0000]); // nop; str r0, [r1]
    cpu.registers_mut().set(1, 0x400);
    cpu.step(&mut bus);

    assert_eq!(cpu.step(&mut bus), S + N);
}

#[test]
fn test_ldm_costs_ns_plus_n_plus_i() {
    let (mut cpu, mut bus) = setup_arm(&[0xE1A0_0000, 0xE891_000F]); // nop; ldmia r1, {r0-r3}
    cpu.registers_mut().set(1, 0x400);
    cpu.step(&mut bus);

    assert_eq!(cpu.step(&mut bus), S + N + 3 * S + 1);
}

#[test]
fn test_stm_costs_n_then_sequential() {
    let (mut cpu, mut bus) = setup_arm(&[0xE1A0_0000, 0xE881_000F]); // nop; stmia r1, {r0-r3}
    cpu.registers_mut().set(1, 0x400);
    cpu.step(&mut bus);

    assert_eq!(cpu.step(&mut bus), S + N + 3 * S);
}

#[test]
fn test_multiply_early_termination() {
    let (mut cpu, mut bus) = setup_arm(&[
        0xE1A0_0000, // nop
        0xE002_0190, // mul r2, r0, r1
        0xE002_0190, // mul r2, r0, r1
        0xE023_0190, // mla r3, r0, r1, r0
    ]);
    cpu.registers_mut().set(1, 0xFF);
    cpu.step(&mut bus);
    assert_eq!(cpu.step(&mut bus), S + 1);

    cpu.registers_mut().set(1, 0x0012_3456);
    assert_eq!(cpu.step(&mut bus), S + 3);

    cpu.registers_mut().set(1, 0x1234_5678);
    assert_eq!(cpu.step(&mut bus), S + 4 + 1);
}

#[test]
fn test_long_multiply_adds_one() {
    let (mut cpu, mut bus) = setup_arm(&[0xE1A0_0000, 0xE081_0392]); // nop; umull r0, r1, r2, r3
    cpu.registers_mut().set(3, 0x10);
    cpu.step(&mut bus);

    assert_eq!(cpu.step(&mut bus), S + 1 + 1);
}

#[test]
fn test_swap_costs_two_n_plus_i() {
    let (mut cpu, mut bus) = setup_arm(&[0xE1A0_0000, 0xE102_0091]); // nop; swp r0, r1, [r2]
    cpu.registers_mut().set(2, 0x400);
    cpu.step(&mut bus);

    assert_eq!(cpu.step(&mut bus), S + N + N + 1);
}

#[test]
fn test_failed_condition_is_fetch_only() {
    let (mut cpu, mut bus) = setup_arm(&[0xE1A0_0000, 0x0591_0000]); // nop; ldreq r0, [r1]
    cpu.step(&mut bus);

    assert_eq!(cpu.step(&mut bus), S);
}

#[test]
fn test_undefined_costs_internal_cycle_and_refill() {
    let (mut cpu, mut bus) = setup_arm(&[0xE1A0_0000, 0xE600_0010]); // nop; undefined
    cpu.step(&mut bus);

    assert_eq!(cpu.step(&mut bus), S + 1 + N + S);
}

#[test]
fn test_thumb_register_shift_and_multiply() {
    let mut bus = timed_bus();
    let mut cpu = Arm7tdmi::new();
    bus.load_halves(0x100, &[0x46C0, 0x4088, 0x4348]); // nop; lsl r0, r1; mul r0, r1
    cpu.registers_mut().set_cpsr(Psr(Mode::System.bits() | T));
    cpu.set_pc(0x100);
    cpu.registers_mut().set(1, 0x0001_0000);
    cpu.step(&mut bus);

    assert_eq!(cpu.step(&mut bus), S + 1);
    cpu.registers_mut().set(0, 0x00FF_FFFF);
    assert_eq!(cpu.step(&mut bus), S + 3, "m follows the destination operand");
}

#[test]
fn test_thumb_bl_pair_cost() {
    let mut bus = timed_bus();
    let mut cpu = Arm7tdmi::new();
    bus.load_halves(0x100, &[0x46C0, 0xF000, 0xF802]);
    cpu.registers_mut().set_cpsr(Psr(Mode::System.bits() | T));
    cpu.set_pc(0x100);
    cpu.step(&mut bus);

    let total = cpu.step(&mut bus) + cpu.step(&mut bus);
    assert_eq!(total, S + S + N + S);
}
