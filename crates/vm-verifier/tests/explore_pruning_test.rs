// SPDX-License-Identifier: GPL-2.0

//! Tests for path exploration, pruning and budgets
//!
//! Pruning must never change a verdict, repeated runs must agree exactly,
//! and every budget must end a run as an abort rather than a rejection.

use vm_verifier::prelude::*;

fn platform() -> HostPlatform {
    HostPlatform::new().with_map(MapDef::array(1, 64, 16))
}

fn mov_imm(dst: u8, imm: i32) -> Insn {
    Insn::new(VM_ALU64 | VM_MOV | VM_K, dst, 0, 0, imm)
}

fn exit() -> Insn {
    Insn::new(VM_JMP | VM_EXIT, 0, 0, 0, 0)
}

/// Two arms that only differ in a dead register
fn diamond() -> Vec<Insn> {
    vec![
        // r2 = *(u32 *)(r1 + 8)
        Insn::new(VM_LDX | VM_MEM | VM_W, 2, 1, 8, 0),
        // if r2 > 5 goto join
        Insn::new(VM_JMP | VM_JGT | VM_K, 2, 0, 1, 5),
        // r3 = 1
        mov_imm(3, 1),
        // join: r0 = 0
        mov_imm(0, 0),
        exit(),
    ]
}

/// `n` diamonds in a row; 2^n paths without pruning
fn diamonds(n: usize) -> Vec<Insn> {
    let mut insns = vec![mov_imm(0, 0)];
    for i in 0..n {
        // r2 = *(u32 *)(r1 + 8)
        insns.push(Insn::new(VM_LDX | VM_MEM | VM_W, 2, 1, 8, 0));
        // if r2 > 5 goto +1
        insns.push(Insn::new(VM_JMP | VM_JGT | VM_K, 2, 0, 1, 5));
        // r3 = i
        insns.push(mov_imm(3, i as i32));
    }
    insns.push(exit());
    insns
}

/// Counting loop with a constant trip count
fn bounded_loop(trips: i32) -> Vec<Insn> {
    vec![
        // r1 = 0
        mov_imm(1, 0),
        // loop: r1 += 1
        Insn::new(VM_ALU64 | VM_ADD | VM_K, 1, 0, 0, 1),
        // if r1 < trips goto loop
        Insn::new(VM_JMP | VM_JLT | VM_K, 1, 0, -2, trips),
        mov_imm(0, 0),
        exit(),
    ]
}

/// Programs with both verdicts, for verdict comparisons
fn corpus() -> Vec<Vec<Insn>> {
    let mut uninit_on_one_arm = diamond();
    // join reads r3, written only on the fall-through arm
    uninit_on_one_arm[3] = Insn::new(VM_ALU64 | VM_MOV | VM_X, 0, 3, 0, 0);

    let mut leak_on_one_arm = diamond();
    leak_on_one_arm[2] = Insn::new(VM_ALU64 | VM_MOV | VM_X, 0, 1, 0, 0);
    leak_on_one_arm[3] = exit();

    vec![
        diamond(),
        diamonds(6),
        bounded_loop(10),
        uninit_on_one_arm,
        leak_on_one_arm,
        vec![mov_imm(0, 0), Insn::new(VM_JMP | VM_JA, 0, 0, -1, 0)],
    ]
}

#[test]
fn test_pruning_hits_on_dead_difference() {
    let output = verify_program(platform(), diamond(), VerifierConfig::default());
    let VerificationOutcome::Success(info) = output.outcome else {
        panic!("expected success");
    };
    assert!(info.stats.prune_hits >= 1, "{}", info.stats.summary());

    let output = verify_program(platform(), diamond(), VerifierConfig::default().with_prune(false));
    let VerificationOutcome::Success(info) = output.outcome else {
        panic!("expected success");
    };
    assert_eq!(info.stats.prune_hits, 0);
}

#[test]
fn test_pruning_keeps_diamond_chain_linear() {
    let pruned = verify_program(platform(), diamonds(12), VerifierConfig::default());
    let full = verify_program(
        platform(),
        diamonds(12),
        VerifierConfig::default().with_prune(false),
    );
    let (VerificationOutcome::Success(pruned), VerificationOutcome::Success(full)) =
        (&pruned.outcome, &full.outcome)
    else {
        panic!("both runs must accept");
    };
    assert!(pruned.stats.insns_processed < full.stats.insns_processed);
    assert!(pruned.stats.insns_processed < 200);
}

#[test]
fn test_pruning_never_changes_the_verdict() {
    for (i, insns) in corpus().into_iter().enumerate() {
        for base in [VerifierConfig::default(), VerifierConfig::privileged()] {
            let on = verify_program(platform(), insns.clone(), base.clone()).outcome;
            let off = verify_program(platform(), insns.clone(), base.with_prune(false)).outcome;
            assert_eq!(on.is_success(), off.is_success(), "program {}: {} vs {}", i, on, off);
            assert_eq!(on.error_kind(), off.error_kind(), "program {}", i);
        }
    }
}

#[test]
fn test_runs_are_deterministic() {
    for insns in corpus() {
        let config = VerifierConfig::default().with_log_level(LogLevel::Trace);
        let a = verify_program(platform(), insns.clone(), config.clone());
        let b = verify_program(platform(), insns, config);
        assert_eq!(a.log, b.log);
        assert_eq!(a.outcome.to_string(), b.outcome.to_string());
        assert_eq!(a.outcome.failure(), b.outcome.failure());
        if let (VerificationOutcome::Success(x), VerificationOutcome::Success(y)) =
            (&a.outcome, &b.outcome)
        {
            assert_eq!(x.stats, y.stats);
            assert_eq!(x.rewritten, y.rewritten);
        }
    }
}

#[test]
fn test_bounded_loop_accepted() {
    let outcome = verify_program(platform(), bounded_loop(10), VerifierConfig::default()).outcome;
    assert!(outcome.is_success(), "{}", outcome);
}

#[test]
fn test_infinite_loop_detected() {
    let insns = vec![
        mov_imm(0, 0),
        // l: goto l
        Insn::new(VM_JMP | VM_JA, 0, 0, -1, 0),
    ];
    let outcome = verify_program(platform(), insns, VerifierConfig::default()).outcome;
    let VerificationOutcome::Aborted(info) = outcome else {
        panic!("expected abort");
    };
    assert_eq!(info.reason, AbortReason::Loop);
    assert_eq!(info.failure.error, VerifierError::InfiniteLoop(1));
}

#[test]
fn test_loop_without_progress_detected_without_pruning() {
    let insns = vec![
        // r2 = *(u32 *)(r1 + 8)
        Insn::new(VM_LDX | VM_MEM | VM_W, 2, 1, 8, 0),
        mov_imm(0, 0),
        // l: if r2 != 0 goto l
        Insn::new(VM_JMP | VM_JNE | VM_K, 2, 0, -1, 0),
        exit(),
    ];
    let outcome = verify_program(
        platform(),
        insns,
        VerifierConfig::default().with_prune(false),
    )
    .outcome;
    assert_eq!(outcome.error_kind(), Some(ErrorKind::TooComplex));
    assert!(outcome.is_aborted());
}

#[test]
fn test_state_budget_abort() {
    let outcome = verify_program(
        platform(),
        diamonds(4),
        VerifierConfig::default().with_state_budget(2),
    )
    .outcome;
    let VerificationOutcome::Aborted(info) = outcome else {
        panic!("expected abort");
    };
    assert_eq!(info.reason, AbortReason::StateBudget);
    assert_eq!(info.stats.total_states, 2);
}

#[test]
fn test_pending_stack_abort() {
    let outcome = verify_program(
        platform(),
        diamond(),
        VerifierConfig::default().with_max_pending(0),
    )
    .outcome;
    let VerificationOutcome::Aborted(info) = outcome else {
        panic!("expected abort");
    };
    assert_eq!(info.reason, AbortReason::WorkStack);
    assert_eq!(info.failure.insn_idx, 1);
}

#[test]
fn test_malformed_programs() {
    let cases: Vec<(Vec<Insn>, VerifierError)> = vec![
        (vec![], VerifierError::EmptyProgram),
        (vec![mov_imm(0, 0)], VerifierError::FallThroughExit(0)),
        (
            vec![Insn::new(VM_JMP | VM_JA, 0, 0, 5, 0), exit()],
            VerifierError::JumpOutOfRange { from: 0, target: 6 },
        ),
        (
            vec![Insn::new(VM_ALU64 | VM_MOV | VM_K, 11, 0, 0, 0), exit()],
            VerifierError::InvalidRegister(11),
        ),
        (
            vec![Insn::new(VM_ALU64 | VM_DIV | VM_K, 0, 0, 0, 0), exit()],
            VerifierError::InvalidInstruction(0),
        ),
    ];
    for (insns, expected) in cases {
        let outcome = verify_program(platform(), insns, VerifierConfig::default()).outcome;
        assert_eq!(outcome.error(), Some(&expected));
        assert_eq!(outcome.error_kind(), Some(ErrorKind::Malformed));
    }

    let mut insns = Insn::ld_map(1, 9).to_vec();
    insns.push(exit());
    let outcome = verify_program(platform(), insns, VerifierConfig::default()).outcome;
    assert_eq!(outcome.error(), Some(&VerifierError::UnknownMap(9)));
}

#[test]
fn test_program_size_limit() {
    let mut insns = vec![mov_imm(0, 0); 4096];
    insns.push(exit());
    let outcome = verify_program(platform(), insns.clone(), VerifierConfig::unprivileged()).outcome;
    assert_eq!(outcome.error(), Some(&VerifierError::ProgramTooLarge(4097)));
    let outcome = verify_program(platform(), insns, VerifierConfig::privileged()).outcome;
    assert!(outcome.is_success());
}

#[test]
fn test_log_levels() {
    let failing = vec![Insn::new(VM_ALU64 | VM_MOV | VM_X, 0, 2, 0, 0), exit()];

    let output = verify_program(platform(), failing.clone(), VerifierConfig::default());
    assert!(output.log.is_empty());

    let output = verify_program(
        platform(),
        failing.clone(),
        VerifierConfig::default().with_log_level(LogLevel::Error),
    );
    assert!(output.log.contains("0: ERROR"), "{}", output.log);

    let output = verify_program(
        platform(),
        diamond(),
        VerifierConfig::default().with_log_level(LogLevel::Trace),
    );
    assert!(output.log.lines().count() > diamond().len());
    assert!(output.log.contains("processed"));
    assert!(!output.log_truncated);

    let output = verify_program(
        platform(),
        diamond(),
        VerifierConfig::default()
            .with_log_level(LogLevel::Trace)
            .with_log_size(64),
    );
    assert!(output.log_truncated);
    assert!(output.outcome.is_success());
}
