//! End-to-end tests driving the builders through revm
//!
//! Contracts are deployed into an in-memory `CacheDB` and executed with
//! `OeInspector` attached, so every hook signature and every interpreter
//! access the inspector makes runs against the real engine.
//!
//! # Test Coverage
//! - Root frame opened by the first `call` hook
//! - REVERT seen by `step` marks the reverted callee
//! - Delegatecall attributed to the issuing contract
//! - Contract creation address reported by `create_end`

use alloy::primitives::{address, Address};
use oe_trace::{
    errors::EXECUTION_REVERTED,
    traits::{CallTracer, TraceOutput},
    types::{Action, ActionResult, CallKind, TraceSet, TxContext},
    OeInspector, StackTracer, TreeTracer,
};
use revm::{
    database::{CacheDB, EmptyDB},
    handler::{MainBuilder, MainContext},
    primitives::{Bytes, TxKind, U256},
    state::{AccountInfo, Bytecode},
    Context, InspectCommitEvm,
};

const EOA: Address = address!("1000000000000000000000000000000000000001");
const ENTRY: Address = address!("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");
const REVERTER: Address = address!("bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb");
const LIBRARY: Address = address!("cccccccccccccccccccccccccccccccccccccccc");

/// CALL(gas, REVERTER, 0, 0, 0, 0, 0); POP; DELEGATECALL(gas, LIBRARY, 0, 0, 0, 0); POP; STOP
fn entry_code() -> Vec<u8> {
    let mut code = vec![0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x73];
    code.extend_from_slice(REVERTER.as_slice());
    code.extend_from_slice(&[0x5a, 0xf1, 0x50]);
    code.extend_from_slice(&[0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x73]);
    code.extend_from_slice(LIBRARY.as_slice());
    code.extend_from_slice(&[0x5a, 0xf4, 0x50, 0x00]);
    code
}

fn deploy(db: &mut CacheDB<EmptyDB>, at: Address, code: Vec<u8>) {
    let bytecode = Bytecode::new_raw(Bytes::from(code));
    db.insert_account_info(
        at,
        AccountInfo {
            balance: U256::ZERO,
            nonce: 1,
            code_hash: bytecode.hash_slow(),
            code: Some(bytecode),
        },
    );
}

fn database() -> CacheDB<EmptyDB> {
    let mut db = CacheDB::new(EmptyDB::default());
    db.insert_account_info(
        EOA,
        AccountInfo {
            balance: U256::from(10).pow(U256::from(18)),
            ..Default::default()
        },
    );
    deploy(&mut db, ENTRY, entry_code());
    // PUSH1 0 PUSH1 0 REVERT
    deploy(&mut db, REVERTER, vec![0x60, 0x00, 0x60, 0x00, 0xfd]);
    deploy(&mut db, LIBRARY, vec![0x00]);
    db
}

/// Executes one transaction from `EOA` with `tracer` attached
fn execute<T>(tracer: T, kind: TxKind, data: Vec<u8>) -> anyhow::Result<TraceSet>
where
    T: CallTracer + TraceOutput<Output = TraceSet> + Clone,
{
    let inspector = OeInspector::new(tracer);
    let mut evm = Context::mainnet()
        .with_db(database())
        .build_mainnet_with_inspector(inspector.clone());
    let tx = revm::context::TxEnv::builder()
        .caller(EOA)
        .kind(kind)
        .data(Bytes::from(data))
        .gas_limit(1_000_000)
        .nonce(0)
        .build_fill();
    let result = evm
        .inspect_commit(tx, inspector)
        .map_err(|err| anyhow::anyhow!("transaction failed: {err:?}"))?;
    anyhow::ensure!(result.is_success(), "unexpected execution result {result:?}");
    Ok(evm.inspector.get_output())
}

fn check_nested_calls(name: &str, set: &TraceSet) {
    let addresses: Vec<_> = set.traces.iter().map(|node| node.trace_address.clone()).collect();
    assert_eq!(addresses, vec![vec![], vec![0], vec![1]], "{name}");
    assert_eq!(set.traces[0].subtraces, 2, "{name}");
    assert!(set.traces[0].result().is_some(), "{name}");

    match &set.traces[1].action {
        Action::Call(call) => {
            assert_eq!(call.call_type, CallKind::Call, "{name}");
            assert_eq!((call.from, call.to), (ENTRY, REVERTER), "{name}");
        }
        other => panic!("{name}: unexpected action {other:?}"),
    }
    assert_eq!(set.traces[1].error(), Some(EXECUTION_REVERTED), "{name}");
    assert_eq!(set.traces[1].result(), None, "{name}");

    match &set.traces[2].action {
        Action::Call(call) => {
            assert_eq!(call.call_type, CallKind::DelegateCall, "{name}");
            assert_eq!((call.from, call.to), (ENTRY, LIBRARY), "{name}");
            assert_eq!(call.value, U256::ZERO, "{name}");
        }
        other => panic!("{name}: unexpected action {other:?}"),
    }
    assert!(set.traces[2].result().is_some(), "{name}");
}

#[test]
fn test_revm_call_revert_and_delegatecall() -> anyhow::Result<()> {
    let stack = execute(StackTracer::new(TxContext::default()), TxKind::Call(ENTRY), Vec::new())?;
    check_nested_calls("stack", &stack);

    let tree = execute(TreeTracer::new(TxContext::default()), TxKind::Call(ENTRY), Vec::new())?;
    check_nested_calls("tree", &tree);
    Ok(())
}

#[test]
fn test_revm_create_reports_new_address() -> anyhow::Result<()> {
    // PUSH1 0 PUSH1 0 RETURN: deploys empty code
    let init = vec![0x60, 0x00, 0x60, 0x00, 0xf3];
    let set = execute(StackTracer::new(TxContext::default()), TxKind::Create, init.clone())?;

    assert_eq!(set.traces.len(), 1);
    match &set.traces[0].action {
        Action::Create(create) => {
            assert_eq!(create.from, EOA);
            assert_eq!(create.init.as_ref(), init.as_slice());
        }
        other => panic!("unexpected action {other:?}"),
    }
    match set.traces[0].result() {
        Some(ActionResult::Create { address, code, .. }) => {
            assert_eq!(*address, Some(EOA.create(0)));
            assert!(code.is_empty());
        }
        other => panic!("unexpected create result {other:?}"),
    }
    Ok(())
}
