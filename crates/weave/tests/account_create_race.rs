//! End-to-end scenario 1 (§8): two operations each call
//! `create(key="A", payload="p")` against storage that supports
//! `create_if_absent`. Property: in every interleaving, exactly one
//! operation observes success and the other observes conflict.

use std::sync::Arc;

use weave::{Config, Engine, FailureKind, InterlockedCell, StrategyKind, TaskCtx};

/// A single-key `create_if_absent` store. The whole check-then-set is one
/// `InterlockedCell::rmw` call, so it is atomic with respect to every other
/// controlled operation (§4.2 `interlocked_rmw`) — the only question the
/// exploration strategy gets to answer is *which* operation's `rmw` runs
/// first, not whether the two can interleave inside it.
struct KeyStore {
    cell: InterlockedCell<Option<String>>,
}

impl KeyStore {
    fn new() -> Self {
        KeyStore {
            cell: InterlockedCell::new(None),
        }
    }

    /// Returns `true` if this call is the one that created the key.
    fn create_if_absent(&self, ctx: &TaskCtx, payload: &str) -> Result<bool, FailureKind> {
        let mut created = false;
        let payload = payload.to_string();
        self.cell.rmw(ctx, |existing| match existing {
            None => {
                created = true;
                Some(payload.clone())
            }
            Some(v) => Some(v),
        })?;
        Ok(created)
    }
}

fn run_with_strategy(strategy: StrategyKind, iterations: u32) {
    let mut cfg = Config::default();
    cfg.strategy = strategy;
    cfg.iterations = iterations;
    let engine = Engine::new(cfg).unwrap();

    let outcome = engine
        .run_unmonitored(|| {
            |ctx: TaskCtx| {
                let store = Arc::new(KeyStore::new());
                let s1 = store.clone();
                let s2 = store.clone();
                let t1 = ctx.spawn("create-a", move |ctx| s1.create_if_absent(&ctx, "p"));
                let t2 = ctx.spawn("create-b", move |ctx| s2.create_if_absent(&ctx, "p"));
                let results = ctx.when_all(&[t1, t2])?;
                let successes = results.iter().filter(|&&created| created).count();
                ctx.assert(successes == 1, format!("expected exactly one create to win, got {successes}"))?;
                Ok(())
            }
        })
        .unwrap();

    assert!(outcome.is_success(), "{:?}", outcome.failing.map(|f| f.result));
}

#[test]
fn random_strategy_finds_no_bug_across_many_interleavings() {
    run_with_strategy(StrategyKind::Random, 200);
}

#[test]
fn depth_first_confirms_create_and_create_never_both_succeed() {
    run_with_strategy(StrategyKind::Dfs, 500);
}
