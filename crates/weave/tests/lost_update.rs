//! End-to-end scenario 2 (§8): two operations update the same row.
//!
//! Without an ETag compare-and-swap, a plain read-then-write can lose an
//! update: depth-first search must find an interleaving where the
//! later-version update is overwritten by the one that read stale data.
//! With an ETag/CAS retry loop, the property `stored version == max(versions
//! attempted)` holds across every interleaving DFS explores.

use std::sync::Arc;

use weave::{Config, Engine, FailureKind, InterlockedCell, StrategyKind, TaskCtx};

/// A single row with a version counter. `read` and `write` are separate
/// scheduling points, so a strategy can interleave a second operation's
/// `read` between this operation's `read` and `write` — exactly the window
/// the lost-update bug lives in.
struct Row {
    version: InterlockedCell<u64>,
}

impl Row {
    fn new() -> Self {
        Row {
            version: InterlockedCell::new(0),
        }
    }

    fn read(&self) -> u64 {
        self.version.load()
    }

    /// Unconditional overwrite — the buggy path. Not a single interlocked
    /// step: the caller already read `version` in a separate call, so
    /// whatever it observed may be stale by the time this runs.
    fn write_unconditional(&self, ctx: &TaskCtx, new_version: u64) -> Result<(), FailureKind> {
        ctx.yield_now()?;
        self.version.rmw(ctx, |_| new_version)?;
        Ok(())
    }

    /// Compare-and-swap keyed on the version read earlier. Retries against
    /// the freshest value on mismatch, so no update is ever silently
    /// dropped — the later writer always wins.
    fn write_cas(&self, ctx: &TaskCtx, expected: u64, new_version: u64) -> Result<bool, FailureKind> {
        ctx.yield_now()?;
        let mut swapped = false;
        self.version.rmw(ctx, |current| {
            if current == expected {
                swapped = true;
                new_version
            } else {
                current
            }
        })?;
        Ok(swapped)
    }
}

#[test]
fn depth_first_finds_an_interleaving_that_loses_an_update() {
    let mut cfg = Config::default();
    cfg.strategy = StrategyKind::Dfs;
    cfg.iterations = 2000;
    let engine = Engine::new(cfg).unwrap();

    let outcome = engine
        .run_unmonitored(|| {
            |ctx: TaskCtx| {
                let row = Arc::new(Row::new());
                let r1 = row.clone();
                let r2 = row.clone();
                let a = ctx.spawn("update-a", move |ctx| {
                    let seen = r1.read();
                    r1.write_unconditional(&ctx, seen + 1)
                });
                let b = ctx.spawn("update-b", move |ctx| {
                    let seen = r2.read();
                    r2.write_unconditional(&ctx, seen + 1)
                });
                ctx.when_all(&[a, b])?;
                // The bug: two updates attempted, but a racing pair of
                // unconditional writes can leave `version` at 1 instead of 2.
                ctx.assert(row.read() == 2, format!("lost an update: version is {}", row.read()))?;
                Ok(())
            }
        })
        .unwrap();

    assert!(!outcome.is_success(), "DFS should find the interleaving where one write clobbers the other");
    let failing = outcome.failing.unwrap();
    assert!(matches!(failing.result, Err(FailureKind::Assertion { .. })));
}

#[test]
fn cas_retry_never_loses_an_update_across_any_interleaving() {
    let mut cfg = Config::default();
    cfg.strategy = StrategyKind::Dfs;
    cfg.iterations = 2000;
    let engine = Engine::new(cfg).unwrap();

    let outcome = engine
        .run_unmonitored(|| {
            |ctx: TaskCtx| {
                let row = Arc::new(Row::new());
                let r1 = row.clone();
                let r2 = row.clone();
                let a = ctx.spawn("update-a", move |ctx| {
                    loop {
                        let seen = r1.read();
                        if r1.write_cas(&ctx, seen, seen + 1)? {
                            return Ok(());
                        }
                        ctx.yield_now()?;
                    }
                });
                let b = ctx.spawn("update-b", move |ctx| {
                    loop {
                        let seen = r2.read();
                        if r2.write_cas(&ctx, seen, seen + 1)? {
                            return Ok(());
                        }
                        ctx.yield_now()?;
                    }
                });
                ctx.when_all(&[a, b])?;
                ctx.assert(row.read() == 2, format!("both updates should have applied, version is {}", row.read()))?;
                Ok(())
            }
        })
        .unwrap();

    assert!(outcome.is_success(), "{:?}", outcome.failing.map(|f| f.result));
}
