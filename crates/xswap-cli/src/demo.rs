//! Two simulated parties swapping across two in-memory ledgers.
//!
//! Alice sells 100 units on chain A for 50 units on chain B. The trade record
//! only moves between the parties as exported JSON, as it would over a real
//! out-of-band channel.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use xswap_protocol::{
    calculate_timelocks, export_trade, import_trade, new_secret_pair, ChainSide, InMemoryLedger,
    InMemoryTradeStore, Leg, ManualClock, PartyIdentity, PartyKey, ProtocolConfig,
    ProtocolDependencies, ProtocolEngine, SwapStatus, SystemTimeSource, TimeSource, Trade,
};

type DemoEngine =
    ProtocolEngine<InMemoryLedger, InMemoryLedger, Arc<InMemoryTradeStore>, ManualClock>;

const AMOUNT_A: u64 = 100;
const AMOUNT_B: u64 = 50;

struct Ledgers {
    clock: ManualClock,
    chain_a: InMemoryLedger,
    chain_b: InMemoryLedger,
}

impl Ledgers {
    fn engine(&self, identity: &PartyIdentity, trade: Trade) -> Result<DemoEngine> {
        let deps = ProtocolDependencies {
            chain_a: self.chain_a.clone(),
            chain_b: self.chain_b.clone(),
            store: Arc::new(InMemoryTradeStore::new()),
            clock: self.clock.clone(),
        };
        Ok(ProtocolEngine::new(
            deps,
            identity.clone(),
            ProtocolConfig::default(),
            trade,
        )?)
    }

    fn log_balances(&self, alice: &PartyIdentity, bob: &PartyIdentity) {
        for (name, who) in [("alice", alice), ("bob", bob)] {
            info!(
                "[xswap] {} balances: chainA={} chainB={}",
                name,
                self.chain_a
                    .balance_of(&who.address(ChainSide::ChainA))
                    .unwrap_or(0),
                self.chain_b
                    .balance_of(&who.address(ChainSide::ChainB))
                    .unwrap_or(0)
            );
        }
    }
}

/// Send `from`'s trade record to `to`.
fn hand_over(from: &DemoEngine, to: &mut DemoEngine) -> Result<()> {
    let json = export_trade(from.trade())?;
    let received = import_trade(&json).context("Counterparty sent an invalid trade")?;
    to.absorb(&received)
        .context("Counterparty trade conflicts with ours")?;
    Ok(())
}

async fn report(step: &str, alice: &DemoEngine, bob: &DemoEngine) -> Result<SwapStatus> {
    let (a, b) = tokio::try_join!(alice.status(), bob.status())?;
    info!(
        "[xswap] {:<32} alice={} ({}) bob={} ({})",
        step,
        a,
        a.code(),
        b,
        b.code()
    );
    if a != b {
        bail!("parties disagree after {}: alice={} bob={}", step, a, b);
    }
    Ok(a)
}

/// Run the demo. With `expire`, the second leg times out and both legs are
/// refunded. Returns the final status both parties agree on.
pub async fn run(expire: bool) -> Result<SwapStatus> {
    let clock = ManualClock::new(SystemTimeSource.now());
    let ledgers = Ledgers {
        chain_a: InMemoryLedger::new("chain-a", Arc::new(clock.clone())),
        chain_b: InMemoryLedger::new("chain-b", Arc::new(clock.clone())),
        clock,
    };

    let alice_id = PartyIdentity::new(PartyKey::generate(), PartyKey::generate());
    let bob_id = PartyIdentity::new(PartyKey::generate(), PartyKey::generate());
    ledgers
        .chain_a
        .fund_account(&alice_id.address(ChainSide::ChainA), 1_000);
    ledgers
        .chain_a
        .fund_account(&bob_id.address(ChainSide::ChainA), 10);
    ledgers
        .chain_b
        .fund_account(&bob_id.address(ChainSide::ChainB), 1_000);
    ledgers
        .chain_b
        .fund_account(&alice_id.address(ChainSide::ChainB), 10);
    ledgers.log_balances(&alice_id, &bob_id);

    let (first_timelock, second_timelock) =
        calculate_timelocks(&ProtocolConfig::default(), ledgers.clock.now());
    let (secret, commitment) = new_secret_pair();
    let trade = Trade::builder(commitment)
        .chain_a(Leg::new(
            "XLM",
            AMOUNT_A,
            alice_id.address(ChainSide::ChainA),
            bob_id.address(ChainSide::ChainA),
            first_timelock,
        ))
        .chain_b(Leg::new(
            "ETH",
            AMOUNT_B,
            bob_id.address(ChainSide::ChainB),
            alice_id.address(ChainSide::ChainB),
            second_timelock,
        ))
        .build()?;
    info!("[xswap] Commitment {}", trade.commitment);

    let mut alice = ledgers.engine(&alice_id, trade.clone())?;
    let mut bob = ledgers.engine(&bob_id, trade)?;
    report("agreed", &alice, &bob).await?;

    alice.prepare_leg(ChainSide::ChainA).await?;
    hand_over(&alice, &mut bob)?;
    report("alice prepared chainA", &alice, &bob).await?;

    bob.create_refund_tx(ChainSide::ChainA).await?;
    hand_over(&bob, &mut alice)?;
    report("bob signed chainA refund", &alice, &bob).await?;

    alice.deposit(ChainSide::ChainA).await?;
    report("alice deposited chainA", &alice, &bob).await?;

    bob.prepare_leg(ChainSide::ChainB).await?;
    hand_over(&bob, &mut alice)?;
    alice.create_refund_tx(ChainSide::ChainB).await?;
    hand_over(&alice, &mut bob)?;
    report("alice signed chainB refund", &alice, &bob).await?;

    bob.deposit(ChainSide::ChainB).await?;
    report("bob deposited chainB", &alice, &bob).await?;

    let status = if expire {
        ledgers.clock.set(second_timelock + 1);
        report("chainB timelock passed", &alice, &bob).await?;

        bob.refund(ChainSide::ChainB).await?;
        report("bob refunded chainB", &alice, &bob).await?;

        match alice.fulfill(ChainSide::ChainB, &secret).await {
            Ok(tx) => bail!("late withdrawal unexpectedly accepted: {}", tx),
            Err(e) => warn!("[xswap] Late withdrawal rejected: {}", e),
        }

        ledgers.clock.set(first_timelock + 1);
        alice.refund(ChainSide::ChainA).await?;
        report("alice refunded chainA", &alice, &bob).await?
    } else {
        alice.fulfill(ChainSide::ChainB, &secret).await?;
        report("alice withdrew chainB", &alice, &bob).await?;

        let revealed = bob
            .revealed_secret(ChainSide::ChainB)
            .await?
            .context("chainB withdrawal did not reveal the secret")?;
        bob.fulfill(ChainSide::ChainA, &revealed).await?;
        report("bob withdrew chainA", &alice, &bob).await?
    };

    ledgers.log_balances(&alice_id, &bob_id);
    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_demo_finalises() {
        assert_eq!(run(false).await.unwrap(), SwapStatus::Finalised);
    }

    #[tokio::test]
    async fn test_demo_expires() {
        assert_eq!(run(true).await.unwrap(), SwapStatus::Expired);
    }
}
