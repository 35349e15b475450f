/// Integration tests using Alice & Bob test accounts
///
/// Drives the engine end to end through `AppState`, with a manual clock and
/// the in-memory treasury standing in for custody.

use parimutuel_ledger::math::units;
use parimutuel_ledger::{
    Address, AppConfig, AppState, EngineError, ManualClock, MarketId, NewMarket, Outcome, Side, TransferStatus,
};
use std::sync::Arc;

// ============================================================================
// TEST ACCOUNT CONSTANTS
// ============================================================================

const ALICE: &str = "alice";
const BOB: &str = "bob";
const CAROL: &str = "carol";
const ORACLE: &str = "oracle";
const FEE_RECIPIENT: &str = "treasury";

const START: i64 = 1_000;
const END: i64 = 2_000;

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

fn addr(name: &str) -> Address {
    Address::from(name)
}

/// Fresh engine at t=1000 with every test account funded with 1000 units
fn setup() -> (AppState, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(START));
    let state = AppState::with_clock(&AppConfig::default(), clock.clone()).unwrap();
    for name in [ALICE, BOB, CAROL] {
        state.treasury.deposit(&addr(name), units(1_000)).unwrap();
    }
    (state, clock)
}

fn create_market(state: &AppState, question: &str) -> MarketId {
    let fee = state.engine.market_creation_fee();
    state
        .engine
        .create_market(
            &addr(ALICE),
            NewMarket {
                question: question.into(),
                description: "integration".into(),
                category: "test".into(),
                end_time: END,
                resolution_time: END + 1_000,
            },
            fee,
        )
        .unwrap()
}

/// Custody must always cover every pool plus unwithdrawn fees
fn assert_custody_covers(state: &AppState) {
    let markets = state.engine.list_markets();
    let pools: u128 = markets.iter().map(|m| m.total_pool).sum();
    assert!(
        state.treasury.custody_balance() >= pools + state.engine.accrued_fees(),
        "custody {} below pools {} + fees {}",
        state.treasury.custody_balance(),
        pools,
        state.engine.accrued_fees()
    );
}

// ============================================================================
// TRADING & SETTLEMENT FLOW
// ============================================================================

#[test]
fn test_alice_bob_full_market_lifecycle() {
    let (state, clock) = setup();
    let engine = &state.engine;
    let id = create_market(&state, "Will it rain tomorrow?");
    assert_eq!(engine.get_current_price(id, Side::Yes).unwrap(), 5_000);

    // Alice buys YES at an even market: 10 units -> 20 shares
    let alice_buy = engine.buy_shares(id, &addr(ALICE), Side::Yes, units(10)).unwrap();
    assert_eq!(alice_buy.shares, units(20));
    assert!(engine.get_current_price(id, Side::Yes).unwrap() > 5_000);

    // Bob takes the other side
    let bob_buy = engine.buy_shares(id, &addr(BOB), Side::No, units(10)).unwrap();
    assert_eq!(bob_buy.shares, units(22));

    let market = engine.get_market(id).unwrap();
    assert_eq!(market.yes_pool, units(10));
    assert_eq!(market.no_pool, units(10));
    assert_eq!(market.yes_price_bps + market.no_price_bps, 10_000);
    assert_eq!(engine.get_user_markets(&addr(BOB)), vec![id]);
    assert_custody_covers(&state);

    clock.set(END);
    let resolution = engine.resolve_market(id, &addr(ORACLE), Outcome::Yes).unwrap();
    assert_eq!(resolution.total_payout, units(10));

    let before = state.treasury.balance(&addr(ALICE));
    let claim = engine.claim_winnings(id, &addr(ALICE)).unwrap();
    println!("🏆 Alice claim: {:?}", claim);
    assert_eq!(claim.receipt.gross, units(10));
    assert_eq!(claim.receipt.fee, units(2) / 10);
    assert_eq!(claim.receipt.net, units(98) / 10);
    assert_eq!(claim.transfer, TransferStatus::Paid);
    assert_eq!(state.treasury.balance(&addr(ALICE)) - before, units(98) / 10);

    // Bob lost
    assert_eq!(
        engine.claim_winnings(id, &addr(BOB)).unwrap_err(),
        EngineError::NothingToClaim(id)
    );
    assert!(state.treasury.verify_journal());
}

#[test]
fn test_second_claim_is_rejected() {
    let (state, clock) = setup();
    let engine = &state.engine;
    let id = create_market(&state, "Double claim?");
    engine.buy_shares(id, &addr(ALICE), Side::Yes, units(5)).unwrap();
    engine.buy_shares(id, &addr(BOB), Side::No, units(5)).unwrap();
    clock.set(END);
    engine.resolve_market(id, &addr(ORACLE), Outcome::Yes).unwrap();

    engine.claim_winnings(id, &addr(ALICE)).unwrap();
    let balance = state.treasury.balance(&addr(ALICE));
    assert_eq!(
        engine.claim_winnings(id, &addr(ALICE)).unwrap_err(),
        EngineError::NothingToClaim(id)
    );
    assert_eq!(state.treasury.balance(&addr(ALICE)), balance);
}

#[test]
fn test_batch_payout_matches_individual_claims() {
    let (state, clock) = setup();
    let engine = &state.engine;
    let single = create_market(&state, "Single claims");
    let batch = create_market(&state, "Batch claims");
    for id in [single, batch] {
        engine.buy_shares(id, &addr(ALICE), Side::Yes, units(7)).unwrap();
        engine.buy_shares(id, &addr(BOB), Side::Yes, units(3)).unwrap();
        engine.buy_shares(id, &addr(CAROL), Side::No, units(11)).unwrap();
    }
    clock.set(END);
    engine.resolve_market(single, &addr(ORACLE), Outcome::Yes).unwrap();
    engine.resolve_market(batch, &addr(ORACLE), Outcome::Yes).unwrap();

    let alice = engine.claim_winnings(single, &addr(ALICE)).unwrap();
    let bob = engine.claim_winnings(single, &addr(BOB)).unwrap();

    let report = engine
        .batch_payout_winners(batch, &[addr(ALICE), addr(BOB), addr(ALICE), addr(CAROL)])
        .unwrap();
    assert_eq!(report.claims.len(), 2);
    assert_eq!(report.skipped, vec![addr(ALICE), addr(CAROL)]);
    assert!(report.deferred.is_empty());
    assert_eq!(report.total_paid, alice.receipt.net + bob.receipt.net);
    assert_eq!(report.total_fees, alice.receipt.fee + bob.receipt.fee);
    assert!(report.total_paid + report.total_fees <= units(11));
}

#[test]
fn test_invalid_outcome_refunds_both_sides_without_fee() {
    let (state, clock) = setup();
    let engine = &state.engine;
    let id = create_market(&state, "Cancelled event");
    engine.buy_shares(id, &addr(ALICE), Side::Yes, units(10)).unwrap();
    engine.buy_shares(id, &addr(BOB), Side::No, units(4)).unwrap();
    clock.set(END);

    let resolution = engine.resolve_market(id, &addr(ORACLE), Outcome::Invalid).unwrap();
    assert_eq!(resolution.total_payout, units(14));

    let alice = engine.claim_winnings(id, &addr(ALICE)).unwrap();
    assert_eq!(alice.receipt.gross, units(10));
    assert_eq!(alice.receipt.fee, 0);
    let bob = engine.claim_winnings(id, &addr(BOB)).unwrap();
    assert_eq!(bob.receipt.net, units(4));
    assert_eq!(state.treasury.balance(&addr(BOB)), units(1_000));
}

// ============================================================================
// AUTHORIZATION & LIFECYCLE
// ============================================================================

#[test]
fn test_only_authority_resolves_once() {
    let (state, _clock) = setup();
    let engine = &state.engine;
    let id = create_market(&state, "Who decides?");

    assert!(matches!(
        engine.resolve_market(id, &addr(ALICE), Outcome::Yes),
        Err(EngineError::Unauthorized(_))
    ));
    engine.resolve_market(id, &addr(ORACLE), Outcome::No).unwrap();
    assert_eq!(
        engine.resolve_market(id, &addr(ORACLE), Outcome::Yes).unwrap_err(),
        EngineError::AlreadyResolved(id)
    );
    assert_eq!(engine.get_market(id).unwrap().outcome, Outcome::No);
}

#[test]
fn test_trading_closes_at_end_time() {
    let (state, clock) = setup();
    let engine = &state.engine;
    let id = create_market(&state, "Late trade?");
    engine.buy_shares(id, &addr(ALICE), Side::Yes, units(1)).unwrap();

    clock.set(END);
    assert_eq!(
        engine.buy_shares(id, &addr(BOB), Side::Yes, units(1)).unwrap_err(),
        EngineError::MarketNotActive(id)
    );
    assert!(engine.get_active_markets().is_empty());
}

#[test]
fn test_claim_before_resolution_fails() {
    let (state, _clock) = setup();
    let engine = &state.engine;
    let id = create_market(&state, "Too early");
    engine.buy_shares(id, &addr(ALICE), Side::Yes, units(1)).unwrap();
    assert_eq!(
        engine.claim_winnings(id, &addr(ALICE)).unwrap_err(),
        EngineError::NotResolved(id)
    );
}

// ============================================================================
// ORDER BOOK
// ============================================================================

#[test]
fn test_escrowed_shares_cannot_be_sold_twice() {
    let (state, _clock) = setup();
    let engine = &state.engine;
    let id = create_market(&state, "Escrow");
    engine.buy_shares(id, &addr(ALICE), Side::Yes, units(10)).unwrap();

    let order_id = engine
        .place_sell_order(id, &addr(ALICE), Side::Yes, units(15), units(1) / 2)
        .unwrap();
    let position = engine.get_user_position(id, &addr(ALICE)).unwrap();
    assert_eq!(position.yes_escrowed, units(15));

    assert!(matches!(
        engine.sell_shares(id, &addr(ALICE), Side::Yes, units(10)),
        Err(EngineError::InsufficientShares { .. })
    ));

    let cancelled = engine.cancel_sell_order(order_id, &addr(ALICE)).unwrap();
    assert!(cancelled.cancelled);
    assert_eq!(engine.get_user_position(id, &addr(ALICE)).unwrap().yes_escrowed, 0);
    engine.sell_shares(id, &addr(ALICE), Side::Yes, units(10)).unwrap();
}

#[test]
fn test_fill_moves_shares_and_pays_seller() {
    let (state, _clock) = setup();
    let engine = &state.engine;
    let id = create_market(&state, "Peer to peer");
    engine.buy_shares(id, &addr(ALICE), Side::Yes, units(10)).unwrap();
    let order_id = engine
        .place_sell_order(id, &addr(ALICE), Side::Yes, units(10), units(1) / 2)
        .unwrap();

    assert!(matches!(
        engine.cancel_sell_order(order_id, &addr(BOB)),
        Err(EngineError::Unauthorized(_))
    ));

    let pools_before = engine.get_market(id).unwrap().total_pool;
    let alice_before = state.treasury.balance(&addr(ALICE));
    let fill = engine.buy_from_sell_order(order_id, &addr(BOB), units(5)).unwrap();
    assert_eq!(fill.seller_transfer, TransferStatus::Paid);
    assert_eq!(state.treasury.balance(&addr(ALICE)) - alice_before, units(5));
    assert_eq!(engine.get_user_position(id, &addr(BOB)).unwrap().yes_shares, units(10));
    assert_eq!(engine.get_user_position(id, &addr(ALICE)).unwrap().yes_shares, units(10));
    assert_eq!(engine.get_market(id).unwrap().total_pool, pools_before);

    assert_eq!(
        engine.buy_from_sell_order(order_id, &addr(CAROL), units(5)).unwrap_err(),
        EngineError::OrderNotOpen(order_id)
    );
    assert_custody_covers(&state);
}

#[test]
fn test_resolution_cancels_open_orders() {
    let (state, _clock) = setup();
    let engine = &state.engine;
    let id = create_market(&state, "Orders at resolution");
    engine.buy_shares(id, &addr(ALICE), Side::Yes, units(10)).unwrap();
    engine.buy_shares(id, &addr(BOB), Side::No, units(10)).unwrap();
    let order_id = engine
        .place_sell_order(id, &addr(ALICE), Side::Yes, units(5), units(1) / 2)
        .unwrap();

    let resolution = engine.resolve_market(id, &addr(ORACLE), Outcome::Yes).unwrap();
    assert_eq!(resolution.cancelled_orders.len(), 1);
    assert!(engine.get_open_orders(id).unwrap().is_empty());
    assert!(engine.get_order(order_id).unwrap().cancelled);

    // Formerly escrowed shares are claimable
    let claim = engine.claim_winnings(id, &addr(ALICE)).unwrap();
    assert_eq!(claim.receipt.shares_burned, units(20));
}

#[test]
fn test_limit_order_fills_book_then_curve() {
    let (state, _clock) = setup();
    let engine = &state.engine;
    let id = create_market(&state, "Limit orders");
    engine.buy_shares(id, &addr(ALICE), Side::Yes, units(10)).unwrap();
    engine
        .place_sell_order(id, &addr(ALICE), Side::Yes, units(10), units(3) / 10)
        .unwrap();

    let receipt = engine
        .place_limit_order(id, &addr(BOB), Side::Yes, 6_000, units(5))
        .unwrap();
    assert_eq!(receipt.report.fills.len(), 1);
    assert_eq!(receipt.report.fills[0].cost, units(3));
    let leg = receipt.report.curve_leg.as_ref().unwrap();
    assert_eq!(leg.amount, units(2));
    assert_eq!(receipt.report.total_shares, units(10) + leg.shares);
    assert_eq!(state.treasury.balance(&addr(BOB)), units(995));
    assert_custody_covers(&state);
}

#[test]
fn test_limit_order_above_limit_changes_nothing() {
    let (state, _clock) = setup();
    let engine = &state.engine;
    let id = create_market(&state, "Strict limit");
    engine.buy_shares(id, &addr(ALICE), Side::Yes, units(50)).unwrap();
    let before = engine.get_market(id).unwrap();

    let err = engine
        .place_limit_order(id, &addr(BOB), Side::Yes, 5_000, units(5))
        .unwrap_err();
    assert_eq!(err, EngineError::PriceLimitExceeded { limit_bps: 5_000 });
    assert_eq!(state.treasury.balance(&addr(BOB)), units(1_000));
    assert_eq!(engine.get_market(id).unwrap().yes_pool, before.yes_pool);
}

// ============================================================================
// FAILED TRANSFERS & FEES
// ============================================================================

#[test]
fn test_rejected_payout_becomes_owed() {
    let (state, clock) = setup();
    let engine = &state.engine;
    let id = create_market(&state, "Stubborn recipient");
    engine.buy_shares(id, &addr(ALICE), Side::Yes, units(10)).unwrap();
    engine.buy_shares(id, &addr(BOB), Side::No, units(10)).unwrap();
    clock.set(END);
    engine.resolve_market(id, &addr(ORACLE), Outcome::Yes).unwrap();

    state.treasury.reject_payments_to(&addr(ALICE));
    let claim = engine.claim_winnings(id, &addr(ALICE)).unwrap();
    assert!(!claim.transfer.is_paid());
    assert_eq!(engine.owed_balance(&addr(ALICE)), claim.receipt.net);
    assert!(matches!(
        engine.withdraw_owed(&addr(ALICE)),
        Err(EngineError::TransferFailed(_))
    ));
    assert_eq!(engine.owed_balance(&addr(ALICE)), claim.receipt.net);

    state.treasury.accept_payments_to(&addr(ALICE));
    let before = state.treasury.balance(&addr(ALICE));
    assert_eq!(engine.withdraw_owed(&addr(ALICE)).unwrap(), claim.receipt.net);
    assert_eq!(state.treasury.balance(&addr(ALICE)) - before, claim.receipt.net);
    assert_eq!(engine.owed_balance(&addr(ALICE)), 0);
}

#[test]
fn test_fees_flow_to_recipient() {
    let (state, clock) = setup();
    let engine = &state.engine;
    let id = create_market(&state, "Fee accounting");
    engine.buy_shares(id, &addr(ALICE), Side::Yes, units(10)).unwrap();
    engine.buy_shares(id, &addr(BOB), Side::No, units(10)).unwrap();
    clock.set(END);
    engine.resolve_market(id, &addr(ORACLE), Outcome::Yes).unwrap();
    engine.claim_winnings(id, &addr(ALICE)).unwrap();

    let expected = engine.market_creation_fee() + units(2) / 10;
    assert_eq!(engine.accrued_fees(), expected);
    assert!(matches!(
        engine.withdraw_fees(&addr(BOB)),
        Err(EngineError::Unauthorized(_))
    ));
    assert_eq!(engine.withdraw_fees(&addr(FEE_RECIPIENT)).unwrap(), expected);
    assert_eq!(state.treasury.balance(&addr(FEE_RECIPIENT)), expected);
    assert_eq!(engine.accrued_fees(), 0);
}

#[test]
fn test_events_record_market_history() {
    let (state, clock) = setup();
    let engine = &state.engine;
    let id = create_market(&state, "Event log");
    engine.buy_shares(id, &addr(ALICE), Side::Yes, units(1)).unwrap();
    clock.set(END);
    engine.resolve_market(id, &addr(ORACLE), Outcome::Yes).unwrap();

    let recent = engine.events().recent(10, Some(id));
    assert_eq!(recent.len(), 3);
    let newest = serde_json::to_value(&recent[0]).unwrap();
    assert_eq!(newest["type"], "market_resolved");
}

// ============================================================================
// CONCURRENCY
// ============================================================================

#[test]
fn test_concurrent_claims_pay_exactly_once() {
    let (state, clock) = setup();
    let engine = &state.engine;
    let id = create_market(&state, "Racing claims");
    engine.buy_shares(id, &addr(ALICE), Side::Yes, units(10)).unwrap();
    engine.buy_shares(id, &addr(BOB), Side::No, units(20)).unwrap();
    clock.set(END);
    engine.resolve_market(id, &addr(ORACLE), Outcome::Yes).unwrap();

    let before = state.treasury.balance(&addr(ALICE));
    let results: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..16)
            .map(|_| scope.spawn(|| engine.claim_winnings(id, &addr(ALICE))))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let paid: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(paid.len(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| *e == EngineError::NothingToClaim(id)));

    // 2% withheld from the 20 unit losing pool
    let net = paid[0].receipt.net;
    assert_eq!(net, units(196) / 10);
    assert_eq!(state.treasury.balance(&addr(ALICE)) - before, net);
    assert_custody_covers(&state);
}

#[test]
fn test_concurrent_buys_keep_custody_equal_to_pool() {
    let (state, _clock) = setup();
    let engine = &state.engine;
    let id = create_market(&state, "Racing buys");

    std::thread::scope(|scope| {
        for (name, side) in [(ALICE, Side::Yes), (BOB, Side::No), (CAROL, Side::Yes)] {
            scope.spawn(move || {
                for _ in 0..25 {
                    engine.buy_shares(id, &addr(name), side, units(2)).unwrap();
                }
            });
        }
    });

    let market = engine.get_market(id).unwrap();
    assert_eq!(market.total_pool, units(150));
    assert_eq!(market.yes_pool, units(100));
    assert_eq!(
        state.treasury.custody_balance(),
        market.total_pool + engine.accrued_fees()
    );
    let creation_fee = engine.market_creation_fee();
    assert_eq!(state.treasury.balance(&addr(ALICE)), units(950) - creation_fee);
    assert_eq!(state.treasury.balance(&addr(BOB)), units(950));
    assert_eq!(state.treasury.balance(&addr(CAROL)), units(950));
    assert!(state.treasury.verify_journal());
}
