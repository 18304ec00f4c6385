//! Service-level integration tests against in-memory collaborators

use hive_core::{StrategyKind, BASIS_POINT_MAX};
use hive_liquidity::config::ServiceConfig;
use hive_liquidity::core::{Claims, ServiceError};
use hive_liquidity::program::{discriminator, PROGRAM_ID};
use hive_liquidity::services::liquidity::{AddLiquidity, AddLiquidityOutcome, CreatePool, RemoveLiquidity};
use hive_liquidity::services::swap::SwapRequest;
use hive_liquidity::testing::{fund, program_account, Harness, PoolFixture};
use rust_decimal::Decimal;
use solana_sdk::{pubkey::Pubkey, signature::Signature, transaction::Transaction};
use spl_associated_token_account::get_associated_token_address;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

const SOL: u64 = 1_000_000_000;

fn native_mint() -> Pubkey {
    spl_token::native_mint::id()
}

fn create_request(community_id: Uuid, token_mint: Pubkey, user: Pubkey) -> CreatePool {
    CreatePool {
        community_id,
        token_mint,
        sol_amount: Decimal::from(2),
        token_amount: Decimal::from(1_000),
        token_decimals: 6,
        bin_step: 25,
        initial_price: Decimal::from_str("0.05").unwrap(),
        user,
    }
}

/// Program instruction payloads of `transaction` whose discriminator is `name`
fn program_payloads(transaction: &Transaction, name: &str) -> Vec<Vec<u8>> {
    let tag = discriminator("global", name);
    let keys = &transaction.message.account_keys;
    transaction
        .message
        .instructions
        .iter()
        .filter(|ix| keys[ix.program_id_index as usize] == PROGRAM_ID)
        .filter(|ix| ix.data.len() >= 8 && ix.data[..8] == tag)
        .map(|ix| ix.data[8..].to_vec())
        .collect()
}

/// `(from_bin_id, to_bin_id, bps)` of each removal instruction
fn removal_ranges(transaction: &Transaction) -> Vec<(i32, i32, u16)> {
    program_payloads(transaction, "remove_liquidity_by_range")
        .into_iter()
        .map(|data| {
            (
                i32::from_le_bytes(data[0..4].try_into().unwrap()),
                i32::from_le_bytes(data[4..8].try_into().unwrap()),
                u16::from_le_bytes(data[8..10].try_into().unwrap()),
            )
        })
        .collect()
}

/// Pool between a fresh community token and wrapped SOL, with its community
fn community_pool(harness: &Harness, active_bin: i32) -> (Claims, Uuid, Pubkey, PoolFixture) {
    let token_mint = Pubkey::new_unique();
    let fixture = PoolFixture::with_mints(token_mint, native_mint(), active_bin).install(&harness.ledger);
    let (claims, community) = harness.creator(token_mint, Some(fixture.address()));
    (claims, community.id, token_mint, fixture)
}

fn deposit_amounts(fixture: &PoolFixture, token_mint: &Pubkey, token: Decimal, sol: Decimal) -> (Decimal, Decimal) {
    if fixture.state().token_x == *token_mint {
        (token, sol)
    } else {
        (sol, token)
    }
}

#[tokio::test]
async fn test_create_pool_records_pool_and_cosigns() {
    let harness = Harness::new();
    let token_mint = Pubkey::new_unique();
    let (claims, community) = harness.creator(token_mint, None);
    fund(&harness.ledger, &claims.wallet, &token_mint, 5_000 * 1_000_000);
    harness.ledger.set_balance(claims.wallet, 10 * SOL);

    let created = harness
        .ctx
        .liquidity()
        .create_pool(&claims, create_request(community.id, token_mint, claims.wallet))
        .await
        .unwrap();

    let stored = harness.store.community(&community.id).unwrap();
    assert_eq!(stored.pool_address, Some(created.pool_address));
    assert_ne!(created.active_bin, 0);
    assert_eq!(created.strategy.kind, StrategyKind::Balanced);

    let transaction = &created.transaction.transaction;
    assert_eq!(transaction.message.account_keys[0], claims.wallet);
    assert_eq!(transaction.message.recent_blockhash, harness.ledger.blockhash());
    assert_eq!(created.transaction.ephemeral_signer, Some(created.position_address));
    assert_eq!(transaction.signatures[0], Signature::default());
    let position_slot = transaction
        .message
        .account_keys
        .iter()
        .position(|key| *key == created.position_address)
        .unwrap();
    assert_ne!(transaction.signatures[position_slot], Signature::default());
    assert_eq!(program_payloads(transaction, "initialize_lb_pair").len(), 1);
    assert_eq!(program_payloads(transaction, "add_liquidity_by_strategy").len(), 1);
}

#[tokio::test]
async fn test_create_pool_rejects_existing_pool() {
    let harness = Harness::new();
    let token_mint = Pubkey::new_unique();
    let (claims, community) = harness.creator(token_mint, None);
    fund(&harness.ledger, &claims.wallet, &token_mint, 5_000 * 1_000_000);
    harness.ledger.set_balance(claims.wallet, 10 * SOL);

    let liquidity = harness.ctx.liquidity();
    let created = liquidity
        .create_pool(&claims, create_request(community.id, token_mint, claims.wallet))
        .await
        .unwrap();

    // an abandoned create can be rebuilt
    let rebuilt = liquidity
        .create_pool(&claims, create_request(community.id, token_mint, claims.wallet))
        .await
        .unwrap();
    assert_eq!(rebuilt.pool_address, created.pool_address);

    harness.ledger.insert(created.pool_address, program_account(vec![0u8; 16]));
    let result = liquidity
        .create_pool(&claims, create_request(community.id, token_mint, claims.wallet))
        .await;
    assert!(matches!(result, Err(ServiceError::Validation(_))));
}

#[tokio::test]
async fn test_create_pool_requires_creator_and_supported_step() {
    let harness = Harness::new();
    let token_mint = Pubkey::new_unique();
    let (claims, community) = harness.creator(token_mint, None);

    let outsider = Claims {
        subject: Uuid::new_v4(),
        wallet: Pubkey::new_unique(),
    };
    let result = harness
        .ctx
        .liquidity()
        .create_pool(&outsider, create_request(community.id, token_mint, outsider.wallet))
        .await;
    assert!(matches!(result, Err(ServiceError::Authorization(_))));

    let mut request = create_request(community.id, token_mint, claims.wallet);
    request.bin_step = 7;
    let result = harness.ctx.liquidity().create_pool(&claims, request).await;
    assert!(matches!(result, Err(ServiceError::Validation(_))));

    let mut request = create_request(community.id, Pubkey::new_unique(), claims.wallet);
    request.bin_step = 25;
    let result = harness.ctx.liquidity().create_pool(&claims, request).await;
    assert!(matches!(result, Err(ServiceError::Validation(_))));
}

#[tokio::test]
async fn test_create_pool_with_empty_holding_account_reports_zero_available() {
    let harness = Harness::new();
    let token_mint = Pubkey::new_unique();
    let (claims, community) = harness.creator(token_mint, None);
    fund(&harness.ledger, &claims.wallet, &token_mint, 0);
    harness.ledger.set_balance(claims.wallet, 10 * SOL);

    let result = harness
        .ctx
        .liquidity()
        .create_pool(&claims, create_request(community.id, token_mint, claims.wallet))
        .await;
    match result {
        Err(ServiceError::InsufficientFunds { mint, available, required }) => {
            assert_eq!(mint, token_mint.to_string());
            assert_eq!(available, 0);
            assert_eq!(required, 1_000 * 1_000_000);
        }
        other => panic!("expected insufficient funds, got {:?}", other),
    }
    assert_eq!(harness.store.community(&community.id).unwrap().pool_address, None);
}

#[tokio::test]
async fn test_create_pool_without_holding_account_reports_zero_available() {
    let harness = Harness::new();
    let token_mint = Pubkey::new_unique();
    let (claims, community) = harness.creator(token_mint, None);
    harness.ledger.set_balance(claims.wallet, 10 * SOL);

    let result = harness
        .ctx
        .liquidity()
        .create_pool(&claims, create_request(community.id, token_mint, claims.wallet))
        .await;
    assert!(matches!(
        result,
        Err(ServiceError::InsufficientFunds { available: 0, .. })
    ));
}

#[tokio::test]
async fn test_add_liquidity_times_out_when_pool_never_appears() {
    let harness = Harness::new();
    let token_mint = Pubkey::new_unique();
    let pool = Pubkey::new_unique();
    let (claims, community) = harness.creator(token_mint, Some(pool));

    let result = harness
        .ctx
        .liquidity()
        .add_liquidity(
            &claims,
            AddLiquidity {
                community_id: community.id,
                pool_address: pool,
                token_x_amount: Decimal::ONE,
                token_y_amount: Decimal::ONE,
                user: claims.wallet,
                slippage_bps: None,
            },
        )
        .await;

    match result {
        Err(err @ ServiceError::PropagationTimeout { .. }) => {
            assert!(err.is_retryable());
            let ServiceError::PropagationTimeout { account, attempts } = err else {
                unreachable!()
            };
            assert_eq!(account, pool.to_string());
            assert_eq!(attempts, 40);
        }
        other => panic!("expected propagation timeout, got {:?}", other),
    }
    assert!(harness.clock.elapsed() < Duration::from_secs(100));
}

#[tokio::test]
async fn test_add_liquidity_waits_for_fresh_pool() {
    let harness = Harness::new();
    let token_mint = Pubkey::new_unique();
    let fixture = PoolFixture::with_mints(token_mint, native_mint(), 100).install(&harness.ledger);
    let account = harness.ledger.account(&fixture.address()).unwrap();
    harness.ledger.insert_delayed(fixture.address(), account, 3);
    let (claims, community) = harness.creator(token_mint, Some(fixture.address()));
    fund(&harness.ledger, &claims.wallet, &token_mint, 100 * SOL);
    harness.ledger.set_balance(claims.wallet, 10 * SOL);

    let (x, y) = deposit_amounts(&fixture, &token_mint, Decimal::from(10), Decimal::ZERO);
    let outcome = harness
        .ctx
        .liquidity()
        .add_liquidity(
            &claims,
            AddLiquidity {
                community_id: community.id,
                pool_address: fixture.address(),
                token_x_amount: x,
                token_y_amount: y,
                user: claims.wallet,
                slippage_bps: Some(50),
            },
        )
        .await
        .unwrap();

    assert!(matches!(outcome, AddLiquidityOutcome::Ready { .. }));
    assert_eq!(harness.clock.sleeps().len(), 3);
}

#[tokio::test]
async fn test_add_liquidity_two_phase_holding_account() {
    let harness = Harness::new();
    let (claims, community_id, token_mint, fixture) = community_pool(&harness, 100);
    harness.ledger.set_balance(claims.wallet, 10 * SOL);

    let (x, y) = deposit_amounts(&fixture, &token_mint, Decimal::from(10), Decimal::ONE);
    let request = AddLiquidity {
        community_id,
        pool_address: fixture.address(),
        token_x_amount: x,
        token_y_amount: y,
        user: claims.wallet,
        slippage_bps: None,
    };

    let liquidity = harness.ctx.liquidity();
    match liquidity.add_liquidity(&claims, request.clone()).await.unwrap() {
        AddLiquidityOutcome::HoldingAccountRequired {
            transaction,
            holding_account,
            mint,
        } => {
            assert_eq!(mint, token_mint);
            assert_eq!(holding_account, get_associated_token_address(&claims.wallet, &token_mint));
            assert_eq!(transaction.fee_payer, claims.wallet);
            assert!(transaction.encode().is_ok());
        }
        other => panic!("expected holding account request, got {:?}", other),
    }

    fund(&harness.ledger, &claims.wallet, &token_mint, 100 * SOL);
    match liquidity.add_liquidity(&claims, request).await.unwrap() {
        AddLiquidityOutcome::Ready {
            transaction,
            position_address,
            active_bin,
            strategy,
        } => {
            assert_eq!(active_bin, 100);
            assert_eq!(strategy.kind, StrategyKind::Balanced);
            assert_eq!((strategy.range.min_bin, strategy.range.max_bin), (95, 105));
            assert_eq!(transaction.ephemeral_signer, Some(position_address));
        }
        other => panic!("expected deposit transaction, got {:?}", other),
    }
}

#[tokio::test]
async fn test_add_liquidity_rejects_foreign_pool() {
    let harness = Harness::new();
    let (claims, community_id, _, _) = community_pool(&harness, 100);
    let other = PoolFixture::new(100).install(&harness.ledger);

    let result = harness
        .ctx
        .liquidity()
        .add_liquidity(
            &claims,
            AddLiquidity {
                community_id,
                pool_address: other.address(),
                token_x_amount: Decimal::ONE,
                token_y_amount: Decimal::ONE,
                user: claims.wallet,
                slippage_bps: None,
            },
        )
        .await;
    assert!(matches!(result, Err(ServiceError::Validation(_))));
}

#[tokio::test]
async fn test_add_liquidity_with_empty_holding_account_is_insufficient_funds() {
    let harness = Harness::new();
    let (claims, community_id, token_mint, fixture) = community_pool(&harness, 100);
    fund(&harness.ledger, &claims.wallet, &token_mint, 0);
    harness.ledger.set_balance(claims.wallet, 10 * SOL);

    let (x, y) = deposit_amounts(&fixture, &token_mint, Decimal::from(10), Decimal::ZERO);
    let result = harness
        .ctx
        .liquidity()
        .add_liquidity(
            &claims,
            AddLiquidity {
                community_id,
                pool_address: fixture.address(),
                token_x_amount: x,
                token_y_amount: y,
                user: claims.wallet,
                slippage_bps: None,
            },
        )
        .await;

    // an existing but empty account is a shortfall, not a setup step
    match result {
        Err(ServiceError::InsufficientFunds { mint, available, required }) => {
            assert_eq!(mint, token_mint.to_string());
            assert_eq!(available, 0);
            assert_eq!(required, 10 * SOL);
        }
        other => panic!("expected insufficient funds, got {:?}", other),
    }
}

#[tokio::test]
async fn test_add_liquidity_mint_read_failure_is_transient() {
    let harness = Harness::new();
    let (claims, community_id, token_mint, fixture) = community_pool(&harness, 100);
    fund(&harness.ledger, &claims.wallet, &token_mint, 100 * SOL);
    harness.ledger.set_balance(claims.wallet, 10 * SOL);
    harness.ledger.fail_reads_of(token_mint);

    let (x, y) = deposit_amounts(&fixture, &token_mint, Decimal::from(10), Decimal::ZERO);
    let err = harness
        .ctx
        .liquidity()
        .add_liquidity(
            &claims,
            AddLiquidity {
                community_id,
                pool_address: fixture.address(),
                token_x_amount: x,
                token_y_amount: y,
                user: claims.wallet,
                slippage_bps: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::TransientRpc(_)));
    assert_eq!(err.status_code(), axum::http::StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_remove_liquidity_chunks_in_bin_order_then_closes() {
    let harness = Harness::new();
    let fixture = PoolFixture::new(20).install(&harness.ledger);
    let owner = Pubkey::new_unique();
    let position = fixture.add_position(&harness.ledger, owner, -10, 150, 5, 5);
    let claims = Claims {
        subject: Uuid::new_v4(),
        wallet: owner,
    };

    let transactions = harness
        .ctx
        .liquidity()
        .remove_liquidity(
            &claims,
            RemoveLiquidity {
                user: owner,
                position_address: position,
                bps: BASIS_POINT_MAX,
                claim_and_close: true,
            },
        )
        .await
        .unwrap();

    assert_eq!(transactions.len(), 4);
    let ranges: Vec<(i32, i32, u16)> = transactions[..3]
        .iter()
        .flat_map(|pending| removal_ranges(&pending.transaction))
        .collect();
    assert_eq!(
        ranges,
        vec![(-10, 59, 10_000), (60, 129, 10_000), (130, 150, 10_000)]
    );

    let last = &transactions[3].transaction;
    assert!(removal_ranges(last).is_empty());
    assert_eq!(program_payloads(last, "claim_fee").len(), 1);
    assert_eq!(program_payloads(last, "close_position").len(), 1);
    for pending in &transactions {
        assert_eq!(pending.fee_payer, owner);
        assert!(pending.encode().is_ok());
    }
}

#[tokio::test]
async fn test_remove_liquidity_checks_owner_and_close_amount() {
    let harness = Harness::new();
    let fixture = PoolFixture::new(20).install(&harness.ledger);
    let owner = Pubkey::new_unique();
    let position = fixture.add_position(&harness.ledger, owner, 15, 25, 0, 0);
    let liquidity = harness.ctx.liquidity();

    let claims = Claims {
        subject: Uuid::new_v4(),
        wallet: owner,
    };
    let partial_close = RemoveLiquidity {
        user: owner,
        position_address: position,
        bps: 5_000,
        claim_and_close: true,
    };
    assert!(matches!(
        liquidity.remove_liquidity(&claims, partial_close).await,
        Err(ServiceError::Validation(_))
    ));

    let intruder = Claims {
        subject: Uuid::new_v4(),
        wallet: Pubkey::new_unique(),
    };
    let foreign = RemoveLiquidity {
        user: intruder.wallet,
        position_address: position,
        bps: 5_000,
        claim_and_close: false,
    };
    assert!(matches!(
        liquidity.remove_liquidity(&intruder, foreign).await,
        Err(ServiceError::Authorization(_))
    ));

    let half = RemoveLiquidity {
        user: owner,
        position_address: position,
        bps: 5_000,
        claim_and_close: false,
    };
    let transactions = liquidity.remove_liquidity(&claims, half).await.unwrap();
    assert_eq!(transactions.len(), 1);
    assert_eq!(removal_ranges(&transactions[0].transaction), vec![(15, 25, 5_000)]);
}

#[tokio::test]
async fn test_claim_fees_is_creator_only() {
    let harness = Harness::new();
    let outsider = Claims {
        subject: Uuid::new_v4(),
        wallet: Pubkey::new_unique(),
    };
    let result = harness.ctx.liquidity().claim_fees(&outsider, &outsider.wallet, None).await;
    assert!(matches!(result, Err(ServiceError::Authorization(_))));

    let (_, community_id, _, _) = community_pool(&harness, 100);
    let result = harness
        .ctx
        .liquidity()
        .claim_fees(&outsider, &outsider.wallet, Some(community_id))
        .await;
    assert!(matches!(result, Err(ServiceError::Authorization(_))));
}

#[tokio::test]
async fn test_claim_fees_batches_fee_bearing_positions() {
    let harness = Harness::new();
    let (claims, _, _, fixture) = community_pool(&harness, 100);
    let ledger = &harness.ledger;
    fixture.add_position(ledger, claims.wallet, 95, 99, 10, 0);
    fixture.add_position(ledger, claims.wallet, 100, 104, 0, 10);
    fixture.add_position(ledger, claims.wallet, 105, 109, 3, 3);
    fixture.add_position(ledger, claims.wallet, 110, 114, 0, 0);

    let transactions = harness
        .ctx
        .liquidity()
        .claim_fees(&claims, &claims.wallet, None)
        .await
        .unwrap();

    let claims_per_tx: Vec<usize> = transactions
        .iter()
        .map(|pending| program_payloads(&pending.transaction, "claim_fee").len())
        .collect();
    assert_eq!(claims_per_tx, vec![2, 1]);
}

#[tokio::test]
async fn test_claim_fees_without_pending_fees_is_empty() {
    let harness = Harness::new();
    let (claims, community_id, _, fixture) = community_pool(&harness, 100);
    fixture.add_position(&harness.ledger, claims.wallet, 95, 99, 0, 0);

    let transactions = harness
        .ctx
        .liquidity()
        .claim_fees(&claims, &claims.wallet, Some(community_id))
        .await
        .unwrap();
    assert!(transactions.is_empty());
}

#[tokio::test]
async fn test_management_summary_is_creator_only() {
    let harness = Harness::new();
    let (claims, _, _, fixture) = community_pool(&harness, 100);
    fixture.add_position(&harness.ledger, claims.wallet, 101, 105, 2 * SOL, 0);

    let summary = harness
        .ctx
        .liquidity()
        .management_summary(&claims, &fixture.address(), &claims.wallet)
        .await
        .unwrap();
    assert_eq!(summary.positions.len(), 1);
    assert_eq!(summary.total_fees.first, Decimal::from(2));

    let outsider = Claims {
        subject: Uuid::new_v4(),
        wallet: Pubkey::new_unique(),
    };
    let result = harness
        .ctx
        .liquidity()
        .management_summary(&outsider, &fixture.address(), &outsider.wallet)
        .await;
    assert!(matches!(result, Err(ServiceError::Authorization(_))));

    let result = harness
        .ctx
        .liquidity()
        .management_summary(&claims, &Pubkey::new_unique(), &claims.wallet)
        .await;
    assert!(matches!(result, Err(ServiceError::NotFound(_))));
}

/// Pool at bin 100 with output liquidity for an X-to-Y swap
fn swap_pool(harness: &Harness) -> (Claims, PoolFixture) {
    let (claims, _, _, fixture) = community_pool(harness, 100);
    fixture.set_bin(&harness.ledger, 100, 0, 50 * SOL);
    fixture.set_bin(&harness.ledger, 99, 0, 50 * SOL);
    (claims, fixture)
}

fn fund_input(harness: &Harness, wallet: &Pubkey, mint: &Pubkey, amount: u64) {
    if *mint == native_mint() {
        harness.ledger.set_balance(*wallet, amount);
    } else {
        fund(&harness.ledger, wallet, mint, amount);
    }
}

fn swap_request(fixture: &PoolFixture) -> SwapRequest {
    SwapRequest {
        pool_address: fixture.address(),
        in_mint: fixture.state().token_x,
        in_amount: Decimal::ONE,
        slippage_bps: 100,
    }
}

#[tokio::test]
async fn test_swap_quote_and_transaction() {
    let harness = Harness::new();
    let (claims, fixture) = swap_pool(&harness);
    let request = swap_request(&fixture);
    fund_input(&harness, &claims.wallet, &request.in_mint, 5 * SOL);

    let swaps = harness.ctx.swaps();
    let quoted = swaps.quote(&request).await.unwrap();
    assert_eq!(quoted.summary.in_amount, Decimal::ONE);
    assert_eq!(quoted.summary.consumed_in_amount, Decimal::ONE);
    assert!(quoted.quote.out_amount > 0);
    assert!(quoted.quote.min_out_amount <= quoted.quote.out_amount);
    assert_eq!(quoted.summary.bins_crossed, 1);
    assert_eq!(quoted.summary.end_bin_id, 100);

    let (transaction, swapped) = swaps.swap(&claims, &claims.wallet, &request).await.unwrap();
    assert_eq!(swapped.quote, quoted.quote);
    assert_eq!(transaction.fee_payer, claims.wallet);
    assert_eq!(transaction.ephemeral_signer, None);
    let payloads = program_payloads(&transaction.transaction, "swap");
    assert_eq!(payloads.len(), 1);
    assert_eq!(u64::from_le_bytes(payloads[0][0..8].try_into().unwrap()), SOL);
    assert_eq!(
        u64::from_le_bytes(payloads[0][8..16].try_into().unwrap()),
        quoted.quote.min_out_amount
    );
    assert!(transaction.encode().is_ok());
}

#[tokio::test]
async fn test_swap_validations() {
    let harness = Harness::new();
    let (claims, fixture) = swap_pool(&harness);
    let swaps = harness.ctx.swaps();

    let mut request = swap_request(&fixture);
    request.in_mint = Pubkey::new_unique();
    assert!(matches!(swaps.quote(&request).await, Err(ServiceError::Validation(_))));

    // nothing to buy in the other direction
    let mut request = swap_request(&fixture);
    request.in_mint = fixture.state().token_y;
    assert!(matches!(swaps.quote(&request).await, Err(ServiceError::Validation(_))));

    let request = swap_request(&fixture);
    fund_input(&harness, &claims.wallet, &request.in_mint, SOL / 2);
    assert!(matches!(
        swaps.swap(&claims, &claims.wallet, &request).await,
        Err(ServiceError::InsufficientFunds { .. })
    ));

    let other_wallet = Pubkey::new_unique();
    assert!(matches!(
        swaps.swap(&claims, &other_wallet, &request).await,
        Err(ServiceError::Authorization(_))
    ));
}

#[tokio::test]
async fn test_preflight_failure_surfaces_program_logs() {
    let mut config = ServiceConfig::default();
    config.liquidity.preflight_simulation = true;
    let harness = Harness::with_config(config);
    let (claims, fixture) = swap_pool(&harness);
    let request = swap_request(&fixture);
    fund_input(&harness, &claims.wallet, &request.in_mint, 5 * SOL);
    harness
        .ledger
        .fail_simulation("custom program error: 0x1771", &["Program log: slippage exceeded"]);

    match harness.ctx.swaps().swap(&claims, &claims.wallet, &request).await {
        Err(ServiceError::Program { message, logs }) => {
            assert!(message.contains("0x1771"));
            assert_eq!(logs, vec!["Program log: slippage exceeded".to_string()]);
        }
        other => panic!("expected program error, got {:?}", other),
    }
    assert_eq!(harness.ledger.simulated(), 1);
}

#[tokio::test]
async fn test_unavailable_ledger_is_retryable() {
    let harness = Harness::new();
    let (_, fixture) = swap_pool(&harness);
    harness.ledger.set_unavailable(true);

    let err = harness.ctx.swaps().quote(&swap_request(&fixture)).await.unwrap_err();
    assert!(matches!(err, ServiceError::TransientRpc(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_swap_quote_mint_read_failure_is_transient() {
    let harness = Harness::new();
    let (_, fixture) = swap_pool(&harness);
    let pool = fixture.state();
    for mint in [pool.token_x, pool.token_y] {
        if mint != native_mint() {
            harness.ledger.fail_reads_of(mint);
        }
    }

    let err = harness.ctx.swaps().quote(&swap_request(&fixture)).await.unwrap_err();
    assert!(matches!(err, ServiceError::TransientRpc(_)));
}
