//! Randomized operation sequences against the vault.
//!
//! Drives a few thousand mixed calls (from the owner and from strangers,
//! with sensible and silly amounts) through a seeded RNG, and after every
//! call checks that:
//!
//! - the vault's native counter matches the vault address's native balance;
//! - every token counter matches the vault's balance at the token service;
//! - a rejected call changed nothing at all.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use vault_contracts::{Vault, VaultConfig};
use vault_protocol::{Address, Amount, AssetId, AssetTransfer, CallContext, Chain};

const SEEDS: [u64; 4] = [1, 7, 42, 1337];
const STEPS: usize = 1_500;

struct World {
    chain: Chain,
    vault: Vault,
    owner: Address,
    users: Vec<Address>,
    assets: Vec<AssetId>,
}

fn world() -> World {
    let mut chain = Chain::new();
    let owner = Address::from_label("owner");
    let users: Vec<Address> = (0..3).map(|i| Address::from_label(&format!("user-{i}"))).collect();

    chain.fund(owner, 1_000_000).unwrap();
    for user in &users {
        chain.fund(*user, 1_000_000).unwrap();
    }

    let vault = Vault::deploy(&mut chain, owner, VaultConfig::default()).unwrap();

    let mut assets = Vec::new();
    for symbol in ["AAA", "BBB"] {
        let id = chain
            .tokens_mut()
            .create_token(owner, symbol, symbol, 6, 500_000)
            .unwrap();
        for user in &users {
            chain.tokens_mut().transfer(&id, &owner, user, 50_000).unwrap();
        }
        assets.push(id);
    }

    World {
        chain,
        vault,
        owner,
        users,
        assets,
    }
}

/// Counters the vault reports, in a comparable shape.
fn snapshot(w: &World) -> (Amount, Vec<Amount>, usize) {
    (
        w.vault.balance(),
        w.assets.iter().map(|a| w.vault.balances(a)).collect(),
        w.vault.events().len(),
    )
}

fn assert_custody_matches_host(w: &World) {
    let vault = w.vault.address();
    assert_eq!(w.vault.balance(), w.chain.native_balance(&vault));
    for asset in &w.assets {
        assert_eq!(
            w.vault.balances(asset),
            w.chain.tokens().balance_of(asset, &vault).unwrap()
        );
    }
}

fn step(w: &mut World, rng: &mut StdRng) {
    let caller = if rng.gen_bool(0.7) {
        w.owner
    } else {
        w.users[rng.gen_range(0..w.users.len())]
    };
    let user = w.users[rng.gen_range(0..w.users.len())];
    let asset = w.assets[rng.gen_range(0..w.assets.len())];
    // Mostly modest amounts, sometimes zero, sometimes far too large.
    let amount: Amount = match rng.gen_range(0..10) {
        0 => 0,
        1 => 10_000_000,
        _ => rng.gen_range(1..5_000),
    };
    let ctx = CallContext::new(caller);
    let vault_address = w.vault.address();

    let before = snapshot(w);
    let result = match rng.gen_range(0..9) {
        0 => w
            .vault
            .deposit_native(&CallContext::with_value(caller, amount), w.chain.native_mut()),
        1 => w
            .vault
            .transfer_native_from_user(&CallContext::with_value(caller, amount), w.chain.native_mut()),
        2 => w
            .vault
            .transfer_native_to_user(&ctx, user, amount, w.chain.native_mut()),
        3 => w.vault.withdraw_native(&ctx, amount, w.chain.native_mut()),
        4 => {
            w.chain
                .tokens_mut()
                .approve(&asset, &caller, &vault_address, rng.gen_range(0..5_000))
                .unwrap();
            w.vault.deposit_token(&ctx, asset, amount, w.chain.tokens_mut())
        }
        5 => {
            w.chain
                .tokens_mut()
                .approve(&asset, &user, &vault_address, rng.gen_range(0..5_000))
                .unwrap();
            w.vault
                .transfer_token_from_user(&ctx, user, asset, amount, w.chain.tokens_mut())
        }
        6 => w
            .vault
            .transfer_token_to_user(&ctx, user, asset, amount, w.chain.tokens_mut()),
        7 => w.vault.withdraw_token(&ctx, asset, amount, w.chain.tokens_mut()),
        _ => {
            // Owner-gated call from a stranger must bounce.
            let stranger = CallContext::new(user);
            let err = w
                .vault
                .withdraw_native(&stranger, amount.max(1), w.chain.native_mut())
                .unwrap_err();
            assert!(err.is_unauthorized());
            Err(err)
        }
    };

    if result.is_err() {
        assert_eq!(snapshot(w), before, "rejected call mutated the vault");
    }
    assert_custody_matches_host(w);
}

#[test]
fn custody_tracks_host_balances_under_random_load() {
    for seed in SEEDS {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut w = world();
        for _ in 0..STEPS {
            step(&mut w, &mut rng);
        }
    }
}

#[test]
fn strangers_never_move_custody() {
    let mut rng = StdRng::seed_from_u64(99);
    let mut w = world();
    let owner = CallContext::with_value(w.owner, 10_000);
    w.vault.deposit_native(&owner, w.chain.native_mut()).unwrap();
    let asset = w.assets[0];
    let vault_address = w.vault.address();
    w.chain
        .tokens_mut()
        .approve(&asset, &w.owner, &vault_address, 10_000)
        .unwrap();
    w.vault
        .deposit_token(&CallContext::new(w.owner), asset, 10_000, w.chain.tokens_mut())
        .unwrap();

    let before = snapshot(&w);
    for _ in 0..500 {
        let stranger = w.users[rng.gen_range(0..w.users.len())];
        let ctx = CallContext::new(stranger);
        let amount = rng.gen_range(1..20_000);
        let err = match rng.gen_range(0..4) {
            0 => w.vault.withdraw_native(&ctx, amount, w.chain.native_mut()),
            1 => w
                .vault
                .transfer_native_to_user(&ctx, stranger, amount, w.chain.native_mut()),
            2 => w.vault.withdraw_token(&ctx, asset, amount, w.chain.tokens_mut()),
            _ => w
                .vault
                .transfer_token_to_user(&ctx, stranger, asset, amount, w.chain.tokens_mut()),
        }
        .unwrap_err();
        assert!(err.is_unauthorized());
    }
    assert_eq!(snapshot(&w), before);
    assert_custody_matches_host(&w);
}
