//! In-memory collaborators and account fixtures for tests
//!
//! Fixture encoders panic on failure; they only ever write into `Vec`s.

use async_trait::async_trait;
use solana_program::program_option::COption;
use solana_program::program_pack::Pack;
use solana_sdk::{account::Account, hash::Hash, pubkey::Pubkey, system_program, transaction::Transaction};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::config::ServiceConfig;
use crate::core::{
    AccountFilter, Claims, ClaimsVerifier, Clock, Community, CommunityStore, LedgerError, LedgerPort, LedgerResult,
    PoolState, ServiceError, ServiceResult, SimulationOutcome,
};
use crate::program::{BinArrayAccount, BinRecord, LbPairAccount, PdaBuilder, PositionAccount, ProgramAccount, PROGRAM_ID};
use crate::services::{EngineSettings, ServiceContext};

pub fn program_id() -> Pubkey {
    PROGRAM_ID
}

struct StoredAccount {
    account: Account,
    /// Reads that still report the account as missing
    hidden_reads: u32,
}

/// Ledger fake. Accounts can be made to appear only after a number of reads.
#[derive(Default)]
pub struct InMemoryLedger {
    accounts: Mutex<HashMap<Pubkey, StoredAccount>>,
    balances: Mutex<HashMap<Pubkey, u64>>,
    unavailable: AtomicBool,
    failing: Mutex<HashSet<Pubkey>>,
    simulation_error: Mutex<Option<(String, Vec<String>)>>,
    simulated: Mutex<Vec<Transaction>>,
    blockhash: Hash,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self {
            blockhash: Hash::new_unique(),
            ..Self::default()
        }
    }

    pub fn insert(&self, address: Pubkey, account: Account) {
        self.insert_delayed(address, account, 0);
    }

    /// Store `account`, hidden from the next `hidden_reads` reads.
    pub fn insert_delayed(&self, address: Pubkey, account: Account, hidden_reads: u32) {
        self.lock_accounts().insert(address, StoredAccount { account, hidden_reads });
    }

    pub fn account(&self, address: &Pubkey) -> Option<Account> {
        self.lock_accounts().get(address).map(|stored| stored.account.clone())
    }

    pub fn set_balance(&self, wallet: Pubkey, lamports: u64) {
        self.balances.lock().expect("balances lock").insert(wallet, lamports);
    }

    /// Make every call fail as if the endpoint were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make reads of `address` fail while every other account stays readable.
    pub fn fail_reads_of(&self, address: Pubkey) {
        self.failing.lock().expect("failing lock").insert(address);
    }

    pub fn fail_simulation(&self, message: &str, logs: &[&str]) {
        *self.simulation_error.lock().expect("simulation lock") =
            Some((message.to_string(), logs.iter().map(|log| log.to_string()).collect()));
    }

    pub fn simulated(&self) -> usize {
        self.simulated.lock().expect("simulated lock").len()
    }

    pub fn blockhash(&self) -> Hash {
        self.blockhash
    }

    fn lock_accounts(&self) -> std::sync::MutexGuard<'_, HashMap<Pubkey, StoredAccount>> {
        self.accounts.lock().expect("accounts lock")
    }

    fn check_available(&self) -> LedgerResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(LedgerError::Transport("connection refused".to_string()));
        }
        Ok(())
    }

    fn check_readable(&self, address: &Pubkey) -> LedgerResult<()> {
        if self.failing.lock().expect("failing lock").contains(address) {
            return Err(LedgerError::Transport(format!("read of {} timed out", address)));
        }
        Ok(())
    }

    fn read(&self, address: &Pubkey) -> Option<Account> {
        let mut accounts = self.lock_accounts();
        let stored = accounts.get_mut(address)?;
        if stored.hidden_reads > 0 {
            stored.hidden_reads -= 1;
            return None;
        }
        Some(stored.account.clone())
    }
}

fn matches_filter(account: &Account, filter: &AccountFilter) -> bool {
    match filter {
        AccountFilter::Memcmp { offset, bytes } => account
            .data
            .get(*offset..offset + bytes.len())
            .is_some_and(|window| window == bytes.as_slice()),
        AccountFilter::DataSize(size) => account.data.len() as u64 == *size,
    }
}

#[async_trait]
impl LedgerPort for InMemoryLedger {
    async fn get_account(&self, address: &Pubkey) -> LedgerResult<Option<Account>> {
        self.check_available()?;
        self.check_readable(address)?;
        Ok(self.read(address))
    }

    async fn get_multiple_accounts(&self, addresses: &[Pubkey]) -> LedgerResult<Vec<Option<Account>>> {
        self.check_available()?;
        for address in addresses {
            self.check_readable(address)?;
        }
        Ok(addresses.iter().map(|address| self.read(address)).collect())
    }

    async fn get_balance(&self, address: &Pubkey) -> LedgerResult<u64> {
        self.check_available()?;
        Ok(self
            .balances
            .lock()
            .expect("balances lock")
            .get(address)
            .copied()
            .unwrap_or_default())
    }

    async fn get_latest_blockhash(&self) -> LedgerResult<Hash> {
        self.check_available()?;
        Ok(self.blockhash)
    }

    async fn get_program_accounts(
        &self,
        program: &Pubkey,
        filters: &[AccountFilter],
    ) -> LedgerResult<Vec<(Pubkey, Account)>> {
        self.check_available()?;
        Ok(self
            .lock_accounts()
            .iter()
            .filter(|(_, stored)| stored.hidden_reads == 0 && stored.account.owner == *program)
            .filter(|(_, stored)| filters.iter().all(|filter| matches_filter(&stored.account, filter)))
            .map(|(address, stored)| (*address, stored.account.clone()))
            .collect())
    }

    async fn simulate_transaction(&self, transaction: &Transaction) -> LedgerResult<SimulationOutcome> {
        self.check_available()?;
        self.simulated.lock().expect("simulated lock").push(transaction.clone());
        let outcome = match self.simulation_error.lock().expect("simulation lock").clone() {
            Some((message, logs)) => SimulationOutcome {
                err: Some(message),
                logs,
                units_consumed: None,
            },
            None => SimulationOutcome {
                err: None,
                logs: vec!["Program log: ok".to_string()],
                units_consumed: Some(50_000),
            },
        };
        Ok(outcome)
    }
}

/// Community store and session verifier fake
#[derive(Default)]
pub struct InMemoryStore {
    communities: Mutex<HashMap<Uuid, Community>>,
    sessions: Mutex<HashMap<String, Claims>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_community(&self, community: Community) {
        self.communities
            .lock()
            .expect("communities lock")
            .insert(community.id, community);
    }

    pub fn community(&self, id: &Uuid) -> Option<Community> {
        self.communities.lock().expect("communities lock").get(id).cloned()
    }

    pub fn add_session(&self, token: &str, claims: Claims) {
        self.sessions
            .lock()
            .expect("sessions lock")
            .insert(token.to_string(), claims);
    }
}

#[async_trait]
impl CommunityStore for InMemoryStore {
    async fn get_community(&self, id: Uuid) -> ServiceResult<Option<Community>> {
        Ok(self.community(&id))
    }

    async fn find_community_by_pool(&self, pool: &Pubkey) -> ServiceResult<Option<Community>> {
        Ok(self
            .communities
            .lock()
            .expect("communities lock")
            .values()
            .find(|community| community.pool_address.as_ref() == Some(pool))
            .cloned())
    }

    async fn find_communities_by_creator(&self, creator_id: Uuid) -> ServiceResult<Vec<Community>> {
        let mut found: Vec<Community> = self
            .communities
            .lock()
            .expect("communities lock")
            .values()
            .filter(|community| community.creator_id == creator_id)
            .cloned()
            .collect();
        found.sort_by_key(|community| community.id);
        Ok(found)
    }

    async fn record_pool_address(&self, id: Uuid, pool: &Pubkey) -> ServiceResult<()> {
        let mut communities = self.communities.lock().expect("communities lock");
        let community = communities
            .get_mut(&id)
            .ok_or_else(|| ServiceError::not_found(format!("community {}", id)))?;
        community.pool_address = Some(*pool);
        Ok(())
    }
}

#[async_trait]
impl ClaimsVerifier for InMemoryStore {
    async fn verify(&self, token: &str) -> ServiceResult<Option<Claims>> {
        Ok(self.sessions.lock().expect("sessions lock").get(token).copied())
    }
}

/// Virtual clock: sleeping advances time instantly and is recorded.
pub struct ManualClock {
    start: Instant,
    offset: Mutex<Duration>,
    sleeps: Mutex<Vec<Duration>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
            sleeps: Mutex::new(Vec::new()),
        }
    }

    pub fn elapsed(&self) -> Duration {
        *self.offset.lock().expect("clock lock")
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().expect("clock lock").clone()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.start + self.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().expect("clock lock").push(duration);
        *self.offset.lock().expect("clock lock") += duration;
    }
}

pub fn raw_account(data: Vec<u8>) -> Account {
    Account {
        lamports: 1_000_000,
        data,
        owner: system_program::id(),
        executable: false,
        rent_epoch: 0,
    }
}

pub fn program_account(data: Vec<u8>) -> Account {
    Account {
        owner: PROGRAM_ID,
        ..raw_account(data)
    }
}

pub fn mint_account(decimals: u8) -> Account {
    let mint = spl_token::state::Mint {
        mint_authority: COption::None,
        supply: 1_000_000_000_000_000,
        decimals,
        is_initialized: true,
        freeze_authority: COption::None,
    };
    let mut data = vec![0u8; spl_token::state::Mint::LEN];
    mint.pack_into_slice(&mut data);
    Account {
        owner: spl_token::id(),
        ..raw_account(data)
    }
}

pub fn token_account(mint: &Pubkey, owner: &Pubkey, amount: u64) -> Account {
    let state = spl_token::state::Account {
        mint: *mint,
        owner: *owner,
        amount,
        delegate: COption::None,
        state: spl_token::state::AccountState::Initialized,
        is_native: COption::None,
        delegated_amount: 0,
        close_authority: COption::None,
    };
    let mut data = vec![0u8; spl_token::state::Account::LEN];
    state.pack_into_slice(&mut data);
    Account {
        owner: spl_token::id(),
        ..raw_account(data)
    }
}

/// Fund `wallet` with `amount` of `mint` through its associated token account.
pub fn fund(ledger: &InMemoryLedger, wallet: &Pubkey, mint: &Pubkey, amount: u64) -> Pubkey {
    let holding = spl_associated_token_account::get_associated_token_address(wallet, mint);
    ledger.insert(holding, token_account(mint, wallet, amount));
    holding
}

fn encode<T: ProgramAccount>(account: &T) -> Vec<u8> {
    account.encode().expect("fixture encoding")
}

/// An installed pool with bin step 25 and a 25 bps fee
#[derive(Debug, Clone)]
pub struct PoolFixture {
    pool: PoolState,
    creator: Pubkey,
    pdas: PdaBuilder,
}

impl PoolFixture {
    /// Pool between two fresh mints
    pub fn new(active_bin: i32) -> Self {
        Self::with_mints(Pubkey::new_unique(), Pubkey::new_unique(), active_bin)
    }

    /// Pool between `a` and `b`, in canonical order whatever the argument order
    pub fn with_mints(a: Pubkey, b: Pubkey, active_bin: i32) -> Self {
        let (token_x, token_y) = if a < b { (a, b) } else { (b, a) };
        let pdas = PdaBuilder::new(PROGRAM_ID);
        Self {
            pool: pdas.new_pool(token_x, token_y, 25, active_bin, 25),
            creator: Pubkey::new_unique(),
            pdas,
        }
    }

    pub fn state(&self) -> PoolState {
        self.pool.clone()
    }

    pub fn address(&self) -> Pubkey {
        self.pool.address
    }

    /// Write the pool and its 9-decimal mints to `ledger`.
    pub fn install(self, ledger: &InMemoryLedger) -> Self {
        let account = LbPairAccount {
            bump_seed: 255,
            bin_step: self.pool.bin_step,
            active_id: self.pool.active_bin,
            base_fee_bps: self.pool.base_fee_bps,
            token_x_mint: self.pool.token_x,
            token_y_mint: self.pool.token_y,
            reserve_x: self.pool.reserve_x,
            reserve_y: self.pool.reserve_y,
            oracle: self.pool.oracle,
            creator: self.creator,
        };
        ledger.insert(self.pool.address, program_account(encode(&account)));
        for mint in [self.pool.token_x, self.pool.token_y] {
            if mint != spl_token::native_mint::id() {
                ledger.insert(mint, mint_account(9));
            }
        }
        self
    }

    /// Open a position with pending fees; returns its address.
    pub fn add_position(
        &self,
        ledger: &InMemoryLedger,
        owner: Pubkey,
        lower_bin: i32,
        upper_bin: i32,
        fee_x: u64,
        fee_y: u64,
    ) -> Pubkey {
        let address = Pubkey::new_unique();
        let position = PositionAccount {
            lb_pair: self.pool.address,
            owner,
            lower_bin_id: lower_bin,
            upper_bin_id: upper_bin,
            fee_x_pending: fee_x,
            fee_y_pending: fee_y,
            last_updated_at: 0,
        };
        ledger.insert(address, program_account(encode(&position)));
        address
    }

    pub fn set_bin(&self, ledger: &InMemoryLedger, bin_id: i32, amount_x: u64, amount_y: u64) {
        let index = hive_core::math::bin_array_index(bin_id);
        let (address, _) = self.pdas.bin_array(&self.pool.address, index);
        let mut array = ledger
            .account(&address)
            .and_then(|account| BinArrayAccount::decode(&account.data).ok())
            .unwrap_or_else(|| BinArrayAccount::empty(self.pool.address, index));
        let (lower, _) = hive_core::math::bin_array_bounds(index);
        array.bins[(bin_id - lower) as usize] = BinRecord { amount_x, amount_y };
        ledger.insert(address, program_account(encode(&array)));
    }
}

/// Fakes wired into a `ServiceContext`
pub struct Harness {
    pub ledger: Arc<InMemoryLedger>,
    pub store: Arc<InMemoryStore>,
    pub clock: Arc<ManualClock>,
    pub ctx: ServiceContext,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(ServiceConfig::default())
    }

    pub fn with_config(config: ServiceConfig) -> Self {
        let ledger = Arc::new(InMemoryLedger::new());
        let store = Arc::new(InMemoryStore::new());
        let clock = Arc::new(ManualClock::new());
        let settings = EngineSettings::from_config(&config).expect("test configuration");
        let ctx = ServiceContext::new(ledger.clone(), store.clone(), store.clone(), clock.clone(), settings);
        Self {
            ledger,
            store,
            clock,
            ctx,
        }
    }

    /// A creator session plus their community for `token_mint`.
    pub fn creator(&self, token_mint: Pubkey, pool_address: Option<Pubkey>) -> (Claims, Community) {
        let claims = Claims {
            subject: Uuid::new_v4(),
            wallet: Pubkey::new_unique(),
        };
        let community = Community {
            id: Uuid::new_v4(),
            creator_id: claims.subject,
            token_mint,
            pool_address,
        };
        self.store.insert_community(community.clone());
        (claims, community)
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}
