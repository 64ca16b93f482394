//! Initial database migration.
//!
//! Creates all enums, tables, and constraints for the ledger, period close,
//! reconciliation, and billing subsystems.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: ENUMS
        // ============================================================
        db.execute_unprepared(ENUMS_SQL).await?;

        // ============================================================
        // PART 2: ORGANIZATIONS & LEDGERS
        // ============================================================
        db.execute_unprepared(ORGANIZATIONS_SQL).await?;
        db.execute_unprepared(LEDGERS_SQL).await?;
        db.execute_unprepared(API_KEYS_SQL).await?;

        // ============================================================
        // PART 3: ACCOUNTS & DOUBLE-ENTRY LEDGER
        // ============================================================
        db.execute_unprepared(ACCOUNTS_SQL).await?;
        db.execute_unprepared(TRANSACTIONS_SQL).await?;
        db.execute_unprepared(LEDGER_ENTRIES_SQL).await?;

        // ============================================================
        // PART 4: PERIODS & SNAPSHOTS
        // ============================================================
        db.execute_unprepared(TRIAL_BALANCE_SNAPSHOTS_SQL).await?;
        db.execute_unprepared(ACCOUNTING_PERIODS_SQL).await?;
        db.execute_unprepared(ADJUSTMENT_JOURNALS_SQL).await?;

        // ============================================================
        // PART 5: RECONCILIATION
        // ============================================================
        db.execute_unprepared(BANK_RECORDS_SQL).await?;

        // ============================================================
        // PART 6: BILLING
        // ============================================================
        db.execute_unprepared(OVERAGE_CHARGES_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const ENUMS_SQL: &str = r"
-- Debit or credit side of an entry
CREATE TYPE entry_type AS ENUM ('debit', 'credit');

-- Business meaning of a transaction
CREATE TYPE transaction_type AS ENUM (
    'sale',
    'expense',
    'payout',
    'refund',
    'adjustment',
    'opening_balance',
    'transfer'
);

-- Transaction lifecycle
CREATE TYPE transaction_status AS ENUM (
    'draft',
    'completed',
    'voided',
    'reversed'
);

-- Fixed chart of accounts
CREATE TYPE account_type AS ENUM (
    'cash',
    'bank',
    'accounts_receivable',
    'creator_balance',
    'platform_revenue',
    'tax_reserve',
    'expense',
    'fees',
    'equity'
);

-- Accounting period state (closed and locked are terminal)
CREATE TYPE period_status AS ENUM ('open', 'closed', 'locked');

-- How a period is cut from the calendar
CREATE TYPE period_granularity AS ENUM ('monthly', 'quarterly');

-- Overage charge lifecycle
CREATE TYPE charge_status AS ENUM (
    'pending',
    'processing',
    'succeeded',
    'failed'
);

-- Organization billing standing
CREATE TYPE billing_status AS ENUM (
    'active',
    'past_due',
    'suspended',
    'canceled'
);
";

const ORGANIZATIONS_SQL: &str = r"
CREATE TABLE organizations (
    id UUID PRIMARY KEY,
    name VARCHAR(255) NOT NULL,
    billing_status billing_status NOT NULL DEFAULT 'active',
    billing_customer_ref VARCHAR(255),
    -- Plan allowances; -1 means unlimited
    included_ledgers BIGINT NOT NULL DEFAULT 1,
    included_members BIGINT NOT NULL DEFAULT 2,
    ledger_overage_cents BIGINT NOT NULL DEFAULT 2000,
    member_overage_cents BIGINT NOT NULL DEFAULT 500,
    team_member_count BIGINT NOT NULL DEFAULT 1,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
";

const LEDGERS_SQL: &str = r"
CREATE TABLE ledgers (
    id UUID PRIMARY KEY,
    organization_id UUID NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
    name VARCHAR(255) NOT NULL,
    currency CHAR(3) NOT NULL DEFAULT 'USD',
    is_live BOOLEAN NOT NULL DEFAULT TRUE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX idx_ledgers_organization ON ledgers(organization_id);
";

const API_KEYS_SQL: &str = r"
CREATE TABLE api_keys (
    id UUID PRIMARY KEY,
    ledger_id UUID NOT NULL REFERENCES ledgers(id) ON DELETE CASCADE,
    key_hash CHAR(64) NOT NULL UNIQUE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    rotated_at TIMESTAMPTZ,

    -- One key per ledger; rotation replaces the hash in place
    CONSTRAINT uq_api_keys_ledger UNIQUE (ledger_id)
);
";

const ACCOUNTS_SQL: &str = r"
CREATE TABLE accounts (
    id UUID PRIMARY KEY,
    ledger_id UUID NOT NULL REFERENCES ledgers(id) ON DELETE CASCADE,
    account_type account_type NOT NULL,
    entity_id UUID,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

-- One account per (ledger, type, entity); NULL entity needs its own index
CREATE UNIQUE INDEX idx_accounts_identity
    ON accounts(ledger_id, account_type, entity_id)
    WHERE entity_id IS NOT NULL;
CREATE UNIQUE INDEX idx_accounts_identity_no_entity
    ON accounts(ledger_id, account_type)
    WHERE entity_id IS NULL;
";

const TRANSACTIONS_SQL: &str = r"
CREATE TABLE transactions (
    id UUID PRIMARY KEY,
    ledger_id UUID NOT NULL REFERENCES ledgers(id) ON DELETE CASCADE,
    transaction_type transaction_type NOT NULL,
    status transaction_status NOT NULL DEFAULT 'completed',
    amount NUMERIC(19, 4) NOT NULL,
    currency CHAR(3) NOT NULL DEFAULT 'USD',
    description TEXT,
    reference_id VARCHAR(255),
    reverses_transaction_id UUID REFERENCES transactions(id),
    effective_date DATE NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT uq_transactions_reference UNIQUE (ledger_id, reference_id)
);

CREATE INDEX idx_transactions_ledger_date ON transactions(ledger_id, effective_date);
CREATE INDEX idx_transactions_status ON transactions(ledger_id, status);
";

const LEDGER_ENTRIES_SQL: &str = r"
CREATE TABLE ledger_entries (
    id UUID PRIMARY KEY,
    transaction_id UUID NOT NULL REFERENCES transactions(id) ON DELETE CASCADE,
    account_id UUID NOT NULL REFERENCES accounts(id),
    entry_type entry_type NOT NULL,
    amount NUMERIC(19, 4) NOT NULL CHECK (amount > 0),
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX idx_ledger_entries_transaction ON ledger_entries(transaction_id);
CREATE INDEX idx_ledger_entries_account ON ledger_entries(account_id);
";

const TRIAL_BALANCE_SNAPSHOTS_SQL: &str = r"
CREATE TABLE trial_balance_snapshots (
    id UUID PRIMARY KEY,
    ledger_id UUID NOT NULL REFERENCES ledgers(id) ON DELETE CASCADE,
    balances JSONB NOT NULL,
    content_hash CHAR(64) NOT NULL,
    total_debits NUMERIC(19, 4) NOT NULL,
    total_credits NUMERIC(19, 4) NOT NULL,
    is_balanced BOOLEAN NOT NULL,
    taken_at TIMESTAMPTZ NOT NULL
);

CREATE INDEX idx_snapshots_ledger ON trial_balance_snapshots(ledger_id, taken_at);
";

const ACCOUNTING_PERIODS_SQL: &str = r"
CREATE TABLE accounting_periods (
    id UUID PRIMARY KEY,
    ledger_id UUID NOT NULL REFERENCES ledgers(id) ON DELETE CASCADE,
    start_date DATE NOT NULL,
    end_date DATE NOT NULL,
    granularity period_granularity NOT NULL DEFAULT 'monthly',
    status period_status NOT NULL DEFAULT 'open',
    closing_snapshot_id UUID REFERENCES trial_balance_snapshots(id),
    notes TEXT,
    closed_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    -- The close-serialization anchor: concurrent closes of the same range
    -- collide here
    CONSTRAINT uq_periods_range UNIQUE (ledger_id, start_date, end_date),
    CONSTRAINT chk_periods_range CHECK (start_date <= end_date)
);
";

const ADJUSTMENT_JOURNALS_SQL: &str = r"
CREATE TABLE adjustment_journals (
    id UUID PRIMARY KEY,
    transaction_id UUID NOT NULL REFERENCES transactions(id) ON DELETE CASCADE,
    original_transaction_id UUID REFERENCES transactions(id),
    adjustment_type VARCHAR(64) NOT NULL,
    reason TEXT NOT NULL,
    prepared_by VARCHAR(255) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX idx_adjustment_journals_original
    ON adjustment_journals(original_transaction_id);
";

const BANK_RECORDS_SQL: &str = r"
CREATE TABLE bank_records (
    id UUID PRIMARY KEY,
    ledger_id UUID NOT NULL REFERENCES ledgers(id) ON DELETE CASCADE,
    external_ref VARCHAR(255) NOT NULL,
    amount NUMERIC(19, 4) NOT NULL,
    posted_at TIMESTAMPTZ NOT NULL,
    matched_transaction_id UUID REFERENCES transactions(id),
    matched_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT uq_bank_records_external UNIQUE (ledger_id, external_ref),
    -- A transaction is consumed by at most one bank record
    CONSTRAINT uq_bank_records_transaction UNIQUE (matched_transaction_id)
);

CREATE INDEX idx_bank_records_unmatched
    ON bank_records(ledger_id, posted_at)
    WHERE matched_transaction_id IS NULL;
";

const OVERAGE_CHARGES_SQL: &str = r"
CREATE TABLE overage_charges (
    id UUID PRIMARY KEY,
    organization_id UUID NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
    period_start DATE NOT NULL,
    period_end DATE NOT NULL,
    amount_cents BIGINT NOT NULL CHECK (amount_cents >= 0),
    currency CHAR(3) NOT NULL DEFAULT 'USD',
    detail JSONB NOT NULL DEFAULT '[]',
    status charge_status NOT NULL DEFAULT 'pending',
    attempts INTEGER NOT NULL DEFAULT 0,
    last_attempt_at TIMESTAMPTZ,
    next_retry_at TIMESTAMPTZ,
    last_error TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    -- One charge per organization per billing period; the claim upsert
    -- conflicts on this
    CONSTRAINT uq_overage_charges_period UNIQUE (organization_id, period_start)
);

CREATE INDEX idx_overage_charges_due
    ON overage_charges(status, next_retry_at)
    WHERE status IN ('pending', 'processing');
";

const DROP_ALL_SQL: &str = r"
DROP TABLE IF EXISTS overage_charges CASCADE;
DROP TABLE IF EXISTS bank_records CASCADE;
DROP TABLE IF EXISTS adjustment_journals CASCADE;
DROP TABLE IF EXISTS accounting_periods CASCADE;
DROP TABLE IF EXISTS trial_balance_snapshots CASCADE;
DROP TABLE IF EXISTS ledger_entries CASCADE;
DROP TABLE IF EXISTS transactions CASCADE;
DROP TABLE IF EXISTS accounts CASCADE;
DROP TABLE IF EXISTS api_keys CASCADE;
DROP TABLE IF EXISTS ledgers CASCADE;
DROP TABLE IF EXISTS organizations CASCADE;

DROP TYPE IF EXISTS billing_status;
DROP TYPE IF EXISTS charge_status;
DROP TYPE IF EXISTS period_granularity;
DROP TYPE IF EXISTS period_status;
DROP TYPE IF EXISTS account_type;
DROP TYPE IF EXISTS transaction_status;
DROP TYPE IF EXISTS transaction_type;
DROP TYPE IF EXISTS entry_type;
";
