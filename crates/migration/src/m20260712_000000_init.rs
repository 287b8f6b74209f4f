//! Initial schema migration - creates all tables from scratch.
//!
//! Complete schema for the shared-expense ledger:
//!
//! - `users`: authentication
//! - `groups`: sets of members who share expenses
//! - `group_members`: membership rows with optional default split weights
//! - `expenses`: one shared cost fronted by a payer
//! - `participants`: per-member owed shares of an expense
//! - `payments`: append-only settlement events
//! - `payment_expenses`: which expenses a payment closed

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Users {
    Table,
    Username,
    Password,
}

#[derive(Iden)]
enum Groups {
    Table,
    Id,
    Name,
    OwnerId,
    Currency,
    DefaultSplit,
    CreatedAt,
}

#[derive(Iden)]
enum GroupMembers {
    Table,
    GroupId,
    UserId,
    Position,
    DefaultPercentBp,
    DefaultShares,
}

#[derive(Iden)]
enum Expenses {
    Table,
    Id,
    GroupId,
    PayerId,
    TotalMinor,
    Currency,
    SplitType,
    Note,
    CreatedAt,
    IdempotencyKey,
}

#[derive(Iden)]
enum Participants {
    Table,
    ExpenseId,
    UserId,
    Position,
    AmountOwedMinor,
    PercentBp,
    Shares,
    IsPaid,
    PaidAt,
    LinkedPaymentId,
}

#[derive(Iden)]
enum Payments {
    Table,
    Id,
    GroupId,
    FromUserId,
    ToUserId,
    AmountMinor,
    Currency,
    CreatedAt,
}

#[derive(Iden)]
enum PaymentExpenses {
    Table,
    PaymentId,
    ExpenseId,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Users
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Username)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::Password).string().not_null())
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Groups
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Groups::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Groups::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Groups::Name).string().not_null())
                    .col(ColumnDef::new(Groups::OwnerId).string().not_null())
                    .col(
                        ColumnDef::new(Groups::Currency)
                            .string()
                            .not_null()
                            .default("EUR"),
                    )
                    .col(
                        ColumnDef::new(Groups::DefaultSplit)
                            .string()
                            .not_null()
                            .default("equal"),
                    )
                    .col(
                        ColumnDef::new(Groups::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-groups-owner_id")
                            .from(Groups::Table, Groups::OwnerId)
                            .to(Users::Table, Users::Username),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Group members
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(GroupMembers::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(GroupMembers::GroupId).string().not_null())
                    .col(ColumnDef::new(GroupMembers::UserId).string().not_null())
                    .col(
                        ColumnDef::new(GroupMembers::Position)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(GroupMembers::DefaultPercentBp).integer())
                    .col(ColumnDef::new(GroupMembers::DefaultShares).integer())
                    .primary_key(
                        Index::create()
                            .col(GroupMembers::GroupId)
                            .col(GroupMembers::UserId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-group_members-group_id")
                            .from(GroupMembers::Table, GroupMembers::GroupId)
                            .to(Groups::Table, Groups::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Expenses
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Expenses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Expenses::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Expenses::GroupId).string().not_null())
                    .col(ColumnDef::new(Expenses::PayerId).string().not_null())
                    .col(
                        ColumnDef::new(Expenses::TotalMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Expenses::Currency).string().not_null())
                    .col(ColumnDef::new(Expenses::SplitType).string().not_null())
                    .col(ColumnDef::new(Expenses::Note).string())
                    .col(
                        ColumnDef::new(Expenses::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Expenses::IdempotencyKey).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-expenses-group_id")
                            .from(Expenses::Table, Expenses::GroupId)
                            .to(Groups::Table, Groups::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-expenses-group-created")
                    .table(Expenses::Table)
                    .col(Expenses::GroupId)
                    .col(Expenses::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-expenses-idempotency")
                    .table(Expenses::Table)
                    .col(Expenses::GroupId)
                    .col(Expenses::IdempotencyKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 5. Participants
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Participants::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Participants::ExpenseId).string().not_null())
                    .col(ColumnDef::new(Participants::UserId).string().not_null())
                    .col(
                        ColumnDef::new(Participants::Position)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Participants::AmountOwedMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Participants::PercentBp).integer())
                    .col(ColumnDef::new(Participants::Shares).integer())
                    .col(
                        ColumnDef::new(Participants::IsPaid)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Participants::PaidAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Participants::LinkedPaymentId).string())
                    .primary_key(
                        Index::create()
                            .col(Participants::ExpenseId)
                            .col(Participants::UserId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-participants-expense_id")
                            .from(Participants::Table, Participants::ExpenseId)
                            .to(Expenses::Table, Expenses::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 6. Payments
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Payments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Payments::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Payments::GroupId).string().not_null())
                    .col(ColumnDef::new(Payments::FromUserId).string().not_null())
                    .col(ColumnDef::new(Payments::ToUserId).string().not_null())
                    .col(
                        ColumnDef::new(Payments::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Payments::Currency).string().not_null())
                    .col(
                        ColumnDef::new(Payments::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-payments-group_id")
                            .from(Payments::Table, Payments::GroupId)
                            .to(Groups::Table, Groups::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 7. Payment ↔ expense closed-set
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(PaymentExpenses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PaymentExpenses::PaymentId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PaymentExpenses::ExpenseId)
                            .string()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(PaymentExpenses::PaymentId)
                            .col(PaymentExpenses::ExpenseId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-payment_expenses-payment_id")
                            .from(PaymentExpenses::Table, PaymentExpenses::PaymentId)
                            .to(Payments::Table, Payments::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop in reverse order of creation (respecting FK dependencies)
        manager
            .drop_table(Table::drop().table(PaymentExpenses::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Payments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Participants::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Expenses::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(GroupMembers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Groups::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}
