use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let sql = r#"
            CREATE TYPE "transaction_status" AS ENUM (
                'PENDING',
                'PROCESSED',
                'SUBMITTED',
                'CONFIRMED',
                'PAUSED',
                'ABANDONED'
            );

            CREATE TABLE "transactions" (
                "id" text PRIMARY KEY,
                "chain_id" bigint NOT NULL,
                "block_number" bigint,
                "hash" text,
                "status" "transaction_status" NOT NULL,
                "function_signature" text,
                "args" jsonb,
                "created_at" timestamp NOT NULL DEFAULT (now()),
                "updated_at" timestamp NOT NULL DEFAULT (now())
            );

            CREATE TABLE "writers" (
                "address" text PRIMARY KEY,
                "storage_address" text NOT NULL UNIQUE,
                "title" text NOT NULL,
                "admin" text NOT NULL,
                "managers" jsonb NOT NULL DEFAULT '[]'::jsonb,
                "created_at_hash" text,
                "created_at_block" bigint,
                "created_at_block_datetime" timestamp,
                "transaction_id" text UNIQUE REFERENCES "transactions" ("id"),
                "created_at" timestamp NOT NULL DEFAULT (now()),
                "updated_at" timestamp NOT NULL DEFAULT (now())
            );

            CREATE INDEX "writers_admin_index" ON "writers" ("admin");

            CREATE TABLE "entries" (
                "id" serial PRIMARY KEY,
                "exists" boolean NOT NULL,
                "on_chain_id" bigint NOT NULL,
                "storage_address" text NOT NULL,
                "raw" text,
                "content" text,
                "version" text,
                "author" text,
                "created_at_hash" text,
                "created_at_block" bigint,
                "created_at_block_datetime" timestamp,
                "created_at_transaction_id" text UNIQUE REFERENCES "transactions" ("id"),
                "updated_at_hash" text,
                "updated_at_block" bigint,
                "updated_at_block_datetime" timestamp,
                "updated_at_transaction_id" text UNIQUE REFERENCES "transactions" ("id"),
                "deleted_at_hash" text,
                "deleted_at_block" bigint,
                "deleted_at_block_datetime" timestamp,
                "deleted_at_transaction_id" text UNIQUE REFERENCES "transactions" ("id"),
                "last_event_block" bigint,
                "last_event_log_index" bigint,
                "created_at" timestamp NOT NULL DEFAULT (now()),
                "updated_at" timestamp NOT NULL DEFAULT (now()),
                UNIQUE ("on_chain_id", "storage_address")
            );

            CREATE INDEX "entries_storage_address_index" ON "entries" ("storage_address");

            CREATE TABLE "listener_checkpoints" (
                "address" text PRIMARY KEY,
                "block_number" bigint NOT NULL,
                "created_at" timestamp NOT NULL DEFAULT (now()),
                "updated_at" timestamp NOT NULL DEFAULT (now())
            );

            COMMENT ON TABLE "writers" IS 'Content collections created by the writer factory';
            COMMENT ON TABLE "entries" IS 'Content items of a writer storage contract, removed entries are kept with exists = false';
            COMMENT ON TABLE "transactions" IS 'Relay submitted transactions keyed by correlation id';
            COMMENT ON COLUMN "entries"."last_event_block" IS 'Block of the created or updated event that last wrote entry content, NULL for tombstones';
            COMMENT ON TABLE "listener_checkpoints" IS 'Last fully processed block per listened contract';
        "#;
        crate::from_sql(manager, sql).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let sql = r#"
            DROP TABLE "listener_checkpoints";
            DROP TABLE "entries";
            DROP TABLE "writers";
            DROP TABLE "transactions";
            DROP TYPE "transaction_status";
        "#;
        crate::from_sql(manager, sql).await
    }
}
