use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Tasks::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Tasks::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Tasks::TaskType).string().not_null())
                    .col(ColumnDef::new(Tasks::Status).string().not_null())
                    .col(ColumnDef::new(Tasks::Priority).integer().not_null().default(0))
                    .col(ColumnDef::new(Tasks::Params).json().not_null())
                    .col(ColumnDef::new(Tasks::RetryCount).integer().not_null().default(0))
                    .col(ColumnDef::new(Tasks::MaxRetries).integer().not_null().default(3))
                    .col(ColumnDef::new(Tasks::TimeoutSeconds).big_integer())
                    .col(ColumnDef::new(Tasks::ShotId).string())
                    .col(ColumnDef::new(Tasks::ShotSequence).integer())
                    .col(ColumnDef::new(Tasks::Slot).integer())
                    .col(ColumnDef::new(Tasks::DialogueIndex).integer())
                    .col(ColumnDef::new(Tasks::WorkerId).string())
                    .col(ColumnDef::new(Tasks::HeartbeatAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Tasks::ResultUrl).text())
                    .col(ColumnDef::new(Tasks::ResultLocalPath).text())
                    .col(ColumnDef::new(Tasks::Error).text())
                    .col(
                        ColumnDef::new(Tasks::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Tasks::StartedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Tasks::CompletedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Tasks::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 认领查询：按类型+状态过滤，按优先级排序
        manager
            .create_index(
                Index::create()
                    .name("idx_tasks_type_status_priority")
                    .table(Tasks::Table)
                    .col(Tasks::TaskType)
                    .col(Tasks::Status)
                    .col(Tasks::Priority)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_tasks_created_at")
                    .table(Tasks::Table)
                    .col(Tasks::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Tasks::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Tasks {
    Table,
    Id,
    TaskType,
    Status,
    Priority,
    Params,
    RetryCount,
    MaxRetries,
    TimeoutSeconds,
    ShotId,
    ShotSequence,
    Slot,
    DialogueIndex,
    WorkerId,
    HeartbeatAt,
    ResultUrl,
    ResultLocalPath,
    Error,
    CreatedAt,
    StartedAt,
    CompletedAt,
    UpdatedAt,
}
