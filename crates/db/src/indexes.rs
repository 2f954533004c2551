use mongodb::{Database, IndexModel, options::IndexOptions};
use tracing::info;

use crate::models::{Activity, Customer, Lead, Leave, Notification, Target, Task, User};

pub async fn ensure_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    // Users
    create_indexes(
        db,
        User::COLLECTION,
        vec![
            index_unique(bson::doc! { "username": 1 }),
            index(bson::doc! { "manager": 1, "is_active": 1 }),
            index(bson::doc! { "privilege": 1 }),
        ],
    )
    .await?;

    // Customers
    create_indexes(
        db,
        Customer::COLLECTION,
        vec![
            index_unique(bson::doc! { "phone": 1 }),
            index(bson::doc! { "name": 1 }),
        ],
    )
    .await?;

    // Leads
    create_indexes(
        db,
        Lead::COLLECTION,
        vec![
            index(bson::doc! { "handled_by": 1, "created_at": -1 }),
            index(bson::doc! { "manager": 1, "created_at": -1 }),
            index(bson::doc! { "customer": 1 }),
            index(bson::doc! { "enquire_status": 1 }),
            index(bson::doc! { "has_task": 1, "created_at": -1 }),
        ],
    )
    .await?;

    // Tasks: at most one open task per lead
    create_indexes(
        db,
        Task::COLLECTION,
        vec![
            IndexModel::builder()
                .keys(bson::doc! { "lead": 1 })
                .options(
                    IndexOptions::builder()
                        .unique(true)
                        .partial_filter_expression(bson::doc! { "is_completed": false })
                        .name("lead_open_task_unique".to_string())
                        .build(),
                )
                .build(),
            index(bson::doc! { "assigned": 1, "due": 1 }),
            index(bson::doc! { "lead": 1, "created_at": -1 }),
        ],
    )
    .await?;

    // Activities
    create_indexes(
        db,
        Activity::COLLECTION,
        vec![
            index(bson::doc! { "lead": 1, "created_at": -1 }),
            index(bson::doc! { "activator": 1, "created_at": -1 }),
            index(bson::doc! { "type": 1, "created_at": -1 }),
        ],
    )
    .await?;

    // Targets: one document per user and month
    create_indexes(
        db,
        Target::COLLECTION,
        vec![index_unique(bson::doc! { "assigned": 1, "month": 1 })],
    )
    .await?;

    // Leaves
    create_indexes(
        db,
        Leave::COLLECTION,
        vec![index(bson::doc! { "requester": 1, "date": -1 })],
    )
    .await?;

    // Notifications
    create_indexes(
        db,
        Notification::COLLECTION,
        vec![index(bson::doc! { "assigned": 1, "created_at": -1 })],
    )
    .await?;

    info!("All indexes ensured");
    Ok(())
}

fn index(keys: bson::Document) -> IndexModel {
    IndexModel::builder().keys(keys).build()
}

fn index_unique(keys: bson::Document) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().unique(true).build())
        .build()
}

async fn create_indexes(
    db: &Database,
    collection: &str,
    indexes: Vec<IndexModel>,
) -> Result<(), mongodb::error::Error> {
    db.collection::<bson::Document>(collection)
        .create_indexes(indexes)
        .await?;
    info!(collection, "Indexes created");
    Ok(())
}
