use std::sync::Arc;

use teloxide::prelude::*;

use crate::database::DatabasePool;

/// Admin check against the `admins` table. Falls back to "not an admin" on
/// database failure, logging the cause.
pub async fn is_admin(db_pool: &Arc<DatabasePool>, msg: &Message) -> bool {
    let Some(user) = msg.from.as_ref() else {
        return false;
    };
    match db_pool.is_admin(user.id.0 as i64).await {
        Ok(admin) => admin,
        Err(e) => {
            log::error!("Admin lookup failed for {}: {}", user.id, e);
            false
        }
    }
}

pub async fn is_super_admin(db_pool: &Arc<DatabasePool>, user_id: i64) -> bool {
    match db_pool.is_super_admin(user_id).await {
        Ok(found) => found,
        Err(e) => {
            log::error!("Super admin lookup failed for {}: {}", user_id, e);
            false
        }
    }
}
