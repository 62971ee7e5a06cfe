//! Cart Repository
//!
//! ownerId UNIQUE 索引保证每个身份至多一个购物车。
//! 保存走乐观并发：WHERE version = $expected，冲突时由服务层重读重试，
//! 避免整文档覆盖造成的丢失更新。

use super::{BaseRepository, RepoError, RepoResult, is_unique_violation};
use crate::db::models::Cart;
use crate::utils::time::now_rfc3339;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

const CART_TABLE: &str = "cart";

#[derive(Clone)]
pub struct CartRepository {
    base: BaseRepository,
}

impl CartRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Find a cart by its owning identity
    pub async fn find_by_owner(&self, owner_id: &str) -> RepoResult<Option<Cart>> {
        let carts: Vec<Cart> = self
            .base
            .db()
            .query("SELECT * FROM cart WHERE ownerId = $owner")
            .bind(("owner", owner_id.to_string()))
            .await?
            .take(0)?;
        Ok(carts.into_iter().next())
    }

    /// Create a new cart record
    ///
    /// 并发首次创建时 UNIQUE 索引会拒绝第二个写入，调用方重读即可。
    pub async fn create(&self, cart: Cart) -> RepoResult<Cart> {
        let created: Option<Cart> = self
            .base
            .db()
            .create(CART_TABLE)
            .content(cart)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    RepoError::Duplicate("Cart already exists for this identity".to_string())
                } else {
                    RepoError::from(e)
                }
            })?;
        created.ok_or_else(|| RepoError::Database("Failed to create cart".to_string()))
    }

    /// Optimistic save: only applies when the stored version matches
    ///
    /// Returns `None` on version conflict — caller reloads and retries.
    pub async fn save(&self, cart: &Cart) -> RepoResult<Option<Cart>> {
        let updated: Vec<Cart> = self
            .base
            .db()
            .query(
                r#"
                UPDATE cart SET
                    items       = $items,
                    totalAmount = $total_amount,
                    totalItems  = $total_items,
                    version     = version + 1,
                    updatedAt   = $updated_at
                WHERE ownerId = $owner AND version = $version
                RETURN AFTER
                "#,
            )
            .bind(("items", cart.items.clone()))
            .bind(("total_amount", cart.total_amount))
            .bind(("total_items", cart.total_items))
            .bind(("updated_at", cart.updated_at.clone()))
            .bind(("owner", cart.owner_id.clone()))
            .bind(("version", cart.version))
            .await?
            .take(0)?;
        Ok(updated.into_iter().next())
    }

    /// Transfer cart ownership (guest → user) in one atomic update
    pub async fn rename_owner(&self, from: &str, to: &str) -> RepoResult<Option<Cart>> {
        let updated: Vec<Cart> = self
            .base
            .db()
            .query(
                r#"
                UPDATE cart SET
                    ownerId   = $to,
                    version   = version + 1,
                    updatedAt = $updated_at
                WHERE ownerId = $from
                RETURN AFTER
                "#,
            )
            .bind(("to", to.to_string()))
            .bind(("from", from.to_string()))
            .bind(("updated_at", now_rfc3339()))
            .await?
            .take(0)?;
        Ok(updated.into_iter().next())
    }

    /// Delete a cart; returns whether a record existed
    pub async fn delete_by_owner(&self, owner_id: &str) -> RepoResult<bool> {
        let deleted: Vec<Cart> = self
            .base
            .db()
            .query("DELETE cart WHERE ownerId = $owner RETURN BEFORE")
            .bind(("owner", owner_id.to_string()))
            .await?
            .take(0)?;
        Ok(!deleted.is_empty())
    }
}
