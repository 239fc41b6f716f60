//! Shop catalog and purchases

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::ShopError;
use crate::session::UserId;
use crate::store::WriteBackCache;

/// Something members can buy with Ignis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDef {
    pub key: String,
    pub name: String,
    pub price: u64,
    pub description: String,
}

impl ItemDef {
    fn new(key: &str, name: &str, price: u64, description: &str) -> Self {
        Self {
            key: key.to_string(),
            name: name.to_string(),
            price,
            description: description.to_string(),
        }
    }
}

/// All items for sale
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    items: Vec<ItemDef>,
}

impl Catalog {
    pub fn new(items: Vec<ItemDef>) -> Self {
        Self { items }
    }

    /// Find an item by key
    pub fn find(&self, key: &str) -> Option<&ItemDef> {
        self.items.iter().find(|item| item.key == key)
    }

    pub fn items(&self) -> &[ItemDef] {
        &self.items
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new(vec![
            ItemDef::new("paypal", "Meta Share", 59_997, "Receive 5 € on PayPal. (Single use)"),
            ItemDef::new("xp_bonus", "GPU Chip", 1_440, "Lifts the XP cap for 1 hour. Stacks up to 5."),
            ItemDef::new("xp_block", "Malware", 348, "Blocks XP gain from the next midnight to the following one."),
            ItemDef::new("spy", "Meta Glasses", 20, "Peek at another member's bag (items and Ignis)."),
            ItemDef::new("timemute", "DDOS Attack", 999, "Mutes a member of level 10+ for 10 minutes. Once a day per target."),
        ])
    }
}

/// Completed purchase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub user_id: UserId,
    pub item: String,
    pub price: u64,
    pub balance_after: u64,
}

/// Sells catalog items against cached balances
#[derive(Debug)]
pub struct Shop {
    catalog: Catalog,
    cache: Arc<WriteBackCache>,
}

impl Shop {
    pub fn new(catalog: Catalog, cache: Arc<WriteBackCache>) -> Self {
        Self { catalog, cache }
    }

    /// Current Ignis balance
    pub fn balance(&self, user_id: UserId) -> Result<u64, ShopError> {
        Ok(self.cache.get(user_id)?.coins)
    }

    /// Buy `key` for `user_id`.
    ///
    /// The balance check, deduction and inventory update happen under the
    /// user's lock, so they cannot interleave with message rewards.
    pub fn purchase(&self, user_id: UserId, key: &str) -> Result<Receipt, ShopError> {
        let item = self
            .catalog
            .find(key)
            .ok_or_else(|| ShopError::UnknownItem(key.to_string()))?;

        let receipt = self.cache.with_user(user_id, |user| {
            if !user.spend_coins(item.price) {
                return Err(ShopError::InsufficientFunds {
                    balance: user.coins,
                    price: item.price,
                });
            }
            user.items.push(item.key.clone());
            Ok(Receipt {
                user_id,
                item: item.key.clone(),
                price: item.price,
                balance_after: user.coins,
            })
        })??;

        log::info!(
            "User {} bought {} for {} Ignis ({} left)",
            user_id,
            receipt.item,
            receipt.price,
            receipt.balance_after
        );
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::UserProgress;
    use crate::store::MemoryStore;

    fn shop_with_balance(coins: u64) -> Shop {
        let mut user = UserProgress::new(1);
        user.coins = coins;
        let cache = Arc::new(WriteBackCache::new(Arc::new(MemoryStore::with_users([user]))));
        Shop::new(Catalog::default(), cache)
    }

    #[test]
    fn test_purchase_deducts_and_records_item() {
        let shop = shop_with_balance(100);
        let receipt = shop.purchase(1, "spy").unwrap();
        assert_eq!(receipt.balance_after, 80);
        assert_eq!(shop.balance(1).unwrap(), 80);

        let cache = &shop.cache;
        assert_eq!(cache.get(1).unwrap().items, vec!["spy".to_string()]);
        assert!(cache.is_dirty(1));
    }

    #[test]
    fn test_insufficient_funds_changes_nothing() {
        let shop = shop_with_balance(300);
        let err = shop.purchase(1, "xp_block").unwrap_err();
        assert!(matches!(err, ShopError::InsufficientFunds { balance: 300, price: 348 }));
        assert_eq!(shop.balance(1).unwrap(), 300);
        assert!(!shop.cache.is_dirty(1));
    }

    #[test]
    fn test_unknown_item() {
        let shop = shop_with_balance(1_000_000);
        assert!(matches!(shop.purchase(1, "dragon"), Err(ShopError::UnknownItem(_))));
    }

    #[test]
    fn test_catalog_lookup() {
        let catalog = Catalog::default();
        assert_eq!(catalog.items().len(), 5);
        assert_eq!(catalog.find("paypal").map(|i| i.price), Some(59_997));
        assert!(catalog.find("nope").is_none());
    }
}
