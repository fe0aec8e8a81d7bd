use serde::{Deserialize, Serialize};

use super::{Allocation, DepreciationAsset};
use crate::calculations::AllocatedAsset;

/// A capitalized asset as stored in the ledger.
///
/// `expense_id` links back to the expense the purchase was booked as;
/// `allocation` is copied from that expense and splits the yearly AfA between
/// the streams.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRecord {
    pub id: i64,
    pub user_id: i64,
    pub expense_id: Option<i64>,
    pub allocation: Option<Allocation>,
    pub asset: DepreciationAsset,
}

impl AssetRecord {
    pub fn allocated(&self) -> AllocatedAsset {
        AllocatedAsset {
            asset: self.asset.clone(),
            allocation: self.allocation,
        }
    }
}

/// For creating new asset records (no id)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAssetRecord {
    pub user_id: i64,
    pub expense_id: Option<i64>,
    pub allocation: Option<Allocation>,
    pub asset: DepreciationAsset,
}

impl NewAssetRecord {
    pub fn into_record(
        self,
        id: i64,
    ) -> AssetRecord {
        AssetRecord {
            id,
            user_id: self.user_id,
            expense_id: self.expense_id,
            allocation: self.allocation,
            asset: self.asset,
        }
    }
}
