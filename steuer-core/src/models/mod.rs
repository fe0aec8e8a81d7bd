mod asset_record;
mod depreciation_asset;
mod income_stream;
mod ledger_entry;
mod tax_year_params;
mod threshold_alert;

pub use asset_record::{AssetRecord, NewAssetRecord};
pub use depreciation_asset::{DepreciationAsset, DepreciationError};
pub(crate) use depreciation_asset::month_index;
pub use income_stream::IncomeStream;
pub use ledger_entry::{
    Allocation, AllocationError, ExpenseEntry, IncomeEntry, NewExpenseEntry, NewIncomeEntry,
};
pub use tax_year_params::{TAX_YEAR_2024, TAX_YEAR_2025, TaxYearError, TaxYearParams, TaxYearTable};
pub use threshold_alert::{ThresholdAlert, ThresholdKind};
